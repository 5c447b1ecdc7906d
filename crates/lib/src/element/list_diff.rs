//! Line diffs for list elements.
//!
//! A list diff is a Myers edit script grouped into hunks. Each hunk carries
//! its surrounding context lines so it can be located again when the diff is
//! applied to a list that is not its exact base. Application to the exact
//! base always reproduces the target; application to a drifted base is
//! best-effort and fails with [`ElementError::ListDrift`] when a hunk's
//! context cannot be found.

use serde::{Deserialize, Serialize};

use super::ElementError;

/// Default number of context lines carried on each side of a hunk.
pub const DEFAULT_CONTEXT: usize = 3;

/// One contiguous group of edits, with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
  /// Index into the base list of this hunk's first line.
  pub old_start: usize,
  pub lines: Vec<HunkLine>,
}

/// A single line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HunkLine {
  /// Present in both lists; used to locate the hunk.
  Context { text: String },
  /// Present in the base only.
  Remove { text: String },
  /// Present in the target only.
  Insert { text: String },
}

/// One step of a raw edit script, before grouping into hunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
  /// `(base index, target index)` of a line present in both.
  Equal(usize, usize),
  /// Base index of a deleted line.
  Delete(usize),
  /// Target index of an inserted line.
  Insert(usize),
}

impl Edit {
  fn is_change(self) -> bool {
    !matches!(self, Edit::Equal(..))
  }
}

/// Compute the hunks that transform `a` into `b`, carrying `context` lines
/// of surrounding context.
pub fn diff(a: &[String], b: &[String], context: usize) -> Vec<Hunk> {
  let edits = edit_script(a, b);
  group_hunks(a, b, &edits, context)
}

/// Apply `hunks` to `a`.
///
/// Each hunk is matched against `a` by its full base-side line sequence
/// (context and removals), trying the position nearest its recorded
/// location first. Hunks that cannot be located produce `ListDrift`.
pub fn apply(a: &[String], hunks: &[Hunk]) -> Result<Vec<String>, ElementError> {
  let mut out = Vec::with_capacity(a.len());
  let mut cursor = 0usize;

  for hunk in hunks {
    let old_lines: Vec<&str> = hunk
      .lines
      .iter()
      .filter_map(|line| match line {
        HunkLine::Context { text } | HunkLine::Remove { text } => Some(text.as_str()),
        HunkLine::Insert { .. } => None,
      })
      .collect();

    let pos = locate(a, cursor, hunk.old_start, &old_lines)
      .ok_or(ElementError::ListDrift { line: hunk.old_start })?;

    out.extend_from_slice(&a[cursor..pos]);
    for line in &hunk.lines {
      match line {
        HunkLine::Context { text } | HunkLine::Insert { text } => out.push(text.clone()),
        HunkLine::Remove { .. } => {}
      }
    }
    cursor = pos + old_lines.len();
  }

  out.extend_from_slice(&a[cursor..]);
  Ok(out)
}

/// Find where a hunk's base-side lines occur in `a`, at or after `min`,
/// preferring the position closest to `want`.
fn locate(a: &[String], min: usize, want: usize, old_lines: &[&str]) -> Option<usize> {
  if old_lines.is_empty() {
    // A pure-insert hunk has no lines to anchor on; trust its position.
    return if want >= min && want <= a.len() { Some(want) } else { None };
  }

  let last = a.len().checked_sub(old_lines.len())?;
  let mut best: Option<usize> = None;
  for pos in min..=last {
    if a[pos..pos + old_lines.len()].iter().map(String::as_str).eq(old_lines.iter().copied()) {
      let closer = match best {
        None => true,
        Some(prev) => pos.abs_diff(want) < prev.abs_diff(want),
      };
      if closer {
        best = Some(pos);
      }
    }
  }
  best
}

/// Myers shortest edit script over two line slices.
fn edit_script(a: &[String], b: &[String]) -> Vec<Edit> {
  let n = a.len();
  let m = b.len();
  let max = n + m;
  if max == 0 {
    return Vec::new();
  }

  // Forward pass, recording the furthest-reaching x per diagonal at every
  // edit distance so the path can be rebuilt afterwards.
  let offset = max as isize;
  let width = 2 * max + 1;
  let mut v = vec![0isize; width];
  let mut trace: Vec<Vec<isize>> = Vec::new();
  let mut found_d = None;

  'search: for d in 0..=(max as isize) {
    trace.push(v.clone());
    let mut k = -d;
    while k <= d {
      let idx = (k + offset) as usize;
      let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
        v[idx + 1]
      } else {
        v[idx - 1] + 1
      };
      let mut y = x - k;
      while (x as usize) < n && (y as usize) < m && a[x as usize] == b[y as usize] {
        x += 1;
        y += 1;
      }
      v[idx] = x;
      if x as usize >= n && y as usize >= m {
        found_d = Some(d);
        break 'search;
      }
      k += 2;
    }
  }

  // Walk the trace backwards from (n, m) to (0, 0).
  let mut edits = Vec::new();
  let mut x = n as isize;
  let mut y = m as isize;
  let mut d = found_d.unwrap_or(0);

  while d > 0 {
    let v = &trace[d as usize];
    let k = x - y;
    let idx = (k + offset) as usize;
    let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
      k + 1
    } else {
      k - 1
    };
    let prev_x = v[(prev_k + offset) as usize];
    let prev_y = prev_x - prev_k;

    while x > prev_x && y > prev_y {
      x -= 1;
      y -= 1;
      edits.push(Edit::Equal(x as usize, y as usize));
    }
    if x == prev_x {
      y -= 1;
      edits.push(Edit::Insert(y as usize));
    } else {
      x -= 1;
      edits.push(Edit::Delete(x as usize));
    }
    d -= 1;
  }
  while x > 0 && y > 0 {
    x -= 1;
    y -= 1;
    edits.push(Edit::Equal(x as usize, y as usize));
  }

  edits.reverse();
  edits
}

/// Group a raw edit script into hunks with `context` lines of context,
/// merging changes whose gap is within two contexts of each other.
fn group_hunks(a: &[String], b: &[String], edits: &[Edit], context: usize) -> Vec<Hunk> {
  let change_indices: Vec<usize> = edits
    .iter()
    .enumerate()
    .filter(|(_, e)| e.is_change())
    .map(|(i, _)| i)
    .collect();
  if change_indices.is_empty() {
    return Vec::new();
  }

  // Cluster changes separated by at most 2 * context unchanged lines.
  let mut clusters: Vec<(usize, usize)> = Vec::new();
  let mut start = change_indices[0];
  let mut end = change_indices[0];
  for &i in &change_indices[1..] {
    if i - end <= 2 * context {
      end = i;
    } else {
      clusters.push((start, end));
      start = i;
      end = i;
    }
  }
  clusters.push((start, end));

  clusters
    .into_iter()
    .map(|(first, last)| {
      let from = first.saturating_sub(context);
      let to = (last + context + 1).min(edits.len());
      let old_start = base_position(edits, from);
      let lines = edits[from..to]
        .iter()
        .map(|edit| match *edit {
          Edit::Equal(ai, _) => HunkLine::Context { text: a[ai].clone() },
          Edit::Delete(ai) => HunkLine::Remove { text: a[ai].clone() },
          Edit::Insert(bi) => HunkLine::Insert { text: b[bi].clone() },
        })
        .collect();
      Hunk { old_start, lines }
    })
    .collect()
}

/// The base-list index at which the edit at `idx` sits.
fn base_position(edits: &[Edit], idx: usize) -> usize {
  match edits[idx] {
    Edit::Equal(ai, _) | Edit::Delete(ai) => ai,
    // An insert sits at the base position following the preceding edits.
    Edit::Insert(_) => edits[..idx]
      .iter()
      .rev()
      .find_map(|e| match *e {
        Edit::Equal(ai, _) | Edit::Delete(ai) => Some(ai + 1),
        Edit::Insert(_) => None,
      })
      .unwrap_or(0),
  }
}
