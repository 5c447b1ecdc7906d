//! rsd-lib: the algebraic core of Ready-Set-Deploy.
//!
//! Ready-Set-Deploy moves a host from its observed configuration to a
//! desired configuration by representing both as structured data, taking an
//! algebraic difference, and rendering only that difference into commands.
//! This crate is the algebraic middle: it neither defines desired state nor
//! executes commands.
//!
//! - [`element`]: the typed element kinds and their diff/apply/combine
//!   operations
//! - [`component`]: provider-owned bundles of named elements
//! - [`system`]: keyed component collections with partial/full semantics
//! - [`provider`]: the gather/render plugin seam and its registry
//! - [`render`]: dependency-ordered command streams from diff systems
//! - [`state`]: the canonical on-disk document format

pub mod command;
pub mod component;
pub mod config;
pub mod element;
pub mod error;
pub mod provider;
pub mod render;
pub mod state;
pub mod system;

pub use component::{Component, ComponentKey, StateMode};
pub use element::{DiffElement, FullElement, Kind};
pub use error::{Error, Result};
pub use system::System;
