//! Memory Bank Library
//!
//! Transactional refactoring and rollback for a directory of interlinked markdown
//! documents: versioned snapshots, typed refactoring operations, validation,
//! execution history and conflict-aware undo.

pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{Error, Result};

/// Name of the per-project state directory.
pub const APP_DIR: &str = ".membank";
