//! Data models.

pub mod config;
pub mod execution;
pub mod metadata;
pub mod operation;
pub mod rollback;
pub mod suggestion;
pub mod version;
