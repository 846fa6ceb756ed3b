//! File, index and text services used by the refactoring engine.

pub mod file_store;
pub mod metadata_index;
pub mod sections;
pub mod tokens;
