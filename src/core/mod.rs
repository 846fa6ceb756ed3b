//! Core business logic modules.

pub mod bank;
pub mod executor;
pub mod extractor;
pub mod history;
pub mod operations;
pub mod rollback;
pub mod validator;
pub mod versions;
