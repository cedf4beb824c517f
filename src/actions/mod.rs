//! Mutating actions on inventory records and their files.

pub mod delete;

pub use delete::{BatchDeleteResult, DeleteError, DeleteMode, DeletionExecutor};
