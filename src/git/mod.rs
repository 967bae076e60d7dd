//! Git operations module
//!
//! This module provides a trait-based interface for the repository primitives
//! the workflows sequence, backed by libgit2 bindings.

pub mod operations;
pub mod repository;

#[cfg(any(test, feature = "testing"))]
pub use operations::MockRepositoryOperations;
pub use operations::{MergeOutcome, RepositoryOperations, TagInfo};
pub use repository::Git2Repository;
