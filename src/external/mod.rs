//! External tool abstractions
//!
//! This module provides trait-based abstractions for external CLI tools like
//! the code review tool, enabling testable code through dependency injection
//! and mock implementations.

pub mod command;
pub mod review;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use review::{ReviewAction, ReviewCli, ReviewOutcome, ReviewTool};
#[cfg(any(test, feature = "testing"))]
pub use review::MockReviewTool;
