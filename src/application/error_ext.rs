//! Error conversion helpers for collaborator and I/O results
//!
//! Extension trait attaching repository context to I/O results.

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Report a failed line repository lookup.
    fn with_repository_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_repository_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Repository {
            message: format!("{}: {}", action, e),
        })
    }
}
