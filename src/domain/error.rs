//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::line::LineData;
use crate::domain::pricing::PricingError;

/// Domain errors represent violations inside the line engine itself.
/// Divide-by-zero is never one of them: zero divisors are substituted, not reported.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("parent line has no index: {0}")]
    UnindexedParent(String),

    #[error("line not found in tree: {0}")]
    NodeNotFound(String),

    #[error("decimal overflow while computing {operation} for line {line}")]
    ArithmeticOverflow { line: String, operation: &'static str },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn overflow(line: &LineData, operation: &'static str) -> Self {
        Self::ArithmeticOverflow {
            line: line.label(),
            operation,
        }
    }
}
