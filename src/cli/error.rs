//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Json { .. } => crate::exitcode::DATAERR,
                InfraError::Application(app) => match app {
                    ApplicationError::MalformedPayload { .. } => crate::exitcode::DATAERR,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::Repository { .. } => crate::exitcode::UNAVAILABLE,
                    ApplicationError::Domain(DomainError::Pricing(_)) => crate::exitcode::DATAERR,
                    ApplicationError::Domain(_) => crate::exitcode::SOFTWARE,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricingError;

    #[test]
    fn given_layered_errors_when_exit_code_then_maps_to_sysexits() {
        let malformed = CliError::from(InfraError::from(ApplicationError::malformed("$", "bad")));
        assert_eq!(malformed.exit_code(), crate::exitcode::DATAERR);

        let pricing = CliError::from(InfraError::from(ApplicationError::from(DomainError::from(
            PricingError::unknown_tax_code("GST"),
        ))));
        assert_eq!(pricing.exit_code(), crate::exitcode::DATAERR);

        let io = CliError::from(InfraError::io("read", std::io::Error::other("boom")));
        assert_eq!(io.exit_code(), crate::exitcode::IOERR);

        assert_eq!(CliError::Usage("x".into()).exit_code(), crate::exitcode::USAGE);
    }
}
