use thiserror::Error;

use domain::credits::CreditError;
use domain::error::DomainError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("Missing parameters: {message}")]
    MissingParameters { message: String },

    #[error("Invalid credit action: {action}")]
    InvalidAction { action: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Failed to create profile: {message}")]
    ProfileCreationFailed { message: String },

    #[error("Generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("Internal server error")]
    InternalServerError,

    #[error("External service error: {message}")]
    ExternalServiceError { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {message}")]
    NotFound { message: String },
}

impl AppError {
    /// Client-correctable failures. Everything else is a server fault and is
    /// logged as such.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Domain(_)
                | Self::Credit(_)
                | Self::MissingParameters { .. }
                | Self::InvalidAction { .. }
                | Self::ValidationError { .. }
                | Self::Unauthorized
                | Self::NotFound { .. }
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
