use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid credit action: {0}")]
    InvalidCreditAction(String),

    #[error("Invalid generation kind: {0}")]
    InvalidGenerationKind(String),

    #[error("Invalid reservation status: {0}")]
    InvalidReservationStatus(String),

    #[error("Invalid generation request: {0}")]
    InvalidGenerationRequest(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
