use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Data store error: {0}")]
    Store(String),

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Store(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::MalformedExpression(e) => {
                AppError::BadRequest(anyhow::anyhow!("Malformed search expression: {}", e))
            }
            ServiceError::InvalidQuery(e) => {
                AppError::BadRequest(anyhow::anyhow!("Invalid search query: {}", e))
            }
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
