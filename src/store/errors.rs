//! Relational store error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Database pool error: {message}")]
    Pool { message: String },

    #[error("Row decode error: {message}")]
    Decode { message: String },
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("row", "query returned no rows"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Pool {
                message: err.to_string(),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::Decode {
                message: err.to_string(),
            },
            other => Self::database(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_errors_are_classified() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound { .. }
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Pool { .. }
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::Protocol("bad frame".to_string())),
            StoreError::Database { .. }
        ));
    }
}
