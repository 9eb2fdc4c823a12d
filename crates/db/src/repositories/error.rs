//! Repository error type.

use sea_orm::DbErr;

/// Errors raised by the repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A record the operation depends on does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A stored value cannot be mapped onto the domain model.
    #[error("Invalid {field} value: {value}")]
    InvalidValue {
        /// Column holding the value.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(field: &'static str, value: impl ToString) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidValue { .. } => "INVALID_STORED_VALUE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}
