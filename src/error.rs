use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

/// One or more business rules failed. Keeps every failing field so callers
/// can surface all reasons together, in rule order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Rejection {
    fields: Vec<(&'static str, String)>,
}

impl Rejection {
    pub fn add(&mut self, field: &'static str, reason: impl Into<String>) {
        self.fields.push((field, reason.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn reason(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, r)| r.as_str())
    }

    /// (field, reason) pairs for rendering next to form fields.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(f, r)| (*f, r.as_str()))
    }

    pub fn into_entries(self) -> Vec<(&'static str, String)> {
        self.fields
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, reason) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {reason}")?;
            first = false;
        }
        Ok(())
    }
}

/// Application error taxonomy. All variants are recoverable, request-local
/// conditions; nothing here is process-fatal and nothing is retried.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Rejected(Rejection),

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Rejected(rejection) => {
                (StatusCode::UNPROCESSABLE_ENTITY, rejection.to_string()).into_response()
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
