//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the identity,
//! gateway and board layers, along with a mapper from gateway HTTP statuses.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Rejected user input (empty title, bad media type/size, bad embed URL).
    UserInput { code: String, message: String },
    /// Target resource does not exist at the gateway.
    NotFound { code: String, message: String },
    /// Authorization guard denial: the current identity may not mutate this resource.
    Auth { code: String, message: String },
    /// Secret-key verification returned false; the user may retry.
    Key { code: String, message: String },
    /// A mutation for the same resource is already in flight (double-submit).
    Conflict { code: String, message: String },
    /// Local session storage inaccessible.
    Io { code: String, message: String },
    /// Any remote failure from the resource gateway, underlying message preserved.
    Gateway { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Key { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Io { code, .. }
            | AppError::Gateway { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Key { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Io { message, .. }
            | AppError::Gateway { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn key(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Key { code: code.into(), message: msg.into() } }
    pub fn conflict(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn io(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn gateway(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Gateway { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Whether the failure is worth surfacing as retryable to the user
    /// (invalid key entry and transient gateway trouble are; denials are not).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Key { .. } | AppError::Gateway { .. } | AppError::Conflict { .. })
    }

    /// Map a gateway HTTP status to the matching error variant, keeping the
    /// remote message intact for user-visible feedback.
    pub fn from_gateway_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 | 406 => AppError::NotFound { code: "gateway_not_found".into(), message },
            401 | 403 => AppError::Auth { code: "gateway_denied".into(), message },
            400..=499 => AppError::UserInput { code: "gateway_rejected".into(), message },
            _ => AppError::Gateway { code: "gateway_error".into(), message },
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Gateway unless downcasted elsewhere
        AppError::Gateway { code: "gateway_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal { code: "decode_error".into(), message: err.to_string() }
    }
}
