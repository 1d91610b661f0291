//! Service-wide error type
//!
//! Module errors fold into [`AppError`], which knows the HTTP status it maps
//! to and how to describe itself to a browser without leaking secrets.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

/// Main error type for request handling
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Storage error: {0}")]
    StoreError(#[from] crate::store::StoreError),

    #[error("Directions error: {0}")]
    DirectionsError(#[from] crate::directions::DirectionsError),
}

/// JSON body sent for unexpected failures
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        use crate::directions::DirectionsError as D;
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::DirectionsError(D::InvalidCoordinate(_)) => StatusCode::BAD_REQUEST,
            AppError::DirectionsError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalError { .. } | AppError::ConfigError(_) | AppError::StoreError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand to a client
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.public_message(),
        }
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

impl warp::reject::Reject for AppError {}

static SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*[^\s&]+").expect("secret pattern is valid")
});

static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

const MAX_MESSAGE_LEN: usize = 500;

/// Redact secrets and sensitive paths, cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_RE.replace_all(message, "${1}=***");
    let mut sanitized = PATH_RE
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}
