//! Tenant resolution failures and their mapping to HTTP responses.
//!
//! The mapping from failure kind to status code lives in
//! [`TenantErrorKind::status_code`] and nowhere else.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    /// The identifier header was absent or blank on a non-bypassed path.
    #[error("{0} header is required.")]
    MissingHeader(String),

    #[error("Tenant '{0}' was not found.")]
    NotFound(String),

    #[error("Tenant '{0}' is not active.")]
    Inactive(String),

    /// Code asked for the current tenant outside a resolved request.
    #[error("Tenant context was not resolved for the current request.")]
    ContextMissing,
}

/// Discriminant of [`TenantError`], used for the boundary mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantErrorKind {
    MissingTenantHeader,
    TenantNotFound,
    TenantInactive,
    TenantContextMissing,
}

impl TenantErrorKind {
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            TenantErrorKind::MissingTenantHeader => StatusCode::BAD_REQUEST,
            TenantErrorKind::TenantNotFound => StatusCode::NOT_FOUND,
            TenantErrorKind::TenantInactive => StatusCode::FORBIDDEN,
            TenantErrorKind::TenantContextMissing => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the response body.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            TenantErrorKind::MissingTenantHeader => "MissingTenantHeader",
            TenantErrorKind::TenantNotFound => "TenantNotFound",
            TenantErrorKind::TenantInactive => "TenantInactive",
            TenantErrorKind::TenantContextMissing => "TenantContextMissing",
        }
    }
}

impl TenantError {
    #[must_use]
    pub fn kind(&self) -> TenantErrorKind {
        match self {
            TenantError::MissingHeader(_) => TenantErrorKind::MissingTenantHeader,
            TenantError::NotFound(_) => TenantErrorKind::TenantNotFound,
            TenantError::Inactive(_) => TenantErrorKind::TenantInactive,
            TenantError::ContextMissing => TenantErrorKind::TenantContextMissing,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Resolution failures are client-facing; a missing context is a defect.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, TenantError::ContextMissing)
    }
}

/// Body returned for every tenant failure.
///
/// ```json
/// {
///     "code": "TenantNotFound",
///     "message": "Tenant 'acme' was not found.",
///     "timestamp": "2024-05-01T12:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TenantErrorResponse {
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&TenantError> for TenantErrorResponse {
    fn from(err: &TenantError) -> Self {
        Self {
            code: err.kind().code().to_string(),
            message: err.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for TenantError {
    fn into_response(self) -> Response {
        if !self.is_resolution_failure() {
            tracing::error!(error = %self, "Tenant context accessed outside a resolved request");
        }
        (self.status_code(), Json(TenantErrorResponse::from(&self))).into_response()
    }
}
