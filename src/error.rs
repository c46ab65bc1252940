// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy and the user-facing error shape.
//!
//! [`PhiError`] carries operational detail for logs and the audit trail.
//! [`ApiError`] is what a caller sees: "access denied", "not found",
//! "invalid payload" or "service unavailable", never cryptographic detail.
//!
//! This crate's own router only serves health checks. Host routers that
//! expose record operations return `Result<_, ApiError>` from their handlers
//! and convert with `?`, which goes through `From<PhiError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::access::Denial;
use crate::audit::AuditError;
use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::crypto::CipherError;
use crate::storage::StoreError;

/// Failures of the protection core.
#[derive(Debug, thiserror::Error)]
pub enum PhiError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("access denied ({})", .0.code())]
    AccessDenied(Denial),

    #[error("{resource_type} {resource_id} not found")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

pub type PhiResult<T> = Result<T, PhiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "access denied")
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "service unavailable")
    }
}

impl From<PhiError> for ApiError {
    fn from(err: PhiError) -> Self {
        match err {
            PhiError::AccessDenied(_) => Self::forbidden(),
            PhiError::NotFound { .. } => Self::not_found(err.to_string()),
            PhiError::InvalidPayload(_) => Self::unprocessable(err.to_string()),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::service_unavailable()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn denial_maps_to_generic_forbidden() {
        let api: ApiError = PhiError::AccessDenied(Denial::TenantMismatch).into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(api.message, "access denied");
    }

    #[test]
    fn cryptographic_detail_is_not_surfaced() {
        let api: ApiError = PhiError::Cipher(CipherError::AuthenticationFailed).into();
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.message, "service unavailable");

        let api: ApiError = PhiError::Audit(AuditError::Unavailable("disk full".into())).into();
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!api.message.contains("disk"));
    }

    #[test]
    fn not_found_and_invalid_payload_keep_their_status() {
        let nf: ApiError = PhiError::NotFound {
            resource_type: "patient",
            resource_id: "p-1".into(),
        }
        .into();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "patient p-1 not found");

        let bad: ApiError = PhiError::InvalidPayload("expected a JSON object".into()).into();
        assert_eq!(bad.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn handlers_convert_with_question_mark() {
        fn read_handler(result: PhiResult<()>) -> Result<(), ApiError> {
            result?;
            Ok(())
        }
        let err = read_handler(Err(PhiError::AccessDenied(Denial::RoleNotPermitted))).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(read_handler(Ok(())).is_ok());
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::forbidden().into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"access denied"}"#);
    }
}
