// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operational HTTP surface: health probes and OpenAPI docs.
//!
//! Record access is not exposed here; the host application's routers call
//! [`crate::service::PhiService`] directly.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod health;

pub fn router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(health::health, health::liveness, health::readiness),
    components(schemas(
        health::ReadyResponse,
        health::HealthChecks,
        health::HealthResponse
    )),
    tags((name = "Health", description = "Liveness and readiness probes"))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessGuard;
    use crate::audit::{
        AuditError, AuditEvent, AuditRecorder, AuditResult, AuditSink, MemoryAuditSink,
    };
    use crate::cache::LruRecordCache;
    use crate::crypto::{KeyMaterial, KEY_LEN};
    use crate::records::PayloadTransformer;
    use crate::service::PhiService;
    use crate::storage::InMemoryRecordStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct DownSink;

    impl AuditSink for DownSink {
        fn append(&self, _: &AuditEvent) -> AuditResult<()> {
            Err(AuditError::Unavailable("down".into()))
        }
        fn health_check(&self) -> AuditResult<()> {
            Err(AuditError::Unavailable("down".into()))
        }
    }

    fn app(sink: Arc<dyn AuditSink>) -> Router {
        let material = KeyMaterial::from_bytes(&[0u8; KEY_LEN], None).unwrap();
        let service = PhiService::new(
            PayloadTransformer::new(&material).unwrap(),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(LruRecordCache::new(8)),
            AuditRecorder::new(sink, 1),
            AccessGuard::default(),
            Duration::from_secs(60),
        );
        router(AppState::new(service))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn ready_when_dependencies_are_up() {
        let (status, body) = get(app(Arc::new(MemoryAuditSink::new())), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["record_store"], "ok");
        assert_eq!(body["checks"]["audit_sink"], "ok");
    }

    #[tokio::test]
    async fn degraded_when_audit_sink_is_down() {
        let (status, body) = get(app(Arc::new(DownSink)), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["audit_sink"], "unavailable");
    }

    #[tokio::test]
    async fn liveness_ignores_dependencies() {
        let (status, body) = get(app(Arc::new(DownSink)), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_lists_health_paths() {
        let app = app(Arc::new(MemoryAuditSink::new()));
        let (status, body) = get(app, "/api-doc/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/health/ready"].is_object());
    }
}
