// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::fmt::Display;
use std::sync::Arc;

use phi_vault::access::AccessGuard;
use phi_vault::api::router;
use phi_vault::audit::{AuditRecorder, FileAuditSink};
use phi_vault::cache::LruRecordCache;
use phi_vault::config::AppConfig;
use phi_vault::crypto::resolve_key;
use phi_vault::records::PayloadTransformer;
use phi_vault::service::PhiService;
use phi_vault::state::AppState;
use phi_vault::storage::RedbRecordStore;
use phi_vault::telemetry::init_tracing;

fn fatal(context: &str, err: impl Display) -> ! {
    tracing::error!(error = %err, "{context}");
    std::process::exit(1);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    // Missing or malformed key material stops the process here.
    let material = resolve_key().unwrap_or_else(|e| fatal("failed to resolve encryption key", e));

    let transformer = PayloadTransformer::new(&material)
        .unwrap_or_else(|e| fatal("failed to initialize field cipher", e));
    let store = RedbRecordStore::open(&config.records_db_path())
        .unwrap_or_else(|e| fatal("failed to open record store", e));
    let audit_sink = FileAuditSink::open(config.audit_dir(), &material)
        .unwrap_or_else(|e| fatal("failed to open audit log", e));
    drop(material);

    let service = PhiService::new(
        transformer,
        Arc::new(store),
        Arc::new(LruRecordCache::new(config.cache_capacity)),
        AuditRecorder::new(Arc::new(audit_sink), config.audit_max_attempts),
        AccessGuard::default(),
        config.cache_ttl,
    );
    service
        .health_check()
        .unwrap_or_else(|e| fatal("startup health check failed", e));

    let app = router(AppState::new(service));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| fatal("failed to bind listener", e));

    tracing::info!(
        %addr,
        data_dir = %config.data_dir.display(),
        "PHI vault listening (docs at /docs)"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        fatal("server error", e);
    }
}
