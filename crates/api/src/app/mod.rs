//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services/`: tenant-scoped business operations, one file per domain area
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: response envelopes and request shapes
//! - `errors.rs`: consistent error responses

use std::{sync::Arc, time::Duration};

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use livebase_auth::Hs256JwtValidator;
use livebase_infra::{
    AppConfig, CleanupJob, DocumentStore, FallbackStorage, MemoryDocumentStore,
    PostgresDocumentStore, StoreError, TranslationCache,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match &config.database.url {
        Some(url) => {
            let store = PostgresDocumentStore::connect(url, config.database.max_connections).await?;
            store.migrate().await?;
            info!("using postgres document store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("database.url not set; using in-memory store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> Result<Router, StoreError> {
    let store = open_store(&config).await?;

    if config.cleanup.enabled {
        CleanupJob::new(store.clone(), config.cleanup.retention_days)
            .spawn(Duration::from_secs(config.cleanup.interval_secs));
    }

    let services = Arc::new(services::AppServices::new(
        store.clone(),
        TranslationCache::new(
            Duration::from_secs(config.cache.translation_ttl_secs),
            config.cache.translation_max_entries,
        ),
        Arc::new(FallbackStorage::from_config(&config.storage)),
    ));

    let auth_state = middleware::AuthState {
        jwt: Arc::new(Hs256JwtValidator::new(config.auth.jwt_secret.as_bytes())),
        store,
    };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected);

    // Locally stored uploads are served publicly under their URL prefix.
    let public = config.storage.public_base_url.trim_end_matches('/');
    if public.starts_with('/') && public.len() > 1 && public != "/uploads" {
        app = app.nest_service(public, ServeDir::new(&config.storage.local_root));
    } else if public.starts_with('/') {
        warn!(prefix = %config.storage.public_base_url, "cannot serve local uploads under this prefix");
    }

    Ok(app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
}
