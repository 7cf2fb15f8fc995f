//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, extract::State, http::StatusCode};
use seatledger_core::store::CatalogStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Liveness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does not touch the database.
///
/// ```text
/// GET /health
/// {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service should receive traffic
    pub ready: bool,
    /// Whether the persistence service answered
    pub database: bool,
}

/// Readiness check (for load balancer probes).
///
/// Pings the persistence service; 503 when it does not answer.
///
/// ```text
/// GET /ready
/// {"ready":true,"database":true}
/// ```
pub async fn readiness_check(
    State(store): State<Arc<dyn CatalogStore>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            false
        }
    };
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatledger_testing::InMemoryStore;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, Json(body)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_readiness_follows_store() {
        let store = InMemoryStore::new();
        let shared: Arc<dyn CatalogStore> = Arc::new(store.clone());

        let (status, Json(body)) = readiness_check(State(Arc::clone(&shared))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ready);

        store.set_unavailable(true);
        let (status, Json(body)) = readiness_check(State(shared)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.database);
    }
}
