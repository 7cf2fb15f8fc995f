//! Request tracking middleware.
//!
//! [`request_tracking_layer`] wraps every request:
//!
//! - resolves its [`CorrelationId`] from `X-Correlation-ID` (a fresh one when
//!   absent or not a UUID) and stores it in the request extensions
//! - runs the handler inside an `http_request` span carrying the id
//! - echoes the id on the response
//! - records `seatledger_http_responses_total{method, status}` and
//!   `seatledger_http_request_duration_seconds{method}`
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/events", get(browse))
//!     .layer(request_tracking_layer());
//! ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, request::Parts},
    response::Response,
};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation id of the current request.
///
/// As an extractor it falls back to a fresh id when the tracking layer is
/// not installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// The id sent by the client, or a new one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let sent = headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());
        Self(sent.unwrap_or_else(Uuid::new_v4))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self(Uuid::new_v4())))
    }
}

/// Layer installing [`RequestTracking`] on a router.
#[must_use]
pub const fn request_tracking_layer() -> RequestTrackingLayer {
    RequestTrackingLayer
}

/// See [`request_tracking_layer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestTrackingLayer;

impl<S> Layer<S> for RequestTrackingLayer {
    type Service = RequestTracking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracking { inner }
    }
}

/// Service wrapper produced by [`RequestTrackingLayer`].
#[derive(Clone, Debug)]
pub struct RequestTracking<S> {
    inner: S,
}

impl<S> Service<Request> for RequestTracking<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = CorrelationId::from_headers(request.headers());
        request.extensions_mut().insert(id);

        let method = request.method().as_str().to_owned();
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id.0,
            method = %method,
            path = %request.uri().path(),
        );
        let started = Instant::now();
        let pending = self.inner.call(request).instrument(span.clone());

        Box::pin(async move {
            let mut response = pending.await?;
            let status = response.status();
            let elapsed = started.elapsed();

            metrics::counter!(
                "seatledger_http_responses_total",
                "method" => method.clone(),
                "status" => status.as_str().to_owned()
            )
            .increment(1);
            metrics::histogram!("seatledger_http_request_duration_seconds", "method" => method)
                .record(elapsed.as_secs_f64());
            span.in_scope(|| {
                tracing::debug!(
                    status = status.as_u16(),
                    elapsed_ms = elapsed.as_millis(),
                    "Request finished"
                );
            });

            if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
