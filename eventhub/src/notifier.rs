//! Email function client.
//!
//! [`HttpNotifier`] POSTs each [`Notification`] as `{eventId, userId, type}`
//! to the configured endpoint on a background task. The request path never
//! waits on it: failures are logged and counted, never retried.

use crate::config::NotifierConfig;
use seatledger_core::notifier::{LogNotifier, Notification, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Notifier calling an HTTP email function.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: Arc<str>,
    token: Option<Arc<str>>,
    runtime: Handle,
}

impl HttpNotifier {
    /// Build a notifier posting to `url`.
    ///
    /// Must be called from within a Tokio runtime; deliveries are spawned on it.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: Arc::from(url),
            token: token.map(Arc::from),
            runtime: Handle::current(),
        })
    }
}

async fn deliver(
    client: reqwest::Client,
    url: Arc<str>,
    token: Option<Arc<str>>,
    notification: Notification,
) {
    let mut request = client.post(&*url).json(&notification);
    if let Some(token) = token {
        request = request.bearer_auth(&*token);
    }

    let outcome = match request.send().await.and_then(reqwest::Response::error_for_status) {
        Ok(_) => {
            tracing::debug!(
                event_id = %notification.event_id,
                user_id = %notification.user_id,
                kind = %notification.kind,
                "Notification delivered"
            );
            "delivered"
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                event_id = %notification.event_id,
                user_id = %notification.user_id,
                kind = %notification.kind,
                "Notification delivery failed"
            );
            "failed"
        }
    };
    metrics::counter!(
        "seatledger_notifications_total",
        "kind" => notification.kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

impl Notifier for HttpNotifier {
    fn dispatch(&self, notification: Notification) {
        self.runtime.spawn(deliver(
            self.client.clone(),
            Arc::clone(&self.url),
            self.token.clone(),
            notification,
        ));
    }
}

/// Notifier for the given configuration: HTTP when a URL is set, log otherwise.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the HTTP client cannot be built.
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, reqwest::Error> {
    match &config.url {
        Some(url) => {
            tracing::info!(%url, "Notifications go to the email function");
            Ok(Arc::new(HttpNotifier::new(
                url,
                config.token.as_deref(),
                Duration::from_secs(config.timeout),
            )?))
        }
        None => {
            tracing::info!("NOTIFIER_URL unset; notifications are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
    use seatledger_core::notifier::NotificationKind;
    use seatledger_core::types::{EventId, UserId};
    use tokio::sync::mpsc;

    type Received = (Option<String>, serde_json::Value);

    async fn email_function() -> (String, mpsc::Receiver<Received>) {
        async fn receive(
            State(tx): State<mpsc::Sender<Received>>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let _ = tx.send((auth, body)).await;
        }

        let (tx, rx) = mpsc::channel(4);
        let app = Router::new().route("/send", post(receive)).with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/send"), rx)
    }

    #[tokio::test]
    async fn test_posts_wire_format_with_token() {
        let (url, mut rx) = email_function().await;
        let notifier = HttpNotifier::new(&url, Some("anon-key"), Duration::from_secs(5)).unwrap();

        let notification =
            Notification::new(EventId::new(), UserId::new(), NotificationKind::Registration);
        notifier.dispatch(notification);

        let (auth, body) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("email function was not called")
            .unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer anon-key"));
        assert_eq!(body["type"], "registration");
        assert_eq!(body["eventId"], notification.event_id.to_string());
        assert_eq!(body["userId"], notification.user_id.to_string());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_does_not_panic() {
        // Port 9 (discard) is closed on test hosts; delivery fails and is logged
        let notifier =
            HttpNotifier::new("http://127.0.0.1:9/send", None, Duration::from_millis(200)).unwrap();
        notifier.dispatch(Notification::new(
            EventId::new(),
            UserId::new(),
            NotificationKind::Reminder,
        ));
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    #[tokio::test]
    async fn test_from_config_without_url_logs_only() {
        let notifier = from_config(&NotifierConfig::default()).unwrap();
        notifier.dispatch(Notification::new(
            EventId::new(),
            UserId::new(),
            NotificationKind::Cancellation,
        ));
    }
}
