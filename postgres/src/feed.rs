//! Change feed over `LISTEN/NOTIFY`.
//!
//! A trigger on `events` publishes `{"op", "id"}` on [`CHANNEL`]. One listener
//! task per feed re-reads the row and fans the notice out to subscribers
//! through a broadcast channel. Subscribers that fall behind skip notices.

use crate::rows::{EVENT_COLUMNS, EventRow};
use crate::{PostgresStore, db_error};
use seatledger_core::error::StoreError;
use seatledger_core::feed::{ChangeFeed, ChangeNotice, ChangeOp, ChangeStream, FeedScope};
use seatledger_core::types::{Event, EventId};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Notification channel written by the `events_change_notify` trigger.
pub const CHANNEL: &str = "events_changes";

const FEED_CAPACITY: usize = 1024;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct Payload {
    op: ChangeOp,
    id: Uuid,
}

/// Change feed backed by `PostgreSQL` notifications.
#[derive(Debug)]
pub struct PostgresChangeFeed {
    sender: broadcast::Sender<ChangeNotice>,
    listener: JoinHandle<()>,
}

impl PostgresChangeFeed {
    /// Start listening on [`CHANNEL`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the listener connection fails.
    pub async fn start(store: &PostgresStore) -> Result<Self, StoreError> {
        let pool = store.pool().clone();
        let mut listener = PgListener::connect_with(&pool)
            .await
            .map_err(db_error("Failed to connect listener"))?;
        listener
            .listen(CHANNEL)
            .await
            .map_err(db_error("Failed to LISTEN"))?;

        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        let listener = tokio::spawn(relay(listener, pool, sender.clone()));
        tracing::info!(channel = CHANNEL, "Change feed listening");
        Ok(Self { sender, listener })
    }
}

impl Drop for PostgresChangeFeed {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn relay(mut listener: PgListener, pool: PgPool, sender: broadcast::Sender<ChangeNotice>) {
    loop {
        let notification = match listener.recv().await {
            Ok(notification) => notification,
            Err(e) => {
                // PgListener reconnects on the next recv
                tracing::warn!(error = %e, "Change feed connection lost; reconnecting");
                metrics::counter!("seatledger_feed_reconnects_total").increment(1);
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        let payload: Payload = match serde_json::from_str(notification.payload()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, payload = notification.payload(), "Malformed change notice");
                continue;
            }
        };

        let event = match payload.op {
            ChangeOp::Delete => None,
            ChangeOp::Insert | ChangeOp::Update => match load_event(&pool, payload.id).await {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, event_id = %payload.id, "Failed to load changed event");
                    None
                }
            },
        };

        // No subscribers is not an error
        let _ = sender.send(ChangeNotice {
            op: payload.op,
            event_id: EventId::from_uuid(payload.id),
            event,
        });
    }
}

async fn load_event(pool: &PgPool, id: Uuid) -> Result<Option<Event>, StoreError> {
    sqlx::query_as::<_, EventRow>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Failed to load event"))?
        .map(Event::try_from)
        .transpose()
}

impl ChangeFeed for PostgresChangeFeed {
    fn subscribe(&self, scope: FeedScope) -> ChangeStream {
        let mut rx = self.sender.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(notice) if scope.includes(&notice) => yield notice,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Change feed subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
