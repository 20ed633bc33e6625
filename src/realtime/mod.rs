use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub mod socket;

/// Pushed to the purchasing user's open tabs so a "waiting for payment"
/// view can advance without polling.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSucceededEvent {
    pub payment_id: Uuid,
    pub purchase_id: Uuid,
}

#[derive(Serialize)]
struct Frame<'a> {
    event: &'static str,
    data: &'a PaymentSucceededEvent,
}

/// Push side of the realtime channel, injected into the payment flow so it
/// never reaches for process-global state. Delivery is fire-and-forget: no
/// open session, no event.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn payment_succeeded(&self, user_id: Uuid, event: PaymentSucceededEvent);
}

/// Connection registry for the WebSocket endpoint. Each authenticated
/// socket registers an outbound queue under its user id; a user with
/// several tabs or devices has several sessions and each one receives
/// every event for that user.
pub struct RealtimeHub {
    next_session_id: AtomicU64,
    sessions: RwLock<HashMap<Uuid, HashMap<u64, mpsc::UnboundedSender<String>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            next_session_id: AtomicU64::new(0),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self, user_id: Uuid) -> (u64, mpsc::UnboundedReceiver<String>) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut sessions = self.sessions.write().await;
        sessions.entry(user_id).or_default().insert(session_id, tx);

        (session_id, rx)
    }

    pub async fn unsubscribe(&self, user_id: Uuid, session_id: u64) {
        let mut sessions = self.sessions.write().await;
        if let Some(user_sessions) = sessions.get_mut(&user_id) {
            user_sessions.remove(&session_id);
            if user_sessions.is_empty() {
                sessions.remove(&user_id);
            }
        }
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    async fn send_to_user(&self, user_id: Uuid, text: String) {
        let dead: Vec<u64> = {
            let sessions = self.sessions.read().await;
            let Some(user_sessions) = sessions.get(&user_id) else {
                return;
            };
            user_sessions
                .iter()
                .filter(|(_, tx)| tx.send(text.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            let mut sessions = self.sessions.write().await;
            if let Some(user_sessions) = sessions.get_mut(&user_id) {
                for id in dead {
                    user_sessions.remove(&id);
                }
                if user_sessions.is_empty() {
                    sessions.remove(&user_id);
                }
            }
        }
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for RealtimeHub {
    async fn payment_succeeded(&self, user_id: Uuid, event: PaymentSucceededEvent) {
        let frame = Frame {
            event: "payment_succeeded",
            data: &event,
        };
        match serde_json::to_string(&frame) {
            Ok(text) => self.send_to_user(user_id, text).await,
            Err(e) => tracing::error!("Failed to serialize realtime event: {}", e),
        }
    }
}
