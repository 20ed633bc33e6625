use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

pub mod email;
pub mod telegram;

pub use email::EmailChannel;
pub use telegram::TelegramChannel;

const DELIVERY_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Everything a delivery channel needs to describe a completed purchase.
#[derive(Debug, Clone)]
pub struct PurchaseEvent {
    pub user_email: String,
    pub user_name: Option<String>,
    pub title: String,
    pub amount_minor: i64,
    pub currency: String,
    pub purchase_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Entry point the payment flow hands purchase events to. Dispatch must not
/// block and must not fail the caller; delivery reliability is the sink's
/// problem.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, event: PurchaseEvent);
}

/// One delivery target (purchaser email, ops chat). Channels are isolated:
/// one failing never blocks the others.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, event: &PurchaseEvent) -> Result<()>;
}

/// Decouples notification delivery from the request path: events are queued
/// onto an unbounded channel and a worker task fans each one out to every
/// registered channel, retrying with backoff before giving up.
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<PurchaseEvent>,
}

impl NotificationQueue {
    pub fn start(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        let channels = Arc::new(channels);
        let (tx, mut rx) = mpsc::unbounded_channel::<PurchaseEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for channel in channels.iter() {
                    let channel = Arc::clone(channel);
                    let event = event.clone();
                    tokio::spawn(async move {
                        deliver_with_retry(channel.as_ref(), &event).await;
                    });
                }
            }
        });

        Self { tx }
    }
}

impl NotificationSink for NotificationQueue {
    fn dispatch(&self, event: PurchaseEvent) {
        if self.tx.send(event).is_err() {
            tracing::error!("Notification worker is gone, dropping purchase event");
        }
    }
}

async fn deliver_with_retry(channel: &dyn NotificationChannel, event: &PurchaseEvent) {
    let mut backoff = INITIAL_BACKOFF;

    for attempt in 1..=DELIVERY_ATTEMPTS {
        match channel.deliver(event).await {
            Ok(()) => {
                tracing::debug!(
                    channel = channel.name(),
                    purchase_id = %event.purchase_id,
                    "Notification delivered"
                );
                return;
            }
            Err(e) if attempt < DELIVERY_ATTEMPTS => {
                tracing::warn!(
                    channel = channel.name(),
                    attempt,
                    "Notification delivery failed, retrying: {}",
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => {
                // Dead letter: nothing else to do but make it visible.
                tracing::error!(
                    channel = channel.name(),
                    purchase_id = %event.purchase_id,
                    "Dropping notification after {} attempts: {}",
                    DELIVERY_ATTEMPTS,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyChannel {
        fail_first: usize,
        attempts: Arc<AtomicUsize>,
        delivered: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotificationChannel for FlakyChannel {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn deliver(&self, _event: &PurchaseEvent) -> Result<()> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(AppError::Internal("simulated outage".to_string()));
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event() -> PurchaseEvent {
        PurchaseEvent {
            user_email: "payer@example.com".to_string(),
            user_name: Some("Payer".to_string()),
            title: "Basic".to_string(),
            amount_minor: 1000,
            currency: "RUB".to_string(),
            purchase_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        tokio::time::timeout(Duration::from_secs(120), async {
            while counter.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("counter never reached the expected value");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_delivery_succeeds() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let queue = NotificationQueue::start(vec![Arc::new(FlakyChannel {
            fail_first: 2,
            attempts: attempts.clone(),
            delivered: delivered.clone(),
        })]);

        queue.dispatch(event());

        wait_for(&delivered, 1).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_bounded_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let queue = NotificationQueue::start(vec![Arc::new(FlakyChannel {
            fail_first: usize::MAX,
            attempts: attempts.clone(),
            delivered: delivered.clone(),
        })]);

        queue.dispatch(event());

        wait_for(&attempts, DELIVERY_ATTEMPTS as usize).await;
        // Give the worker room to (incorrectly) retry a fourth time.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), DELIVERY_ATTEMPTS as usize);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_channel_does_not_block_the_others() {
        let failing_attempts = Arc::new(AtomicUsize::new(0));
        let healthy_delivered = Arc::new(AtomicUsize::new(0));
        let queue = NotificationQueue::start(vec![
            Arc::new(FlakyChannel {
                fail_first: usize::MAX,
                attempts: failing_attempts.clone(),
                delivered: Arc::new(AtomicUsize::new(0)),
            }),
            Arc::new(FlakyChannel {
                fail_first: 0,
                attempts: Arc::new(AtomicUsize::new(0)),
                delivered: healthy_delivered.clone(),
            }),
        ]);

        queue.dispatch(event());

        wait_for(&healthy_delivered, 1).await;
        assert_eq!(healthy_delivered.load(Ordering::SeqCst), 1);
    }
}
