//! Background jobs. Currently only the pending-payment expiry sweep:
//! checkouts the payer abandoned stay `pending` forever otherwise, and the
//! gateway will never confirm them. Call `spawn_all` once during startup.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::{config::PaymentsConfig, repository::PaymentRepository};

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(payments: Arc<dyn PaymentRepository>, config: &PaymentsConfig) {
    let ttl = Duration::minutes(config.pending_ttl_minutes);
    let interval = std::time::Duration::from_secs(config.sweep_interval_secs);

    tokio::spawn(async move {
        loop {
            let cutoff = Utc::now() - ttl;
            match payments.cancel_stale(cutoff).await {
                Ok(n) if n > 0 => tracing::info!("Cancelled stale pending payments: {}", n),
                Ok(_) => {}
                Err(e) => tracing::error!("Failed to sweep stale payments: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    });
}
