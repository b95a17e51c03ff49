use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::application::use_cases::subscription::SubscriptionUseCases;

/// Periodically expire overdue subscriptions.
///
/// The first tick fires immediately, so a restart catches up right away.
/// The sweep is idempotent, so overlapping runs (or the admin endpoint
/// firing in between) are harmless.
pub async fn run_expiry_sweep_loop(subscriptions: Arc<SubscriptionUseCases>, sweep_secs: u64) {
    let mut ticker = interval(Duration::from_secs(sweep_secs));

    info!("Subscription expiry sweeper started (every {}s)", sweep_secs);

    loop {
        ticker.tick().await;

        match subscriptions.check_expired().await {
            Ok(0) => {}
            Ok(count) => info!(count, "Expiry sweep updated subscriptions"),
            Err(e) => error!(error = ?e, "Expiry sweep failed"),
        }
    }
}
