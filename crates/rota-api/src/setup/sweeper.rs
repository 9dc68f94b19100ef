//! Periodic expiry sweep: flips overdue pending invitations to `expired`.

use std::time::Duration;

use rota_services::InvitationService;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// `None` when the interval is 0.
pub fn spawn_expiry_sweeper(
    invitations: InvitationService,
    interval_secs: u64,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("Invitation expiry sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs, "Invitation expiry sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = invitations.expire_overdue().await {
                        tracing::warn!(error = %e, "Invitation expiry sweep failed");
                    }
                }
            }
        }
        tracing::info!("Invitation expiry sweeper stopped");
    }))
}
