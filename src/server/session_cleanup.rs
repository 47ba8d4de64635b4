//! Background expired-session reaper

use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::services::AuthService;

/// Periodically deletes sessions whose expiry has passed.
/// Expired sessions are already treated as absent; this only reclaims space.
pub struct SessionCleanupScheduler {
    auth: Arc<AuthService>,
    cleanup_interval: Duration,
}

impl SessionCleanupScheduler {
    pub fn new(auth: Arc<AuthService>, cleanup_interval_secs: u64) -> Self {
        Self {
            auth,
            cleanup_interval: Duration::from_secs(cleanup_interval_secs),
        }
    }

    /// Run one sweep now
    pub async fn run_once(&self) -> u64 {
        match self.auth.cleanup_expired_sessions().await {
            Ok(0) => {
                debug!("Session cleanup: nothing to remove");
                0
            }
            Ok(removed) => {
                info!("Session cleanup removed {} expired session(s)", removed);
                removed
            }
            Err(e) => {
                error!("Session cleanup failed: {}", e);
                0
            }
        }
    }

    /// Start the background cleanup task; `None` when the interval is zero
    pub fn start(self) -> Option<tokio::task::JoinHandle<()>> {
        if self.cleanup_interval.is_zero() {
            info!("Session cleanup disabled");
            return None;
        }

        info!(
            "Starting session cleanup scheduler (interval: {}s)",
            self.cleanup_interval.as_secs()
        );

        Some(tokio::spawn(async move {
            let mut ticker = interval(self.cleanup_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        }))
    }
}
