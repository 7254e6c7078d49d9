use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::session::manager::{SessionEvent, SessionManager};

/// How long before expiry a refresh should run
const REFRESH_LEAD_SECS: i64 = 5 * 60;
/// Minimum delay before a scheduled refresh fires
const MIN_REFRESH_DELAY_SECS: i64 = 60;

/// Compute the delay until the proactive refresh for a session expiring at
/// `expires_at`: five minutes before expiry, floored at one minute.
pub fn refresh_delay(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let lead_ms = (expires_at - now).num_milliseconds() - REFRESH_LEAD_SECS * 1000;
    let delay_ms = lead_ms.max(MIN_REFRESH_DELAY_SECS * 1000);
    Duration::from_millis(delay_ms as u64)
}

/// Proactive token refresh scheduler.
///
/// Holds at most one pending timer per active session: every session change
/// replaces the previous deadline, and logout disarms it. A fired timer
/// invokes `refresh_session()`; on failure there is no retry or backoff —
/// the stale session simply stays in place until it expires and the guards
/// observe the unauthenticated state. A manual refresh racing the timer is
/// tolerated because both perform full session replaces.
pub struct RefreshScheduler {
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Subscribe to the manager's session events and start the timer task.
    ///
    /// The subscription is taken synchronously so events emitted right after
    /// this call (e.g. by `initialize`) are never missed. The task holds
    /// only a weak reference to the manager and exits when it is gone.
    pub fn start(manager: &Arc<SessionManager>) -> Self {
        let events = manager.subscribe();
        let manager = Arc::downgrade(manager);

        let task = tokio::spawn(async move {
            run(events, manager).await;
        });

        Self { task }
    }

    /// Stop the scheduler task
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(mut events: broadcast::Receiver<SessionEvent>, manager: Weak<SessionManager>) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = tokio::time::sleep_until(deadline.unwrap_or_else(far_future));

        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::LoggedIn { expires_at })
                | Ok(SessionEvent::Adopted { expires_at })
                | Ok(SessionEvent::Refreshed { expires_at }) => {
                    let delay = refresh_delay(expires_at, Utc::now());
                    deadline = Some(Instant::now() + delay);
                    debug!(
                        delay_secs = delay.as_secs(),
                        expires_at = %expires_at,
                        "Refresh timer armed"
                    );
                }
                Ok(SessionEvent::LoggedOut) => {
                    deadline = None;
                    debug!("Refresh timer disarmed");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Session event channel closed, scheduler exiting");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed events; resynchronize from the current session
                    warn!(skipped, "Scheduler lagged behind session events");
                    let Some(manager) = manager.upgrade() else { break };
                    deadline = manager
                        .current()
                        .map(|s| Instant::now() + refresh_delay(s.expires_at, Utc::now()));
                }
            },

            () = timer, if deadline.is_some() => {
                deadline = None;
                let Some(manager) = manager.upgrade() else { break };

                info!("Proactive token refresh firing");
                if manager.refresh_session().await {
                    // The Refreshed event re-arms the timer
                    debug!("Scheduled refresh succeeded");
                } else {
                    // No retry: the stale session stays until it expires
                    warn!("Scheduled refresh failed; session will lapse at expiry");
                }
            }
        }
    }
}

fn far_future() -> Instant {
    // A deadline that never fires while the timer is disarmed
    Instant::now() + Duration::from_secs(86400 * 365)
}
