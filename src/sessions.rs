//! In-memory Web Connector session table.
//!
//! One session per polling cycle, created by `authenticate` and destroyed by
//! `closeConnection`/`connectionError`. The table is process-wide shared
//! state; the map has its own lock and every session sits behind a per-ticket
//! async mutex so calls on one ticket serialize even if a connector misbehaves
//! and overlaps requests. An optional idle sweep evicts sessions abandoned by
//! a connector that died mid-cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credentials::generate_ticket;
use crate::models::sync_log;

/// Clock source, injectable so tests can drive idle eviction.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// State of one Web Connector polling cycle.
#[derive(Debug)]
pub struct Session {
    pub ticket: String,
    pub username: String,
    pub company_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Snapshot of pending sync log rows, loaded lazily on the first
    /// `sendRequestXML` of the cycle.
    pub pending_requests: Vec<sync_log::Model>,
    /// Cursor into `pending_requests`; `receiveResponseXML` correlates to
    /// `current_index - 1`.
    pub current_index: usize,
    pub work_loaded: bool,
    /// Most recent error in this cycle, reported through `getLastError`.
    pub last_error: Option<String>,
}

/// Mutex-guarded table of active sessions keyed by ticket.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    clock: Clock,
    idle_timeout: Option<Duration>,
}

impl SessionManager {
    /// `idle_timeout` of `None` disables eviction entirely.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self::with_clock(idle_timeout, Arc::new(Utc::now))
    }

    pub fn with_clock(idle_timeout: Option<Duration>, clock: Clock) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            idle_timeout,
        }
    }

    /// Create a session bound to the authenticated username and company file,
    /// returning its opaque ticket.
    pub async fn create_session(&self, username: &str, company_file: Option<String>) -> String {
        let ticket = generate_ticket();
        let now = (self.clock)();
        let session = Session {
            ticket: ticket.clone(),
            username: username.to_string(),
            company_file,
            created_at: now,
            last_activity: now,
            pending_requests: Vec::new(),
            current_index: 0,
            work_loaded: false,
            last_error: None,
        };

        let mut sessions = self.sessions.lock().await;
        sessions.insert(ticket.clone(), Arc::new(Mutex::new(session)));
        debug!(username, sessions = sessions.len(), "Session created");
        ticket
    }

    /// Look up a session. Absence is not an error: the Web Connector may
    /// retry calls after a close, and callers treat `None` as "no work".
    pub async fn get_session(&self, ticket: &str) -> Option<Arc<Mutex<Session>>> {
        let handle = {
            let sessions = self.sessions.lock().await;
            sessions.get(ticket).cloned()
        }?;

        handle.lock().await.last_activity = (self.clock)();
        Some(handle)
    }

    /// Destroy a session. Idempotent: closing an unknown ticket is a no-op.
    pub async fn close_session(&self, ticket: &str) {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(ticket).is_some() {
            debug!(sessions = sessions.len(), "Session closed");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Evict sessions idle past the configured timeout. Returns the number
    /// evicted; always 0 when eviction is disabled.
    pub async fn sweep_idle(&self) -> usize {
        let Some(idle_timeout) = self.idle_timeout else {
            return 0;
        };
        let now = (self.clock)();
        let mut evicted = 0;

        let mut sessions = self.sessions.lock().await;
        let mut stale = Vec::new();
        for (ticket, handle) in sessions.iter() {
            let session = handle.lock().await;
            let idle = now - session.last_activity;
            if idle.to_std().map(|d| d >= idle_timeout).unwrap_or(false) {
                stale.push(ticket.clone());
            }
        }
        for ticket in stale {
            if let Some(handle) = sessions.remove(&ticket) {
                let session = handle.lock().await;
                warn!(
                    username = %session.username,
                    created_at = %session.created_at,
                    "Evicting idle Web Connector session"
                );
                evicted += 1;
            }
        }
        evicted
    }

    /// Periodic idle sweep, cancelled via the shutdown token. Does nothing
    /// when no idle timeout is configured.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        if self.idle_timeout.is_none() {
            return;
        }
        info!(interval_secs = interval.as_secs(), "Session sweeper started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session sweeper stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {
                    let evicted = self.sweep_idle().await;
                    if evicted > 0 {
                        info!(evicted, "Idle sessions evicted");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::TimeZone;

    use super::*;

    fn manual_clock(start: DateTime<Utc>) -> (Clock, Arc<AtomicI64>) {
        let offset = Arc::new(AtomicI64::new(0));
        let offset_clone = Arc::clone(&offset);
        let clock: Clock = Arc::new(move || {
            start + chrono::Duration::seconds(offset_clone.load(Ordering::SeqCst))
        });
        (clock, offset)
    }

    #[tokio::test]
    async fn ticket_is_accepted_by_get_session() {
        let manager = SessionManager::new(None);
        let ticket = manager.create_session("qbwc", None).await;

        assert_eq!(ticket.len(), 64);
        assert!(manager.get_session(&ticket).await.is_some());
        assert!(manager.get_session("unknown-ticket").await.is_none());
    }

    #[tokio::test]
    async fn close_session_is_idempotent() {
        let manager = SessionManager::new(None);
        let ticket = manager.create_session("qbwc", None).await;

        manager.close_session(&ticket).await;
        manager.close_session(&ticket).await;
        assert!(manager.get_session(&ticket).await.is_none());
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn sweep_evicts_only_idle_sessions() {
        let start = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        let (clock, offset) = manual_clock(start);
        let manager = SessionManager::with_clock(Some(Duration::from_secs(300)), clock);

        let stale = manager.create_session("qbwc", None).await;
        offset.store(280, Ordering::SeqCst);
        let fresh = manager.create_session("qbwc", None).await;

        offset.store(310, Ordering::SeqCst);
        let evicted = manager.sweep_idle().await;

        assert_eq!(evicted, 1);
        assert!(manager.get_session(&stale).await.is_none());
        assert!(manager.get_session(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn sweep_is_disabled_without_timeout() {
        let start = Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap();
        let (clock, offset) = manual_clock(start);
        let manager = SessionManager::with_clock(None, clock);

        let ticket = manager.create_session("qbwc", None).await;
        offset.store(86_400, Ordering::SeqCst);

        assert_eq!(manager.sweep_idle().await, 0);
        assert!(manager.get_session(&ticket).await.is_some());
    }
}
