//! Shared session state: the session identifier and the interaction clock.
//!
//! A single [`SessionContext`] is created at startup and shared (via `Arc`)
//! between the foreground request path and the keep-alive loop. The session
//! identifier is written exactly once by `connect`; the interaction clock is
//! a single atomic value where last-write-wins is acceptable because it only
//! gates keep-alive timing.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Process-wide session state shared between the foreground request path and
/// the keep-alive loop.
pub struct SessionContext {
    session: OnceLock<String>,
    /// Milliseconds since `epoch` at the last completed interaction.
    last_activity_ms: AtomicU64,
    epoch: Instant,
}

impl SessionContext {
    /// Creates a context with no session and the clock set to "now".
    pub fn new() -> Self {
        Self {
            session: OnceLock::new(),
            last_activity_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    /// Records the session identifier returned by the server.
    ///
    /// The identifier is write-once; a second call returns an error because
    /// the client manages exactly one session per process.
    pub fn set_session(&self, session: String) -> Result<()> {
        self.session
            .set(session)
            .map_err(|_| Error::session("session identifier already set"))
    }

    /// Returns the session identifier, or an error if `connect` has not run.
    pub fn session(&self) -> Result<&str> {
        self.session
            .get()
            .map(String::as_str)
            .ok_or_else(|| Error::session("no session established; call connect first"))
    }

    /// Returns true once a session has been acquired.
    pub fn has_session(&self) -> bool {
        self.session.get().is_some()
    }

    /// Advances the interaction clock to "now".
    ///
    /// The clock never moves backwards: a stale writer racing a fresh one
    /// leaves the later reading in place.
    pub fn touch(&self) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    /// Returns the elapsed time since the last recorded interaction.
    pub fn idle_for(&self) -> Duration {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let last_ms = self.last_activity_ms.load(Ordering::Relaxed);
        Duration::from_millis(now_ms.saturating_sub(last_ms))
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
