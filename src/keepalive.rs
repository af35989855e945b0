//! Background keep-alive loop.
//!
//! The loop wakes on a fixed polling interval and pings `/keepalive` only
//! when the session has sat idle past a threshold. Normal foreground traffic
//! advances the interaction clock, so an active conversation never generates
//! keep-alive traffic; a successful ping also advances the clock so the next
//! tick does not immediately re-ping. Failures are logged and the loop keeps
//! ticking: losing a ping is never fatal.

use std::time::Duration;

use crate::client::Parley;
use crate::observability::{KEEPALIVE_FAILURES, KEEPALIVE_PINGS};

/// How often the loop wakes to check idleness.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum idle time before the session is worth extending. Materially
/// longer than the polling interval, so an idle session is pinged roughly
/// once per threshold rather than once per tick.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Returns true when the elapsed idle time warrants a keep-alive ping.
pub fn due(idle: Duration) -> bool {
    idle > IDLE_THRESHOLD
}

/// Runs the keep-alive loop until the task is dropped.
///
/// Spawn this with `tokio::spawn` at startup and abandon the handle at
/// shutdown; the polling sleep is the cooperative cancellation point.
pub async fn run(client: Parley) {
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        tick(&client).await;
    }
}

/// One poll tick: ping if a session is active and idle past the threshold.
async fn tick(client: &Parley) {
    let context = client.context();
    if !context.has_session() || !due(context.idle_for()) {
        return;
    }
    KEEPALIVE_PINGS.click();
    match client.keepalive().await {
        Ok(()) => {
            // The ping itself counts as activity.
            context.touch();
        }
        Err(err) => {
            KEEPALIVE_FAILURES.click();
            eprintln!("keepalive ping failed (will retry): {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;

    #[test]
    fn due_only_past_threshold() {
        assert!(!due(Duration::ZERO));
        assert!(!due(IDLE_THRESHOLD));
        assert!(due(IDLE_THRESHOLD + Duration::from_millis(1)));
        assert!(due(Duration::from_secs(3600)));
    }

    #[test]
    fn threshold_exceeds_poll_interval() {
        assert!(IDLE_THRESHOLD > POLL_INTERVAL * 4);
    }

    #[test]
    fn fresh_activity_suppresses_ping() {
        let ctx = SessionContext::new();
        ctx.touch();
        assert!(!due(ctx.idle_for()));
    }

    #[test]
    fn tick_without_session_is_a_no_op() {
        let client = Parley::new(Some("http://localhost:8000/".to_string())).unwrap();
        tokio_test::block_on(tick(&client));
        assert!(!client.context().has_session());
    }
}
