//! Activity — the three concurrent loops a running robot is made of.
//!
//! Each loop owns a `CancellationToken` and observes it within one
//! interval. Only the receive loop writes the peer table; only the motion
//! loop moves the robot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::flocking::integrate;
use crate::presence::Presence;
use crate::state::{RobotMetrics, SharedState};
use crate::transport::Transport;

/// Announce own position every `interval`, then send exactly one departure.
pub async fn announce_loop(
    presence: Arc<Presence>,
    transport: Arc<dyn Transport>,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!("Starting announce loop (interval: {}ms)", interval.as_millis());

    let metrics = &presence.state().metrics;
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let announce = presence.format_self_announce();
                match transport.send(&announce.to_bytes()).await {
                    Ok(()) => RobotMetrics::incr(&metrics.announces_sent),
                    Err(e) => {
                        // Skipped until the next tick; the next announce supersedes it.
                        RobotMetrics::incr(&metrics.send_failures);
                        warn!("Announce send failed: {}", e);
                    }
                }
            }
        }
    }

    let departure = presence.format_departure();
    match transport.send(&departure.to_bytes()).await {
        Ok(()) => info!("Sent departure ({})", departure),
        Err(e) => {
            RobotMetrics::incr(&metrics.send_failures);
            warn!("Departure send failed, peers will rely on timeout: {}", e);
        }
    }
    info!("Announce loop stopped");
}

/// Feed every inbound datagram to the presence protocol and sweep silent peers.
///
/// Transient receive errors back off and retry; a fatal one ends the loop.
pub async fn receive_loop(
    presence: Arc<Presence>,
    transport: Arc<dyn Transport>,
    poll_timeout: Duration,
    backoff: Duration,
    cancel: CancellationToken,
) {
    info!(
        "Starting receive loop (poll timeout: {}ms, backoff: {}ms)",
        poll_timeout.as_millis(),
        backoff.as_millis()
    );

    let mut consecutive_failures: u32 = 0;

    loop {
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            polled = transport.try_recv(poll_timeout) => polled,
        };

        match polled {
            Ok(Some(datagram)) => {
                consecutive_failures = 0;
                presence.on_receive(&datagram);
            }
            Ok(None) => {
                consecutive_failures = 0;
            }
            Err(e) if !e.is_transient() => {
                error!("Receive loop giving up: {}", e);
                break;
            }
            Err(e) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                warn!("Receive failed (attempt {}): {}", consecutive_failures, e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(backoff) => {}
                }
            }
        }

        presence.expire_stale(Instant::now());
    }

    info!("Receive loop stopped");
}

/// Integrate the current motion vector into the robot's position every `tick`.
pub async fn motion_loop(state: SharedState, tick: Duration, cancel: CancellationToken) {
    info!("Starting motion loop (tick: {}ms)", tick.as_millis());

    let mut ticker = time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut was_moving = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let after = state.advance(|k| integrate(k, tick));
                let moving = !after.motion.is_idle();
                if was_moving && !moving {
                    debug!(x = after.position.x, y = after.position.y, "Robot came to rest");
                }
                was_moving = moving;
            }
        }
    }

    let position = state.position();
    info!("Motion loop stopped at ({:.1}, {:.1})", position.x, position.y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::RobotConfig;
    use crate::state::{AgentId, Position, RobotState};
    use crate::transport::{TransportError, TransportFuture};

    struct ClosedTransport;

    impl Transport for ClosedTransport {
        fn send<'a>(&'a self, _payload: &'a [u8]) -> TransportFuture<'a, ()> {
            Box::pin(async { Err(TransportError::Closed) })
        }

        fn try_recv(&self, _timeout: Duration) -> TransportFuture<'_, Option<Vec<u8>>> {
            Box::pin(async { Err(TransportError::Closed) })
        }
    }

    fn presence() -> Arc<Presence> {
        let state = RobotState::new(
            AgentId::parse("loner").unwrap(),
            Position::new(0.0, 0.0),
            RobotConfig::default(),
        );
        Arc::new(Presence::new(Arc::new(state)))
    }

    #[tokio::test]
    async fn test_receive_loop_exits_on_closed_transport() {
        let cancel = CancellationToken::new();
        let finished = time::timeout(
            Duration::from_secs(1),
            receive_loop(
                presence(),
                Arc::new(ClosedTransport),
                Duration::from_millis(5),
                Duration::from_millis(5),
                cancel.clone(),
            ),
        )
        .await;

        assert!(finished.is_ok(), "loop must stop without cancellation");
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_announce_loop_only_attempts_departure() {
        let presence = presence();
        let cancel = CancellationToken::new();
        cancel.cancel();

        announce_loop(
            Arc::clone(&presence),
            Arc::new(ClosedTransport),
            Duration::from_millis(5),
            cancel,
        )
        .await;

        let metrics = presence.state().metrics.snapshot();
        assert_eq!(metrics.announces_sent, 0);
        assert_eq!(metrics.send_failures, 1, "only the departure was attempted");
    }
}
