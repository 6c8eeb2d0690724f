//! Handler — the receive-side protocol: decode, self-filter, table update, recompute.

use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::message::{DecodeError, Message};
use super::table::TableChange;
use crate::flocking::{FlockingController, RecomputePolicy};
use crate::state::{RobotMetrics, SharedState};

/// What a single datagram did to the local view
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    Applied(TableChange),
    SelfEcho,
    Malformed(DecodeError),
}

pub struct Presence {
    state: SharedState,
    controller: FlockingController,
    policy: RecomputePolicy,
    peer_timeout: Option<Duration>,
}

impl Presence {
    pub fn new(state: SharedState) -> Self {
        let controller = FlockingController::new(&state.config.motion);
        let policy = state.config.motion.recompute;
        let peer_timeout = state.config.timing.peer_timeout();
        Self {
            state,
            controller,
            policy,
            peer_timeout,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn on_receive(&self, raw: &[u8]) -> ReceiveOutcome {
        self.on_receive_at(raw, Instant::now())
    }

    pub fn on_receive_at(&self, raw: &[u8], now: Instant) -> ReceiveOutcome {
        let metrics = &self.state.metrics;
        RobotMetrics::incr(&metrics.datagrams_received);

        let message = match Message::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                RobotMetrics::incr(&metrics.malformed_dropped);
                debug!(
                    error = %e,
                    payload = %String::from_utf8_lossy(raw),
                    "Dropping malformed datagram"
                );
                return ReceiveOutcome::Malformed(e);
            }
        };

        if message.id() == &self.state.id {
            RobotMetrics::incr(&metrics.self_echoes);
            trace!("Ignoring own announcement");
            return ReceiveOutcome::SelfEcho;
        }

        let change = self.state.peers.apply(&message, now);
        match change {
            TableChange::Joined => info!(
                peer = %message.id(),
                peers = self.state.peers.len(),
                "Peer joined"
            ),
            TableChange::Departed => info!(
                peer = %message.id(),
                peers = self.state.peers.len(),
                "Peer departed"
            ),
            TableChange::Moved | TableChange::Unchanged => {}
        }

        if self.policy.should_recompute(change) {
            self.refresh_motion();
        }
        ReceiveOutcome::Applied(change)
    }

    /// Evict peers silent for longer than the configured timeout.
    pub fn expire_stale(&self, now: Instant) -> usize {
        let Some(timeout) = self.peer_timeout else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub(timeout) else {
            return 0;
        };

        let expired = self.state.peers.expire_older_than(cutoff);
        if expired.is_empty() {
            return 0;
        }

        for id in &expired {
            info!(peer = %id, timeout_ms = timeout.as_millis() as u64, "Peer timed out");
        }
        RobotMetrics::add(&self.state.metrics.peers_expired, expired.len() as u64);
        self.refresh_motion();
        expired.len()
    }

    /// Snapshot of own id and current position
    pub fn format_self_announce(&self) -> Message {
        Message::Announce {
            id: self.state.id.clone(),
            position: self.state.position(),
        }
    }

    pub fn format_departure(&self) -> Message {
        Message::Depart {
            id: self.state.id.clone(),
        }
    }

    /// Recompute the steering vector from the current table and publish it.
    fn refresh_motion(&self) {
        let peers = self.state.peers.positions();
        let motion = self
            .state
            .steer(|position| self.controller.recompute(&peers, position));
        RobotMetrics::incr(&self.state.metrics.recomputes);
        debug!(
            peers = peers.len(),
            vx = motion.velocity.x,
            vy = motion.velocity.y,
            "Recomputed motion vector"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::RobotConfig;
    use crate::flocking::RecomputePolicy;
    use crate::state::{AgentId, Kinematics, Position, RobotState};
    use std::sync::Arc;

    const SELF_ID: &str = "selfAgent1";

    fn presence_with(config: RobotConfig, at: Position) -> Presence {
        let state = Arc::new(RobotState::new(AgentId::parse(SELF_ID).unwrap(), at, config));
        Presence::new(state)
    }

    fn presence() -> Presence {
        presence_with(RobotConfig::default(), Position::new(5.0, 10.0))
    }

    // ── Receive path ─────────────────────────────────────────────

    #[test]
    fn test_announce_then_depart() {
        let p = presence();
        assert_eq!(p.on_receive(b"peerA 1 2"), ReceiveOutcome::Applied(TableChange::Joined));
        assert_eq!(p.on_receive(b"peerA STOP!"), ReceiveOutcome::Applied(TableChange::Departed));
        assert!(p.state().peers.is_empty());
    }

    #[test]
    fn test_self_echo_never_enters_table() {
        let p = presence();
        let own = p.format_self_announce().to_bytes();
        for _ in 0..3 {
            assert_eq!(p.on_receive(&own), ReceiveOutcome::SelfEcho);
        }
        assert_eq!(p.on_receive(format!("{} STOP!", SELF_ID).as_bytes()), ReceiveOutcome::SelfEcho);
        assert!(!p.state().peers.contains(&AgentId::parse(SELF_ID).unwrap()));
        assert_eq!(p.state().metrics.snapshot().self_echoes, 4);
    }

    #[test]
    fn test_malformed_leaves_table_unchanged() {
        let p = presence();
        p.on_receive(b"peerA 1 2");
        let before = p.state().peers.snapshot();

        let outcome = p.on_receive(b"abc");
        assert!(matches!(outcome, ReceiveOutcome::Malformed(DecodeError::MissingCoordinates(0))));
        assert_eq!(p.state().peers.snapshot(), before);
        assert_eq!(p.state().metrics.snapshot().malformed_dropped, 1);
    }

    #[test]
    fn test_malformed_outcome_is_cloneable_with_its_error() {
        let p = presence();
        let outcome = p.on_receive(b"peerA 1 nope");
        let kept = outcome.clone();
        assert_eq!(kept, outcome);
        assert_eq!(
            kept,
            ReceiveOutcome::Malformed(DecodeError::InvalidCoordinate("nope".to_string()))
        );
    }

    // ── Flocking trigger ─────────────────────────────────────────

    #[test]
    fn test_join_publishes_motion_toward_centroid() {
        let p = presence();
        p.on_receive(b"peerA 0 0");
        p.on_receive(b"peerB 10 0");

        let heading = p.state().motion().heading().expect("should steer");
        assert!(heading.x.abs() < 1e-9);
        assert!((heading.y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_departure_idles_motion() {
        let p = presence();
        p.on_receive(b"peerA 0 0");
        assert!(!p.state().motion().is_idle());
        p.on_receive(b"peerA STOP!");
        assert!(p.state().motion().is_idle());
    }

    #[test]
    fn test_membership_policy_ignores_peer_moves() {
        let mut config = RobotConfig::default();
        config.motion.recompute = RecomputePolicy::MembershipChange;
        let p = presence_with(config, Position::new(0.0, 0.0));

        p.on_receive(b"peerA 10 0");
        let first = p.state().motion();
        p.on_receive(b"peerA 0 10");

        assert_eq!(p.state().motion(), first, "move without join/leave must not recompute");
        assert_eq!(p.state().metrics.snapshot().recomputes, 1);
    }

    #[test]
    fn test_every_update_policy_tracks_peer_moves() {
        let p = presence_with(RobotConfig::default(), Position::new(0.0, 0.0));

        p.on_receive(b"peerA 10 0");
        p.on_receive(b"peerA 0 10");

        let heading = p.state().motion().heading().unwrap();
        assert!(heading.x.abs() < 1e-9);
        assert!((heading.y - 1.0).abs() < 1e-9);
        assert_eq!(p.state().metrics.snapshot().recomputes, 2);
    }

    #[test]
    fn test_recompute_anchors_waypoint_at_current_position() {
        let p = presence_with(RobotConfig::default(), Position::new(0.0, 0.0));
        p.state().advance(|k| Kinematics {
            position: Position::new(0.0, 40.0),
            motion: k.motion,
        });

        p.on_receive(b"peerA 0 200");

        // One lookahead (100) past the moved position, not past the start.
        let target = p.state().motion().target.unwrap();
        assert!(target.x.abs() < 1e-9);
        assert!((target.y - 140.0).abs() < 1e-9);
    }

    // ── Expiry ───────────────────────────────────────────────────

    #[test]
    fn test_expire_stale_evicts_and_recomputes() {
        let p = presence();
        let start = Instant::now();
        p.on_receive_at(b"peerA 0 0", start);

        assert_eq!(p.expire_stale(start + Duration::from_millis(500)), 0);
        assert_eq!(p.expire_stale(start + Duration::from_secs(10)), 1);
        assert!(p.state().peers.is_empty());
        assert!(p.state().motion().is_idle());
    }

    #[test]
    fn test_expiry_disabled_keeps_silent_peers() {
        let mut config = RobotConfig::default();
        config.timing.peer_timeout_ms = 0;
        let p = presence_with(config, Position::new(0.0, 0.0));
        let start = Instant::now();
        p.on_receive_at(b"peerA 0 0", start);

        assert_eq!(p.expire_stale(start + Duration::from_secs(3600)), 0);
        assert_eq!(p.state().peers.len(), 1);
    }

    // ── Formatting ───────────────────────────────────────────────

    #[test]
    fn test_format_messages_carry_own_identity() {
        let p = presence();
        assert_eq!(p.format_self_announce().to_string(), format!("{} 5 10", SELF_ID));
        assert_eq!(p.format_departure().to_string(), format!("{} STOP!", SELF_ID));
    }
}
