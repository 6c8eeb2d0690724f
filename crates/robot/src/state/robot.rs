//! Robot state — RobotState struct, metrics counters, shared state type alias.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::identity::AgentId;
use super::position::Position;
use crate::conf::RobotConfig;
use crate::flocking::MotionVector;
use crate::presence::PeerTable;

/// Self position plus the vector currently steering it.
///
/// Both live under one lock so an arrival (motion activity) and a fresh
/// recompute (receive activity) cannot interleave half-applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub position: Position,
    pub motion: MotionVector,
}

pub struct RobotState {
    pub id: AgentId,
    pub config: RobotConfig,
    pub peers: PeerTable,
    pub metrics: RobotMetrics,
    kinematics: Mutex<Kinematics>,
}

impl RobotState {
    pub fn new(id: AgentId, position: Position, config: RobotConfig) -> Self {
        Self {
            id,
            config,
            peers: PeerTable::new(),
            metrics: RobotMetrics::default(),
            kinematics: Mutex::new(Kinematics {
                position,
                motion: MotionVector::idle(),
            }),
        }
    }

    pub fn position(&self) -> Position {
        self.kinematics.lock().position
    }

    pub fn motion(&self) -> MotionVector {
        self.kinematics.lock().motion
    }

    /// Replace the steering vector with one derived from the current position.
    ///
    /// `plan` runs under the kinematics lock, so a motion tick cannot move the
    /// robot between reading its position and publishing the new vector.
    pub fn steer<F>(&self, plan: F) -> MotionVector
    where
        F: FnOnce(Position) -> MotionVector,
    {
        let mut guard = self.kinematics.lock();
        guard.motion = plan(guard.position);
        guard.motion
    }

    /// Run one integration step under the lock. `step` returns the new kinematics.
    pub fn advance<F>(&self, step: F) -> Kinematics
    where
        F: FnOnce(Kinematics) -> Kinematics,
    {
        let mut guard = self.kinematics.lock();
        *guard = step(*guard);
        *guard
    }

    /// Point-in-time copy of the peer positions for read-only consumers.
    pub fn peers_snapshot(&self) -> HashMap<AgentId, Position> {
        self.peers.snapshot()
    }
}

/// Activity counters, updated lock-free from every task.
#[derive(Debug, Default)]
pub struct RobotMetrics {
    pub announces_sent: AtomicU64,
    pub send_failures: AtomicU64,
    pub datagrams_received: AtomicU64,
    pub malformed_dropped: AtomicU64,
    pub self_echoes: AtomicU64,
    pub peers_expired: AtomicU64,
    pub recomputes: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub announces_sent: u64,
    pub send_failures: u64,
    pub datagrams_received: u64,
    pub malformed_dropped: u64,
    pub self_echoes: u64,
    pub peers_expired: u64,
    pub recomputes: u64,
}

impl RobotMetrics {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            announces_sent: self.announces_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            self_echoes: self.self_echoes.load(Ordering::Relaxed),
            peers_expired: self.peers_expired.load(Ordering::Relaxed),
            recomputes: self.recomputes.load(Ordering::Relaxed),
        }
    }
}

pub type SharedState = Arc<RobotState>;
