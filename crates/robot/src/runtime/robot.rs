//! Robot — lifecycle of one agent: create, start the activities, ordered stop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::activity::{announce_loop, motion_loop, receive_loop};
use crate::conf::RobotConfig;
use crate::error::{Result, RobotError};
use crate::flocking::MotionVector;
use crate::presence::Presence;
use crate::state::{AgentId, MetricsSnapshot, Position, RobotState, SharedState};
use crate::transport::{Transport, UdpMulticast};

/// `Created → Running → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Final tallies returned by [`Robot::stop`]
#[derive(Debug, Clone, PartialEq)]
pub struct StopReport {
    pub id: AgentId,
    pub final_position: Position,
    pub peers_at_stop: usize,
    pub metrics: MetricsSnapshot,
}

/// A spawned activity and the token that stops it
struct Activity {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Activity {
    fn spawn<F>(cancel: CancellationToken, task: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            cancel,
            handle: tokio::spawn(task),
        }
    }

    async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.handle.await?;
        Ok(())
    }
}

struct Activities {
    announce: Activity,
    motion: Activity,
    receive: Activity,
}

/// Read-only view for monitoring consumers
#[derive(Clone)]
pub struct RobotHandle {
    state: SharedState,
}

impl RobotHandle {
    pub fn id(&self) -> &AgentId {
        &self.state.id
    }

    pub fn position(&self) -> Position {
        self.state.position()
    }

    pub fn motion(&self) -> MotionVector {
        self.state.motion()
    }

    /// Point-in-time copy of peer positions; eventually consistent.
    pub fn peers_snapshot(&self) -> HashMap<AgentId, Position> {
        self.state.peers_snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.state.metrics.snapshot()
    }
}

pub struct Robot {
    state: SharedState,
    lifecycle: Lifecycle,
    activities: Option<Activities>,
}

impl Robot {
    /// Validate `config`, then generate a random id and a random placement in the field.
    pub fn new(config: RobotConfig) -> Result<Self> {
        config.validate().map_err(RobotError::InvalidConfig)?;
        let mut rng = rand::thread_rng();
        let id = AgentId::random_with(&mut rng);
        let position = Position::random_within(&config.field, &mut rng);
        Ok(Self::with_identity(id, position, config))
    }

    /// Build a robot with a known id and starting point. The config is
    /// validated when the robot starts.
    pub fn with_identity(id: AgentId, position: Position, config: RobotConfig) -> Self {
        Self {
            state: Arc::new(RobotState::new(id, position, config)),
            lifecycle: Lifecycle::Created,
            activities: None,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.state.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn handle(&self) -> RobotHandle {
        RobotHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Join the configured multicast group and start the activities.
    pub async fn start(&mut self) -> Result<()> {
        self.expect(Lifecycle::Created)?;
        let transport = UdpMulticast::join(&self.state.config.network).map_err(|e| {
            error!("Failed to join swarm group: {}", e);
            e
        })?;
        self.start_with(Arc::new(transport))
    }

    /// Start the activities over an already-joined transport.
    pub fn start_with(&mut self, transport: Arc<dyn Transport>) -> Result<()> {
        self.expect(Lifecycle::Created)?;
        self.state
            .config
            .validate()
            .map_err(RobotError::InvalidConfig)?;

        let config = &self.state.config;
        let presence = Arc::new(Presence::new(Arc::clone(&self.state)));

        let receive_cancel = CancellationToken::new();
        let receive = Activity::spawn(
            receive_cancel.clone(),
            receive_loop(
                Arc::clone(&presence),
                Arc::clone(&transport),
                config.network.poll_timeout(),
                config.network.poll_backoff(),
                receive_cancel,
            ),
        );

        let motion_cancel = CancellationToken::new();
        let motion = Activity::spawn(
            motion_cancel.clone(),
            motion_loop(Arc::clone(&self.state), config.timing.motion_tick(), motion_cancel),
        );

        let announce_cancel = CancellationToken::new();
        let announce = Activity::spawn(
            announce_cancel.clone(),
            announce_loop(
                presence,
                transport,
                config.timing.broadcast_interval(),
                announce_cancel,
            ),
        );

        self.activities = Some(Activities {
            announce,
            motion,
            receive,
        });
        self.lifecycle = Lifecycle::Running;

        let position = self.state.position();
        info!(
            "✓ Robot {} running at ({:.1}, {:.1})",
            self.state.id, position.x, position.y
        );
        Ok(())
    }

    /// Stop announcing (one departure goes out), then motion, then receive.
    pub async fn stop(&mut self) -> Result<StopReport> {
        self.expect(Lifecycle::Running)?;
        self.lifecycle = Lifecycle::Stopping;
        info!("Stopping robot {}", self.state.id);

        let activities = self.activities.take().ok_or(RobotError::InvalidState {
            expected: Lifecycle::Running,
            actual: Lifecycle::Stopping,
        })?;

        // Receive goes last, so departures of other robots are still observed
        // while we wind down. A failed activity does not keep the rest running.
        let mut failure = None;
        for (name, activity) in [
            ("announce", activities.announce),
            ("motion", activities.motion),
            ("receive", activities.receive),
        ] {
            if let Err(e) = activity.shutdown().await {
                error!("{} activity failed: {}", name, e);
                failure.get_or_insert(e);
            }
        }

        self.lifecycle = Lifecycle::Stopped;
        if let Some(e) = failure {
            return Err(e);
        }
        let report = StopReport {
            id: self.state.id.clone(),
            final_position: self.state.position(),
            peers_at_stop: self.state.peers.len(),
            metrics: self.state.metrics.snapshot(),
        };
        info!("✓ Robot {} stopped", self.state.id);
        Ok(report)
    }

    fn expect(&self, expected: Lifecycle) -> Result<()> {
        if self.lifecycle != expected {
            return Err(RobotError::InvalidState {
                expected,
                actual: self.lifecycle,
            });
        }
        Ok(())
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        // Dropped while running: cancel everything. The announce task still
        // gets its departure out if the runtime is alive.
        if let Some(activities) = self.activities.take() {
            activities.announce.cancel.cancel();
            activities.motion.cancel.cancel();
            activities.receive.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LoopbackBus, TransportFuture};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Panics on send; counts receive polls so liveness can be observed.
    #[derive(Default)]
    struct PanicOnSend {
        polls: AtomicU64,
    }

    impl Transport for PanicOnSend {
        fn send<'a>(&'a self, _payload: &'a [u8]) -> TransportFuture<'a, ()> {
            panic!("send exploded")
        }

        fn try_recv(&self, timeout: Duration) -> TransportFuture<'_, Option<Vec<u8>>> {
            Box::pin(async move {
                self.polls.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(timeout).await;
                Ok(None)
            })
        }
    }

    #[test]
    fn test_new_robot_is_created_and_inside_field() {
        let config = RobotConfig::default();
        let robot = Robot::new(config.clone()).unwrap();
        assert_eq!(robot.lifecycle(), Lifecycle::Created);

        let p = robot.handle().position();
        assert!(p.x >= config.field.margin && p.x <= config.field.width - config.field.margin);
        assert!(p.y >= config.field.margin && p.y <= config.field.height - config.field.margin);
        assert!(robot.handle().peers_snapshot().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = RobotConfig::default();
        config.timing.motion_tick_ms = 0;
        assert!(matches!(Robot::new(config), Err(RobotError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_rejected() {
        let mut robot = Robot::new(RobotConfig::default()).unwrap();
        let err = robot.stop().await.unwrap_err();
        assert!(matches!(
            err,
            RobotError::InvalidState {
                expected: Lifecycle::Running,
                actual: Lifecycle::Created
            }
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let bus = LoopbackBus::new();
        let mut robot = Robot::new(RobotConfig::default()).unwrap();

        robot.start_with(Arc::new(bus.join())).unwrap();
        assert_eq!(robot.lifecycle(), Lifecycle::Running);
        assert!(robot.start_with(Arc::new(bus.join())).is_err(), "double start must fail");

        let report = robot.stop().await.unwrap();
        assert_eq!(robot.lifecycle(), Lifecycle::Stopped);
        assert_eq!(&report.id, robot.id());
        assert!(robot.stop().await.is_err(), "stop is terminal");
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config_for_known_identity() {
        let mut config = RobotConfig::default();
        config.timing.broadcast_interval_ms = 0;
        let mut robot = Robot::with_identity(
            AgentId::parse("fixed").unwrap(),
            Position::new(1.0, 1.0),
            config,
        );

        let err = robot.start_with(Arc::new(LoopbackBus::new().join())).unwrap_err();
        assert!(matches!(err, RobotError::InvalidConfig(_)));
        assert_eq!(robot.lifecycle(), Lifecycle::Created);
    }

    #[tokio::test]
    async fn test_failed_activity_still_stops_the_others() {
        let mut config = RobotConfig::default();
        config.network.poll_timeout_ms = 5;
        let transport = Arc::new(PanicOnSend::default());
        let mut robot = Robot::with_identity(
            AgentId::parse("fragile").unwrap(),
            Position::new(1.0, 1.0),
            config,
        );

        tokio_test::assert_ok!(robot.start_with(transport.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = tokio_test::assert_err!(robot.stop().await);
        assert!(matches!(err, RobotError::Join(_)));
        assert_eq!(robot.lifecycle(), Lifecycle::Stopped);

        let polls = transport.polls.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            transport.polls.load(Ordering::Relaxed),
            polls,
            "receive activity must be stopped"
        );
    }
}
