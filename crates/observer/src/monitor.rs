//! Passive swarm monitor: listens to the group, never announces.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use robot::presence::{Message, PeerTable, TableChange};
use robot::transport::Transport;

use crate::summary::{summarize, SwarmSummary};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    pub datagrams: u64,
    pub malformed: u64,
    pub joins: u64,
    pub departures: u64,
    pub expired: u64,
}

pub struct Monitor {
    transport: Arc<dyn Transport>,
    peers: PeerTable,
    peer_timeout: Option<Duration>,
    poll_timeout: Duration,
    report_interval: Duration,
    stats: MonitorStats,
}

impl Monitor {
    pub fn new(
        transport: Arc<dyn Transport>,
        peer_timeout: Option<Duration>,
        poll_timeout: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            transport,
            peers: PeerTable::new(),
            peer_timeout,
            poll_timeout,
            report_interval,
            stats: MonitorStats::default(),
        }
    }

    pub fn summary(&self) -> SwarmSummary {
        summarize(&self.peers.positions())
    }

    /// Apply one raw datagram. Malformed input is counted and dropped.
    pub fn observe(&mut self, raw: &[u8], now: Instant) -> Option<TableChange> {
        self.stats.datagrams += 1;
        let message = match Message::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                self.stats.malformed += 1;
                debug!("Dropping malformed datagram: {}", e);
                return None;
            }
        };

        let change = self.peers.apply(&message, now);
        match change {
            TableChange::Joined => {
                self.stats.joins += 1;
                info!("Robot {} joined the swarm", message.id());
            }
            TableChange::Departed => {
                self.stats.departures += 1;
                info!("Robot {} left the swarm", message.id());
            }
            TableChange::Moved | TableChange::Unchanged => {}
        }
        Some(change)
    }

    /// Forget robots silent for longer than the peer timeout.
    pub fn expire(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.peer_timeout else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub(timeout) else {
            return 0;
        };

        let expired = self.peers.expire_older_than(cutoff);
        for id in &expired {
            info!("Robot {} timed out after {}ms of silence", id, timeout.as_millis());
        }
        self.stats.expired += expired.len() as u64;
        expired.len()
    }

    /// Listen until `cancel` fires, logging a summary every report interval.
    pub async fn run(mut self, cancel: CancellationToken) -> MonitorStats {
        info!(
            "Starting swarm monitor (report every {}s)",
            self.report_interval.as_secs()
        );

        let mut report = time::interval(self.report_interval);
        report.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let transport = Arc::clone(&self.transport);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = report.tick() => {
                    info!("Swarm: {}", self.summary());
                }
                polled = transport.try_recv(self.poll_timeout) => {
                    match polled {
                        Ok(Some(datagram)) => {
                            self.observe(&datagram, Instant::now());
                        }
                        Ok(None) => {}
                        Err(e) if e.is_transient() => {
                            warn!("Receive failed: {}", e);
                        }
                        Err(e) => {
                            warn!("Transport closed, monitor exiting: {}", e);
                            break;
                        }
                    }
                    self.expire(Instant::now());
                }
            }
        }

        info!(
            "Swarm monitor stopped ({} datagrams, {} malformed)",
            self.stats.datagrams, self.stats.malformed
        );
        self.stats
    }
}
