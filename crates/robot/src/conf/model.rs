//! Model — RobotConfig and related structs.

use std::net::Ipv4Addr;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::flocking::RecomputePolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub network: NetworkConfig,
    pub timing: TimingConfig,
    pub motion: MotionConfig,
    pub field: FieldConfig,
    pub logging: LoggingConfig,
}

/// Multicast group membership and receive polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    /// Multicast hop limit for outgoing announcements
    pub ttl: u32,
    /// Local interface used to join the group (0.0.0.0 lets the OS choose)
    pub interface: Ipv4Addr,
    pub recv_buffer: usize,
    pub poll_timeout_ms: u64,
    /// Pause after a failed receive before polling again
    pub poll_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub broadcast_interval_ms: u64,
    pub motion_tick_ms: u64,
    /// Evict peers silent for this long. 0 keeps peers until they depart.
    pub peer_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Units per second
    pub cruise_speed: f64,
    pub lookahead: f64,
    pub stop_at_target: bool,
    pub recompute: RecomputePolicy,
}

/// Bounds used for the random initial placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            group: Ipv4Addr::new(224, 1, 1, 1),
            port: 25535,
            ttl: 2,
            interface: Ipv4Addr::UNSPECIFIED,
            recv_buffer: 1024,
            poll_timeout_ms: 50,
            poll_backoff_ms: 20,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: 100,
            motion_tick_ms: 100,
            peer_timeout_ms: 3000,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            cruise_speed: 15.0,
            lookahead: 100.0,
            stop_at_target: true,
            recompute: RecomputePolicy::EveryUpdate,
        }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            margin: 10.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,robot=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl NetworkConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.group.is_multicast() {
            return Err(format!("network.group {} is not a multicast address", self.group));
        }
        if self.port == 0 {
            return Err("network.port must be > 0".to_string());
        }
        if self.ttl == 0 || self.ttl > 255 {
            return Err("network.ttl must be within 1..=255".to_string());
        }
        if self.recv_buffer == 0 {
            return Err("network.recv_buffer must be > 0".to_string());
        }
        if self.poll_timeout_ms == 0 {
            return Err("network.poll_timeout_ms must be > 0".to_string());
        }
        Ok(())
    }
}

impl TimingConfig {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn motion_tick(&self) -> Duration {
        Duration::from_millis(self.motion_tick_ms)
    }

    pub fn peer_timeout(&self) -> Option<Duration> {
        (self.peer_timeout_ms > 0).then(|| Duration::from_millis(self.peer_timeout_ms))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.broadcast_interval_ms == 0 {
            return Err("timing.broadcast_interval_ms must be > 0".to_string());
        }
        if self.motion_tick_ms == 0 {
            return Err("timing.motion_tick_ms must be > 0".to_string());
        }
        if self.peer_timeout_ms > 0 && self.peer_timeout_ms <= self.broadcast_interval_ms {
            return Err(
                "timing.peer_timeout_ms must exceed broadcast_interval_ms (or be 0 to disable)".to_string(),
            );
        }
        Ok(())
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.cruise_speed.is_finite() || self.cruise_speed < 0.0 {
            return Err("motion.cruise_speed must be a finite, non-negative number".to_string());
        }
        if !self.lookahead.is_finite() || self.lookahead <= 0.0 {
            return Err("motion.lookahead must be a finite number > 0".to_string());
        }
        Ok(())
    }
}

impl FieldConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.width.is_finite() && self.height.is_finite() && self.margin.is_finite()) {
            return Err("field dimensions must be finite".to_string());
        }
        if self.margin < 0.0 {
            return Err("field.margin must be >= 0".to_string());
        }
        if self.width <= 2.0 * self.margin || self.height <= 2.0 * self.margin {
            return Err("field must be larger than twice its margin in both dimensions".to_string());
        }
        Ok(())
    }
}

impl RobotConfig {
    /// Validate every section; the first failure wins
    pub fn validate(&self) -> Result<(), String> {
        self.network.validate()?;
        self.timing.validate()?;
        self.motion.validate()?;
        self.field.validate()?;
        Ok(())
    }
}
