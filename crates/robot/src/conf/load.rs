//! Load — config loading from file and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use super::model::RobotConfig;

const DEFAULT_CONFIG_PATH: &str = "/etc/flockcast/robot.toml";

impl RobotConfig {
    /// Load configuration from file or defaults, then apply environment overrides.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("ROBOT_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: RobotConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply `ROBOT_*` overrides from `lookup`. Unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(group) = parse_var(&lookup, "ROBOT_GROUP") {
            self.network.group = group;
        }
        if let Some(port) = parse_var(&lookup, "ROBOT_PORT") {
            self.network.port = port;
        }
        if let Some(ttl) = parse_var(&lookup, "ROBOT_TTL") {
            self.network.ttl = ttl;
        }
        if let Some(interface) = parse_var(&lookup, "ROBOT_INTERFACE") {
            self.network.interface = interface;
        }
        if let Some(ms) = parse_var(&lookup, "ROBOT_BROADCAST_INTERVAL_MS") {
            self.timing.broadcast_interval_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "ROBOT_MOTION_TICK_MS") {
            self.timing.motion_tick_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "ROBOT_PEER_TIMEOUT_MS") {
            self.timing.peer_timeout_ms = ms;
        }
        if let Some(speed) = parse_var(&lookup, "ROBOT_CRUISE_SPEED") {
            self.motion.cruise_speed = speed;
        }
        if let Some(level) = lookup("ROBOT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}
