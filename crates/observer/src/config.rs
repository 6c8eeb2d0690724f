use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use robot::conf::NetworkConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObserverConfig {
    pub network: NetworkConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Forget robots silent for this long (0 keeps them until they depart)
    pub peer_timeout_ms: u64,
    /// How often a swarm summary is logged
    pub report_interval_secs: u64,
}

impl MonitorConfig {
    pub fn peer_timeout(&self) -> Option<Duration> {
        (self.peer_timeout_ms > 0).then(|| Duration::from_millis(self.peer_timeout_ms))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            peer_timeout_ms: 3000,
            report_interval_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File { path: String },
}

impl ObserverConfig {
    /// Load configuration from observer.toml and environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        // Compiled defaults first so missing keys fall back to them
        let defaults = config::Config::try_from(&ObserverConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        let config_paths = [
            "/etc/flockcast/observer",
            "config/observer",
            "crates/observer/config/observer",
        ];
        for path in config_paths {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Nested keys use a double underscore: OBSERVER_NETWORK__PORT
        builder = builder.add_source(
            config::Environment::with_prefix("OBSERVER")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        self.network
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid network section")?;

        if self.monitor.report_interval_secs == 0 {
            anyhow::bail!("monitor.report_interval_secs must be greater than 0");
        }

        let poll = self.network.poll_timeout_ms;
        if let Some(timeout) = self.monitor.peer_timeout() {
            if timeout <= Duration::from_millis(poll) {
                anyhow::bail!(
                    "monitor.peer_timeout_ms ({}) must exceed network.poll_timeout_ms ({})",
                    self.monitor.peer_timeout_ms,
                    poll
                );
            }
        }

        Ok(())
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig {
                level: "info,observer=info,robot=warn".to_string(),
                format: LogFormat::Pretty,
                output: LogOutput::Stdout,
            },
        }
    }
}
