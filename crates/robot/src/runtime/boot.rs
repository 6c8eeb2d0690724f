//! Boot — logging init, config load, robot creation and start.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::conf::{LogFormat, LoggingConfig, RobotConfig};
use crate::runtime::Robot;

/// Initialise the tracing / logging subsystem. `RUST_LOG` wins over the configured level.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true))
                .init();
        }
    }
}

/// Load and validate configuration.
pub fn load_config() -> Result<RobotConfig, Box<dyn std::error::Error>> {
    let config = RobotConfig::load()?;
    config.validate()?;
    Ok(config)
}

/// Create the robot and join the swarm.
///
/// Returns the running robot on success; a transport failure here is fatal.
pub async fn boot(config: RobotConfig) -> Result<Robot, Box<dyn std::error::Error>> {
    info!("Starting Flockcast robot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Swarm group {}:{} (ttl={}), announce every {}ms, motion tick {}ms",
        config.network.group,
        config.network.port,
        config.network.ttl,
        config.timing.broadcast_interval_ms,
        config.timing.motion_tick_ms,
    );
    info!(
        "Flocking: cruise_speed={}, lookahead={}, stop_at_target={}, recompute={:?}",
        config.motion.cruise_speed,
        config.motion.lookahead,
        config.motion.stop_at_target,
        config.motion.recompute,
    );

    let mut robot = Robot::new(config)?;
    info!("Generated identity {}", robot.id());

    robot.start().await.map_err(|e| {
        error!("Robot failed to start: {}", e);
        e
    })?;

    Ok(robot)
}
