use robot::runtime::{boot, stop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = boot::load_config()?;
    boot::init_logging(&config.logging);

    let mut robot = boot::boot(config).await?;
    info!("Press Enter or Ctrl+C to stop the robot");

    stop::shutdown_requested().await;

    let report = robot.stop().await?;
    info!(
        "Robot {} stopped at ({:.1}, {:.1}) with {} peer(s) known; sent {} announce(s), dropped {} malformed datagram(s)",
        report.id,
        report.final_position.x,
        report.final_position.y,
        report.peers_at_stop,
        report.metrics.announces_sent,
        report.metrics.malformed_dropped,
    );
    Ok(())
}
