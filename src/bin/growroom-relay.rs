// ABOUTME: Entry point for the companion relay that runs next to the sensors
// ABOUTME: Polls readings on an interval and forwards them until interrupted

use clap::Parser;
use std::time::Duration;

use growroom::relay::{Relay, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = RelayConfig::parse();

    growroom::init_tracing(config.log_json);

    let relay = Relay::from_config(&config)?;
    tracing::info!(
        server = %config.server,
        plant_id = ?config.plant_id,
        interval_secs = config.interval_secs,
        "relay starting"
    );

    relay
        .run(Duration::from_secs(config.interval_secs.max(1)), async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    Ok(())
}
