//! Interaction scenario simulator.
//!
//! Runs a RON scenario through an interaction session and prints the event
//! stream as JSON lines on stdout. Logs go to stderr.
//!
//! ```bash
//! cargo run -p interaction-client -- crates/runtime/scenarios/vault.ron
//! INTERACTION_LOG_DIR=target/logs cargo run -p interaction-client -- --quiet vault.ron
//! ```

use anyhow::Result;
use interaction_client::{SimConfig, run};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SimConfig::from_env().with_args(std::env::args().skip(1))?;
    tracing::info!(scenario = ?config.scenario, log_dir = ?config.log_dir, "starting simulator");

    let stdout = std::io::stdout();
    let summary = run(&config, &mut stdout.lock())?;

    tracing::info!(
        steps = summary.steps,
        records = summary.records,
        end_time = summary.end_time,
        "simulation complete"
    );
    Ok(())
}
