use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mqttbot::announce::announce;
use mqttbot::runner::{reporter_from_settings, Runner};
use mqttbot::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "mqttbot")]
#[command(about = "Publishes storage array health and mobility availability to MQTT")]
#[command(version)]
struct Args {
    /// Configuration file (TOML). Missing files fall back to defaults.
    #[arg(short, long, default_value = "mqttbot.toml")]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Log facts instead of publishing them to the broker
    #[arg(long)]
    dry_run: bool,

    /// Read the RAID listing from a captured plist instead of running diskutil
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut settings = Settings::load(&args.config)
        .with_context(|| format!("failed to load settings from {}", args.config.display()))?;
    if let Some(path) = args.replay {
        settings.raid.enabled = true;
        settings.raid.replay_file = Some(path);
    }

    let reporter = reporter_from_settings(&settings, args.dry_run).await?;
    let runner = Runner::from_settings(&settings, &reporter)?;
    if runner.monitor_count() == 0 {
        bail!("no monitors enabled");
    }
    info!(
        monitors = runner.monitor_count(),
        outputs = reporter.output_count(),
        interval_secs = settings.general.refresh_interval_secs,
        "mqttbot started"
    );

    if settings.discovery.enabled {
        if let Err(e) = announce(&settings, &reporter).await {
            error!(error = %e, "Home Assistant discovery failed");
        }
    }

    if args.once {
        let ok = runner.run_cycle().await;
        reporter.shutdown().await;
        if !ok {
            bail!("cycle failed to publish");
        }
        return Ok(());
    }

    runner
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;
    reporter.shutdown().await;
    Ok(())
}
