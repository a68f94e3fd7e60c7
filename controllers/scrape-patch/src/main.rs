//! scrape-patch
//!
//! One-shot controller that exposes the metrics endpoints of
//! kube-controller-manager, kube-scheduler, the kubelet and kube-proxy as
//! headless services in `kube-system`:
//! - discovers whether the control plane runs as static pods or host processes
//! - creates a headless service per component if missing
//! - creates or patches the endpoints records behind those services
//!
//! Runs once and exits non-zero on the first failure.

mod config;
mod controller;
mod discovery;
#[cfg(test)]
mod discovery_test;
mod error;
mod reconciler;
#[cfg(test)]
mod test_utils;

use clap::Parser;
use config::{Args, Config, LogFormat};
use controller::Controller;
use error::ControllerError;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level, args.log_format);

    info!("Starting scrape-patch {}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => {
            info!("See you next time!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ControllerError> {
    let config = Config::try_from(args)?;
    config.log_summary();

    let controller = Controller::connect(config).await?;
    let summary = controller.run().await?;
    if summary.is_noop() {
        info!("Nothing to do, {summary}");
    } else {
        info!("Done, {summary}");
    }
    Ok(())
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: LevelFilter, format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}
