use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use epd_hwtools::abort::AbortSignal;
use epd_hwtools::cli::Cli;
use epd_hwtools::cmd;
use epd_hwtools::config::Config;
use epd_hwtools::context::DeviceContext;
use epd_hwtools::tracing::{self, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = config.log_level().unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        ::tracing::level_filters::LevelFilter::INFO
    });
    tracing::init_journald_or_stderr(level);
    debug!(?config, "Configuration");

    let abort = AbortSignal::new();
    let listener = match abort.listen_for_interrupt() {
        Ok(listener) => Some(listener),
        Err(e) => {
            warn!("Failed to install the interrupt handler: {}", e);
            None
        }
    };

    let mut ctx = DeviceContext::new(config, abort);
    let result = cmd::run(&mut ctx, &cli.command).await;
    drop(ctx);

    if let Some(listener) = listener {
        listener.abort();
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load the configuration")?;
    cli.apply_to(&mut config);
    Ok(config)
}
