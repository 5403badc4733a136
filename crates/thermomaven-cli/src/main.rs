mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use thermomaven_core::{AccountConfig, Coordinator};

use crate::cli::{Cli, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_account_config(&cli.global)?;
    let coordinator = Coordinator::new(config)?;

    coordinator.connect().await?;
    let result = commands::dispatch(cli.command, &coordinator, &cli.global).await;
    coordinator.disconnect().await;
    result
}

/// Build an `AccountConfig` from CLI flags and environment variables.
fn build_account_config(global: &GlobalOpts) -> Result<AccountConfig, CliError> {
    let (Some(email), Some(password)) = (global.email.clone(), global.password.clone()) else {
        return Err(CliError::NoCredentials);
    };

    let mut config = AccountConfig::new(email, SecretString::from(password));
    config.region = global.region.clone();
    if let Some(base_url) = &global.base_url {
        config.base_url = base_url.clone();
    }
    // One-shot commands never need the periodic refresh task.
    config.refresh_interval = std::time::Duration::ZERO;
    Ok(config)
}
