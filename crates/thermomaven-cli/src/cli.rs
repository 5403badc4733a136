//! Argument definitions (clap derive).

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "thermomaven",
    version,
    about = "Cloud client for ThermoMaven wireless thermometers",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account email.
    #[arg(long, global = true, env = "THERMOMAVEN_EMAIL")]
    pub email: Option<String>,

    /// Account password.
    #[arg(long, global = true, env = "THERMOMAVEN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Account region (US or EU).
    #[arg(long, global = true, env = "THERMOMAVEN_REGION", default_value = "US")]
    pub region: String,

    /// Cloud base URL override.
    #[arg(long, global = true, env = "THERMOMAVEN_BASE_URL", hide = true)]
    pub base_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices with their latest telemetry.
    Devices,

    /// Show the account profile.
    Account,

    /// Stream live telemetry updates to stdout until interrupted.
    Watch(WatchArgs),

    /// Start a cook on a probe with a target temperature.
    Start(ProbeTargetArgs),

    /// Stop the active cook on a probe.
    Stop(ProbeArgs),

    /// Change the target temperature of an active cook.
    SetTemp(ProbeTargetArgs),

    /// Force a roster resync from the cloud.
    Sync,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show updates for this device id.
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Target device id (see `thermomaven devices`).
    #[arg(long)]
    pub device: String,

    /// Probe number, 1-based as printed on the hardware.
    #[arg(long, default_value_t = 1)]
    pub probe: u8,
}

#[derive(Debug, Args)]
pub struct ProbeTargetArgs {
    #[command(flatten)]
    pub probe: ProbeArgs,

    /// Target temperature in degrees Fahrenheit.
    #[arg(long)]
    pub temp: f64,
}
