use std::{path::PathBuf, time::Duration};

use clap::{Args as ClapArgs, Parser, Subcommand};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "packet-scanner-job")]
#[command(
    about = "Virus-scan staged packets and dispatch them to the durable store or the retry area"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Subcommand to execute; a bare invocation runs one cycle.
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run(RunArgs::default()))
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to packet-scanner.toml
    #[arg(long, global = true, env = "PACKET_SCANNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute exactly one scan cycle and exit
    Run(RunArgs),
    /// Run scan cycles on a fixed interval until interrupted
    Schedule(ScheduleArgs),
    /// Print the status record of one packet as JSON
    Status {
        /// Packet identifier
        id: String,
    },
    #[command(subcommand)]
    Db(DbCommand),
    /// Check database, ClamAV and staging directories, then exit
    Preflight,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Exit non-zero when the status store could not be listed
    #[arg(long)]
    pub fail_on_fetch_error: bool,

    /// Print the cycle result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ScheduleArgs {
    /// Time between cycle starts, e.g. `5m` (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum DbCommand {
    /// Apply the embedded migrations and exit
    Migrate,
}
