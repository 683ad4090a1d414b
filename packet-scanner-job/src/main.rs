use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, bail};
use clap::Parser;
use packet_scanner_config::{Config, ConfigLoad, ConfigLoader};
use packet_scanner_core::{
    domain::PacketId, infrastructure::PostgresStatusStore, ports::StatusStore,
};
use packet_scanner_job::{
    AppContext, CycleScheduler,
    cli::{Cli, Command, DbCommand, GlobalArgs, RunArgs, ScheduleArgs},
    infra::{preflight::run_preflight, telemetry::init_tracing},
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli.global)?;

    match cli.subcommand() {
        Command::Run(args) => run_once(config, args).await,
        Command::Schedule(args) => run_scheduled(config, args).await,
        Command::Status { id } => print_status(config, &id).await,
        Command::Db(DbCommand::Migrate) => run_db_migrate(config).await,
        Command::Preflight => run_preflight_checks(config).await,
    }
}

fn load_config(args: &GlobalArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }
    let load = loader.load();

    // Install logging after .env has been applied so RUST_LOG from it counts.
    init_tracing();

    let ConfigLoad { config, warnings } =
        load.context("failed to load configuration")?;

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(warning = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(warning = %warning.message, "configuration warning"),
        }
    }

    info!(
        clamd = %format!("{}:{}", config.scanner.host, config.scanner.port),
        durable.root = %config.durable.root.display(),
        dispatch.max_concurrency = config.dispatch.max_concurrency,
        dispatch.call_timeout = %humantime::format_duration(config.dispatch.call_timeout),
        "scanner configuration in effect"
    );

    Ok(config)
}

async fn run_once(config: Config, args: RunArgs) -> anyhow::Result<ExitCode> {
    let fail_on_fetch_error =
        args.fail_on_fetch_error || config.schedule.fail_on_fetch_error;
    let ctx = AppContext::connect(config).await?;

    let result = ctx.orchestrator().run_cycle().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    if result.is_fetch_failure() && fail_on_fetch_error {
        error!(
            error = result.batch_fetch_error.as_deref().unwrap_or_default(),
            "batch fetch failed"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_scheduled(
    config: Config,
    args: ScheduleArgs,
) -> anyhow::Result<ExitCode> {
    let interval = args.interval.unwrap_or(config.schedule.interval);
    let ctx = AppContext::connect(config).await?;
    let scheduler = CycleScheduler::new(Arc::new(ctx.orchestrator()), interval);

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for shutdown signal");
        }
        info!("shutdown requested; finishing the current cycle");
    };
    let summary = scheduler.run_until(shutdown).await;

    info!(summary = %summary.to_json(), "scheduler exited");
    Ok(ExitCode::SUCCESS)
}

async fn print_status(config: Config, id: &str) -> anyhow::Result<ExitCode> {
    let id = PacketId::new(id).context("invalid packet identifier")?;
    let ctx = AppContext::connect(config).await?;

    match ctx.status_store().find(&id).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            warn!(packet_id = %id, "no status record found");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_db_migrate(config: Config) -> anyhow::Result<ExitCode> {
    let url = config
        .database
        .primary_url
        .as_deref()
        .context("no database URL configured")?;
    let store = PostgresStatusStore::connect(url, 1)
        .await
        .context("failed to connect to PostgreSQL for migration")?;
    store.migrate().await.context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(ExitCode::SUCCESS)
}

async fn run_preflight_checks(config: Config) -> anyhow::Result<ExitCode> {
    let timeout = config.dispatch.call_timeout;
    let ctx = AppContext::connect(config).await?;

    let report = run_preflight(&ctx, timeout).await;
    for check in &report.checks {
        println!("{check}");
    }
    if !report.passed() {
        bail!("preflight failed");
    }
    Ok(ExitCode::SUCCESS)
}
