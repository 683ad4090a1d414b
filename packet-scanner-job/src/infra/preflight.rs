use std::{fmt, path::Path, time::Duration};

use packet_scanner_core::domain::StagingArea;
use tracing::{info, warn};

use super::app_context::AppContext;

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// The dependency answered.
    Passed,
    /// The dependency is unusable, with the reason.
    Failed(String),
}

/// One named check.
#[derive(Debug, Clone)]
pub struct PreflightCheck {
    /// What was checked.
    pub name: String,
    /// How it went.
    pub status: CheckStatus,
}

impl fmt::Display for PreflightCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            CheckStatus::Passed => write!(f, "[ok]   {}", self.name),
            CheckStatus::Failed(reason) => {
                write!(f, "[fail] {}: {reason}", self.name)
            }
        }
    }
}

/// All checks of one preflight run.
#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    /// Checks in the order they ran.
    pub checks: Vec<PreflightCheck>,
}

impl PreflightReport {
    /// True when every check passed.
    pub fn passed(&self) -> bool {
        self.checks
            .iter()
            .all(|check| check.status == CheckStatus::Passed)
    }

    fn record(&mut self, name: impl Into<String>, outcome: Result<(), String>) {
        let name = name.into();
        let status = match outcome {
            Ok(()) => {
                info!(check = %name, "preflight check passed");
                CheckStatus::Passed
            }
            Err(reason) => {
                warn!(check = %name, reason = %reason, "preflight check failed");
                CheckStatus::Failed(reason)
            }
        };
        self.checks.push(PreflightCheck { name, status });
    }
}

/// Check every collaborator the job needs without touching any packet.
pub async fn run_preflight(ctx: &AppContext, timeout: Duration) -> PreflightReport {
    let mut report = PreflightReport::default();

    let db = tokio::time::timeout(timeout, ctx.status_store().health_check()).await;
    report.record("status store", flatten(db));

    let ping = tokio::time::timeout(timeout, ctx.scanner().ping()).await;
    report.record(
        format!("clamd at {}", ctx.scanner().address()),
        flatten(ping),
    );

    let staging = &ctx.config().staging;
    for area in [&staging.scan_area, &staging.retry_area] {
        report.record(
            format!("staging area {area}"),
            check_directory(area, ctx.staging().directory(area)),
        );
    }

    report
}

fn flatten<E: fmt::Display>(
    outcome: Result<Result<(), E>, tokio::time::error::Elapsed>,
) -> Result<(), String> {
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err("timed out".to_string()),
    }
}

/// Confirm `area` is mapped to an existing directory.
pub fn check_directory(area: &StagingArea, dir: Option<&Path>) -> Result<(), String> {
    let Some(dir) = dir else {
        return Err(format!("{area} is not mapped to a directory"));
    };
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() && meta.permissions().readonly() => {
            Err(format!("{} is read-only", dir.display()))
        }
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(format!("{} is not a directory", dir.display())),
        Err(err) => Err(format!("{}: {err}", dir.display())),
    }
}
