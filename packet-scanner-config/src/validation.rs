use std::fmt;

use thiserror::Error;

use packet_scanner_core::domain::StagingArea;

use crate::models::Config;

/// Hard configuration errors; the job refuses to start on any of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    /// No database URL from file or environment.
    #[error("database URL is required; set DATABASE_URL or [database] url")]
    MissingDatabaseUrl,
    /// `max_concurrency` is zero.
    #[error("dispatch max_concurrency must be at least 1")]
    ZeroConcurrency,
    /// `call_timeout` is zero.
    #[error("dispatch call_timeout must be greater than zero")]
    ZeroCallTimeout,
    /// Scan and retry area are the same.
    #[error("scan area and retry area must differ (both are {area})")]
    SameAreas {
        /// The shared area.
        area: StagingArea,
    },
    /// An area has no directory.
    #[error("staging area {area} is not mapped to a directory")]
    UnmappedArea {
        /// The unmapped area.
        area: StagingArea,
    },
}

/// Soft configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// What is wrong.
    pub message: String,
    /// How to fix it, when known.
    pub hint: Option<String>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{} ({hint})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Ordered collection of [`ConfigWarning`]s.
#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    /// Add a warning without a hint.
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    /// Add a warning with a remediation hint.
    pub fn push_with_hint(
        &mut self,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    /// Append every warning of `other`.
    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    /// True when nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of warnings.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Warnings in the order they were raised.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Reject unusable settings and collect warnings for questionable ones.
pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config
        .database
        .primary_url
        .as_deref()
        .is_none_or(|url| url.trim().is_empty())
    {
        return Err(ConfigGuardRailError::MissingDatabaseUrl);
    }

    if config.dispatch.max_concurrency == 0 {
        return Err(ConfigGuardRailError::ZeroConcurrency);
    }
    if config.dispatch.call_timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroCallTimeout);
    }

    let staging = &config.staging;
    if staging.scan_area == staging.retry_area {
        return Err(ConfigGuardRailError::SameAreas {
            area: staging.scan_area.clone(),
        });
    }

    for area in [&staging.scan_area, &staging.retry_area] {
        let Some(dir) = staging.directory(area) else {
            return Err(ConfigGuardRailError::UnmappedArea { area: area.clone() });
        };
        if !dir.is_dir() {
            warnings.push_with_hint(
                format!(
                    "staging directory {} for {area} does not exist yet",
                    dir.display()
                ),
                "packets cannot be scanned or quarantined until it is mounted",
            );
        }
    }

    if !config.durable.root.exists() {
        warnings.push_with_hint(
            format!(
                "durable store root {} does not exist",
                config.durable.root.display()
            ),
            "it is created on the first write",
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, path::PathBuf, time::Duration};

    use super::*;
    use crate::models::{
        ConfigMetadata, DatabaseConfig, DispatchSettings, DurableConfig,
        ScannerConfig, ScheduleConfig, StagingConfig,
    };

    fn config(dir: &std::path::Path) -> Config {
        let mut areas = BTreeMap::new();
        areas.insert(StagingArea::virus_scan(), dir.join("scan"));
        areas.insert(StagingArea::virus_scan_retry(), dir.join("retry"));
        Config {
            database: DatabaseConfig {
                primary_url: Some("postgres://localhost/packets".into()),
                max_connections: 5,
            },
            staging: StagingConfig {
                extension: ".zip".into(),
                scan_area: StagingArea::virus_scan(),
                retry_area: StagingArea::virus_scan_retry(),
                areas,
            },
            scanner: ScannerConfig {
                host: "localhost".into(),
                port: 3310,
                chunk_size: 65_536,
            },
            durable: DurableConfig {
                root: dir.join("dfs"),
            },
            dispatch: DispatchSettings {
                max_concurrency: 4,
                call_timeout: Duration::from_secs(60),
                actor: "PACKET_SCANNER_JOB".into(),
            },
            schedule: ScheduleConfig {
                interval: Duration::from_secs(300),
                fail_on_fetch_error: false,
            },
            metadata: ConfigMetadata::default(),
        }
    }

    #[test]
    fn missing_directories_are_warnings() {
        let dir = PathBuf::from("/nonexistent/packet-scanner");
        let warnings = apply_guard_rails(&config(&dir)).unwrap();
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn guard_rails_reject_bad_settings() {
        let dir = PathBuf::from("/tmp");

        let mut cfg = config(&dir);
        cfg.database.primary_url = Some("  ".into());
        assert_eq!(
            apply_guard_rails(&cfg).unwrap_err(),
            ConfigGuardRailError::MissingDatabaseUrl
        );

        let mut cfg = config(&dir);
        cfg.dispatch.max_concurrency = 0;
        assert_eq!(
            apply_guard_rails(&cfg).unwrap_err(),
            ConfigGuardRailError::ZeroConcurrency
        );

        let mut cfg = config(&dir);
        cfg.staging.retry_area = StagingArea::virus_scan();
        assert!(matches!(
            apply_guard_rails(&cfg).unwrap_err(),
            ConfigGuardRailError::SameAreas { .. }
        ));

        let mut cfg = config(&dir);
        cfg.staging.areas.remove(&StagingArea::virus_scan_retry());
        assert_eq!(
            apply_guard_rails(&cfg).unwrap_err(),
            ConfigGuardRailError::UnmappedArea {
                area: StagingArea::virus_scan_retry()
            }
        );
    }
}
