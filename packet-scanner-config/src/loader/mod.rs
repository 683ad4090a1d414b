/// Loader error type.
pub mod error;

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
    time::Duration,
};
use tracing::debug;
use url::Url;

use packet_scanner_core::{
    domain::StagingArea,
    infrastructure::clamav::{DEFAULT_CHUNK_SIZE, DEFAULT_CLAMD_PORT},
    orchestration::config::{DEFAULT_ACTOR, DEFAULT_PACKET_EXTENSION},
};

use crate::{
    constants::{
        DEFAULT_CALL_TIMEOUT, DEFAULT_CLAMD_HOST, DEFAULT_DURABLE_ROOT,
        DEFAULT_MAX_CONNECTIONS, DEFAULT_SCHEDULE_INTERVAL,
    },
    models::{
        Config, ConfigMetadata, DatabaseConfig, DispatchSettings, DurableConfig,
        ScannerConfig, ScheduleConfig, StagingConfig,
        sources::{EnvConfig, FileConfig},
    },
    validation::{self, ConfigWarnings},
};

use error::ConfigLoadError;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("packet-scanner.toml"),
        PathBuf::from("config/packet-scanner.toml"),
    ]
});

/// Inputs that steer where configuration is read from.
#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    /// Explicit config file; must exist when set.
    pub config_path: Option<PathBuf>,
    /// `.env` file to load instead of the default lookup.
    pub env_file: Option<PathBuf>,
    /// Skip `.env` loading entirely.
    pub skip_env_file: bool,
}

/// Composes [`Config`] from file, `.env` and environment.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

/// Loaded configuration plus the warnings raised while composing it.
#[derive(Debug)]
pub struct ConfigLoad {
    /// The validated configuration.
    pub config: Config,
    /// Soft problems for the caller to log.
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    /// Loader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader with explicit options.
    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    /// Read this config file.
    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Load this `.env` file.
    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Do not load any `.env` file.
    pub fn without_env_file(mut self) -> Self {
        self.options.skip_env_file = true;
        self
    }

    /// Load `.env`, read the process environment and the config file, then
    /// compose and validate.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        self.load_with_env(EnvConfig::gather()?, env_file_loaded)
    }

    /// Same as [`load`](Self::load) but with an explicit environment
    /// snapshot instead of the process environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            compose_config(file_config, env, config_path, env_file_loaded)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        if self.options.skip_env_file {
            return Ok(false);
        }
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        loaded.or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(ConfigLoadError::EnvFile(err)),
        })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let requested = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match requested {
            Some(path) if !path.exists() => {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(found) => found.clone(),
                None => return Ok((None, None)),
            },
        };

        debug!(path = %path.display(), "reading configuration file");
        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No packet-scanner.toml detected; using environment variables only",
            "Pass --config or set PACKET_SCANNER_CONFIG to use a file",
        );
    }

    let FileConfig {
        database: file_database,
        staging: file_staging,
        scanner: file_scanner,
        durable: file_durable,
        dispatch: file_dispatch,
        schedule: file_schedule,
    } = file_config.unwrap_or_default();

    let primary_url = env.database_url.clone().or(file_database.url);
    if let Some(url) = primary_url.as_deref() {
        Url::parse(url.trim())
            .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    }
    let database = DatabaseConfig {
        primary_url,
        max_connections: file_database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };

    let raw_extension = env
        .packet_extension
        .clone()
        .or(file_staging.extension)
        .unwrap_or_else(|| DEFAULT_PACKET_EXTENSION.to_string());
    let extension = if raw_extension.starts_with('.') {
        raw_extension
    } else {
        let normalized = format!(".{raw_extension}");
        warnings.push(format!(
            "packet extension '{raw_extension}' has no leading dot; using '{normalized}'"
        ));
        normalized
    };

    let mut areas: BTreeMap<StagingArea, PathBuf> = file_staging
        .areas
        .into_iter()
        .map(|(name, dir)| (StagingArea::new(name), dir))
        .collect();
    if let Some(dir) = env.virus_scan_dir.clone() {
        areas.insert(StagingArea::virus_scan(), dir);
    }
    if let Some(dir) = env.virus_scan_retry_dir.clone() {
        areas.insert(StagingArea::virus_scan_retry(), dir);
    }
    let staging = StagingConfig {
        extension,
        scan_area: file_staging
            .scan_area
            .map(StagingArea::new)
            .unwrap_or_else(StagingArea::virus_scan),
        retry_area: file_staging
            .retry_area
            .map(StagingArea::new)
            .unwrap_or_else(StagingArea::virus_scan_retry),
        areas,
    };

    let scanner = ScannerConfig {
        host: env
            .clamd_host
            .clone()
            .or(file_scanner.host)
            .unwrap_or_else(|| DEFAULT_CLAMD_HOST.to_string()),
        port: env
            .clamd_port
            .or(file_scanner.port)
            .unwrap_or(DEFAULT_CLAMD_PORT),
        chunk_size: file_scanner.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
    };

    let durable = DurableConfig {
        root: env
            .durable_root
            .clone()
            .or(file_durable.root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DURABLE_ROOT)),
    };

    let dispatch = DispatchSettings {
        max_concurrency: env
            .max_concurrency
            .or(file_dispatch.max_concurrency)
            .unwrap_or(4),
        call_timeout: duration_setting(
            "call_timeout",
            env.call_timeout.clone().or(file_dispatch.call_timeout),
            DEFAULT_CALL_TIMEOUT,
        )?,
        actor: file_dispatch
            .actor
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
    };

    let schedule = ScheduleConfig {
        interval: duration_setting(
            "interval",
            env.schedule_interval.clone().or(file_schedule.interval),
            DEFAULT_SCHEDULE_INTERVAL,
        )?,
        fail_on_fetch_error: env
            .fail_on_fetch_error
            .or(file_schedule.fail_on_fetch_error)
            .unwrap_or(false),
    };

    let config = Config {
        database,
        staging,
        scanner,
        durable,
        dispatch,
        schedule,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn duration_setting(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim()).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            }
        }),
        None => Ok(default),
    }
}
