use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "PACKET_SCANNER_CONFIG";

/// `clamd` host used when none is configured.
pub const DEFAULT_CLAMD_HOST: &str = "localhost";
/// Durable store root used when none is configured.
pub const DEFAULT_DURABLE_ROOT: &str = "./dfs";
/// Postgres pool size used when none is configured.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Per-call timeout used when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
/// Interval between cycles in `schedule` mode.
pub const DEFAULT_SCHEDULE_INTERVAL: Duration = Duration::from_secs(5 * 60);
