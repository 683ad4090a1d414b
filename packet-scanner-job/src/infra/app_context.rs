use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use packet_scanner_config::Config;
use packet_scanner_core::{
    infrastructure::{
        ClamdScanner, FilesystemDurableStore, LocalStagingFileManager,
        PostgresStatusStore,
    },
    orchestration::{DispatchPorts, ScanDispatchOrchestrator},
};
use tracing::info;

/// Concrete adapters built from a loaded [`Config`].
#[derive(Clone)]
pub struct AppContext {
    config: Arc<Config>,
    status_store: Arc<PostgresStatusStore>,
    scanner: Arc<ClamdScanner>,
    staging: Arc<LocalStagingFileManager>,
    durable: Arc<FilesystemDurableStore>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    /// Connect to Postgres and build every adapter. No other collaborator is
    /// contacted here.
    pub async fn connect(config: Config) -> Result<Self> {
        let url = config
            .database
            .primary_url
            .as_deref()
            .context("no database URL configured")?;
        let status_store =
            PostgresStatusStore::connect(url, config.database.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
        info!(
            target: "scan::store",
            max_connections = config.database.max_connections,
            "connected to status store"
        );

        Ok(Self::from_parts(config, status_store))
    }

    /// Build the remaining adapters around an already connected store.
    pub fn from_parts(config: Config, status_store: PostgresStatusStore) -> Self {
        let staging = config.staging.areas.iter().fold(
            LocalStagingFileManager::new(),
            |manager, (area, dir)| manager.with_area(area.clone(), dir),
        );
        let scanner = ClamdScanner::new(&config.scanner.host, config.scanner.port)
            .with_chunk_size(config.scanner.chunk_size);
        let durable = FilesystemDurableStore::new(&config.durable.root);

        Self {
            config: Arc::new(config),
            status_store: Arc::new(status_store),
            scanner: Arc::new(scanner),
            staging: Arc::new(staging),
            durable: Arc::new(durable),
        }
    }

    /// Configuration the context was built from.
    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    /// Postgres status store.
    pub fn status_store(&self) -> &PostgresStatusStore {
        self.status_store.as_ref()
    }

    /// ClamAV client.
    pub fn scanner(&self) -> &ClamdScanner {
        self.scanner.as_ref()
    }

    /// Staging directories.
    pub fn staging(&self) -> &LocalStagingFileManager {
        self.staging.as_ref()
    }

    /// Orchestrator wired to this context's adapters.
    pub fn orchestrator(&self) -> ScanDispatchOrchestrator {
        let ports = DispatchPorts::new(
            self.status_store.clone(),
            self.scanner.clone(),
            self.staging.clone(),
            self.durable.clone(),
        );
        ScanDispatchOrchestrator::new(ports, self.config.dispatch_config())
    }
}
