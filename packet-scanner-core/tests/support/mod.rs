#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use packet_scanner_core::{
    PacketError, Result,
    domain::{PacketId, PacketStatusRecord, PendingPacket, StagingArea},
    infrastructure::{
        FilesystemDurableStore, InMemoryStatusStore, LocalStagingFileManager,
    },
    orchestration::{DispatchConfig, DispatchPorts, ScanDispatchOrchestrator},
    ports::{DurableStore, ScanVerdict, StagingFileManager, VirusScanner},
};
use tempfile::TempDir;

pub const EXTENSION: &str = ".zip";

#[derive(Clone, Debug)]
pub enum Script {
    Clean,
    Infected,
    Fail,
    Hang(Duration),
}

/// Scanner answering from a per-packet script keyed by file stem.
#[derive(Default)]
pub struct ScriptedScanner {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedScanner {
    pub fn set(&self, id: &PacketId, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.as_str().to_string(), script);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VirusScanner for ScriptedScanner {
    async fn scan_file(&self, path: &Path) -> Result<ScanVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&stem)
            .cloned()
            .unwrap_or(Script::Clean);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match script {
            Script::Clean => Ok(ScanVerdict::Clean),
            Script::Infected => Ok(ScanVerdict::Infected {
                signature: Some("Eicar-Test-Signature".into()),
            }),
            Script::Fail => Err(PacketError::ScanFailure(format!(
                "engine could not read {}",
                path.display()
            ))),
            Script::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(ScanVerdict::Clean)
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Filesystem durable store that counts writes and can refuse the next N.
pub struct RecordingDurableStore {
    inner: FilesystemDurableStore,
    writes: Mutex<Vec<PacketId>>,
    failures_remaining: AtomicUsize,
}

impl RecordingDurableStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FilesystemDurableStore::new(root),
            writes: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn writes_for(&self, id: &PacketId) -> usize {
        self.writes.lock().unwrap().iter().filter(|w| *w == id).count()
    }

    pub fn total_writes(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn object_path(&self, id: &PacketId) -> PathBuf {
        self.inner.object_path(id)
    }
}

#[async_trait]
impl DurableStore for RecordingDurableStore {
    async fn store_packet(&self, id: &PacketId, file: &Path) -> Result<()> {
        let refused = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(PacketError::ConnectionUnavailable(
                "object store refused connection".into(),
            ));
        }
        self.inner.store_packet(id, file).await?;
        self.writes.lock().unwrap().push(id.clone());
        Ok(())
    }
}

/// Local staging with switchable copy and cleanup failures.
pub struct FlakyStaging {
    inner: LocalStagingFileManager,
    fail_copy: AtomicBool,
    fail_cleanup: AtomicBool,
    copies: AtomicUsize,
    cleanups: AtomicUsize,
}

impl FlakyStaging {
    pub fn new(inner: LocalStagingFileManager) -> Self {
        Self {
            inner,
            fail_copy: AtomicBool::new(false),
            fail_cleanup: AtomicBool::new(false),
            copies: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        }
    }

    pub fn set_copy_failure(&self, fail: bool) {
        self.fail_copy.store(fail, Ordering::SeqCst);
    }

    pub fn set_cleanup_failure(&self, fail: bool) {
        self.fail_cleanup.store(fail, Ordering::SeqCst);
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StagingFileManager for FlakyStaging {
    fn packet_path(
        &self,
        area: &StagingArea,
        packet: &PendingPacket,
    ) -> Result<PathBuf> {
        self.inner.packet_path(area, packet)
    }

    async fn copy(
        &self,
        packet: &PendingPacket,
        from: &StagingArea,
        to: &StagingArea,
    ) -> Result<()> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(PacketError::IoFailure("retry share offline".into()));
        }
        self.inner.copy(packet, from, to).await
    }

    async fn cleanup(
        &self,
        from: &StagingArea,
        to: &StagingArea,
        packet: &PendingPacket,
    ) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        if self.fail_cleanup.load(Ordering::SeqCst) {
            return Err(PacketError::RetryAreaUnavailable(
                "retry folder not accessible".into(),
            ));
        }
        self.inner.cleanup(from, to, packet).await
    }
}

/// Temp directories, fakes, and an in-memory status store wired together.
pub struct Harness {
    _root: TempDir,
    pub scan_dir: PathBuf,
    pub retry_dir: PathBuf,
    pub store: Arc<InMemoryStatusStore>,
    pub scanner: Arc<ScriptedScanner>,
    pub staging: Arc<FlakyStaging>,
    pub durable: Arc<RecordingDurableStore>,
}

impl Harness {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let scan_dir = root.path().join("virus-scan");
        let retry_dir = root.path().join("virus-scan-retry");
        std::fs::create_dir_all(&scan_dir).expect("scan dir");
        std::fs::create_dir_all(&retry_dir).expect("retry dir");

        let staging = LocalStagingFileManager::new()
            .with_area(StagingArea::virus_scan(), &scan_dir)
            .with_area(StagingArea::virus_scan_retry(), &retry_dir);
        let durable = RecordingDurableStore::new(&root.path().join("dfs"));

        Self {
            scan_dir,
            retry_dir,
            store: Arc::new(InMemoryStatusStore::new()),
            scanner: Arc::new(ScriptedScanner::default()),
            staging: Arc::new(FlakyStaging::new(staging)),
            durable: Arc::new(durable),
            _root: root,
        }
    }

    /// Write a packet file into the scan area and register it as awaiting scan.
    pub async fn stage(&self, id: &str) -> PacketId {
        self.stage_record(id, None).await
    }

    pub async fn stage_record(
        &self,
        id: &str,
        retry_count: Option<u32>,
    ) -> PacketId {
        let id = PacketId::new(id).expect("packet id");
        std::fs::write(
            self.scan_path(&id),
            format!("packet payload for {id}"),
        )
        .expect("write packet");
        let record = PacketStatusRecord {
            retry_count,
            ..PacketStatusRecord::awaiting_scan(id.clone(), "REGISTRATION_CLIENT")
        };
        self.store.insert(record).await;
        id
    }

    pub fn scan_path(&self, id: &PacketId) -> PathBuf {
        self.scan_dir.join(format!("{id}{EXTENSION}"))
    }

    pub fn retry_path(&self, id: &PacketId) -> PathBuf {
        self.retry_dir.join(format!("{id}{EXTENSION}"))
    }

    pub fn config(&self) -> DispatchConfig {
        DispatchConfig {
            packet_extension: EXTENSION.to_string(),
            call_timeout_ms: 2_000,
            ..DispatchConfig::default()
        }
    }

    pub fn orchestrator(&self) -> ScanDispatchOrchestrator {
        self.orchestrator_with(self.config())
    }

    pub fn orchestrator_with(
        &self,
        config: DispatchConfig,
    ) -> ScanDispatchOrchestrator {
        let ports = DispatchPorts::new(
            self.store.clone(),
            self.scanner.clone(),
            self.staging.clone(),
            self.durable.clone(),
        );
        ScanDispatchOrchestrator::new(ports, config)
    }

    pub async fn record(&self, id: &PacketId) -> PacketStatusRecord {
        use packet_scanner_core::ports::StatusStore;
        self.store
            .find(id)
            .await
            .expect("find")
            .expect("record present")
    }
}
