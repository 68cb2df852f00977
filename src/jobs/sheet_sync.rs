// ==================== SHEET SYNC WORKER ====================
// Fila em background que espelha capturas na planilha do usuário.
// Sem retry: falha fica registrada e o flag synced_to_sheets continua 0.

use crate::{
    database::Database,
    models::{PlantObservation, SyncStatus},
    services::{
        plant_service,
        sheets_service::{SheetRow, SheetSink},
    },
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

/// Upper bound for one append (header check + append) before it counts as failed.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30);

/// Finished states kept in memory; older ones fall back to the stored flag.
pub const DEFAULT_MAX_TRACKED: usize = 10_000;

/// One pending append: which observation, where to, and what.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub plant_id: i64,
    pub spreadsheet_id: String,
    pub row: SheetRow,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub job_timeout: Duration,
    pub max_tracked: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            job_timeout: DEFAULT_JOB_TIMEOUT,
            max_tracked: DEFAULT_MAX_TRACKED,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncCounters {
    pub enqueued: AtomicU64,
    pub synced: AtomicU64,
    pub failed: AtomicU64,
    pub not_configured: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub enqueued: u64,
    pub synced: u64,
    pub failed: u64,
    pub not_configured: u64,
}

/// In-memory sync states. `Pending` entries stay until the worker resolves them;
/// finished ones are evicted oldest-first past `capacity`.
struct StateRegistry {
    states: HashMap<i64, SyncStatus>,
    finished: VecDeque<i64>,
    capacity: usize,
}

impl StateRegistry {
    fn new(capacity: usize) -> Self {
        Self {
            states: HashMap::new(),
            finished: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, plant_id: i64) -> Option<SyncStatus> {
        self.states.get(&plant_id).copied()
    }

    fn set(&mut self, plant_id: i64, status: SyncStatus) {
        let previous = self.states.insert(plant_id, status);
        if status == SyncStatus::Pending {
            return;
        }

        // cada id entra uma vez na fila de despejo
        let already_finished = matches!(previous, Some(prev) if prev != SyncStatus::Pending);
        if !already_finished {
            self.finished.push_back(plant_id);
        }

        while self.finished.len() > self.capacity {
            if let Some(oldest) = self.finished.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.states.len()
    }
}

struct Shared {
    states: RwLock<StateRegistry>,
    counters: SyncCounters,
}

/// Handle to the sync worker. Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct SyncQueue {
    sender: mpsc::UnboundedSender<SyncJob>,
    shared: Arc<Shared>,
}

impl SyncQueue {
    /// Spawns the worker with default settings.
    pub fn start(db: Database, sink: Arc<dyn SheetSink>) -> Self {
        Self::start_with(db, sink, SyncSettings::default())
    }

    /// Spawns the worker task and returns the handle used by the request handlers.
    pub fn start_with(db: Database, sink: Arc<dyn SheetSink>, settings: SyncSettings) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SyncJob>();
        let shared = Arc::new(Shared {
            states: RwLock::new(StateRegistry::new(settings.max_tracked)),
            counters: SyncCounters::default(),
        });

        let worker_shared = shared.clone();
        tokio::spawn(async move {
            log::info!(
                "📤 Sheet sync worker started (timeout {}s)",
                settings.job_timeout.as_secs()
            );

            while let Some(job) = receiver.recv().await {
                let status = run_job(&db, sink.as_ref(), &job, settings.job_timeout).await;

                match status {
                    SyncStatus::Synced => worker_shared.counters.synced.fetch_add(1, Ordering::Relaxed),
                    _ => worker_shared.counters.failed.fetch_add(1, Ordering::Relaxed),
                };
                worker_shared.states.write().await.set(job.plant_id, status);
            }

            log::info!("📤 Sheet sync worker stopped");
        });

        Self { sender, shared }
    }

    /// Records that nothing will be attempted for this observation.
    pub async fn skip_not_configured(&self, plant_id: i64) -> SyncStatus {
        self.shared
            .counters
            .not_configured
            .fetch_add(1, Ordering::Relaxed);
        self.shared
            .states
            .write()
            .await
            .set(plant_id, SyncStatus::NotConfigured);
        SyncStatus::NotConfigured
    }

    /// Records a sync that could not even be scheduled.
    pub async fn mark_failed(&self, plant_id: i64) -> SyncStatus {
        self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
        self.shared
            .states
            .write()
            .await
            .set(plant_id, SyncStatus::Failed);
        SyncStatus::Failed
    }

    /// Queues a job and returns immediately with `Pending`.
    pub async fn enqueue(&self, job: SyncJob) -> SyncStatus {
        let plant_id = job.plant_id;
        self.shared
            .states
            .write()
            .await
            .set(plant_id, SyncStatus::Pending);

        if self.sender.send(job).is_err() {
            log::error!("❌ Sheet sync worker is gone; plant {} left unsynced", plant_id);
            return self.mark_failed(plant_id).await;
        }

        self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        SyncStatus::Pending
    }

    /// Current state; without an in-memory record, falls back to the stored flag.
    pub async fn status(&self, plant: &PlantObservation) -> SyncStatus {
        if let Some(status) = self.shared.states.read().await.get(plant.id) {
            return status;
        }
        if plant.synced_to_sheets {
            SyncStatus::Synced
        } else {
            SyncStatus::Unsynced
        }
    }

    /// Number of plant ids currently held in memory.
    pub async fn tracked(&self) -> usize {
        self.shared.states.read().await.len()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let c = &self.shared.counters;
        SyncSnapshot {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            synced: c.synced.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            not_configured: c.not_configured.load(Ordering::Relaxed),
        }
    }
}

async fn run_job(db: &Database, sink: &dyn SheetSink, job: &SyncJob, timeout: Duration) -> SyncStatus {
    match tokio::time::timeout(timeout, sink.append_row(&job.spreadsheet_id, &job.row)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::warn!("⚠️  Sheets sync failed for plant {}: {}", job.plant_id, e);
            return SyncStatus::Failed;
        }
        Err(_) => {
            log::warn!(
                "⏱️  Sheets sync timed out for plant {} after {}s",
                job.plant_id,
                timeout.as_secs()
            );
            return SyncStatus::Failed;
        }
    }

    // append confirmado; agora o flag
    match plant_service::mark_synced(db, job.plant_id).await {
        Ok(_) => {
            log::info!("✅ Plant {} synced to Google Sheets", job.plant_id);
            SyncStatus::Synced
        }
        Err(e) => {
            log::error!("❌ Row appended but failed to flag plant {}: {}", job.plant_id, e);
            SyncStatus::Failed
        }
    }
}
