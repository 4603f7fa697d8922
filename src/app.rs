use crate::error::TagError;
use crate::fallback::FallbackSource;
use crate::pipeline;
use crate::tag_store::TagStore;
use crate::types::{AudioFile, ChangeEvent, CommandMode, MediaRecord, NormalizationOptions, Statistics};

use anyhow::{Context, Result};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/* =========================
   Outcomes + observer
   ========================= */

/// What one job produced for one file.
#[derive(Clone, Debug)]
pub struct JobReport {
    /// tags as read
    pub before: MediaRecord,
    /// normalized tags; None for read-only modes
    pub after: Option<MediaRecord>,
    pub events: Vec<ChangeEvent>,
    /// where the tags were written, if they were
    pub written_to: Option<PathBuf>,
}

#[derive(Debug)]
pub struct FileOutcome {
    /// 1-based dispatch index
    pub index: usize,
    pub file: AudioFile,
    pub result: std::result::Result<JobReport, TagError>,
}

/// Receives per-file outcomes and the final statistics. Always called from
/// the coordinator thread, never from a worker.
pub trait BatchObserver {
    fn on_start(&mut self, _mode: CommandMode, _total: usize) {}

    fn on_file(&mut self, outcome: &FileOutcome, total: usize);

    /// Called exactly once per run.
    fn on_finish(&mut self, stats: &Statistics);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BatchPhase {
    Idle,
    Dispatching,
    Draining,
    Reporting,
    Done,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchPhase::Idle => "idle",
            BatchPhase::Dispatching => "dispatching",
            BatchPhase::Draining => "draining",
            BatchPhase::Reporting => "reporting",
            BatchPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/* =========================
   Shared ledger
   ========================= */

#[derive(Debug, Default)]
struct Ledger {
    dispatch_index: usize,
    stats: Statistics,
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/* =========================
   Per-file job
   ========================= */

fn run_job<S: TagStore + ?Sized>(
    store: &S,
    file: &AudioFile,
    mode: CommandMode,
    options: &NormalizationOptions,
) -> std::result::Result<JobReport, TagError> {
    let mut before = store.read(&file.path)?;
    before.rel_path = file.rel_path.clone();

    if !mode.normalizes() {
        return Ok(JobReport {
            before,
            after: None,
            events: Vec::new(),
            written_to: None,
        });
    }

    let source = FallbackSource::from_path(&file.path);
    let normalized = pipeline::normalize(&before, options, &source);
    if normalized.is_unchanged() {
        debug!(file = %file.rel_path.display(), "tags already normalized");
    }

    let written_to = if mode.writes() {
        let dest = match &options.output_root {
            Some(root) => root.join(&file.rel_path),
            None => file.path.clone(),
        };
        if dest == file.path {
            store.write(&dest, &normalized.record)?;
        } else {
            store.write_to_copy(&file.path, &dest, &normalized.record)?;
        }
        Some(dest)
    } else {
        None
    };

    Ok(JobReport {
        before,
        after: Some(normalized.record),
        events: normalized.events,
        written_to,
    })
}

/* =========================
   Coordinator
   ========================= */

/// Runs one command mode over a list of files on a bounded worker pool.
/// Statistics are only mutated here, never inside a job.
pub struct BatchCoordinator<S: TagStore + 'static> {
    store: Arc<S>,
    mode: CommandMode,
    options: Arc<NormalizationOptions>,
    ledger: Arc<Mutex<Ledger>>,
    phase: BatchPhase,
}

impl<S: TagStore + 'static> BatchCoordinator<S> {
    pub fn new(store: Arc<S>, mode: CommandMode, options: NormalizationOptions) -> Self {
        Self {
            store,
            mode,
            options: Arc::new(options),
            ledger: Arc::new(Mutex::new(Ledger::default())),
            phase: BatchPhase::Idle,
        }
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    fn enter(&mut self, next: BatchPhase) {
        debug!(from = %self.phase, to = %next, "batch phase");
        self.phase = next;
    }

    /// Processes every file and blocks until all of them reported. The
    /// observer sees each outcome, then the statistics exactly once.
    pub fn run(
        &mut self,
        files: Vec<AudioFile>,
        observer: &mut dyn BatchObserver,
    ) -> Result<Statistics> {
        let total = files.len();
        let threads = self.options.threads.max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tag-worker-{i}"))
            .panic_handler(|payload| {
                error!(reason = panic_message(payload.as_ref()), "worker panicked");
            })
            .build()
            .context("rayon threadpool build failed")?;

        *lock(&self.ledger) = Ledger {
            dispatch_index: 0,
            stats: Statistics {
                total,
                ..Default::default()
            },
        };

        info!(mode = %self.mode, total, threads, "batch started");
        observer.on_start(self.mode, total);

        self.enter(BatchPhase::Dispatching);
        let (tx, rx) = mpsc::channel::<FileOutcome>();
        for file in files {
            let tx = tx.clone();
            let store = Arc::clone(&self.store);
            let ledger = Arc::clone(&self.ledger);
            let options = Arc::clone(&self.options);
            let mode = self.mode;

            pool.spawn(move || {
                let index = {
                    let mut l = lock(&ledger);
                    l.dispatch_index += 1;
                    l.dispatch_index
                };
                debug!(index, file = %file.rel_path.display(), "job started");

                let result = run_job(store.as_ref(), &file, mode, &options);
                // receiver only goes away once the coordinator stopped draining
                let _ = tx.send(FileOutcome {
                    index,
                    file,
                    result,
                });
            });
        }
        drop(tx);

        self.enter(BatchPhase::Draining);
        let mut received = 0usize;
        for outcome in rx {
            received += 1;
            self.fold(&outcome);
            observer.on_file(&outcome, total);
        }

        let missing = total.saturating_sub(received);
        if missing > 0 {
            warn!(missing, "jobs ended without reporting, counted as failed");
            lock(&self.ledger).stats.failed += missing;
        }

        self.enter(BatchPhase::Reporting);
        let stats = lock(&self.ledger).stats.clone();
        info!(
            total = stats.total,
            success = stats.success,
            failed = stats.failed,
            "batch finished"
        );
        observer.on_finish(&stats);

        self.enter(BatchPhase::Done);
        Ok(stats)
    }

    fn fold(&self, outcome: &FileOutcome) {
        let mut ledger = lock(&self.ledger);
        match &outcome.result {
            Ok(report) => {
                ledger.stats.success += 1;
                if self.mode.writes() {
                    ledger.stats.record_write(&report.events);
                }
            }
            Err(e) => {
                ledger.stats.failed += 1;
                error!(index = outcome.index, error = %e, "file failed");
            }
        }
    }
}
