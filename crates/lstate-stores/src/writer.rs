// Copyright 2024 PRAGMA
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background persistence of ledger checkpoints.
//!
//! Jobs go through a bounded channel to a dedicated thread, which encodes each checkpoint, writes
//! it atomically and then sweeps older snapshots. Jobs are processed strictly in submission order.
//! Failures never reach the producer: they're logged and counted in the [`WriterReport`].
//!
//! Rollbacks go through the same queue, so snapshots of discarded checkpoints that are still
//! queued get written before the rollback removes them.

use crate::{
    fs::{self, RetentionPolicy},
    LedgerStateFile, StoreError,
};
use lstate_kernel::Point;
use lstate_ledger::{
    codec::{self, EncodeError},
    LedgerCheckpoint, LedgerState,
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

pub const EVENT_TARGET: &str = "lstate::stores::writer";

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

const THREAD_NAME: &str = "snapshot-writer";

/// What `submit` does when the queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueFullPolicy {
    /// Wait for the worker to free a slot.
    #[default]
    Block,
    /// Give up on the snapshot; a later one will take its place.
    Drop,
}

/// What happens to queued jobs when the writer shuts down. A job already being written always
/// completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShutdownPolicy {
    #[default]
    Drain,
    Abandon,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterConfig {
    pub queue_capacity: usize,
    pub on_full: QueueFullPolicy,
    pub on_shutdown: ShutdownPolicy,
    pub retention: RetentionPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            on_full: QueueFullPolicy::default(),
            on_shutdown: ShutdownPolicy::default(),
            retention: RetentionPolicy::default(),
        }
    }
}

pub struct SnapshotJob<S> {
    pub file: LedgerStateFile,
    pub checkpoint: Arc<LedgerCheckpoint<S>>,
}

enum Job<S> {
    Write(SnapshotJob<S>),
    Rollback(Point),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    Dropped,
    /// The writer is shutting down, or its worker is gone.
    Closed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub written: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub dropped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SnapshotWriter<S: LedgerState> {
    dir: PathBuf,
    on_full: QueueFullPolicy,
    on_shutdown: ShutdownPolicy,
    sender: Option<mpsc::Sender<Job<S>>>,
    idle: Option<Worker<S>>,
    running: Option<JoinHandle<WriterReport>>,
    abandon: Arc<AtomicBool>,
    dropped: AtomicUsize,
}

impl<S: LedgerState> SnapshotWriter<S> {
    /// Create a writer and start its worker thread.
    pub fn spawn(dir: &Path, config: WriterConfig) -> Result<Self, StoreError> {
        let mut writer = Self::unstarted(dir, config);
        writer.start()?;
        Ok(writer)
    }

    /// Create a writer whose jobs queue up until [`Self::start`] is called.
    pub fn unstarted(dir: &Path, config: WriterConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let abandon = Arc::new(AtomicBool::new(false));

        Self {
            dir: dir.to_path_buf(),
            on_full: config.on_full,
            on_shutdown: config.on_shutdown,
            sender: Some(sender),
            idle: Some(Worker {
                dir: dir.to_path_buf(),
                receiver,
                retention: config.retention,
                abandon: abandon.clone(),
            }),
            running: None,
            abandon,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Remove stale partial files, then run the worker on its own thread. The worker reports to
    /// the `tracing` dispatcher of the calling thread.
    pub fn start(&mut self) -> Result<(), StoreError> {
        let Some(worker) = self.idle.take() else {
            return Ok(());
        };

        if let Err(e) = fs::remove_partial_files(&self.dir) {
            self.idle = Some(worker);
            return Err(e);
        }

        let dispatch = tracing::dispatcher::get_default(|dispatch| dispatch.clone());

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || tracing::dispatcher::with_default(&dispatch, || worker.run()))
            .map_err(StoreError::io(&self.dir))?;

        self.running = Some(handle);

        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue a snapshot for writing.
    ///
    /// With [`QueueFullPolicy::Block`], this waits on the queue and panics when called from
    /// within an asynchronous runtime.
    pub fn submit(&self, job: SnapshotJob<S>) -> SubmitOutcome {
        match self.on_full {
            QueueFullPolicy::Block => self.send(Job::Write(job)),
            QueueFullPolicy::Drop => {
                let Some(sender) = &self.sender else {
                    return SubmitOutcome::Closed;
                };
                let slot = job.file.slot;
                match sender.try_send(Job::Write(job)) {
                    Ok(()) => SubmitOutcome::Queued,
                    Err(TrySendError::Full(_)) => {
                        warn!(target: EVENT_TARGET, %slot, "snapshot.queue_full");
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        SubmitOutcome::Dropped
                    }
                    Err(TrySendError::Closed(_)) => SubmitOutcome::Closed,
                }
            }
        }
    }

    /// Queue the removal of every snapshot that isn't on the chain ending at `point`. Runs after
    /// the jobs already queued, and is never dropped nor abandoned.
    pub fn rollback(&self, point: Point) -> SubmitOutcome {
        self.send(Job::Rollback(point))
    }

    fn send(&self, job: Job<S>) -> SubmitOutcome {
        let Some(sender) = &self.sender else {
            return SubmitOutcome::Closed;
        };
        match sender.blocking_send(job) {
            Ok(()) => SubmitOutcome::Queued,
            Err(_) => SubmitOutcome::Closed,
        }
    }

    /// Stop accepting jobs and wait for the worker to finish, writing or abandoning what's still
    /// queued according to `policy`. A writer that was never started processes its queue on the
    /// calling thread. Subsequent calls return an empty report.
    pub fn shutdown(&mut self, policy: ShutdownPolicy) -> WriterReport {
        if policy == ShutdownPolicy::Abandon {
            self.abandon.store(true, Ordering::SeqCst);
        }

        self.sender = None;

        let mut report = if let Some(handle) = self.running.take() {
            handle.join().unwrap_or_else(|_| {
                error!(target: EVENT_TARGET, "snapshot.worker_panicked");
                WriterReport::default()
            })
        } else if let Some(worker) = self.idle.take() {
            worker.run()
        } else {
            WriterReport::default()
        };

        report.dropped = self.dropped.swap(0, Ordering::Relaxed);

        info!(
            target: EVENT_TARGET,
            written = report.written,
            failed = report.failed,
            abandoned = report.abandoned,
            dropped = report.dropped,
            "snapshot.writer_stopped"
        );

        report
    }
}

impl<S: LedgerState> Drop for SnapshotWriter<S> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.shutdown(self.on_shutdown);
        }
    }
}

struct Worker<S> {
    dir: PathBuf,
    receiver: mpsc::Receiver<Job<S>>,
    retention: RetentionPolicy,
    abandon: Arc<AtomicBool>,
}

impl<S: LedgerState> Worker<S> {
    fn run(mut self) -> WriterReport {
        let mut report = WriterReport::default();

        while let Some(job) = self.receiver.blocking_recv() {
            let job = match job {
                Job::Write(job) => job,
                Job::Rollback(point) => {
                    self.rollback(&point, &mut report);
                    continue;
                }
            };

            if self.abandon.load(Ordering::SeqCst) {
                report.abandoned += 1;
                continue;
            }

            match self.write(&job) {
                Ok(removed) => {
                    info!(
                        target: EVENT_TARGET,
                        slot = %job.file.slot,
                        epoch_block_no = %job.checkpoint.epoch_block_no,
                        removed = removed.len(),
                        "snapshot.written"
                    );
                    report.written += 1;
                }
                Err(reason) => {
                    error!(
                        target: EVENT_TARGET,
                        slot = %job.file.slot,
                        %reason,
                        "snapshot.write_failed"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn rollback(&self, point: &Point, report: &mut WriterReport) {
        match fs::remove_after(&self.dir, point) {
            Ok(removed) => {
                info!(
                    target: EVENT_TARGET,
                    %point,
                    removed = removed.len(),
                    "snapshot.rolled_back"
                );
            }
            Err(reason) => {
                error!(target: EVENT_TARGET, %point, %reason, "snapshot.rollback_failed");
                report.failed += 1;
            }
        }
    }

    fn write(&self, job: &SnapshotJob<S>) -> Result<Vec<PathBuf>, SnapshotError> {
        let checkpoint = &job.checkpoint;
        let bytes = codec::encode(&checkpoint.state, checkpoint.epoch_block_no)?;
        fs::write_atomically(&job.file.path, &bytes)?;
        Ok(fs::sweep(&self.dir, &job.file, self.retention)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstate_kernel::{Epoch, EpochBlockNo};
    use lstate_ledger::testing::{checkpoint_at, checkpoint_with, fake_point, FakeState};
    use lstate_tracing_json::{collect, find_event};
    use tempfile::TempDir;

    fn job(dir: &Path, slot: u64) -> SnapshotJob<FakeState> {
        SnapshotJob {
            file: LedgerStateFile::new(dir, &fake_point(slot), None),
            checkpoint: checkpoint_at(slot),
        }
    }

    fn config() -> WriterConfig {
        WriterConfig {
            retention: RetentionPolicy {
                keep_regular: 10,
                keep_epoch_boundary: 10,
            },
            ..WriterConfig::default()
        }
    }

    fn on_disk(dir: &Path) -> Vec<u64> {
        fs::list_snapshots(dir)
            .unwrap()
            .into_iter()
            .map(|file| file.slot.as_u64())
            .collect()
    }

    #[test]
    fn writes_in_submission_order() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::spawn(dir.path(), config()).unwrap();

        for slot in [10, 20, 30] {
            assert_eq!(writer.submit(job(dir.path(), slot)), SubmitOutcome::Queued);
        }

        let report = writer.shutdown(ShutdownPolicy::Drain);

        assert_eq!(report.written, 3);
        assert_eq!(on_disk(dir.path()), vec![10, 20, 30]);
    }

    #[test]
    fn older_snapshot_removes_newer_ones() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::spawn(dir.path(), config()).unwrap();

        writer.submit(job(dir.path(), 30));
        writer.submit(job(dir.path(), 10));
        writer.shutdown(ShutdownPolicy::Drain);

        assert_eq!(on_disk(dir.path()), vec![10]);
    }

    #[test]
    fn written_snapshot_decodes_back() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::spawn(dir.path(), config()).unwrap();
        let file = LedgerStateFile::new(dir.path(), &fake_point(200), Some(Epoch::from(2)));

        writer.submit(SnapshotJob {
            file: file.clone(),
            checkpoint: checkpoint_with(200, EpochBlockNo::EpochBoundaryBlock),
        });
        writer.shutdown(ShutdownPolicy::Drain);

        let checkpoint = fs::load_snapshot::<FakeState>(&file).unwrap();
        assert_eq!(checkpoint.epoch_block_no, EpochBlockNo::EpochBoundaryBlock);
        assert_eq!(checkpoint.state, FakeState::at(200));
    }

    #[test]
    fn rollback_removes_snapshots_queued_before_it() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::unstarted(dir.path(), config());

        for slot in [10, 20, 30, 40] {
            writer.submit(job(dir.path(), slot));
        }
        assert_eq!(writer.rollback(fake_point(20)), SubmitOutcome::Queued);

        let (report, traces) = collect(|| writer.shutdown(ShutdownPolicy::Drain));

        assert_eq!(report.written, 4);
        assert_eq!(on_disk(dir.path()), vec![10, 20]);
        let rolled_back = find_event(&traces, "snapshot.rolled_back").unwrap();
        assert_eq!(rolled_back["removed"], 2);
    }

    #[test]
    fn rollback_survives_abandon() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::spawn(dir.path(), config()).unwrap();
        for slot in [10, 20, 30] {
            writer.submit(job(dir.path(), slot));
        }
        writer.shutdown(ShutdownPolicy::Drain);

        let mut writer = SnapshotWriter::unstarted(dir.path(), config());
        writer.submit(job(dir.path(), 40));
        writer.rollback(fake_point(10));

        let report = writer.shutdown(ShutdownPolicy::Abandon);

        assert_eq!(report.abandoned, 1);
        assert_eq!(on_disk(dir.path()), vec![10]);
    }

    #[tokio::test]
    async fn blocking_submissions_run_on_blocking_tasks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let report = tokio::task::spawn_blocking(move || {
            let mut writer = SnapshotWriter::spawn(&path, config()).unwrap();
            assert_eq!(writer.submit(job(&path, 10)), SubmitOutcome::Queued);
            assert_eq!(writer.rollback(fake_point(10)), SubmitOutcome::Queued);
            writer.shutdown(ShutdownPolicy::Drain)
        })
        .await
        .unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(on_disk(dir.path()), vec![10]);
    }

    #[test]
    fn drops_jobs_when_queue_is_full() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::unstarted(
            dir.path(),
            WriterConfig {
                queue_capacity: 1,
                on_full: QueueFullPolicy::Drop,
                ..config()
            },
        );

        assert_eq!(writer.submit(job(dir.path(), 10)), SubmitOutcome::Queued);
        assert_eq!(writer.submit(job(dir.path(), 20)), SubmitOutcome::Dropped);

        let report = writer.shutdown(ShutdownPolicy::Drain);

        assert_eq!(
            report,
            WriterReport {
                written: 1,
                failed: 0,
                abandoned: 0,
                dropped: 1,
            }
        );
        assert_eq!(on_disk(dir.path()), vec![10]);
    }

    #[test]
    fn abandons_queued_jobs() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::unstarted(dir.path(), config());

        for slot in [10, 20, 30] {
            writer.submit(job(dir.path(), slot));
        }

        let report = writer.shutdown(ShutdownPolicy::Abandon);

        assert_eq!(report.abandoned, 3);
        assert_eq!(report.written, 0);
        assert!(on_disk(dir.path()).is_empty());
    }

    #[test]
    fn closed_writer_rejects_jobs() {
        let dir = TempDir::new().unwrap();
        let mut writer = SnapshotWriter::<FakeState>::spawn(dir.path(), config()).unwrap();

        assert_eq!(writer.shutdown(ShutdownPolicy::Drain), WriterReport::default());
        assert_eq!(writer.submit(job(dir.path(), 10)), SubmitOutcome::Closed);
        assert_eq!(writer.shutdown(ShutdownPolicy::Drain), WriterReport::default());
    }

    #[test]
    fn failures_are_logged_and_counted() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let mut writer = SnapshotWriter::unstarted(&missing, config());

        writer.submit(job(&missing, 10));

        let (report, traces) = collect(|| writer.shutdown(ShutdownPolicy::Drain));

        assert_eq!(report.failed, 1);
        let failure = find_event(&traces, "snapshot.write_failed").unwrap();
        assert_eq!(failure["level"], "ERROR");
        assert_eq!(failure["slot"], "10");
    }

    #[test]
    fn start_removes_stale_partial_files() {
        let dir = TempDir::new().unwrap();
        let stale = job(dir.path(), 10).file.partial_path();
        std::fs::write(&stale, b"half").unwrap();

        let (_, traces) = collect(|| {
            let mut writer = SnapshotWriter::<FakeState>::spawn(dir.path(), config()).unwrap();
            writer.submit(job(dir.path(), 20));
            writer.shutdown(ShutdownPolicy::Drain)
        });

        assert!(!stale.exists());
        assert!(find_event(&traces, "partial.removed").is_some());
        assert!(find_event(&traces, "snapshot.written").is_some());
    }
}
