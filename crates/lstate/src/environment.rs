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

//! The ledger environment owns everything the indexer needs to apply blocks: the rollback window
//! of checkpoints, a cached chain interpreter and the background snapshot writer.

use crate::LedgerConfig;
use lstate_kernel::{Epoch, EpochBlockNo, EraHistory, EraHistoryError, Point, Slot};
use lstate_ledger::{
    apply::{self, Applied, ApplyError, ApplyResult},
    policy::SnapshotDecision,
    sequence::{CheckpointSequence, SequenceError},
    LedgerCheckpoint, LedgerRules, LedgerState,
};
use lstate_stores::{
    fs,
    writer::{SnapshotJob, SnapshotWriter, SubmitOutcome, WriterReport},
    LedgerStateFile, SnapshotPoint, StoreError,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, Level};

pub const EVENT_TARGET: &str = "lstate::environment";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("the ledger environment holds no state yet")]
    NotInitialised,
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("ledger rules rejected the block: {0}")]
    Transition(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to interpret slot: {0}")]
    Interpreter(#[from] EraHistoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<E: std::error::Error + Send + Sync + 'static> From<ApplyError<E>> for LedgerError {
    fn from(e: ApplyError<E>) -> Self {
        match e {
            ApplyError::Transition(e) => LedgerError::Transition(Box::new(e)),
            ApplyError::Interpreter(e) => LedgerError::Interpreter(e),
        }
    }
}

pub struct LedgerEnvironment<R: LedgerRules> {
    config: LedgerConfig,
    rules: R,
    interpreter: RwLock<Option<Arc<EraHistory>>>,
    current: Mutex<Option<CheckpointSequence<R::State>>>,
    writer: SnapshotWriter<R::State>,
}

impl<R: LedgerRules> LedgerEnvironment<R> {
    /// Prepare the ledger directory and start the snapshot writer. The environment holds no state
    /// until [`Self::initialise`] is called.
    pub fn new(config: LedgerConfig, rules: R) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(&config.ledger_dir).map_err(|source| StoreError::Io {
            path: config.ledger_dir.clone(),
            source,
        })?;

        let writer = SnapshotWriter::spawn(&config.ledger_dir, config.writer)?;

        Ok(Self {
            config,
            rules,
            interpreter: RwLock::new(None),
            current: Mutex::new(None),
            writer,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Seed the environment from the most recent usable snapshot at or below `target`, or from
    /// the genesis state when there's none.
    pub fn initialise(&self, target: Option<Slot>) -> Result<SnapshotPoint, LedgerError> {
        if let Some(file) = self.restore(target)? {
            return Ok(SnapshotPoint::OnDisk(file));
        }

        let genesis = Arc::new(LedgerCheckpoint::new(
            self.rules.genesis(),
            EpochBlockNo::Genesis,
        ));

        info!(target: EVENT_TARGET, tip = %genesis.tip(), "ledger.initialised_from_genesis");

        self.persist(&genesis, Some(Epoch::from(0)));

        *self.current.lock() = Some(CheckpointSequence::anchored_at(genesis));
        *self.interpreter.write() = None;

        Ok(SnapshotPoint::InMemory(Point::Origin))
    }

    /// Replace the current state with the most recent usable snapshot at or below `target`.
    /// Leaves the current state untouched when there's no such snapshot.
    pub fn restore(&self, target: Option<Slot>) -> Result<Option<LedgerStateFile>, LedgerError> {
        let Some((file, checkpoint)) =
            fs::restore_latest::<R::State>(&self.config.ledger_dir, target)?
        else {
            return Ok(None);
        };

        info!(
            target: EVENT_TARGET,
            tip = %checkpoint.tip(),
            epoch_block_no = %checkpoint.epoch_block_no,
            "ledger.restored"
        );

        *self.current.lock() = Some(CheckpointSequence::anchored_at(Arc::new(checkpoint)));
        *self.interpreter.write() = None;

        Ok(Some(file))
    }

    /// Apply a block on top of the current tip, and queue the new checkpoint for persistence when
    /// the snapshot policy asks for it. `network_tip` tells whether the indexer is following the
    /// chain or catching up.
    ///
    /// Queueing a snapshot may wait on the writer, so this must run on a plain thread (or a
    /// blocking task) rather than within an asynchronous runtime.
    #[instrument(level = Level::TRACE, skip_all, name = "ledger.apply_block")]
    pub fn apply_block(
        &self,
        block: &R::Block,
        network_tip: &Point,
    ) -> Result<ApplyResult<R::State>, LedgerError> {
        let mut current = self.current.lock();
        let sequence = current.as_mut().ok_or(LedgerError::NotInitialised)?;
        let previous = sequence.tip().cloned().ok_or(LedgerError::NotInitialised)?;

        let era_history = self.interpreter_for(&previous.state);

        let Applied { checkpoint, result } = apply::apply_block(
            &self.rules,
            &previous,
            block,
            &era_history,
            &self.config.apply_options(),
        )?;

        if let Err(violation) = sequence.push(checkpoint.clone()) {
            return Err(self.invariant_violation(violation));
        }

        sequence.retain_last(self.config.rollback_window);

        if result.new_epoch.is_some() {
            *self.interpreter.write() = None;
        }

        let decision = self.config.snapshot_policy().decide(&*checkpoint, network_tip);
        match decision {
            SnapshotDecision::Skip => {}
            SnapshotDecision::Interval => self.persist(&checkpoint, None),
            SnapshotDecision::EpochBoundary => {
                self.persist(&checkpoint, Some(result.slot_details.epoch))
            }
        }

        Ok(result)
    }

    /// Discard every checkpoint after `point`, which must be within the retained window. Snapshots
    /// past `point` are removed from disk once the writer gets to it, after any snapshot still
    /// queued. The same threading constraint as [`Self::apply_block`] applies.
    #[instrument(level = Level::TRACE, skip_all, name = "ledger.rollback", fields(point = %point))]
    pub fn rollback(&self, point: &Point) -> Result<(), LedgerError> {
        let mut current = self.current.lock();
        let sequence = current.as_mut().ok_or(LedgerError::NotInitialised)?;

        sequence.rollback_to(point)?;

        *self.interpreter.write() = None;

        if self.writer.rollback(*point) == SubmitOutcome::Closed {
            error!(target: EVENT_TARGET, %point, "snapshot.writer_closed");
        }

        info!(target: EVENT_TARGET, %point, retained = sequence.len(), "ledger.rolled_back");

        Ok(())
    }

    pub fn tip(&self) -> Option<Point> {
        self.current
            .lock()
            .as_ref()
            .and_then(|sequence| sequence.tip().map(|tip| *tip.tip()))
    }

    /// Run `f` with a consistent view of the current checkpoints.
    pub fn with_sequence<T>(
        &self,
        f: impl FnOnce(&CheckpointSequence<R::State>) -> T,
    ) -> Result<T, LedgerError> {
        let current = self.current.lock();
        let sequence = current.as_ref().ok_or(LedgerError::NotInitialised)?;
        Ok(f(sequence))
    }

    /// The chain interpreter of the current tip.
    pub fn interpreter(&self) -> Result<Arc<EraHistory>, LedgerError> {
        let current = self.current.lock();
        let tip = current
            .as_ref()
            .and_then(|sequence| sequence.tip())
            .ok_or(LedgerError::NotInitialised)?;
        Ok(self.interpreter_for(&tip.state))
    }

    fn interpreter_for(&self, state: &R::State) -> Arc<EraHistory> {
        if let Some(era_history) = self.interpreter.read().as_ref() {
            return era_history.clone();
        }

        let era_history = Arc::new(state.era_history());
        *self.interpreter.write() = Some(era_history.clone());
        era_history
    }

    /// Where to recover the state at `point` from: memory when it's still retained, otherwise the
    /// most recent snapshot on disk at or before it.
    pub fn find_snapshot_point(&self, point: &Point) -> Result<Option<SnapshotPoint>, LedgerError> {
        let in_memory = self
            .current
            .lock()
            .as_ref()
            .is_some_and(|sequence| sequence.contains(point));

        if in_memory {
            return Ok(Some(SnapshotPoint::InMemory(*point)));
        }

        let target = point.slot_or_default();

        Ok(fs::list_snapshots(&self.config.ledger_dir)?
            .into_iter()
            .rev()
            .find(|file| file.slot <= target)
            .map(SnapshotPoint::OnDisk))
    }

    /// Stop the snapshot writer, according to the configured shutdown policy.
    pub fn shutdown(mut self) -> WriterReport {
        self.writer.shutdown(self.config.writer.on_shutdown)
    }

    fn persist(&self, checkpoint: &Arc<LedgerCheckpoint<R::State>>, epoch: Option<Epoch>) {
        let file = LedgerStateFile::new(&self.config.ledger_dir, checkpoint.tip(), epoch);
        let slot = file.slot;

        match self.writer.submit(SnapshotJob {
            file,
            checkpoint: checkpoint.clone(),
        }) {
            SubmitOutcome::Queued => {
                debug!(target: EVENT_TARGET, %slot, ?epoch, "snapshot.queued");
            }
            SubmitOutcome::Dropped => {}
            SubmitOutcome::Closed => {
                error!(target: EVENT_TARGET, %slot, "snapshot.writer_closed");
            }
        }
    }

    #[expect(clippy::panic)]
    fn invariant_violation(&self, violation: SequenceError) -> LedgerError {
        error!(
            target: EVENT_TARGET,
            %violation,
            abort = self.config.abort_on_panic,
            "ledger.invariant_violation"
        );

        if self.config.abort_on_panic {
            panic!("ledger invariant violated: {violation}");
        }

        LedgerError::Sequence(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstate_ledger::testing::{fake_point, FakeBlock, FakeError, FakeRules};
    use lstate_stores::writer::ShutdownPolicy;
    use tempfile::TempDir;

    fn environment(dir: &TempDir) -> LedgerEnvironment<FakeRules> {
        LedgerEnvironment::new(LedgerConfig::new(dir.path()), FakeRules).unwrap()
    }

    #[test]
    fn uninitialised_environment_rejects_blocks() {
        let dir = TempDir::new().unwrap();
        let env = environment(&dir);

        assert!(matches!(
            env.apply_block(&FakeBlock::at(1), &fake_point(1)),
            Err(LedgerError::NotInitialised)
        ));
        assert!(matches!(
            env.rollback(&Point::Origin),
            Err(LedgerError::NotInitialised)
        ));
        assert_eq!(env.tip(), None);
    }

    #[test]
    fn transition_errors_are_propagated() {
        let dir = TempDir::new().unwrap();
        let env = environment(&dir);
        env.initialise(None).unwrap();

        let error = env
            .apply_block(&FakeBlock::at(1).invalid(), &fake_point(1))
            .unwrap_err();

        match error {
            LedgerError::Transition(e) => assert_eq!(
                e.downcast_ref::<FakeError>(),
                Some(&FakeError::InvalidBlock(Slot::from(1)))
            ),
            e => panic!("unexpected error: {e}"),
        }
        assert_eq!(env.tip(), Some(Point::Origin));
    }

    #[test]
    fn interpreter_is_cached_until_epoch_changes() {
        let dir = TempDir::new().unwrap();
        let env = environment(&dir);
        env.initialise(None).unwrap();

        let before = env.interpreter().unwrap();
        assert!(Arc::ptr_eq(&before, &env.interpreter().unwrap()));

        env.apply_block(&FakeBlock::at(1), &fake_point(1)).unwrap();
        let after = env.interpreter().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));

        env.apply_block(&FakeBlock::at(2), &fake_point(2)).unwrap();
        assert!(Arc::ptr_eq(&after, &env.interpreter().unwrap()));

        assert_eq!(env.shutdown().failed, 0);
    }

    #[test]
    fn snapshot_points_prefer_memory() {
        let dir = TempDir::new().unwrap();
        let env = environment(&dir);
        env.initialise(None).unwrap();
        env.apply_block(&FakeBlock::at(5), &fake_point(5)).unwrap();

        assert_eq!(
            env.find_snapshot_point(&fake_point(5)).unwrap(),
            Some(SnapshotPoint::InMemory(fake_point(5)))
        );

        let mut env = env;
        env.writer.shutdown(ShutdownPolicy::Drain);

        match env.find_snapshot_point(&fake_point(7)).unwrap() {
            Some(SnapshotPoint::OnDisk(file)) => assert_eq!(file.point(), fake_point(5)),
            other => panic!("unexpected snapshot point: {other:?}"),
        }
    }
}
