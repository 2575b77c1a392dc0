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

use lstate_ledger::{
    apply::{ApplyOptions, DEFAULT_STAKE_SLICE_SIZE},
    policy::{
        SnapshotPolicy, DEFAULT_FOLLOWING_DISTANCE, DEFAULT_SNAPSHOT_EVERY_FOLLOWING,
        DEFAULT_SNAPSHOT_EVERY_LAGGING,
    },
    sequence::DEFAULT_ROLLBACK_WINDOW,
};
use lstate_stores::writer::WriterConfig;
use std::path::PathBuf;

/// Default path to the on-disk ledger snapshots.
pub const DEFAULT_LEDGER_DIR: &str = "./ledger.db";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub ledger_dir: PathBuf,
    /// Snapshot interval, in slots, while close to the network tip.
    pub snapshot_every_following: u64,
    /// Snapshot interval, in slots, while catching up.
    pub snapshot_every_lagging: u64,
    /// Maximum distance to the network tip, in slots, to be considered following.
    pub following_distance: u64,
    /// Number of checkpoints kept in memory; bounds the depth of rollbacks.
    pub rollback_window: usize,
    /// Terminate the process on internal inconsistencies, instead of reporting them.
    pub abort_on_panic: bool,
    pub track_deposits: bool,
    /// Wall-clock time of slot 0, in milliseconds since the UNIX epoch.
    pub system_start_ms: u64,
    pub stake_slice_size: usize,
    pub writer: WriterConfig,
}

impl LedgerConfig {
    pub fn new(ledger_dir: impl Into<PathBuf>) -> Self {
        Self {
            ledger_dir: ledger_dir.into(),
            ..Self::default()
        }
    }

    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        SnapshotPolicy {
            every_following: self.snapshot_every_following,
            every_lagging: self.snapshot_every_lagging,
            following_distance: self.following_distance,
        }
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            system_start_ms: self.system_start_ms,
            track_deposits: self.track_deposits,
            stake_slice_size: self.stake_slice_size,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_dir: PathBuf::from(DEFAULT_LEDGER_DIR),
            snapshot_every_following: DEFAULT_SNAPSHOT_EVERY_FOLLOWING,
            snapshot_every_lagging: DEFAULT_SNAPSHOT_EVERY_LAGGING,
            following_distance: DEFAULT_FOLLOWING_DISTANCE,
            rollback_window: DEFAULT_ROLLBACK_WINDOW,
            abort_on_panic: true,
            track_deposits: true,
            system_start_ms: 0,
            stake_slice_size: DEFAULT_STAKE_SLICE_SIZE,
            writer: WriterConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_agree_with_components() {
        let config = LedgerConfig::new("/tmp/ledger");
        assert_eq!(config.ledger_dir, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.snapshot_policy(), SnapshotPolicy::default());
        assert_eq!(config.apply_options(), ApplyOptions::default());
        assert_eq!(config.rollback_window, 2160);
        assert_eq!(config.writer.queue_capacity, 5);
        assert!(config.abort_on_panic);
    }
}
