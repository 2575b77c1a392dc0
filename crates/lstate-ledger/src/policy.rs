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

use crate::LedgerCheckpoint;
use lstate_kernel::{EpochBlockNo, Point, Slot};

pub const DEFAULT_SNAPSHOT_EVERY_FOLLOWING: u64 = 500;
pub const DEFAULT_SNAPSHOT_EVERY_LAGGING: u64 = 10_000;
pub const DEFAULT_FOLLOWING_DISTANCE: u64 = 600;

/// Whether the indexer keeps up with the network, or is catching up from far behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Following,
    Lagging,
}

impl SyncState {
    /// Following when `slot` is at most `following_distance` slots behind the network tip.
    pub fn from_distance(slot: Slot, network_tip: Slot, following_distance: u64) -> Self {
        if slot.distance_to(network_tip) <= following_distance {
            SyncState::Following
        } else {
            SyncState::Lagging
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotDecision {
    Skip,
    /// The slot falls on the snapshot interval.
    Interval,
    /// The checkpoint starts an epoch; it's written regardless of intervals.
    EpochBoundary,
}

impl SnapshotDecision {
    pub fn should_write(&self) -> bool {
        match self {
            SnapshotDecision::Skip => false,
            SnapshotDecision::Interval | SnapshotDecision::EpochBoundary => true,
        }
    }
}

/// Decide whether a freshly applied checkpoint goes to disk. An interval of `0` disables interval
/// snapshots; epoch boundaries are always written.
pub fn should_snapshot<S>(
    checkpoint: &LedgerCheckpoint<S>,
    sync_state: SyncState,
    every_following: u64,
    every_lagging: u64,
) -> SnapshotDecision {
    decide(
        checkpoint.tip().slot_or_default(),
        checkpoint.epoch_block_no,
        sync_state,
        every_following,
        every_lagging,
    )
}

fn decide(
    slot: Slot,
    epoch_block_no: EpochBlockNo,
    sync_state: SyncState,
    every_following: u64,
    every_lagging: u64,
) -> SnapshotDecision {
    if epoch_block_no.is_epoch_boundary() {
        return SnapshotDecision::EpochBoundary;
    }

    let interval = match sync_state {
        SyncState::Following => every_following,
        SyncState::Lagging => every_lagging,
    };

    if interval > 0 && slot.as_u64() % interval == 0 {
        SnapshotDecision::Interval
    } else {
        SnapshotDecision::Skip
    }
}

/// The two-speed snapshot policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub every_following: u64,
    pub every_lagging: u64,
    pub following_distance: u64,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            every_following: DEFAULT_SNAPSHOT_EVERY_FOLLOWING,
            every_lagging: DEFAULT_SNAPSHOT_EVERY_LAGGING,
            following_distance: DEFAULT_FOLLOWING_DISTANCE,
        }
    }
}

impl SnapshotPolicy {
    pub fn sync_state(&self, slot: Slot, network_tip: &Point) -> SyncState {
        SyncState::from_distance(
            slot,
            network_tip.slot_or_default(),
            self.following_distance,
        )
    }

    pub fn decide<S>(
        &self,
        checkpoint: &LedgerCheckpoint<S>,
        network_tip: &Point,
    ) -> SnapshotDecision {
        should_snapshot(
            checkpoint,
            self.sync_state(checkpoint.tip().slot_or_default(), network_tip),
            self.every_following,
            self.every_lagging,
        )
    }
}
