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

use crate::LedgerState;
use lstate_kernel::{EpochBlockNo, Point, Slot};

/// A ledger state paired with the height of its last block within the epoch.
///
/// Checkpoints are never modified once built; they're shared behind an `Arc` between the
/// checkpoint sequence and the snapshot writer.
#[derive(Debug, PartialEq, Eq)]
pub struct LedgerCheckpoint<S> {
    pub state: S,
    pub epoch_block_no: EpochBlockNo,
    tip: Point,
}

impl<S: LedgerState> LedgerCheckpoint<S> {
    pub fn new(state: S, epoch_block_no: EpochBlockNo) -> Self {
        let tip = state.tip();
        Self {
            state,
            epoch_block_no,
            tip,
        }
    }
}

impl<S> LedgerCheckpoint<S> {
    pub fn tip(&self) -> &Point {
        &self.tip
    }

    /// The key of this checkpoint in a sequence; `None` for a state at the origin.
    pub fn slot(&self) -> Option<Slot> {
        self.tip.slot()
    }
}
