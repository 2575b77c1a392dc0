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

use crate::{Bound, Epoch, EraHistory, EraParams, Slot, Summary};
use proptest::prelude::*;

#[allow(clippy::unwrap_used)]
fn params(epoch_size_slots: u64, slot_length: u64) -> EraParams {
    EraParams::new(epoch_size_slots, slot_length).unwrap()
}

/// One single era of 86400-slot epochs, opened at genesis.
pub fn one_era() -> EraHistory {
    EraHistory::single_era(params(86400, 1000))
}

/// A first era of one 86400-slot epoch, followed by a closed era of 7200-slot epochs lasting
/// until the beginning of epoch 3.
pub fn two_eras() -> EraHistory {
    EraHistory {
        eras: vec![
            Summary {
                start: Bound::genesis(),
                end: Some(Bound {
                    time_ms: 86400000,
                    slot: Slot(86400),
                    epoch: Epoch(1),
                }),
                params: params(86400, 1000),
            },
            Summary {
                start: Bound {
                    time_ms: 86400000,
                    slot: Slot(86400),
                    epoch: Epoch(1),
                },
                end: Some(Bound {
                    time_ms: 86400000 + 2 * 7200 * 1000,
                    slot: Slot(86400 + 2 * 7200),
                    epoch: Epoch(3),
                }),
                params: params(7200, 1000),
            },
        ],
    }
}

pub fn any_slot() -> impl Strategy<Value = Slot> {
    any::<u64>().prop_map(Slot)
}

pub fn any_epoch() -> impl Strategy<Value = Epoch> {
    any::<u64>().prop_map(Epoch)
}

prop_compose! {
    fn any_era_params()(epoch_size_slots in 1u64..65535, slot_length in 1u64..65535) -> EraParams {
        params(epoch_size_slots, slot_length)
    }
}

prop_compose! {
    /// A well-formed history with successive eras; the last one is left open.
    pub fn any_era_history()(
        eras in prop::collection::vec((any_era_params(), 1u64..32), 1..8),
    ) -> EraHistory {
        let mut start = Bound::genesis();
        let mut summaries = Vec::with_capacity(eras.len());
        let last = eras.len() - 1;

        for (ix, (params, epochs)) in eras.into_iter().enumerate() {
            let slots = epochs * params.epoch_size_slots;
            let end = Bound {
                time_ms: start.time_ms + slots * params.slot_length,
                slot: Slot(start.slot.0 + slots),
                epoch: Epoch(start.epoch.0 + epochs),
            };

            summaries.push(Summary {
                start: start.clone(),
                end: if ix == last { None } else { Some(end.clone()) },
                params,
            });

            start = end;
        }

        EraHistory { eras: summaries }
    }
}
