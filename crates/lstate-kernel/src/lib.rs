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

//! Primitive types shared by the ledger checkpoint store: chain points, hashes, per-epoch block
//! heights, and the governance/deposit values surfaced to indexers after each block.

pub use minicbor as cbor;
pub use slot_arithmetic::{Epoch, EraHistory, EraHistoryError, Slot};

mod hash;
pub use hash::*;

mod point;
pub use point::*;

mod epoch_block_no;
pub use epoch_block_no::*;

mod rational_number;
pub use rational_number::*;

mod credential;
pub use credential::*;

mod committee;
pub use committee::*;

mod protocol_parameters;
pub use protocol_parameters::*;

mod deposits_map;
pub use deposits_map::*;

mod stake_distribution;
pub use stake_distribution::*;

mod events;
pub use events::*;

/// Amount of the native asset, in its smallest unit.
pub type Lovelace = u64;

#[cfg(any(test, feature = "test-utils"))]
pub mod tests {
    pub use crate::{
        committee::tests::*, credential::tests::*, epoch_block_no::tests::*, hash::tests::*,
        point::tests::*, rational_number::tests::*,
    };
}
