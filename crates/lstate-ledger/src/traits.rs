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

use lstate_kernel::{
    cbor, AdaPots, Committee, Deposits, DepositsMap, EpochInterval, EraHistory, LedgerEvent,
    Point, PoolId, Prices, StakeDistribution,
};
use std::collections::BTreeSet;

/// A full ledger state, as produced by the ledger rules.
///
/// The store never looks inside a state beyond the accessors below. Its CBOR encoding is the
/// payload of on-disk snapshots, so it must be stable across restarts.
///
/// Accessors other than `tip` and `era_history` default to "nothing to report", for ledgers that
/// don't track the corresponding values.
pub trait LedgerState:
    Send + Sync + 'static + cbor::Encode<()> + for<'d> cbor::Decode<'d, ()>
{
    /// The point of the last block applied to this state; `Point::Origin` for the genesis state.
    fn tip(&self) -> Point;

    /// The era history known to this state, used to turn slots into epochs and time.
    fn era_history(&self) -> EraHistory;

    fn prices(&self) -> Option<Prices> {
        None
    }

    fn gov_action_lifetime(&self) -> Option<EpochInterval> {
        None
    }

    fn registered_pools(&self) -> BTreeSet<PoolId> {
        BTreeSet::new()
    }

    fn deposits(&self) -> Option<Deposits> {
        None
    }

    fn committee(&self) -> Option<Committee> {
        None
    }

    fn deposits_map(&self) -> DepositsMap {
        DepositsMap::empty()
    }

    fn ada_pots(&self) -> Option<AdaPots> {
        None
    }

    fn stake_distribution(&self) -> Option<&StakeDistribution> {
        None
    }
}

/// The outcome of applying one block: the new state, and what happened along the way.
#[derive(Debug)]
pub struct Transition<S> {
    pub state: S,
    pub events: Vec<LedgerEvent>,
}

/// The ledger rules, i.e. what turns a state and a block into a new state.
pub trait LedgerRules: Send + Sync + 'static {
    type State: LedgerState;
    type Block;
    type Error: std::error::Error + Send + Sync + 'static;

    /// The state derived from the genesis configuration, before any block.
    fn genesis(&self) -> Self::State;

    fn apply_block(
        &self,
        state: &Self::State,
        block: &Self::Block,
    ) -> Result<Transition<Self::State>, Self::Error>;
}
