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

//! A small, fully deterministic ledger used to exercise the checkpoint store: blocks carry the
//! changes they make to the state explicitly.

use crate::{governance, LedgerCheckpoint, LedgerRules, LedgerState, Transition};
use lstate_kernel::{
    cbor,
    tests::{any_committee, any_credential, any_hash28, any_point, any_rational_number},
    AdaPots, Committee, Deposits, DepositsMap, EpochBlockNo, EpochInterval, EraHistory,
    HeaderHash, LedgerEvent, Lovelace, Point, PoolId, Prices, Slot, StakeDistribution, StakeEntry,
};
use proptest::prelude::*;
use slot_arithmetic::EraParams;
use std::{collections::BTreeSet, sync::Arc};

pub const FAKE_EPOCH_SIZE: u64 = 100;

pub const FAKE_SLOT_LENGTH: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct FakeState {
    #[n(0)]
    pub tip: Point,
    #[n(1)]
    pub epoch_size: u64,
    #[n(2)]
    pub prices: Option<Prices>,
    #[n(3)]
    pub gov_action_lifetime: Option<EpochInterval>,
    #[n(4)]
    pub pools: BTreeSet<PoolId>,
    #[n(5)]
    pub deposits: Option<Deposits>,
    #[n(6)]
    pub committee: Option<Committee>,
    #[n(7)]
    pub deposits_map: DepositsMap,
    #[n(8)]
    pub ada_pots: Option<AdaPots>,
    #[n(9)]
    pub stake: Option<StakeDistribution>,
}

impl FakeState {
    pub fn genesis(epoch_size: u64) -> Self {
        Self {
            tip: Point::Origin,
            epoch_size,
            prices: None,
            gov_action_lifetime: None,
            pools: BTreeSet::new(),
            deposits: None,
            committee: None,
            deposits_map: DepositsMap::empty(),
            ada_pots: None,
            stake: None,
        }
    }

    pub fn at(slot: u64) -> Self {
        Self {
            tip: fake_point(slot),
            ..Self::genesis(FAKE_EPOCH_SIZE)
        }
    }
}

impl LedgerState for FakeState {
    fn tip(&self) -> Point {
        self.tip
    }

    fn era_history(&self) -> EraHistory {
        EraHistory::single_era(EraParams {
            epoch_size_slots: self.epoch_size.max(1),
            slot_length: FAKE_SLOT_LENGTH,
        })
    }

    fn prices(&self) -> Option<Prices> {
        self.prices
    }

    fn gov_action_lifetime(&self) -> Option<EpochInterval> {
        self.gov_action_lifetime
    }

    fn registered_pools(&self) -> BTreeSet<PoolId> {
        self.pools.clone()
    }

    fn deposits(&self) -> Option<Deposits> {
        self.deposits
    }

    fn committee(&self) -> Option<Committee> {
        self.committee.clone()
    }

    fn deposits_map(&self) -> DepositsMap {
        self.deposits_map.clone()
    }

    fn ada_pots(&self) -> Option<AdaPots> {
        self.ada_pots
    }

    fn stake_distribution(&self) -> Option<&StakeDistribution> {
        self.stake.as_ref()
    }
}

/// A deterministic header hash for a slot.
pub fn fake_hash(slot: u64) -> HeaderHash {
    let mut bytes = [0xaa; 32];
    bytes[..8].copy_from_slice(&slot.to_be_bytes());
    HeaderHash::new(bytes)
}

pub fn fake_point(slot: u64) -> Point {
    Point::Specific(Slot::from(slot), fake_hash(slot))
}

pub fn fake_era_history() -> EraHistory {
    FakeState::genesis(FAKE_EPOCH_SIZE).era_history()
}

pub fn genesis_checkpoint() -> Arc<LedgerCheckpoint<FakeState>> {
    Arc::new(LedgerCheckpoint::new(
        FakeState::genesis(FAKE_EPOCH_SIZE),
        EpochBlockNo::Genesis,
    ))
}

pub fn checkpoint_with(
    slot: u64,
    epoch_block_no: EpochBlockNo,
) -> Arc<LedgerCheckpoint<FakeState>> {
    Arc::new(LedgerCheckpoint::new(FakeState::at(slot), epoch_block_no))
}

/// A checkpoint in the middle of an epoch.
pub fn checkpoint_at(slot: u64) -> Arc<LedgerCheckpoint<FakeState>> {
    checkpoint_with(slot, EpochBlockNo::Normal(1))
}

prop_compose! {
    pub fn any_prices()(
        memory in any_rational_number(),
        steps in any_rational_number(),
    ) -> Prices {
        Prices { memory, steps }
    }
}

prop_compose! {
    pub fn any_deposits()(
        stake_credential in any::<Lovelace>(),
        stake_pool in any::<Lovelace>(),
        drep in any::<Lovelace>(),
        gov_action in any::<Lovelace>(),
    ) -> Deposits {
        Deposits { stake_credential, stake_pool, drep, gov_action }
    }
}

prop_compose! {
    pub fn any_ada_pots()(
        pots in any::<[Lovelace; 6]>(),
    ) -> AdaPots {
        let [treasury, reserves, rewards, utxo, deposits, fees] = pots;
        AdaPots { treasury, reserves, rewards, utxo, deposits, fees }
    }
}

prop_compose! {
    pub fn any_stake_distribution()(
        entries in prop::collection::vec((any_credential(), any_hash28(), any::<Lovelace>()), 0..8),
    ) -> StakeDistribution {
        entries
            .into_iter()
            .map(|(credential, pool, stake)| StakeEntry { credential, pool, stake })
            .collect()
    }
}

prop_compose! {
    pub fn any_fake_state()(
        tip in prop_oneof![Just(Point::Origin), any_point()],
        epoch_size in 1u64..100_000,
        prices in proptest::option::of(any_prices()),
        gov_action_lifetime in proptest::option::of(any::<u32>()),
        pools in prop::collection::btree_set(any_hash28(), 0..4),
        deposits in proptest::option::of(any_deposits()),
        committee in proptest::option::of(any_committee()),
        deposits_map in prop::collection::vec((prop::collection::vec(any::<u8>(), 1..29), any::<u64>()), 0..4),
        ada_pots in proptest::option::of(any_ada_pots()),
        stake in proptest::option::of(any_stake_distribution()),
    ) -> FakeState {
        FakeState {
            tip,
            epoch_size,
            prices,
            gov_action_lifetime: gov_action_lifetime.map(EpochInterval),
            pools,
            deposits,
            committee,
            deposits_map: deposits_map.into_iter().collect(),
            ada_pots,
            stake,
        }
    }
}

// FakeRules
// ----------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FakeError {
    #[error("invalid block at slot {0}")]
    InvalidBlock(Slot),
}

#[derive(Clone, Debug)]
pub struct FakeBlock {
    pub slot: Slot,
    pub hash: HeaderHash,
    pub invalid: bool,
    pub prices: Option<Prices>,
    pub deposits: Option<Deposits>,
    pub new_deposits: Vec<(Vec<u8>, Lovelace)>,
    pub gov_action_lifetime: Option<EpochInterval>,
    pub registering: Vec<PoolId>,
    pub stake: Option<StakeDistribution>,
    pub events: Vec<LedgerEvent>,
}

impl FakeBlock {
    pub fn at(slot: u64) -> Self {
        Self {
            slot: Slot::from(slot),
            hash: fake_hash(slot),
            invalid: false,
            prices: None,
            deposits: None,
            new_deposits: Vec::new(),
            gov_action_lifetime: None,
            registering: Vec::new(),
            stake: None,
            events: Vec::new(),
        }
    }

    pub fn point(&self) -> Point {
        Point::Specific(self.slot, self.hash)
    }

    pub fn invalid(self) -> Self {
        Self {
            invalid: true,
            ..self
        }
    }

    pub fn with_prices(self, prices: Prices) -> Self {
        Self {
            prices: Some(prices),
            ..self
        }
    }

    pub fn with_deposits(self, deposits: Deposits) -> Self {
        Self {
            deposits: Some(deposits),
            ..self
        }
    }

    pub fn with_deposit(mut self, key: Vec<u8>, amount: Lovelace) -> Self {
        self.new_deposits.push((key, amount));
        self
    }

    pub fn with_gov_action_lifetime(self, lifetime: EpochInterval) -> Self {
        Self {
            gov_action_lifetime: Some(lifetime),
            ..self
        }
    }

    pub fn registering(mut self, pool: PoolId) -> Self {
        self.registering.push(pool);
        self
    }

    pub fn with_stake(self, stake: StakeDistribution) -> Self {
        Self {
            stake: Some(stake),
            ..self
        }
    }

    pub fn with_event(mut self, event: LedgerEvent) -> Self {
        self.events.push(event);
        self
    }
}

pub struct FakeRules;

impl LedgerRules for FakeRules {
    type State = FakeState;
    type Block = FakeBlock;
    type Error = FakeError;

    fn genesis(&self) -> FakeState {
        FakeState::genesis(FAKE_EPOCH_SIZE)
    }

    fn apply_block(
        &self,
        state: &FakeState,
        block: &FakeBlock,
    ) -> Result<Transition<FakeState>, FakeError> {
        if block.invalid {
            return Err(FakeError::InvalidBlock(block.slot));
        }

        let mut state = state.clone();

        state.tip = block.point();
        state.prices = block.prices.or(state.prices);
        state.deposits = block.deposits.or(state.deposits);
        state.gov_action_lifetime = block.gov_action_lifetime.or(state.gov_action_lifetime);
        state.pools.extend(block.registering.iter().copied());

        if !block.new_deposits.is_empty() {
            state.deposits_map = state
                .deposits_map
                .iter()
                .map(|(key, amount)| (key.to_vec(), amount))
                .chain(block.new_deposits.iter().cloned())
                .collect();
        }

        if let Some(stake) = &block.stake {
            state.stake = Some(stake.clone());
        }

        if let Some(committee) =
            governance::enacted_committee(state.committee.clone(), &block.events)
        {
            state.committee = Some(committee);
        }

        Ok(Transition {
            state,
            events: block.events.clone(),
        })
    }
}
