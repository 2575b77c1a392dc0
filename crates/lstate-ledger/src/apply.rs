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

use crate::{governance, LedgerCheckpoint, LedgerRules, LedgerState, Transition};
use lstate_kernel::{
    AdaPots, Committee, Deposits, DepositsMap, Epoch, EpochBlockNo, EpochInterval, EraHistory,
    EraHistoryError, LedgerEvent, PoolId, Prices, Slot, StakeDistribution, StakeEntry,
};
use std::{
    collections::BTreeSet,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{instrument, Level};

pub const DEFAULT_STAKE_SLICE_SIZE: usize = 2000;

// SlotDetails
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDetails {
    pub slot: Slot,
    pub epoch: Epoch,
    /// Position of the slot within its epoch.
    pub epoch_slot: u64,
    pub epoch_size: u64,
    /// Wall-clock time of the slot, in milliseconds since the UNIX epoch.
    pub slot_time_ms: u64,
    /// Wall-clock time at which the details were computed.
    pub current_time_ms: u64,
}

impl SlotDetails {
    pub fn new(
        era_history: &EraHistory,
        system_start_ms: u64,
        slot: Slot,
    ) -> Result<Self, EraHistoryError> {
        let epoch = era_history.slot_to_epoch(slot)?;
        Ok(Self {
            slot,
            epoch,
            epoch_slot: era_history.slot_in_epoch(slot)?,
            epoch_size: era_history.epoch_size(epoch)?,
            slot_time_ms: era_history.slot_to_absolute_time(slot, system_start_ms)?,
            current_time_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis() as u64)
                .unwrap_or_default(),
        })
    }
}

// StakeSliceResult
// ----------------------------------------------------------------------------

/// The share of the stake distribution an indexer should process along with a block, so that the
/// whole distribution is spread over the first blocks of an epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StakeSliceResult {
    Slice {
        slice: Vec<StakeEntry>,
        is_final: bool,
    },
    NoSlices,
}

/// Slice `i` of the distribution, where `i` is 0 for the epoch boundary block and `n` for the
/// `n`-th block after it.
pub fn stake_slice(
    distribution: &StakeDistribution,
    epoch_block_no: EpochBlockNo,
    slice_size: usize,
) -> StakeSliceResult {
    let index = match epoch_block_no {
        EpochBlockNo::Genesis => return StakeSliceResult::NoSlices,
        EpochBlockNo::EpochBoundaryBlock => 0,
        EpochBlockNo::Normal(n) => n,
    };

    let entries = distribution.entries();

    let start = usize::try_from(index)
        .ok()
        .and_then(|index| index.checked_mul(slice_size));

    match start {
        Some(start) if slice_size > 0 && start < entries.len() => {
            let end = start.saturating_add(slice_size).min(entries.len());
            StakeSliceResult::Slice {
                slice: entries[start..end].to_vec(),
                is_final: end == entries.len(),
            }
        }
        _ => StakeSliceResult::NoSlices,
    }
}

// ApplyResult
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEpoch {
    pub epoch: Epoch,
    /// `None` when the block is the first one after genesis.
    pub previous_epoch: Option<Epoch>,
    pub ada_pots: Option<AdaPots>,
}

/// Everything an indexer needs to know about the block it just applied.
///
/// Optional fields left empty mean "unchanged", not "cleared".
#[derive(Debug)]
pub struct ApplyResult<S> {
    pub prices: Option<Prices>,
    pub gov_expires_after: Option<EpochInterval>,
    /// Pools registered before this block.
    pub pools_registered: BTreeSet<PoolId>,
    pub new_epoch: Option<NewEpoch>,
    /// The checkpoint the block was applied to, kept for the first block of an epoch only.
    pub old_ledger: Option<Arc<LedgerCheckpoint<S>>>,
    pub deposits: Option<Deposits>,
    pub slot_details: SlotDetails,
    pub stake_slice: StakeSliceResult,
    pub events: Vec<LedgerEvent>,
    pub committee: Option<Committee>,
    pub deposits_map: DepositsMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOptions {
    pub system_start_ms: u64,
    pub track_deposits: bool,
    pub stake_slice_size: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            system_start_ms: 0,
            track_deposits: true,
            stake_slice_size: DEFAULT_STAKE_SLICE_SIZE,
        }
    }
}

/// Where the new checkpoint sits with respect to epochs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochTransition {
    pub previous: Option<Epoch>,
    pub current: Epoch,
}

impl EpochTransition {
    pub fn is_new_epoch(&self) -> bool {
        self.previous != Some(self.current)
    }
}

/// Assemble the result of applying a block, from the checkpoints before and after it.
pub fn aggregate<S: LedgerState>(
    previous: &Arc<LedgerCheckpoint<S>>,
    next: &LedgerCheckpoint<S>,
    events: Vec<LedgerEvent>,
    epochs: EpochTransition,
    slot_details: SlotDetails,
    options: &ApplyOptions,
) -> ApplyResult<S> {
    let is_new_epoch = epochs.is_new_epoch();

    let prices = next
        .state
        .prices()
        .filter(|prices| Some(prices) != previous.state.prices().as_ref());

    let deposits = next.state.deposits().filter(|deposits| {
        options.track_deposits
            && (is_new_epoch || Some(deposits) != previous.state.deposits().as_ref())
    });

    let deposits_map = if options.track_deposits {
        next.state.deposits_map()
    } else {
        DepositsMap::empty()
    };

    let new_epoch = is_new_epoch.then(|| NewEpoch {
        epoch: epochs.current,
        previous_epoch: epochs.previous,
        ada_pots: next.state.ada_pots(),
    });

    let stake_slice = next
        .state
        .stake_distribution()
        .map(|distribution| {
            stake_slice(distribution, next.epoch_block_no, options.stake_slice_size)
        })
        .unwrap_or(StakeSliceResult::NoSlices);

    let committee = governance::enacted_committee(previous.state.committee(), &events);

    ApplyResult {
        prices,
        gov_expires_after: next.state.gov_action_lifetime(),
        pools_registered: previous.state.registered_pools(),
        new_epoch,
        old_ledger: is_new_epoch.then(|| previous.clone()),
        deposits,
        slot_details,
        stake_slice,
        events,
        committee,
        deposits_map,
    }
}

// apply_block
// ----------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApplyError<E> {
    #[error("ledger rules rejected the block: {0}")]
    Transition(E),
    #[error("failed to interpret slot: {0}")]
    Interpreter(#[from] EraHistoryError),
}

#[derive(Debug)]
pub struct Applied<S> {
    pub checkpoint: Arc<LedgerCheckpoint<S>>,
    pub result: ApplyResult<S>,
}

/// Apply a block on top of a checkpoint, producing the next checkpoint and the block's results.
#[instrument(level = Level::TRACE, skip_all)]
pub fn apply_block<R: LedgerRules>(
    rules: &R,
    previous: &Arc<LedgerCheckpoint<R::State>>,
    block: &R::Block,
    era_history: &EraHistory,
    options: &ApplyOptions,
) -> Result<Applied<R::State>, ApplyError<R::Error>> {
    let Transition { state, events } = rules
        .apply_block(&previous.state, block)
        .map_err(ApplyError::Transition)?;

    let slot = state.tip().slot_or_default();

    let epochs = EpochTransition {
        previous: match (previous.epoch_block_no, previous.slot()) {
            (EpochBlockNo::Genesis, _) | (_, None) => None,
            (_, Some(previous_slot)) => Some(era_history.slot_to_epoch(previous_slot)?),
        },
        current: era_history.slot_to_epoch(slot)?,
    };

    let next = LedgerCheckpoint::new(
        state,
        previous.epoch_block_no.successor(epochs.is_new_epoch()),
    );

    let slot_details = SlotDetails::new(era_history, options.system_start_ms, slot)?;

    let result = aggregate(previous, &next, events, epochs, slot_details, options);

    Ok(Applied {
        checkpoint: Arc::new(next),
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        fake_era_history, genesis_checkpoint, FakeBlock, FakeError, FakeRules, FakeState,
        FAKE_EPOCH_SIZE,
    };
    use lstate_kernel::{
        tests::key_credential, Credential, GovAction, Hash, ProposalId, RationalNumber,
        UnitInterval, NULL_HASH32,
    };
    use std::collections::{BTreeMap, BTreeSet};
    use test_case::test_case;

    fn distribution(size: u8) -> StakeDistribution {
        (0..size)
            .map(|ix| StakeEntry {
                credential: key_credential(ix),
                pool: Hash::new([ix; 28]),
                stake: u64::from(ix),
            })
            .collect()
    }

    fn apply(
        previous: &Arc<LedgerCheckpoint<FakeState>>,
        block: FakeBlock,
        options: &ApplyOptions,
    ) -> Applied<FakeState> {
        apply_block(&FakeRules, previous, &block, &fake_era_history(), options).unwrap()
    }

    fn prices(memory: u64) -> Prices {
        Prices {
            memory: RationalNumber::new(memory, 100).unwrap(),
            steps: RationalNumber::new(1, 1000).unwrap(),
        }
    }

    #[test_case(EpochBlockNo::Genesis, 3 => StakeSliceResult::NoSlices)]
    #[test_case(EpochBlockNo::EpochBoundaryBlock, 3 => StakeSliceResult::Slice {
        slice: distribution(3).entries().to_vec(),
        is_final: false,
    })]
    #[test_case(EpochBlockNo::Normal(1), 3 => StakeSliceResult::Slice {
        slice: distribution(6).entries()[3..6].to_vec(),
        is_final: false,
    })]
    #[test_case(EpochBlockNo::Normal(2), 3 => StakeSliceResult::Slice {
        slice: distribution(7).entries()[6..7].to_vec(),
        is_final: true,
    })]
    #[test_case(EpochBlockNo::Normal(3), 3 => StakeSliceResult::NoSlices; "past the end")]
    #[test_case(EpochBlockNo::Normal(0), 0 => StakeSliceResult::NoSlices; "empty slices")]
    fn slicing_seven_entries(epoch_block_no: EpochBlockNo, size: usize) -> StakeSliceResult {
        stake_slice(&distribution(7), epoch_block_no, size)
    }

    #[test]
    fn exact_multiple_marks_last_slice_final() {
        pretty_assertions::assert_eq!(
            stake_slice(&distribution(6), EpochBlockNo::Normal(1), 3),
            StakeSliceResult::Slice {
                slice: distribution(6).entries()[3..6].to_vec(),
                is_final: true,
            }
        );
    }

    #[test]
    fn first_block_after_genesis_starts_an_epoch() {
        let genesis = genesis_checkpoint();
        let applied = apply(&genesis, FakeBlock::at(3), &ApplyOptions::default());

        pretty_assertions::assert_eq!(
            applied.checkpoint.epoch_block_no,
            EpochBlockNo::EpochBoundaryBlock
        );
        pretty_assertions::assert_eq!(
            applied.result.new_epoch,
            Some(NewEpoch {
                epoch: Epoch::from(0),
                previous_epoch: None,
                ada_pots: None,
            })
        );
        assert!(applied.result.old_ledger.is_some());
    }

    #[test]
    fn blocks_within_an_epoch_are_numbered() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions::default();
        let first = apply(&genesis, FakeBlock::at(3), &options).checkpoint;
        let second = apply(&first, FakeBlock::at(5), &options);

        pretty_assertions::assert_eq!(second.checkpoint.epoch_block_no, EpochBlockNo::Normal(1));
        pretty_assertions::assert_eq!(second.result.new_epoch, None);
        assert!(second.result.old_ledger.is_none());

        let third = apply(&second.checkpoint, FakeBlock::at(8), &options);
        pretty_assertions::assert_eq!(third.checkpoint.epoch_block_no, EpochBlockNo::Normal(2));
    }

    #[test]
    fn crossing_an_epoch_resets_the_block_number() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions::default();
        let first = apply(&genesis, FakeBlock::at(3), &options).checkpoint;
        let crossing = apply(&first, FakeBlock::at(FAKE_EPOCH_SIZE + 1), &options);

        pretty_assertions::assert_eq!(
            crossing.checkpoint.epoch_block_no,
            EpochBlockNo::EpochBoundaryBlock
        );
        pretty_assertions::assert_eq!(
            crossing.result.new_epoch.map(|new_epoch| new_epoch.previous_epoch),
            Some(Some(Epoch::from(0)))
        );
        pretty_assertions::assert_eq!(
            crossing.result.old_ledger.map(|old| *old.tip()),
            Some(*first.tip())
        );
        pretty_assertions::assert_eq!(crossing.result.slot_details.epoch, Epoch::from(1));
        pretty_assertions::assert_eq!(crossing.result.slot_details.epoch_slot, 1);
        pretty_assertions::assert_eq!(crossing.result.slot_details.epoch_size, FAKE_EPOCH_SIZE);
    }

    #[test]
    fn slot_time_accounts_for_system_start() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions {
            system_start_ms: 1_000_000,
            ..ApplyOptions::default()
        };
        let applied = apply(&genesis, FakeBlock::at(3), &options);
        pretty_assertions::assert_eq!(applied.result.slot_details.slot_time_ms, 1_003_000);
    }

    #[test]
    fn prices_only_reported_when_changed() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions::default();

        let changed = apply(
            &genesis,
            FakeBlock::at(3).with_prices(prices(5)),
            &options,
        );
        pretty_assertions::assert_eq!(changed.result.prices, Some(prices(5)));

        let unchanged = apply(
            &changed.checkpoint,
            FakeBlock::at(4).with_prices(prices(5)),
            &options,
        );
        pretty_assertions::assert_eq!(unchanged.result.prices, None);

        let carried = apply(&unchanged.checkpoint, FakeBlock::at(5), &options);
        pretty_assertions::assert_eq!(carried.result.prices, None);
        pretty_assertions::assert_eq!(carried.checkpoint.state.prices, Some(prices(5)));
    }

    #[test]
    fn deposits_reported_on_change_or_new_epoch() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions::default();
        let deposits = Deposits {
            stake_credential: 2_000_000,
            ..Deposits::default()
        };

        let first = apply(
            &genesis,
            FakeBlock::at(3).with_deposits(deposits),
            &options,
        );
        pretty_assertions::assert_eq!(first.result.deposits, Some(deposits));

        let same_epoch = apply(&first.checkpoint, FakeBlock::at(4), &options);
        pretty_assertions::assert_eq!(same_epoch.result.deposits, None);

        let next_epoch = apply(
            &same_epoch.checkpoint,
            FakeBlock::at(FAKE_EPOCH_SIZE),
            &options,
        );
        pretty_assertions::assert_eq!(next_epoch.result.deposits, Some(deposits));
    }

    #[test]
    fn deposit_tracking_can_be_disabled() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions {
            track_deposits: false,
            ..ApplyOptions::default()
        };

        let applied = apply(
            &genesis,
            FakeBlock::at(3)
                .with_deposits(Deposits::default())
                .with_deposit(vec![1, 2, 3], 42),
            &options,
        );

        pretty_assertions::assert_eq!(applied.result.deposits, None);
        assert!(applied.result.deposits_map.is_empty());
        pretty_assertions::assert_eq!(
            applied.checkpoint.state.deposits_map.lookup(&[1, 2, 3]),
            Some(42)
        );
    }

    #[test]
    fn deposits_map_carried_when_tracking() {
        let genesis = genesis_checkpoint();
        let applied = apply(
            &genesis,
            FakeBlock::at(3).with_deposit(vec![7], 500),
            &ApplyOptions::default(),
        );
        pretty_assertions::assert_eq!(applied.result.deposits_map.lookup(&[7]), Some(500));
    }

    #[test]
    fn pools_registered_come_from_previous_state() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions::default();
        let pool = Hash::new([1; 28]);

        let registering = apply(&genesis, FakeBlock::at(3).registering(pool), &options);
        assert!(registering.result.pools_registered.is_empty());

        let after = apply(&registering.checkpoint, FakeBlock::at(4), &options);
        pretty_assertions::assert_eq!(after.result.pools_registered, BTreeSet::from([pool]));
    }

    #[test]
    fn gov_expiry_follows_next_state() {
        let genesis = genesis_checkpoint();
        let applied = apply(
            &genesis,
            FakeBlock::at(3).with_gov_action_lifetime(EpochInterval(6)),
            &ApplyOptions::default(),
        );
        pretty_assertions::assert_eq!(applied.result.gov_expires_after, Some(EpochInterval(6)));
    }

    #[test]
    fn committee_reflects_enacted_updates() {
        let genesis = genesis_checkpoint();
        let quorum: UnitInterval = RationalNumber::new(2, 3).unwrap();
        let member: Credential = key_credential(9);
        let event = LedgerEvent::GovActionEnacted {
            id: ProposalId {
                transaction: NULL_HASH32,
                index: 0,
            },
            action: GovAction::UpdateCommittee {
                remove: BTreeSet::new(),
                add: BTreeMap::from([(member, Epoch::from(42))]),
                quorum,
            },
        };

        let applied = apply(
            &genesis,
            FakeBlock::at(3).with_event(event.clone()),
            &ApplyOptions::default(),
        );

        pretty_assertions::assert_eq!(
            applied.result.committee,
            Some(Committee::new(
                BTreeMap::from([(member, Epoch::from(42))]),
                quorum
            ))
        );
        pretty_assertions::assert_eq!(applied.result.events, vec![event]);

        let quiet = apply(
            &applied.checkpoint,
            FakeBlock::at(4),
            &ApplyOptions::default(),
        );
        pretty_assertions::assert_eq!(quiet.result.committee, None);
    }

    #[test]
    fn stake_slices_follow_block_numbers() {
        let genesis = genesis_checkpoint();
        let options = ApplyOptions {
            stake_slice_size: 2,
            ..ApplyOptions::default()
        };

        let boundary = apply(
            &genesis,
            FakeBlock::at(3).with_stake(distribution(3)),
            &options,
        );
        pretty_assertions::assert_eq!(
            boundary.result.stake_slice,
            StakeSliceResult::Slice {
                slice: distribution(2).entries().to_vec(),
                is_final: false,
            }
        );

        let next = apply(&boundary.checkpoint, FakeBlock::at(4), &options);
        pretty_assertions::assert_eq!(
            next.result.stake_slice,
            StakeSliceResult::Slice {
                slice: distribution(3).entries()[2..3].to_vec(),
                is_final: true,
            }
        );

        let past = apply(&next.checkpoint, FakeBlock::at(5), &options);
        pretty_assertions::assert_eq!(past.result.stake_slice, StakeSliceResult::NoSlices);
    }

    #[test]
    fn rejected_block_is_reported() {
        let genesis = genesis_checkpoint();
        let result = apply_block(
            &FakeRules,
            &genesis,
            &FakeBlock::at(3).invalid(),
            &fake_era_history(),
            &ApplyOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ApplyError::Transition(FakeError::InvalidBlock(slot))) if slot == Slot::from(3)
        ));
    }
}
