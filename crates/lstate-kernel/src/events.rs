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

use crate::{Credential, Epoch, Lovelace, PoolId, TransactionId, UnitInterval};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId {
    pub transaction: TransactionId,
    pub index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GovAction {
    UpdateCommittee {
        remove: BTreeSet<Credential>,
        add: BTreeMap<Credential, Epoch>,
        quorum: UnitInterval,
    },
    NoConfidence,
    /// Any other governance action; its content does not matter here.
    Other,
}

/// Something notable that happened while applying a block, as reported by the ledger rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    RewardsDistributed {
        epoch: Epoch,
        total: Lovelace,
    },
    DepositRefunded {
        credential: Credential,
        amount: Lovelace,
    },
    PoolRetired {
        pool: PoolId,
        epoch: Epoch,
    },
    GovActionEnacted {
        id: ProposalId,
        action: GovAction,
    },
    GovActionExpired {
        id: ProposalId,
    },
}

impl LedgerEvent {
    /// The committee update carried by this event, if it enacts one.
    pub fn committee_update(
        &self,
    ) -> Option<(&BTreeSet<Credential>, &BTreeMap<Credential, Epoch>, &UnitInterval)> {
        match self {
            LedgerEvent::GovActionEnacted {
                action:
                    GovAction::UpdateCommittee {
                        remove,
                        add,
                        quorum,
                    },
                ..
            } => Some((remove, add, quorum)),
            LedgerEvent::GovActionEnacted { .. }
            | LedgerEvent::RewardsDistributed { .. }
            | LedgerEvent::DepositRefunded { .. }
            | LedgerEvent::PoolRetired { .. }
            | LedgerEvent::GovActionExpired { .. } => None,
        }
    }
}
