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

use crate::{cbor, Credential, Lovelace, PoolId};

/// Delegated stake per credential, as of the last epoch boundary. The order is stable so that it
/// can be consumed in fixed-size slices across the blocks of an epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct StakeDistribution {
    #[n(0)]
    entries: Vec<StakeEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct StakeEntry {
    #[n(0)]
    pub credential: Credential,
    #[n(1)]
    pub pool: PoolId,
    #[n(2)]
    pub stake: Lovelace,
}

impl StakeDistribution {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StakeEntry] {
        &self.entries
    }

    pub fn total(&self) -> Lovelace {
        self.entries.iter().map(|entry| entry.stake).sum()
    }
}

impl FromIterator<StakeEntry> for StakeDistribution {
    fn from_iter<T: IntoIterator<Item = StakeEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
