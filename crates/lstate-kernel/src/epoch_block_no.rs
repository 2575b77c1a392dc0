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

use std::fmt;

/// Height of a block within its epoch.
///
/// The first block of an epoch is the [`EpochBlockNo::EpochBoundaryBlock`]; the blocks that follow
/// it are numbered from 1. The state derived from the genesis configuration, before any block, is
/// tagged [`EpochBlockNo::Genesis`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EpochBlockNo {
    Genesis,
    EpochBoundaryBlock,
    Normal(u64),
}

impl EpochBlockNo {
    /// Height of the block applied on top of a checkpoint tagged with `self`.
    pub fn successor(&self, starts_new_epoch: bool) -> EpochBlockNo {
        match self {
            _ if starts_new_epoch => EpochBlockNo::EpochBoundaryBlock,
            EpochBlockNo::Genesis => EpochBlockNo::EpochBoundaryBlock,
            EpochBlockNo::EpochBoundaryBlock => EpochBlockNo::Normal(1),
            EpochBlockNo::Normal(n) => EpochBlockNo::Normal(n.saturating_add(1)),
        }
    }

    /// Whether this checkpoint marks the start of an epoch (the genesis state included).
    pub fn is_epoch_boundary(&self) -> bool {
        matches!(
            self,
            EpochBlockNo::Genesis | EpochBlockNo::EpochBoundaryBlock
        )
    }
}

impl fmt::Display for EpochBlockNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpochBlockNo::Genesis => write!(f, "genesis"),
            EpochBlockNo::EpochBoundaryBlock => write!(f, "epoch-boundary"),
            EpochBlockNo::Normal(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod tests {
    use super::EpochBlockNo;
    use proptest::prelude::*;

    pub fn any_epoch_block_no() -> impl Strategy<Value = EpochBlockNo> {
        prop_oneof![
            Just(EpochBlockNo::Genesis),
            Just(EpochBlockNo::EpochBoundaryBlock),
            any::<u64>().prop_map(EpochBlockNo::Normal),
        ]
    }

}
