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

use crate::{cbor, Credential, Epoch, UnitInterval};
use std::collections::BTreeMap;

/// The constitutional committee: members with their expiry epoch, and the fraction of them
/// required to ratify an action.
#[derive(Clone, Debug, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct Committee {
    #[n(0)]
    pub members: BTreeMap<Credential, Epoch>,
    #[n(1)]
    pub quorum: UnitInterval,
}

impl Committee {
    pub fn new(members: BTreeMap<Credential, Epoch>, quorum: UnitInterval) -> Self {
        Self { members, quorum }
    }

    pub fn is_member(&self, credential: &Credential) -> bool {
        self.members.contains_key(credential)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod tests {
    use super::Committee;
    use crate::{credential::tests::any_credential, rational_number::tests::any_rational_number};
    use proptest::prelude::*;
    use slot_arithmetic::testing::any_epoch;

    prop_compose! {
        pub fn any_committee()(
            members in prop::collection::btree_map(any_credential(), any_epoch(), 0..8),
            quorum in any_rational_number(),
        ) -> Committee {
            Committee { members, quorum }
        }
    }

    #[cfg(test)]
    mod internal {
        use super::*;
        use crate::cbor;

        proptest! {
            #[test]
            fn cbor_roundtrip(committee in any_committee()) {
                let bytes = cbor::to_vec(&committee).unwrap();
                prop_assert_eq!(cbor::decode::<Committee>(&bytes).unwrap(), committee);
            }
        }
    }
}
