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

use lstate_kernel::{Committee, Credential, Epoch, LedgerEvent, UnitInterval};
use std::collections::{BTreeMap, BTreeSet};

/// Compute the committee resulting from an `UpdateCommittee` action.
///
/// Members in `to_remove` leave, then members in `to_add` join; so a credential found in both ends
/// up in the committee with its new expiry. The quorum is replaced.
pub fn merge(
    current: Option<&Committee>,
    to_remove: &BTreeSet<Credential>,
    to_add: &BTreeMap<Credential, Epoch>,
    quorum: UnitInterval,
) -> Committee {
    let Some(current) = current else {
        return Committee::new(to_add.clone(), quorum);
    };

    let mut members = current
        .members
        .iter()
        .filter(|(credential, _)| !to_remove.contains(credential))
        .map(|(credential, expiry)| (*credential, *expiry))
        .collect::<BTreeMap<_, _>>();

    members.extend(to_add.iter().map(|(credential, expiry)| (*credential, *expiry)));

    Committee::new(members, quorum)
}

/// Fold every committee update enacted by `events`, in order, on top of `current`. `None` when no
/// event touches the committee.
pub fn enacted_committee(current: Option<Committee>, events: &[LedgerEvent]) -> Option<Committee> {
    let mut updates = events.iter().filter_map(LedgerEvent::committee_update).peekable();

    updates.peek()?;

    updates.fold(current, |committee, (to_remove, to_add, quorum)| {
        Some(merge(committee.as_ref(), to_remove, to_add, *quorum))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstate_kernel::{
        tests::{any_committee, any_credential, any_rational_number, key_credential},
        GovAction, ProposalId, NULL_HASH32,
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn quorum(numerator: u64, denominator: u64) -> UnitInterval {
        UnitInterval::new(numerator, denominator).unwrap()
    }

    fn enacted(action: GovAction) -> LedgerEvent {
        LedgerEvent::GovActionEnacted {
            id: ProposalId {
                transaction: NULL_HASH32,
                index: 0,
            },
            action,
        }
    }

    proptest! {
        #[test]
        fn prop_empty_update_only_replaces_quorum(
            existing in any_committee(),
            q in any_rational_number(),
        ) {
            let merged = merge(Some(&existing), &BTreeSet::new(), &BTreeMap::new(), q);
            prop_assert_eq!(&merged.members, &existing.members);
            prop_assert_eq!(merged.quorum, q);
        }

        #[test]
        fn prop_added_credentials_always_win(
            existing in any_committee(),
            credential in any_credential(),
            expiry in 0u64..1000,
            q in any_rational_number(),
        ) {
            let to_remove = BTreeSet::from([credential]);
            let to_add = BTreeMap::from([(credential, Epoch::from(expiry))]);
            let merged = merge(Some(&existing), &to_remove, &to_add, q);
            prop_assert_eq!(merged.members.get(&credential), Some(&Epoch::from(expiry)));
        }
    }

    #[test]
    fn no_current_committee_yields_additions() {
        let to_add = BTreeMap::from([(key_credential(1), Epoch::from(10))]);
        let merged = merge(None, &BTreeSet::from([key_credential(2)]), &to_add, quorum(2, 3));
        assert_eq!(merged, Committee::new(to_add, quorum(2, 3)));
    }

    #[test]
    fn removals_then_additions() {
        let existing = Committee::new(
            BTreeMap::from([
                (key_credential(1), Epoch::from(10)),
                (key_credential(2), Epoch::from(10)),
                (key_credential(3), Epoch::from(10)),
            ]),
            quorum(1, 2),
        );

        let merged = merge(
            Some(&existing),
            &BTreeSet::from([key_credential(1), key_credential(2)]),
            &BTreeMap::from([
                (key_credential(2), Epoch::from(20)),
                (key_credential(4), Epoch::from(30)),
            ]),
            quorum(2, 3),
        );

        assert_eq!(
            merged,
            Committee::new(
                BTreeMap::from([
                    (key_credential(2), Epoch::from(20)),
                    (key_credential(3), Epoch::from(10)),
                    (key_credential(4), Epoch::from(30)),
                ]),
                quorum(2, 3),
            )
        );
    }

    #[test]
    fn enacted_committee_ignores_unrelated_events() {
        let events = vec![
            enacted(GovAction::NoConfidence),
            LedgerEvent::GovActionExpired {
                id: ProposalId {
                    transaction: NULL_HASH32,
                    index: 1,
                },
            },
        ];
        assert_eq!(enacted_committee(None, &events), None);
    }

    #[test]
    fn enacted_committee_folds_updates_in_order() {
        let events = vec![
            enacted(GovAction::UpdateCommittee {
                remove: BTreeSet::new(),
                add: BTreeMap::from([(key_credential(1), Epoch::from(5))]),
                quorum: quorum(1, 2),
            }),
            enacted(GovAction::UpdateCommittee {
                remove: BTreeSet::from([key_credential(1)]),
                add: BTreeMap::from([(key_credential(2), Epoch::from(7))]),
                quorum: quorum(3, 4),
            }),
        ];

        assert_eq!(
            enacted_committee(None, &events),
            Some(Committee::new(
                BTreeMap::from([(key_credential(2), Epoch::from(7))]),
                quorum(3, 4),
            ))
        );
    }
}
