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

use crate::LedgerCheckpoint;
use lstate_kernel::{Point, Slot};
use std::{collections::VecDeque, fmt, sync::Arc};
use tracing::trace;

pub const EVENT_TARGET: &str = "lstate::ledger::sequence";

/// Retention window used when none is configured: the security parameter of the chain, i.e. the
/// maximum depth of a rollback.
pub const DEFAULT_ROLLBACK_WINDOW: usize = 2160;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("checkpoint at {} is not after the tip at {}", Key(.attempted), Key(.tip))]
    OrderingViolation {
        tip: Option<Slot>,
        attempted: Option<Slot>,
    },
    #[error("cannot roll back to {}: oldest retained checkpoint is at {}", Key(.target), Key(.anchor))]
    RollbackBeyondRetention {
        target: Option<Slot>,
        anchor: Option<Slot>,
    },
}

struct Key<'a>(&'a Option<Slot>);

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => write!(f, "origin"),
            Some(slot) => write!(f, "slot {slot}"),
        }
    }
}

// CheckpointSequence
// ----------------------------------------------------------------------------

/// The retained checkpoints, oldest (the anchor) in front and newest (the tip) at the back.
///
/// Checkpoints are keyed by the slot of their tip, `None` standing for the origin. Keys strictly
/// increase from the anchor to the tip.
#[derive(Debug)]
pub struct CheckpointSequence<S>(VecDeque<Arc<LedgerCheckpoint<S>>>);

impl<S> Default for CheckpointSequence<S> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<S> CheckpointSequence<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence made of a single checkpoint, which is both anchor and tip.
    pub fn anchored_at(checkpoint: Arc<LedgerCheckpoint<S>>) -> Self {
        Self(VecDeque::from([checkpoint]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn tip(&self) -> Option<&Arc<LedgerCheckpoint<S>>> {
        self.0.back()
    }

    pub fn anchor(&self) -> Option<&Arc<LedgerCheckpoint<S>>> {
        self.0.front()
    }

    /// From the anchor to the tip.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<LedgerCheckpoint<S>>> {
        self.0.iter()
    }

    /// The checkpoint at exactly this slot, if retained.
    pub fn lookup(&self, slot: Slot) -> Option<&Arc<LedgerCheckpoint<S>>> {
        self.find(Some(slot))
    }

    /// Whether the given point, hash included, is retained.
    pub fn contains(&self, point: &Point) -> bool {
        self.find(point.slot())
            .is_some_and(|checkpoint| checkpoint.tip() == point)
    }

    fn find(&self, key: Option<Slot>) -> Option<&Arc<LedgerCheckpoint<S>>> {
        self.0
            .binary_search_by_key(&key, |checkpoint| checkpoint.slot())
            .ok()
            .and_then(|ix| self.0.get(ix))
    }

    /// Append a new tip. Its slot must be strictly greater than the current tip's; an empty
    /// sequence accepts anything, the origin included.
    pub fn push(&mut self, checkpoint: Arc<LedgerCheckpoint<S>>) -> Result<(), SequenceError> {
        if let Some(tip) = self.tip() {
            if checkpoint.slot() <= tip.slot() {
                return Err(SequenceError::OrderingViolation {
                    tip: tip.slot(),
                    attempted: checkpoint.slot(),
                });
            }
        }

        self.0.push_back(checkpoint);

        Ok(())
    }

    /// Discard every checkpoint newer than `target`. The new tip is the newest checkpoint at or
    /// before `target`, which therefore needs not be an exact match.
    pub fn rollback(&mut self, target: Slot) -> Result<(), SequenceError> {
        self.rollback_to_key(Some(target))
    }

    /// Discard every checkpoint newer than the given point. The point itself must be retained.
    pub fn rollback_to(&mut self, point: &Point) -> Result<(), SequenceError> {
        if !self.contains(point) {
            return Err(SequenceError::RollbackBeyondRetention {
                target: point.slot(),
                anchor: self.anchor().and_then(|anchor| anchor.slot()),
            });
        }

        self.rollback_to_key(point.slot())
    }

    fn rollback_to_key(&mut self, target: Option<Slot>) -> Result<(), SequenceError> {
        let anchor = match self.anchor() {
            Some(anchor) if anchor.slot() <= target => anchor.slot(),
            anchor => {
                return Err(SequenceError::RollbackBeyondRetention {
                    target,
                    anchor: anchor.and_then(|anchor| anchor.slot()),
                });
            }
        };

        let keep = self.0.partition_point(|checkpoint| checkpoint.slot() <= target);
        let discarded = self.0.len() - keep;
        self.0.truncate(keep);

        trace!(
            target: EVENT_TARGET,
            target_slot = ?target,
            anchor = ?anchor,
            discarded,
            "sequence.rollback"
        );

        Ok(())
    }

    /// Move the anchor forward, dropping every checkpoint strictly older than `slot`. The tip is
    /// always kept, even when it's older than `slot`. Returns the number of evicted checkpoints.
    pub fn evict_before_anchor(&mut self, slot: Slot) -> usize {
        let mut evicted = 0;
        while self.0.len() > 1
            && self
                .0
                .front()
                .is_some_and(|anchor| anchor.slot() < Some(slot))
        {
            self.0.pop_front();
            evicted += 1;
        }

        if evicted > 0 {
            trace!(target: EVENT_TARGET, %slot, evicted, "sequence.evicted");
        }

        evicted
    }

    /// Drop the oldest checkpoints until at most `window` remain (and at least one).
    pub fn retain_last(&mut self, window: usize) -> usize {
        let excess = self.0.len().saturating_sub(window.max(1));
        self.0.drain(..excess);
        excess
    }
}
