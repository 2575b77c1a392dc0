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

use minicbor::{Decode, Decoder, Encode};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, Sub},
    str::FromStr,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Slot
// ----------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Slot(u64);

impl Slot {
    pub const fn new(slot: u64) -> Self {
        Self(slot)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Number of slots between `earlier` and `self`, or `None` when `earlier` is in the future.
    pub fn elapsed_from(&self, earlier: Slot) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Like [`Self::elapsed_from`], but saturating at zero.
    pub fn distance_to(&self, later: Slot) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Slot {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Slot)
    }
}

impl From<u64> for Slot {
    fn from(slot: u64) -> Slot {
        Slot(slot)
    }
}

impl From<Slot> for u64 {
    fn from(slot: Slot) -> u64 {
        slot.0
    }
}

impl Add<u64> for Slot {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Slot(self.0 + rhs)
    }
}

impl<C> Encode<C> for Slot {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b, C> Decode<'b, C> for Slot {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.u64().map(Slot)
    }
}

// Epoch
// ----------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Epoch(u64);

impl Epoch {
    pub const fn new(epoch: u64) -> Self {
        Self(epoch)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Epoch {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Epoch)
    }
}

impl From<u64> for Epoch {
    fn from(epoch: u64) -> Epoch {
        Epoch(epoch)
    }
}

impl From<Epoch> for u64 {
    fn from(epoch: Epoch) -> u64 {
        epoch.0
    }
}

impl Add<u64> for Epoch {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Epoch(self.0 + rhs)
    }
}

impl Sub<u64> for Epoch {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Epoch(self.0.saturating_sub(rhs))
    }
}

impl<C> Encode<C> for Epoch {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b, C> Decode<'b, C> for Epoch {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.u64().map(Epoch)
    }
}

// EraHistory
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    /// Milliseconds elapsed since the system start.
    pub time_ms: u64,
    pub slot: Slot,
    pub epoch: Epoch,
}

impl Bound {
    pub fn genesis() -> Bound {
        Bound {
            time_ms: 0,
            slot: Slot(0),
            epoch: Epoch(0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraParams {
    pub epoch_size_slots: u64,
    /// Milliseconds
    pub slot_length: u64,
}

impl EraParams {
    pub fn new(epoch_size_slots: u64, slot_length: u64) -> Option<Self> {
        let params = EraParams {
            epoch_size_slots,
            slot_length,
        };
        params.is_valid().then_some(params)
    }

    /// Epochs and slots can't be empty. Parameters built by hand or deserialized are only checked
    /// once an `EraHistory` uses them.
    pub fn is_valid(&self) -> bool {
        self.epoch_size_slots > 0 && self.slot_length > 0
    }
}

/// The start is inclusive and the end is exclusive. In a valid `EraHistory`, the end of each era
/// equals the start of the next one. Only the last era may be left open (`end == None`), in which
/// case it extends indefinitely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub start: Bound,
    pub end: Option<Bound>,
    pub params: EraParams,
}

impl Summary {
    fn contains_slot(&self, slot: Slot) -> bool {
        self.start.slot <= slot && self.end.as_ref().is_none_or(|end| slot < end.slot)
    }

    fn contains_epoch(&self, epoch: Epoch) -> bool {
        self.start.epoch <= epoch && self.end.as_ref().is_none_or(|end| epoch < end.epoch)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EraHistoryError {
    #[error("slot past time horizon")]
    PastTimeHorizon,
    #[error("invalid era history")]
    InvalidEraHistory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpochBounds {
    pub start: Slot,
    pub end: Slot,
}

/// A complete history of eras that have taken place; this is what turns slot numbers into epochs
/// and wall-clock time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraHistory {
    pub eras: Vec<Summary>,
}

impl EraHistory {
    /// A history made of one single, never-ending era starting at genesis.
    pub fn single_era(params: EraParams) -> Self {
        EraHistory {
            eras: vec![Summary {
                start: Bound::genesis(),
                end: None,
                params,
            }],
        }
    }

    fn era_for_slot(&self, slot: Slot) -> Result<&Summary, EraHistoryError> {
        for era in &self.eras {
            if era.start.slot > slot || !era.params.is_valid() {
                return Err(EraHistoryError::InvalidEraHistory);
            }
            if era.contains_slot(slot) {
                return Ok(era);
            }
        }
        Err(EraHistoryError::PastTimeHorizon)
    }

    fn era_for_epoch(&self, epoch: Epoch) -> Result<&Summary, EraHistoryError> {
        for era in &self.eras {
            if era.start.epoch > epoch || !era.params.is_valid() {
                return Err(EraHistoryError::InvalidEraHistory);
            }
            if era.contains_epoch(epoch) {
                return Ok(era);
            }
        }
        Err(EraHistoryError::PastTimeHorizon)
    }

    /// Number of milliseconds elapsed since the system start at the beginning of the given slot.
    pub fn slot_to_relative_time(&self, slot: Slot) -> Result<u64, EraHistoryError> {
        let era = self.era_for_slot(slot)?;
        let slots_elapsed = slot.0 - era.start.slot.0;
        Ok(era.start.time_ms + era.params.slot_length * slots_elapsed)
    }

    pub fn slot_to_absolute_time(
        &self,
        slot: Slot,
        system_start_ms: u64,
    ) -> Result<u64, EraHistoryError> {
        self.slot_to_relative_time(slot)
            .map(|t| system_start_ms + t)
    }

    pub fn slot_to_epoch(&self, slot: Slot) -> Result<Epoch, EraHistoryError> {
        let era = self.era_for_slot(slot)?;
        let slots_elapsed = slot.0 - era.start.slot.0;
        Ok(Epoch(
            era.start.epoch.0 + slots_elapsed / era.params.epoch_size_slots,
        ))
    }

    /// Position of the slot relative to the first slot of its epoch.
    pub fn slot_in_epoch(&self, slot: Slot) -> Result<u64, EraHistoryError> {
        let era = self.era_for_slot(slot)?;
        Ok((slot.0 - era.start.slot.0) % era.params.epoch_size_slots)
    }

    pub fn epoch_bounds(&self, epoch: Epoch) -> Result<EpochBounds, EraHistoryError> {
        let era = self.era_for_epoch(epoch)?;
        let epochs_elapsed = epoch.0 - era.start.epoch.0;
        let start = era.start.slot.0 + era.params.epoch_size_slots * epochs_elapsed;
        Ok(EpochBounds {
            start: Slot(start),
            end: Slot(start + era.params.epoch_size_slots),
        })
    }

    pub fn epoch_size(&self, epoch: Epoch) -> Result<u64, EraHistoryError> {
        self.era_for_epoch(epoch)
            .map(|era| era.params.epoch_size_slots)
    }
}
