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

use crate::{cbor, Lovelace, RationalNumber};

/// Execution unit prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct Prices {
    #[n(0)]
    pub memory: RationalNumber,
    #[n(1)]
    pub steps: RationalNumber,
}

/// Amounts locked when registering the various on-chain entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct Deposits {
    #[n(0)]
    pub stake_credential: Lovelace,
    #[n(1)]
    pub stake_pool: Lovelace,
    #[n(2)]
    pub drep: Lovelace,
    #[n(3)]
    pub gov_action: Lovelace,
}

/// A number of epochs, e.g. the lifetime of a governance action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochInterval(pub u32);

impl<C> cbor::encode::Encode<C> for EpochInterval {
    fn encode<W: cbor::encode::Write>(
        &self,
        e: &mut cbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), cbor::encode::Error<W::Error>> {
        e.u32(self.0)?;
        Ok(())
    }
}

impl<'d, C> cbor::decode::Decode<'d, C> for EpochInterval {
    fn decode(d: &mut cbor::Decoder<'d>, _ctx: &mut C) -> Result<Self, cbor::decode::Error> {
        d.u32().map(EpochInterval)
    }
}

/// The accounting pots at an epoch boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, cbor::Encode, cbor::Decode)]
pub struct AdaPots {
    #[n(0)]
    pub treasury: Lovelace,
    #[n(1)]
    pub reserves: Lovelace,
    #[n(2)]
    pub rewards: Lovelace,
    #[n(3)]
    pub utxo: Lovelace,
    #[n(4)]
    pub deposits: Lovelace,
    #[n(5)]
    pub fees: Lovelace,
}

impl AdaPots {
    pub fn total(&self) -> Lovelace {
        self.treasury + self.reserves + self.rewards + self.utxo + self.deposits + self.fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ada_pots_total_sums_every_pot() {
        let pots = AdaPots {
            treasury: 1,
            reserves: 2,
            rewards: 3,
            utxo: 4,
            deposits: 5,
            fees: 6,
        };
        assert_eq!(pots.total(), 21);
    }

    #[test]
    fn epoch_interval_encodes_as_plain_integer() {
        assert_eq!(cbor::to_vec(EpochInterval(6)).unwrap(), vec![0x06]);
    }
}
