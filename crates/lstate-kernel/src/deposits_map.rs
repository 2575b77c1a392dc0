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

use crate::{cbor, Lovelace};
use std::collections::BTreeMap;

/// Currently locked deposits, keyed by the raw bytes of the address-like identifier that holds
/// them.
///
/// The map is a value: it can only be looked up, and a new map is built whenever deposits change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepositsMap(BTreeMap<Vec<u8>, Lovelace>);

impl DepositsMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &[u8]) -> Option<Lovelace> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Lovelace)> {
        self.0.iter().map(|(k, v)| (k.as_slice(), *v))
    }
}

impl FromIterator<(Vec<u8>, Lovelace)> for DepositsMap {
    fn from_iter<T: IntoIterator<Item = (Vec<u8>, Lovelace)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<C> cbor::encode::Encode<C> for DepositsMap {
    fn encode<W: cbor::encode::Write>(
        &self,
        e: &mut cbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), cbor::encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (key, amount) in &self.0 {
            e.bytes(key)?.u64(*amount)?;
        }
        Ok(())
    }
}

impl<'d, C> cbor::decode::Decode<'d, C> for DepositsMap {
    fn decode(d: &mut cbor::Decoder<'d>, _ctx: &mut C) -> Result<Self, cbor::decode::Error> {
        let len = d
            .map()?
            .ok_or_else(|| cbor::decode::Error::message("indefinite deposits map"))?;
        let mut deposits = BTreeMap::new();
        for _ in 0..len {
            let key = d.bytes()?.to_vec();
            let amount = d.u64()?;
            deposits.insert(key, amount);
        }
        Ok(Self(deposits))
    }
}
