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

use crate::cbor;
use num::rational::Ratio;
use std::fmt;

/// A non-negative rational number, as found in protocol parameters and committee quorums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RationalNumber(Ratio<u64>);

/// A rational in the range [0; 1]. Bounds are the producer's responsibility.
pub type UnitInterval = RationalNumber;

const RATIONAL_NUMBER_TAG: u64 = 30;

impl RationalNumber {
    /// `None` when the denominator is zero.
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        Some(Self(Ratio::new(numerator, denominator)))
    }

    pub fn numerator(&self) -> u64 {
        *self.0.numer()
    }

    pub fn denominator(&self) -> u64 {
        *self.0.denom()
    }
}

impl From<Ratio<u64>> for RationalNumber {
    fn from(ratio: Ratio<u64>) -> Self {
        Self(ratio)
    }
}

impl fmt::Display for RationalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator(), self.denominator())
    }
}

impl<C> cbor::encode::Encode<C> for RationalNumber {
    fn encode<W: cbor::encode::Write>(
        &self,
        e: &mut cbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), cbor::encode::Error<W::Error>> {
        e.tag(cbor::data::Tag::new(RATIONAL_NUMBER_TAG))?
            .array(2)?
            .u64(self.numerator())?
            .u64(self.denominator())?;
        Ok(())
    }
}

impl<'d, C> cbor::decode::Decode<'d, C> for RationalNumber {
    fn decode(d: &mut cbor::Decoder<'d>, _ctx: &mut C) -> Result<Self, cbor::decode::Error> {
        let tag = d.tag()?;
        if tag != cbor::data::Tag::new(RATIONAL_NUMBER_TAG) {
            return Err(cbor::decode::Error::message(format!(
                "unexpected tag {} for rational number; expected {RATIONAL_NUMBER_TAG}",
                tag.as_u64()
            )));
        }

        if d.array()? != Some(2) {
            return Err(cbor::decode::Error::message(
                "rational number must be an array of 2 elements",
            ));
        }

        let numerator = d.u64()?;
        let denominator = d.u64()?;
        RationalNumber::new(numerator, denominator)
            .ok_or_else(|| cbor::decode::Error::message("rational number with a zero denominator"))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod tests {
    use super::RationalNumber;
    use proptest::prelude::*;

    prop_compose! {
        pub fn any_rational_number()(
            numerator in 0u64..1000,
            denominator in 1u64..1000,
        ) -> RationalNumber {
            RationalNumber(num::rational::Ratio::new(numerator, denominator))
        }
    }

    #[cfg(test)]
    mod internal {
        use super::*;
        use crate::cbor;

        #[test]
        fn zero_denominator_is_rejected() {
            assert_eq!(RationalNumber::new(1, 0), None);
        }

        #[test]
        fn equality_is_on_values() {
            assert_eq!(RationalNumber::new(2, 4), RationalNumber::new(1, 2));
        }

        #[test]
        fn decode_rejects_zero_denominator() {
            // tag(30) [1, 0]
            let bytes = [0xd8, 0x1e, 0x82, 0x01, 0x00];
            assert!(cbor::decode::<RationalNumber>(&bytes).is_err());
        }

        proptest! {
            #[test]
            fn cbor_roundtrip(r in any_rational_number()) {
                let bytes = cbor::to_vec(r).unwrap();
                prop_assert_eq!(cbor::decode::<RationalNumber>(&bytes).unwrap(), r);
            }
        }
    }
}
