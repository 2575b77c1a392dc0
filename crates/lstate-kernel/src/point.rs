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

use crate::{cbor, HeaderHash, Slot, ORIGIN_HASH};
use std::fmt::{self, Debug, Display};

/// A position on the chain: either before the first block, or a block identified by its slot and
/// header hash.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Point {
    Origin,
    Specific(Slot, HeaderHash),
}

impl Point {
    pub fn slot_or_default(&self) -> Slot {
        match self {
            Point::Origin => Slot::from(0),
            Point::Specific(slot, _) => *slot,
        }
    }

    /// The slot of the point, `None` standing for the origin. `None` sorts below every slot.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Point::Origin => None,
            Point::Specific(slot, _) => Some(*slot),
        }
    }

    pub fn hash(&self) -> HeaderHash {
        match self {
            // By convention, the hash of `Origin` is all 0s.
            Point::Origin => ORIGIN_HASH,
            Point::Specific(_, header_hash) => *header_hash,
        }
    }
}

impl Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::Origin => write!(f, "Origin"),
            Point::Specific(slot, hash) => write!(f, "Specific({slot}, {hash})"),
        }
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.slot_or_default(), self.hash())
    }
}

/// Parse a point of the form '<slot>.<hash>', where `<slot>` is a number and `<hash>` is a
/// hex-encoded 32 bytes hash.
impl TryFrom<&str> for Point {
    type Error = String;

    fn try_from(raw_str: &str) -> Result<Self, Self::Error> {
        let (slot, hash) = raw_str
            .split_once('.')
            .ok_or("missing block header hash after '.'")?;

        let slot = slot
            .parse::<Slot>()
            .map_err(|_| "failed to parse point's slot as a non-negative integer")?;

        let hash = hash
            .parse::<HeaderHash>()
            .map_err(|_| "unable to decode block header hash from hex")?;

        Ok(Point::Specific(slot, hash))
    }
}

impl<C> cbor::encode::Encode<C> for Point {
    fn encode<W: cbor::encode::Write>(
        &self,
        e: &mut cbor::encode::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), cbor::encode::Error<W::Error>> {
        match self {
            Point::Origin => e.array(0)?,
            Point::Specific(slot, hash) => e.array(2)?.u64(slot.as_u64())?.bytes(hash.as_ref())?,
        };

        Ok(())
    }
}

impl<'b, C> cbor::decode::Decode<'b, C> for Point {
    fn decode(
        d: &mut cbor::decode::Decoder<'b>,
        _ctx: &mut C,
    ) -> Result<Self, cbor::decode::Error> {
        let size = d.array()?;

        match size {
            Some(0) => Ok(Point::Origin),
            Some(2) => {
                let slot = d.u64()?;
                let bytes: [u8; 32] = d
                    .bytes()?
                    .try_into()
                    .map_err(|_| cbor::decode::Error::message("header hash must be 32 bytes"))?;
                Ok(Point::Specific(Slot::from(slot), HeaderHash::new(bytes)))
            }
            _ => Err(cbor::decode::Error::message(
                "can't decode Point from array of size",
            )),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod tests {
    use super::Point;
    use crate::{hash::tests::any_hash32, Slot};
    use proptest::prelude::*;

    prop_compose! {
        pub fn any_point()(
            slot in any::<u64>(),
            hash in any_hash32(),
        ) -> Point {
            Point::Specific(Slot::from(slot), hash)
        }
    }

    #[cfg(test)]
    mod internal {
        use super::*;
        use crate::{cbor, hash::tests::header_hash};
        use test_case::test_case;

        #[test_case(Point::Origin => "Origin")]
        #[test_case(
            Point::Specific(Slot::from(42), header_hash(0xfe))
            => "Specific(42, fefefefefefefefefefefefefefefefefefefefefefefefefefefefefefefefe)";
            "specific"
        )]
        fn better_debug_point(point: Point) -> String {
            format!("{point:?}")
        }

        #[test_case(
            Point::Origin => "0.0000000000000000000000000000000000000000000000000000000000000000";
           "origin"
        )]
        #[test_case(
            Point::Specific(Slot::from(42), header_hash(0x01))
            => "42.0101010101010101010101010101010101010101010101010101010101010101";
            "specific"
        )]
        fn better_display_point(point: Point) -> String {
            format!("{point}")
        }

        #[test]
        fn test_parse_real_point() {
            let point = Point::try_from(
                "70070379.d6fe6439aed8bddc10eec22c1575bf0648e4a76125387d9e985e9a3f8342870d",
            )
            .unwrap();
            assert_eq!(point.slot(), Some(Slot::from(70070379)));
        }

        #[test_case("42" ; "missing hash")]
        #[test_case("foo.d6fe6439aed8bddc10eec22c1575bf0648e4a76125387d9e985e9a3f8342870d" ; "bad slot")]
        #[test_case("42.0123456789abcdef" ; "short hash")]
        fn test_parse_invalid_point(raw: &str) {
            assert!(Point::try_from(raw).is_err());
        }

        #[test]
        fn origin_sorts_before_any_specific_point() {
            assert!(Point::Origin < Point::Specific(Slot::from(0), header_hash(0)));
        }

        proptest! {
            #[test]
            fn cbor_roundtrip(point in prop_oneof![Just(Point::Origin), any_point()]) {
                let bytes = cbor::to_vec(point).unwrap();
                prop_assert_eq!(cbor::decode::<Point>(&bytes).unwrap(), point);
            }
        }
    }
}
