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

use crate::{cbor, size, Hash};
use std::fmt;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, cbor::Encode, cbor::Decode,
)]
pub enum Credential {
    #[n(0)]
    Key(#[n(0)] Hash<{ size::CREDENTIAL }>),
    #[n(1)]
    Script(#[n(0)] Hash<{ size::CREDENTIAL }>),
}

impl Credential {
    pub fn as_hash(&self) -> &Hash<{ size::CREDENTIAL }> {
        match self {
            Credential::Key(hash) | Credential::Script(hash) => hash,
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Key(hash) => write!(f, "key:{hash}"),
            Credential::Script(hash) => write!(f, "script:{hash}"),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod tests {
    use super::Credential;
    use crate::{hash::tests::any_hash28, Hash};
    use proptest::prelude::*;

    pub fn any_credential() -> impl Strategy<Value = Credential> {
        prop_oneof![
            any_hash28().prop_map(Credential::Key),
            any_hash28().prop_map(Credential::Script),
        ]
    }

    /// A recognisable key credential: the given byte repeated.
    pub fn key_credential(byte: u8) -> Credential {
        Credential::Key(Hash::new([byte; 28]))
    }
}
