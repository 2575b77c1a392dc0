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

use lstate_ledger::codec;
use lstate_stores::{LedgerStateFile, StoreError};
use serde::Serialize;
use std::fs;

/// What can be told about a snapshot without knowing the type of the state it holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub slot: u64,
    pub epoch: Option<u64>,
    pub hash: String,
    pub epoch_block_no: String,
    pub size: u64,
    pub path: String,
}

impl SnapshotSummary {
    pub fn read(file: &LedgerStateFile) -> Result<Self, StoreError> {
        let bytes = fs::read(&file.path).map_err(|source| StoreError::Io {
            path: file.path.clone(),
            source,
        })?;

        let epoch_block_no =
            codec::decode_epoch_block_no(&bytes).map_err(|source| StoreError::Decode {
                path: file.path.clone(),
                source,
            })?;

        Ok(Self {
            slot: file.slot.as_u64(),
            epoch: file.epoch.map(u64::from),
            hash: file.hash.to_string(),
            epoch_block_no: epoch_block_no.to_string(),
            size: bytes.len() as u64,
            path: file.path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstate_kernel::{Epoch, EpochBlockNo};
    use lstate_ledger::testing::{fake_point, FakeState};
    use lstate_stores::fs::write_atomically;
    use tempfile::TempDir;

    #[test]
    fn summarise_without_decoding_the_state() {
        let dir = TempDir::new().unwrap();
        let file = LedgerStateFile::new(dir.path(), &fake_point(200), Some(Epoch::from(2)));
        let bytes = codec::encode(&FakeState::at(200), EpochBlockNo::EpochBoundaryBlock).unwrap();
        write_atomically(&file.path, &bytes).unwrap();

        let summary = SnapshotSummary::read(&file).unwrap();

        assert_eq!(summary.slot, 200);
        assert_eq!(summary.epoch, Some(2));
        assert_eq!(summary.hash, file.hash.to_string());
        assert_eq!(summary.epoch_block_no, EpochBlockNo::EpochBoundaryBlock.to_string());
        assert_eq!(summary.size, bytes.len() as u64);
    }

    #[test]
    fn truncated_snapshot() {
        let dir = TempDir::new().unwrap();
        let file = LedgerStateFile::new(dir.path(), &fake_point(200), None);
        let mut bytes = codec::encode(&FakeState::at(200), EpochBlockNo::Normal(3)).unwrap();
        bytes.truncate(bytes.len() - 4);
        write_atomically(&file.path, &bytes).unwrap();

        assert!(matches!(
            SnapshotSummary::read(&file),
            Err(StoreError::Decode { .. })
        ));
    }
}
