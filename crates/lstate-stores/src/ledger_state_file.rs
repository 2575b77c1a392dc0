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

use lstate_kernel::{Epoch, HeaderHash, Point, Slot, ORIGIN_HASH};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_EXTENSION: &str = "lstate";

pub const PARTIAL_EXTENSION: &str = "partial";

const SEPARATOR: char = '-';

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FileNameError {
    #[error("missing '.{SNAPSHOT_EXTENSION}' extension")]
    MissingExtension,
    #[error("expected 3 '{SEPARATOR}'-separated fields, found {0}")]
    WrongFieldCount(usize),
    #[error("invalid slot: {0:?}")]
    InvalidSlot(String),
    #[error("invalid epoch: {0:?}")]
    InvalidEpoch(String),
    #[error("invalid header hash: {0:?}")]
    InvalidHash(String),
}

/// A ledger snapshot on disk, named `<slot>-<epoch>-<hash>.lstate`.
///
/// The epoch is only present for snapshots taken at an epoch boundary, which are retained for
/// longer; the name of a regular snapshot reads `<slot>--<hash>.lstate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerStateFile {
    pub slot: Slot,
    pub hash: HeaderHash,
    pub epoch: Option<Epoch>,
    pub path: PathBuf,
}

impl LedgerStateFile {
    pub fn new(dir: &Path, point: &Point, epoch: Option<Epoch>) -> Self {
        let slot = point.slot_or_default();
        let hash = point.hash();
        Self {
            slot,
            hash,
            epoch,
            path: dir.join(file_name(slot, &hash, epoch)),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, FileNameError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(FileNameError::MissingExtension)?;

        let (slot, epoch, hash) = parse_file_name(name)?;

        Ok(Self {
            slot,
            hash,
            epoch,
            path: path.to_path_buf(),
        })
    }

    /// The chain point of the state held by the file. By convention, slot 0 with a null hash is
    /// the origin.
    pub fn point(&self) -> Point {
        if self.slot == Slot::from(0) && self.hash == ORIGIN_HASH {
            Point::Origin
        } else {
            Point::Specific(self.slot, self.hash)
        }
    }

    pub fn is_epoch_boundary(&self) -> bool {
        self.epoch.is_some()
    }

    /// Where the file is written before being moved in place.
    pub fn partial_path(&self) -> PathBuf {
        self.path.with_extension(PARTIAL_EXTENSION)
    }
}

pub fn file_name(slot: Slot, hash: &HeaderHash, epoch: Option<Epoch>) -> String {
    let epoch = epoch.map(|epoch| epoch.to_string()).unwrap_or_default();
    format!("{slot}{SEPARATOR}{epoch}{SEPARATOR}{hash}.{SNAPSHOT_EXTENSION}")
}

pub fn parse_file_name(name: &str) -> Result<(Slot, Option<Epoch>, HeaderHash), FileNameError> {
    let stem = name
        .strip_suffix(SNAPSHOT_EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
        .ok_or(FileNameError::MissingExtension)?;

    let fields = stem.split(SEPARATOR).collect::<Vec<_>>();
    let [slot, epoch, hash] = fields.as_slice() else {
        return Err(FileNameError::WrongFieldCount(fields.len()));
    };

    let slot = slot
        .parse::<Slot>()
        .map_err(|_| FileNameError::InvalidSlot(slot.to_string()))?;

    let epoch = if epoch.is_empty() {
        None
    } else {
        Some(
            epoch
                .parse::<Epoch>()
                .map_err(|_| FileNameError::InvalidEpoch(epoch.to_string()))?,
        )
    };

    let hash = hash
        .parse::<HeaderHash>()
        .map_err(|_| FileNameError::InvalidHash(hash.to_string()))?;

    Ok((slot, epoch, hash))
}

/// A place a ledger state can be recovered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotPoint {
    OnDisk(LedgerStateFile),
    InMemory(Point),
}

impl SnapshotPoint {
    pub fn point(&self) -> Point {
        match self {
            SnapshotPoint::OnDisk(file) => file.point(),
            SnapshotPoint::InMemory(point) => *point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstate_kernel::tests::header_hash;
    use test_case::test_case;

    const HASH: &str = "0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a";

    #[test_case(4492800, Some(209) => format!("4492800-209-{HASH}.lstate"); "epoch boundary")]
    #[test_case(4492900, None => format!("4492900--{HASH}.lstate"); "regular")]
    fn format_file_name(slot: u64, epoch: Option<u64>) -> String {
        file_name(Slot::from(slot), &header_hash(0x0a), epoch.map(Epoch::from))
    }

    #[test_case(&format!("4492800-209-{HASH}.lstate") => Ok((Slot::from(4492800), Some(Epoch::from(209)), header_hash(0x0a))))]
    #[test_case(&format!("4492900--{HASH}.lstate") => Ok((Slot::from(4492900), None, header_hash(0x0a))))]
    #[test_case(&format!("4492900--{HASH}.partial") => Err(FileNameError::MissingExtension))]
    #[test_case(&format!("4492900-{HASH}.lstate") => Err(FileNameError::WrongFieldCount(2)))]
    #[test_case(&format!("4492900-1-2-{HASH}.lstate") => Err(FileNameError::WrongFieldCount(4)))]
    #[test_case(&format!("-1-{HASH}.lstate") => Err(FileNameError::InvalidSlot(String::new())))]
    #[test_case(&format!("10-x-{HASH}.lstate") => Err(FileNameError::InvalidEpoch("x".to_string())))]
    #[test_case("10--abcd.lstate" => Err(FileNameError::InvalidHash("abcd".to_string())))]
    #[test_case("lstate" => Err(FileNameError::MissingExtension))]
    fn parse(name: &str) -> Result<(Slot, Option<Epoch>, HeaderHash), FileNameError> {
        parse_file_name(name)
    }

    #[test]
    fn path_roundtrip() {
        let dir = Path::new("/var/lib/lstate");
        let point = Point::Specific(Slot::from(42), header_hash(0x0a));
        let file = LedgerStateFile::new(dir, &point, Some(Epoch::from(3)));

        assert_eq!(LedgerStateFile::from_path(&file.path), Ok(file.clone()));
        assert_eq!(file.point(), point);
        assert!(file.is_epoch_boundary());
        assert_eq!(
            file.partial_path(),
            dir.join(format!("42-3-{HASH}.partial"))
        );
    }

    #[test]
    fn origin_roundtrip() {
        let file = LedgerStateFile::new(Path::new("."), &Point::Origin, Some(Epoch::from(0)));
        assert_eq!(file.point(), Point::Origin);
        assert_eq!(SnapshotPoint::OnDisk(file).point(), Point::Origin);
    }
}
