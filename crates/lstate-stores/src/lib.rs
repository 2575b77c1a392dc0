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

use lstate_kernel::Point;
use lstate_ledger::codec::DecodeError;
use std::{io, path::PathBuf};

pub mod fs;
pub mod ledger_state_file;
pub mod writer;

pub use ledger_state_file::{LedgerStateFile, SnapshotPoint};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to decode snapshot {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("not a snapshot file: {}", .0.display())]
    NotASnapshot(PathBuf),
    #[error("snapshot {} holds a state at {actual}, not {expected}", path.display())]
    TipMismatch {
        path: PathBuf,
        expected: Point,
        actual: Point,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
