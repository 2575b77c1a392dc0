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

use crate::{
    ledger_state_file::{LedgerStateFile, PARTIAL_EXTENSION},
    StoreError,
};
use lstate_kernel::{Point, Slot};
use lstate_ledger::{codec, LedgerCheckpoint, LedgerState};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub const EVENT_TARGET: &str = "lstate::stores::fs";

pub const DEFAULT_KEEP_REGULAR: usize = 2;

pub const DEFAULT_KEEP_EPOCH_BOUNDARY: usize = 3;

/// How many snapshots survive a sweep, for each kind of snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_regular: usize,
    pub keep_epoch_boundary: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_regular: DEFAULT_KEEP_REGULAR,
            keep_epoch_boundary: DEFAULT_KEEP_EPOCH_BOUNDARY,
        }
    }
}

/// All snapshot files found in `dir`, oldest first. Files that don't follow the naming scheme are
/// reported and ignored; in-progress `.partial` files are ignored silently.
pub fn list_snapshots(dir: &Path) -> Result<Vec<LedgerStateFile>, StoreError> {
    let mut snapshots = Vec::new();

    for entry in fs::read_dir(dir).map_err(StoreError::io(dir))? {
        let entry = entry.map_err(StoreError::io(dir))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        match LedgerStateFile::from_path(&path) {
            Ok(file) => {
                debug!(
                    target: EVENT_TARGET,
                    slot = %file.slot,
                    epoch = ?file.epoch,
                    "list.found_snapshot"
                );
                snapshots.push(file);
            }
            Err(_) if is_partial(&path) => {}
            Err(reason) => {
                warn!(
                    target: EVENT_TARGET,
                    filename = %path.display(),
                    %reason,
                    "list.unexpected_file"
                );
            }
        }
    }

    snapshots.sort_by(|a, b| (a.slot, a.hash).cmp(&(b.slot, b.hash)));

    Ok(snapshots)
}

fn is_partial(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(PARTIAL_EXTENSION)
}

/// Write `bytes` to `<path>.partial`, flush it to disk, then move it to `path`. A crash leaves
/// either the previous content of `path` or the new one, plus possibly a stale partial file.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp_path = path.with_extension(PARTIAL_EXTENSION);

    let mut file = fs::File::create(&tmp_path).map_err(StoreError::io(&tmp_path))?;
    file.write_all(bytes).map_err(StoreError::io(&tmp_path))?;
    file.sync_all().map_err(StoreError::io(&tmp_path))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(StoreError::io(path))
}

/// Remove leftovers of interrupted writes. Returns the removed paths.
pub fn remove_partial_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut removed = Vec::new();

    for entry in fs::read_dir(dir).map_err(StoreError::io(dir))? {
        let path = entry.map_err(StoreError::io(dir))?.path();
        if path.is_file() && is_partial(&path) {
            fs::remove_file(&path).map_err(StoreError::io(&path))?;
            info!(target: EVENT_TARGET, filename = %path.display(), "partial.removed");
            removed.push(path);
        }
    }

    Ok(removed)
}

/// Apply the retention policy right after `written` has been persisted.
///
/// Snapshots past `written` (or at the same slot but on another fork) are leftovers of an
/// abandoned chain and always go. Of the remaining ones, only the most recent regular and
/// epoch-boundary snapshots are kept, each kind counted separately.
pub fn sweep(
    dir: &Path,
    written: &LedgerStateFile,
    retention: RetentionPolicy,
) -> Result<Vec<PathBuf>, StoreError> {
    let snapshots = list_snapshots(dir)?;
    let written = written.point();

    let (stale, mut retained): (Vec<_>, Vec<_>) = snapshots
        .into_iter()
        .partition(|file| is_past(file, &written));

    retained.reverse();

    let (epoch_boundaries, regulars): (Vec<_>, Vec<_>) = retained
        .into_iter()
        .partition(LedgerStateFile::is_epoch_boundary);

    let obsolete = stale
        .into_iter()
        .chain(regulars.into_iter().skip(retention.keep_regular))
        .chain(epoch_boundaries.into_iter().skip(retention.keep_epoch_boundary));

    let mut removed = Vec::new();
    for file in obsolete {
        fs::remove_file(&file.path).map_err(StoreError::io(&file.path))?;
        debug!(target: EVENT_TARGET, filename = %file.path.display(), "sweep.removed");
        removed.push(file.path);
    }

    Ok(removed)
}

/// Remove every snapshot that isn't on the chain ending at `point`: those past its slot, and those
/// at its slot on another fork. Returns the removed paths.
pub fn remove_after(dir: &Path, point: &Point) -> Result<Vec<PathBuf>, StoreError> {
    let mut removed = Vec::new();

    for file in list_snapshots(dir)? {
        if is_past(&file, point) {
            fs::remove_file(&file.path).map_err(StoreError::io(&file.path))?;
            debug!(target: EVENT_TARGET, filename = %file.path.display(), "rollback.removed");
            removed.push(file.path);
        }
    }

    Ok(removed)
}

fn is_past(file: &LedgerStateFile, point: &Point) -> bool {
    let slot = point.slot_or_default();
    file.slot > slot || (file.slot == slot && file.hash != point.hash())
}

/// Read and decode a single snapshot, checking that it holds the state its name advertises.
pub fn load_snapshot<S: LedgerState>(
    file: &LedgerStateFile,
) -> Result<LedgerCheckpoint<S>, StoreError> {
    let bytes = fs::read(&file.path).map_err(StoreError::io(&file.path))?;

    let (state, epoch_block_no) =
        codec::decode::<S>(&bytes).map_err(|source| StoreError::Decode {
            path: file.path.clone(),
            source,
        })?;

    let checkpoint = LedgerCheckpoint::new(state, epoch_block_no);

    let expected = file.point();
    if checkpoint.tip() != &expected {
        return Err(StoreError::TipMismatch {
            path: file.path.clone(),
            expected,
            actual: *checkpoint.tip(),
        });
    }

    Ok(checkpoint)
}

/// Find the most recent snapshot at or below `target` (any, when `None`) that can be loaded.
/// Snapshots that can't be read are skipped; returns `None` when nothing usable is found.
pub fn restore_latest<S: LedgerState>(
    dir: &Path,
    target: Option<Slot>,
) -> Result<Option<(LedgerStateFile, LedgerCheckpoint<S>)>, StoreError> {
    let snapshots = list_snapshots(dir)?;

    for file in snapshots.into_iter().rev() {
        if target.is_some_and(|target| file.slot > target) {
            continue;
        }

        match load_snapshot::<S>(&file) {
            Ok(checkpoint) => {
                info!(
                    target: EVENT_TARGET,
                    slot = %file.slot,
                    epoch_block_no = %checkpoint.epoch_block_no,
                    "restore.found"
                );
                return Ok(Some((file, checkpoint)));
            }
            Err(reason) => {
                warn!(
                    target: EVENT_TARGET,
                    filename = %file.path.display(),
                    %reason,
                    "restore.skipping_unreadable"
                );
            }
        }
    }

    Ok(None)
}
