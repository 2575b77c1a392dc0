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

use clap::Parser;
use lstate::config::DEFAULT_LEDGER_DIR;
use lstate_kernel::Slot;
use lstate_stores::fs::{
    list_snapshots, sweep, RetentionPolicy, DEFAULT_KEEP_EPOCH_BOUNDARY, DEFAULT_KEEP_REGULAR,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
pub struct Args {
    /// Directory holding the ledger snapshots.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_LEDGER_DIR, env = "LSTATE_LEDGER_DIR")]
    ledger_dir: PathBuf,

    /// Number of regular snapshots to keep.
    #[arg(long, default_value_t = DEFAULT_KEEP_REGULAR)]
    keep: usize,

    /// Number of epoch-boundary snapshots to keep.
    #[arg(long, default_value_t = DEFAULT_KEEP_EPOCH_BOUNDARY)]
    keep_epoch_boundary: usize,

    /// Prune as if the most recent snapshot at or before this slot had just been written.
    /// Defaults to the most recent snapshot.
    #[arg(long, value_name = "SLOT")]
    at_slot: Option<u64>,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let snapshots = list_snapshots(&args.ledger_dir)?;

    let reference = snapshots
        .iter()
        .rev()
        .find(|file| args.at_slot.is_none_or(|slot| file.slot <= Slot::from(slot)));

    let Some(reference) = reference else {
        anyhow::bail!(
            "no snapshot to prune against in {}",
            args.ledger_dir.display()
        );
    };

    let removed = sweep(
        &args.ledger_dir,
        reference,
        RetentionPolicy {
            keep_regular: args.keep,
            keep_epoch_boundary: args.keep_epoch_boundary,
        },
    )?;

    for path in &removed {
        println!("{}", path.display());
    }

    info!(
        reference = %reference.slot,
        removed = removed.len(),
        "prune.done"
    );

    Ok(())
}
