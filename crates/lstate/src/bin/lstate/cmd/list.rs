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
use lstate::{config::DEFAULT_LEDGER_DIR, summary::SnapshotSummary};
use lstate_stores::fs::list_snapshots;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct Args {
    /// Directory holding the ledger snapshots.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_LEDGER_DIR, env = "LSTATE_LEDGER_DIR")]
    ledger_dir: PathBuf,

    /// Print one JSON object per snapshot instead of a table.
    #[arg(long)]
    json: bool,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    for file in list_snapshots(&args.ledger_dir)? {
        let summary = match SnapshotSummary::read(&file) {
            Ok(summary) => summary,
            Err(reason) => {
                warn!(filename = %file.path.display(), %reason, "list.unreadable_snapshot");
                continue;
            }
        };

        if args.json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!(
                "{:>12}  {:>6}  {}  {:<20}  {:>12}",
                summary.slot,
                summary.epoch.map(|epoch| epoch.to_string()).unwrap_or_default(),
                summary.hash,
                summary.epoch_block_no,
                summary.size,
            );
        }
    }

    Ok(())
}
