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

use anyhow::Context;
use clap::Parser;
use lstate::summary::SnapshotSummary;
use lstate_stores::LedgerStateFile;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct Args {
    /// Path to a `.lstate` snapshot file.
    #[arg(value_name = "FILE")]
    snapshot: PathBuf,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let file = LedgerStateFile::from_path(&args.snapshot)
        .with_context(|| format!("not a snapshot file: {}", args.snapshot.display()))?;

    let summary = SnapshotSummary::read(&file)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
