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

use clap::{Parser, Subcommand};
use lstate::{
    observability::{setup_observability, Color},
    panic::panic_handler,
};
use tracing::info;

mod cmd;

#[derive(Debug, Subcommand)]
enum Command {
    /// List the ledger snapshots found in a directory, oldest first.
    List(cmd::list::Args),

    /// Describe a single snapshot file: its point, epoch marker and epoch block number.
    Inspect(cmd::inspect::Args),

    /// Remove obsolete snapshots, as the snapshot writer does after each write.
    ///
    /// Snapshots past the reference slot are removed. Of the remaining ones, only the most
    /// recent regular and epoch-boundary snapshots are kept.
    #[clap(verbatim_doc_comment)]
    Prune(cmd::prune::Args),
}

#[derive(Debug, Parser)]
#[clap(name = "lstate")]
#[clap(bin_name = "lstate")]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[clap(long, action, env("LSTATE_WITH_JSON_TRACES"))]
    with_json_traces: bool,

    #[clap(long, action, env("LSTATE_COLOR"))]
    color: Option<Color>,
}

fn main() -> anyhow::Result<()> {
    panic_handler();

    let args = Cli::parse();

    setup_observability(args.with_json_traces, Color::is_enabled(args.color));

    info!(
        with_json_traces = args.with_json_traces,
        "Started with global arguments"
    );

    match args.command {
        Command::List(args) => cmd::list::run(args),
        Command::Inspect(args) => cmd::inspect::run(args),
        Command::Prune(args) => cmd::prune::run(args),
    }
}
