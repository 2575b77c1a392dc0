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

//! Process-wide ledger state for chain indexers: a rollback window of checkpoints in memory,
//! periodically persisted to disk so that a restart doesn't replay the chain.

pub mod config;
pub mod environment;
pub mod observability;
pub mod panic;
pub mod summary;

pub use config::LedgerConfig;
pub use environment::{LedgerEnvironment, LedgerError};
