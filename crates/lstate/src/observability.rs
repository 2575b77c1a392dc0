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

use std::{env::VarError, error::Error as _, io, io::IsTerminal, str::FromStr};
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::format::{FmtSpan, JsonFields},
    prelude::*,
    EnvFilter,
};

const LSTATE_LOG_VAR: &str = "LSTATE_LOG";

const DEFAULT_LSTATE_LOG_FILTER: &str = "lstate=info";

/// A notice stashed until the subscriber is installed.
type DelayedWarning = Option<Box<dyn FnOnce()>>;

/// Install the global subscriber: compact logs on stderr, or JSON lines on stdout.
pub fn setup_observability(with_json_traces: bool, color: bool) {
    let (filter, warning) = new_default_filter(LSTATE_LOG_VAR, DEFAULT_LSTATE_LOG_FILTER);

    if with_json_traces {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(tracing_subscriber::fmt::format().json().with_span_list(false))
                    .fmt_fields(JsonFields::new())
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .event_format(tracing_subscriber::fmt::format().with_ansi(color).compact())
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(filter),
            )
            .init();
    }

    if let Some(notify) = warning {
        notify();
    }
}

fn new_default_filter(var: &str, default: &str) -> (EnvFilter, DelayedWarning) {
    match EnvFilter::try_from_env(var) {
        Ok(filter) => (filter, None),
        Err(e) => {
            let fallback = default.to_string();
            let var = var.to_string();
            let warning = match e.source().and_then(|e| e.downcast_ref::<VarError>()) {
                Some(VarError::NotPresent) => {
                    Box::new(move || info!(var, fallback, "unspecified ENV variable"))
                        as Box<dyn FnOnce()>
                }
                _ => Box::new(move || warn!(var, fallback, reason = %e, "invalid ENV variable"))
                    as Box<dyn FnOnce()>,
            };

            #[expect(clippy::expect_used)]
            let filter = EnvFilter::try_new(default).expect("invalid default filter");
            (filter, Some(warning))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Never,
    Always,
    Auto,
}

impl FromStr for Color {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Color::Never),
            "always" => Ok(Color::Always),
            "auto" => Ok(Color::Auto),
            _ => Err("valid color settings are 'never', 'always' or 'auto'"),
        }
    }
}

impl Color {
    pub fn is_enabled(this: Option<Self>) -> bool {
        match this {
            Some(Color::Never) => false,
            Some(Color::Always) => true,
            Some(Color::Auto) => io::stderr().is_terminal(),
            None => {
                std::env::var("NO_COLOR").map_or(true, |s| s.is_empty())
                    && io::stderr().is_terminal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("never" => Ok(Color::Never))]
    #[test_case("always" => Ok(Color::Always))]
    #[test_case("auto" => Ok(Color::Auto))]
    #[test_case("sometimes" => matches Err(_))]
    fn parse_color(s: &str) -> Result<Color, &'static str> {
        s.parse()
    }

    #[test]
    fn explicit_color_settings() {
        assert!(Color::is_enabled(Some(Color::Always)));
        assert!(!Color::is_enabled(Some(Color::Never)));
    }

    #[test]
    fn default_filter_is_valid() {
        assert!(EnvFilter::try_new(DEFAULT_LSTATE_LOG_FILTER).is_ok());
    }
}
