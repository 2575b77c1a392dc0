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

use std::process::exit;

/// Install a panic hook printing some diagnostics and asking the user to report the issue, then
/// terminating the process with a non-zero status.
pub fn panic_handler() {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let error_message = indoc::formatdoc! {
            r#"{fatal}
                Whoops! The lstate process panicked, rather than handling the error it encountered gracefully.

                The ledger state may have been left inconsistent: it was not persisted past its last snapshot.

                This is almost certainly a bug, and we'd appreciate a report.

                In your bug report please provide the information below and if possible the code
                that produced it.
                {info}

                "#,
            info = process_info(),
            fatal = "lstate::fatal::error",
        };
        eprintln!("\n{}", indent(&error_message, 3));
        prev(info);
        exit(1);
    }));
}

pub fn indent(lines: &str, n: usize) -> String {
    let tab = " ".repeat(n);
    lines
        .lines()
        .map(|line| format!("{tab}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn process_info() -> String {
    format!(
        r#"
Operating System: {}
Architecture:     {}
Version:          v{}"#,
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_every_line() {
        assert_eq!(indent("a\nb", 2), "  a\n  b");
        assert_eq!(indent("", 2), "");
    }

    #[test]
    fn info_mentions_version() {
        assert!(process_info().contains(env!("CARGO_PKG_VERSION")));
    }
}
