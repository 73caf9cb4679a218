// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

//! Terminal presentation helpers.

mod table;

pub use table::PlainTable;

/// Decide whether output is coloured.
///
/// An explicit `--color`/`--no-color` wins. Otherwise colours are used when
/// stdout is a terminal, `NO_COLOR` is unset and `TERM` is not `dumb`.
pub fn should_use_colors(explicit: Option<bool>) -> bool {
    if let Some(choice) = explicit {
        return choice;
    }

    if !atty::is(atty::Stream::Stdout) {
        return false;
    }

    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    !matches!(std::env::var("TERM").as_deref(), Ok("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_choice_wins() {
        assert!(should_use_colors(Some(true)));
        assert!(!should_use_colors(Some(false)));
    }
}
