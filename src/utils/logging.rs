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

use tracing_subscriber::EnvFilter;

/// Map `--verbose` counts to a filter. `RUST_LOG` takes precedence when set.
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            0 => EnvFilter::new("fleetsh=warn"),
            1 => EnvFilter::new("fleetsh=info"),
            2 => EnvFilter::new("fleetsh=debug"),
            _ => EnvFilter::new("fleetsh=trace"),
        }
    }
}

/// Effective verbosity: `--debug` is at least debug level.
pub fn effective_verbosity(verbose: u8, debug: bool) -> u8 {
    if debug {
        verbose.max(2)
    } else {
        verbose
    }
}

/// Install the global subscriber. Logs always go to stderr so they never
/// mix with task output on stdout.
pub fn init_logging(verbosity: u8) {
    let filter = create_env_filter(verbosity);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 3)
        .with_writer(std::io::stderr)
        .try_init();
}
