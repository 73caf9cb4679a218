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

//! The `fleetsh` binary: setup, dispatch and exit codes.

mod dispatcher;
mod initialization;
mod utils;

use std::sync::Arc;

use fleetsh::cli::Cli;
use fleetsh::executor::{Console, EXIT_ERR};
use fleetsh::ui::should_use_colors;
use fleetsh::utils::init_logging;
use fleetsh::ExecutorError;

/// Run one invocation and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    init_logging(cli.verbosity());
    let console = Arc::new(Console::stdio(should_use_colors(cli.color_override())));

    let result = match initialization::initialize(&cli, Arc::clone(&console)).await {
        Ok(ctx) => dispatcher::dispatch(&cli, &ctx).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            // A parallel abort has already printed its cause.
            let reported = matches!(
                err.downcast_ref::<ExecutorError>(),
                Some(ExecutorError::FailFast { .. })
            );
            if !reported {
                console.report_error(&format_args!("{err:#}"));
            }
            EXIT_ERR
        }
    }
}
