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

//! fleetsh runs shell tasks across a fleet of hosts described in YAML.
//!
//! Hosts, tasks and drivers live in a [`Registry`]. A task is rendered into
//! one shell script per host by its [`Driver`] and executed over `ssh`, or
//! locally, by a [`TaskExecutor`]. Anything that is not a task is handed to
//! the ssh client as an interactive session with the host's hooks.

pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod host;
pub mod query;
pub mod registry;
pub mod session;
pub mod ssh_config;
pub mod task;
pub mod ui;
pub mod utils;

pub use driver::Driver;
pub use error::{ConfigError, ExecutorError, HookError, RenderError, ResolutionError};
pub use executor::{Console, ExecutorOptions, TaskExecutor};
pub use hooks::HookValue;
pub use host::Host;
pub use query::resolve_hosts;
pub use registry::Registry;
pub use session::{run_interactive_session, SessionOptions};
pub use task::{Backend, Task};

/// Run `task` on the hosts it selects, with `args` visible to its templates.
pub async fn run_task(
    executor: &TaskExecutor,
    task: &Task,
    args: &[String],
) -> Result<(), ExecutorError> {
    executor.run_task(task, args).await
}
