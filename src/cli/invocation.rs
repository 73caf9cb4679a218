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

//! Turning a parsed command line into one immutable [`Invocation`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};

use super::Cli;
use crate::registry::Registry;
use crate::task::{ScriptFragment, Task};

/// Name of the temporary task built by `--exec`.
pub const EXEC_TASK_NAME: &str = "--exec";

/// Host listing options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostListing {
    pub selections: Vec<String>,
    pub filters: Vec<String>,
    /// Print the selected hosts as ssh_config instead of a table.
    pub ssh_config: bool,
}

/// What one run of the binary does.
#[derive(Debug, Clone)]
pub enum Mode {
    Aliases,
    ListHosts(HostListing),
    ListTags,
    ListTasks,
    PrintConfig,
    GenConfig,
    Exec(Box<Task>),
    RunTask { task: Arc<Task>, args: Vec<String> },
    Usage,
    Session(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub quiet: bool,
    pub all: bool,
}

impl Invocation {
    /// Pick the mode for `cli`.
    ///
    /// `--aliases` wins over everything, then the listing flags, then
    /// `--print` and `--gen`, then `--exec`. A first argument naming an enabled task runs that task with
    /// the remaining arguments; any other arguments start an ssh session.
    pub fn from_cli(cli: &Cli, registry: &Registry) -> Result<Self> {
        let mode = if cli.aliases {
            Mode::Aliases
        } else if cli.hosts {
            Mode::ListHosts(HostListing {
                selections: cli.select.clone(),
                filters: cli.filter.clone(),
                ssh_config: cli.ssh_config,
            })
        } else if cli.tags {
            Mode::ListTags
        } else if cli.tasks {
            Mode::ListTasks
        } else if cli.print {
            Mode::PrintConfig
        } else if cli.gen {
            Mode::GenConfig
        } else if cli.exec {
            if cli.args.is_empty() {
                bail!("--exec requires a command to run");
            }
            Mode::Exec(Box::new(exec_task(cli)))
        } else {
            match cli.args.split_first() {
                None => Mode::Usage,
                Some((first, rest)) => match registry.enabled_task(first) {
                    Some(task) => Mode::RunTask {
                        task: Arc::clone(task),
                        args: rest.to_vec(),
                    },
                    None => Mode::Session(cli.args.clone()),
                },
            }
        };

        Ok(Self {
            mode,
            quiet: cli.quiet,
            all: cli.all,
        })
    }
}

/// Build the temporary task described by the `--exec` options.
pub fn exec_task(cli: &Cli) -> Task {
    let command = cli.args.join(" ");
    let mut task = Task::new(EXEC_TASK_NAME);

    if cli.script_file {
        task.file = Some(PathBuf::from(command));
    } else {
        task.script = vec![ScriptFragment::new(command)];
    }
    if let Some(backend) = cli.backend {
        task.backend = backend;
    }

    task.targets = cli.target.clone();
    task.filters = cli.filter.clone();
    task.parallel = cli.parallel;
    task.privileged = cli.privileged;
    task.user = cli.user.clone();
    task.pty = cli.pty;
    task.driver = cli.driver.clone();

    let prefix = cli.prefix_string.clone().unwrap_or_default();
    task.use_prefix = cli.prefix || !prefix.is_empty();
    task.prefix = prefix;
    task
}
