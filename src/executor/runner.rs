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

//! Task execution across resolved hosts.
//!
//! A run goes through four stages: the task's prepare step, host resolution,
//! rendering of every script and prefix, and dispatch. Nothing is spawned
//! until every host has rendered successfully. Hosts run one after another
//! or concurrently; a concurrent run is torn down as soon as one host fails.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::command::{local_command, remote_command, CommandSpec};
use super::console::{Console, OutputStream};
use super::pump::{self, Chunk};
use crate::driver::{generate, render_prefix, Driver, RenderContext};
use crate::error::{ConfigError, ExecutorError, RenderError, ResolutionError};
use crate::host::Host;
use crate::query::{check_selection, HostQuery};
use crate::registry::Registry;
use crate::task::{Backend, Task};

pub const DEFAULT_REMOTE_PREFIX: &str = "[remote:{{ host.name }}]{{ hostname_align(\" \") }} ";
pub const DEFAULT_LOCAL_PREFIX: &str = "[local:{{ host.name }}]{{ hostname_align(\" \") }} ";
/// Prefix of a local run that has no hosts.
pub const HOSTLESS_PREFIX: &str = "[local] ";

/// Target name used in errors and logs for a run without hosts.
const HOSTLESS_TARGET: &str = "local";

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// ssh client used for remote hosts.
    pub ssh_program: String,
    /// Directory local commands start in.
    pub working_dir: PathBuf,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// One host's share of a run, fully rendered.
struct HostUnit {
    target: String,
    command: CommandSpec,
    prefix: Arc<str>,
    /// Wire the child straight to the terminal instead of scanning lines.
    direct_output: bool,
}

enum UnitInput {
    Channel(mpsc::Receiver<Chunk>),
    Console,
}

pub struct TaskExecutor {
    registry: Arc<Registry>,
    ssh_config_path: PathBuf,
    console: Arc<Console>,
    options: ExecutorOptions,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<Registry>,
        ssh_config_path: impl Into<PathBuf>,
        console: Arc<Console>,
    ) -> Self {
        Self {
            registry,
            ssh_config_path: ssh_config_path.into(),
            console,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ssh_config_path(&self) -> &Path {
        &self.ssh_config_path
    }

    /// Run `task` with `args` exposed to its templates.
    pub async fn run_task(&self, task: &Task, args: &[String]) -> Result<(), ExecutorError> {
        debug!(task = task.public_name(), ?args, "running task");

        if let Some(prepare) = task.prepare.clone() {
            let owned = task.clone();
            let prepared = match tokio::task::spawn_blocking(move || prepare(&owned)).await {
                Ok(result) => result,
                Err(err) => match err.try_into_panic() {
                    Ok(panic) => std::panic::resume_unwind(panic),
                    Err(err) => return Err(ExecutorError::Crashed(err)),
                },
            };
            prepared.map_err(|source| ExecutorError::Prepare {
                task: task.public_name().to_string(),
                source,
            })?;
        }

        let driver = self
            .registry
            .driver(task.driver_name())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownDriver {
                task: task.public_name().to_string(),
                driver: task.driver_name().to_string(),
            })?;

        let hosts = self.resolve_targets(task)?;
        if hosts.is_empty() {
            return self.run_without_hosts(task, &driver, args).await;
        }

        let units = self.plan(task, &driver, &hosts, args)?;
        info!(
            task = task.public_name(),
            hosts = units.len(),
            parallel = task.parallel,
            "dispatching task"
        );

        let (senders, receivers) = pump::channels(units.len());
        let stdin_pump = self
            .console
            .take_input()
            .map(|input| pump::spawn_stdin_pump(input, senders));

        let result = if task.parallel {
            self.run_parallel(units, receivers).await
        } else {
            self.run_sequential(units, receivers).await
        };

        if let Some(handle) = stdin_pump {
            handle.abort();
        }
        result
    }

    fn resolve_targets(&self, task: &Task) -> Result<Vec<Arc<Host>>, ResolutionError> {
        check_selection(&task.targets, &task.filters)?;

        if task.targets.is_empty() {
            return match task.backend {
                Backend::Local => Ok(Vec::new()),
                Backend::Remote => Err(ResolutionError::RemoteWithoutTargets {
                    task: task.public_name().to_string(),
                }),
            };
        }

        let hosts = HostQuery::new(&self.registry)
            .select(&task.targets)
            .filter(&task.filters)
            .resolve();
        if hosts.is_empty() {
            return Err(ResolutionError::NoHosts {
                task: task.public_name().to_string(),
            });
        }
        Ok(hosts)
    }

    fn prefix_for(&self, task: &Task, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        if !task.use_prefix {
            return Ok(String::new());
        }
        let template = match (task.prefix.is_empty(), task.backend) {
            (false, _) => task.prefix.as_str(),
            (true, Backend::Remote) => DEFAULT_REMOTE_PREFIX,
            (true, Backend::Local) => DEFAULT_LOCAL_PREFIX,
        };
        render_prefix(template, ctx)
    }

    /// Render every host's script, prefix and command line.
    fn plan(
        &self,
        task: &Task,
        driver: &Driver,
        hosts: &[Arc<Host>],
        args: &[String],
    ) -> Result<Vec<HostUnit>, ExecutorError> {
        let single = hosts.len() <= 1;

        hosts
            .iter()
            .map(|host| {
                let ctx = RenderContext {
                    ssh_config: &self.ssh_config_path,
                    task,
                    host: Some(host.as_ref()),
                    hosts,
                    args,
                };
                let script = generate(driver, &ctx).map_err(|source| ExecutorError::Render {
                    target: host.name.clone(),
                    source,
                })?;
                let prefix = self
                    .prefix_for(task, &ctx)
                    .map_err(|source| ExecutorError::Render {
                        target: host.name.clone(),
                        source,
                    })?;

                let command = match task.backend {
                    Backend::Remote => remote_command(
                        &self.options.ssh_program,
                        &self.ssh_config_path,
                        task,
                        host,
                        &script,
                    ),
                    Backend::Local => local_command(task, &self.options.working_dir, &script),
                };

                Ok(HostUnit {
                    target: host.name.clone(),
                    command,
                    direct_output: single && prefix.is_empty() && self.console.inherits_stdio(),
                    prefix: Arc::from(prefix),
                })
            })
            .collect()
    }

    async fn run_without_hosts(
        &self,
        task: &Task,
        driver: &Driver,
        args: &[String],
    ) -> Result<(), ExecutorError> {
        let ctx = RenderContext {
            ssh_config: &self.ssh_config_path,
            task,
            host: None,
            hosts: &[],
            args,
        };
        let render_error = |source| ExecutorError::Render {
            target: HOSTLESS_TARGET.to_string(),
            source,
        };

        let script = generate(driver, &ctx).map_err(render_error)?;
        let prefix = match (task.use_prefix, task.prefix.is_empty()) {
            (false, _) => String::new(),
            (true, true) => HOSTLESS_PREFIX.to_string(),
            (true, false) => render_prefix(&task.prefix, &ctx).map_err(render_error)?,
        };

        let unit = HostUnit {
            target: HOSTLESS_TARGET.to_string(),
            command: local_command(task, &self.options.working_dir, &script),
            direct_output: prefix.is_empty() && self.console.inherits_stdio(),
            prefix: Arc::from(prefix),
        };
        run_unit(
            Arc::clone(&self.console),
            unit,
            UnitInput::Console,
            CancellationToken::new(),
        )
        .await
    }

    /// Hosts in order; the first failure stops the run.
    async fn run_sequential(
        &self,
        units: Vec<HostUnit>,
        receivers: Vec<mpsc::Receiver<Chunk>>,
    ) -> Result<(), ExecutorError> {
        let token = CancellationToken::new();
        for (unit, rx) in units.into_iter().zip(receivers) {
            run_unit(
                Arc::clone(&self.console),
                unit,
                UnitInput::Channel(rx),
                token.clone(),
            )
            .await?;
        }
        Ok(())
    }

    /// All hosts at once. The first failure is reported, the remaining hosts
    /// are killed, and the run returns once every worker has finished.
    async fn run_parallel(
        &self,
        units: Vec<HostUnit>,
        receivers: Vec<mpsc::Receiver<Chunk>>,
    ) -> Result<(), ExecutorError> {
        let token = CancellationToken::new();
        let mut workers = JoinSet::new();
        for (unit, rx) in units.into_iter().zip(receivers) {
            workers.spawn(run_unit(
                Arc::clone(&self.console),
                unit,
                UnitInput::Channel(rx),
                token.clone(),
            ));
        }

        let mut first_failure: Option<ExecutorError> = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(ExecutorError::Crashed(e)));
            match outcome {
                Ok(()) => {}
                Err(ExecutorError::Cancelled { target }) => {
                    debug!(%target, "host stopped after an earlier failure");
                }
                Err(err) if first_failure.is_none() => {
                    self.console.report_error(&err);
                    token.cancel();
                    first_failure = Some(err);
                }
                Err(err) => debug!("additional failure during abort: {err}"),
            }
        }

        match first_failure {
            Some(err) => Err(ExecutorError::FailFast {
                source: Box::new(err),
            }),
            None => Ok(()),
        }
    }
}

/// Spawn one host's command, wire its streams and wait for it.
async fn run_unit(
    console: Arc<Console>,
    unit: HostUnit,
    input: UnitInput,
    token: CancellationToken,
) -> Result<(), ExecutorError> {
    let HostUnit {
        target,
        command,
        prefix,
        direct_output,
    } = unit;

    let inherit_input = matches!(input, UnitInput::Console) && console.inherits_stdio();

    let mut cmd = command.to_command();
    cmd.kill_on_drop(true);
    cmd.stdin(if inherit_input {
        Stdio::inherit()
    } else {
        Stdio::piped()
    });
    if direct_output {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    debug!(%target, command = %command, "spawning");
    let mut child = cmd.spawn().map_err(|source| ExecutorError::Spawn {
        target: target.clone(),
        program: command.program.clone(),
        source,
    })?;

    let writer = match (input, child.stdin.take()) {
        (UnitInput::Channel(rx), Some(stdin)) => {
            Some(pump::spawn_stdin_writer(rx, stdin, target.clone()))
        }
        (UnitInput::Console, Some(stdin)) => console
            .take_input()
            .map(|source| pump::spawn_stdin_copy(source, stdin, target.clone())),
        _ => None,
    };

    let mut scanners = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        scanners.push(pump::spawn_line_scanner(
            stdout,
            Arc::clone(&console),
            OutputStream::Stdout,
            Arc::clone(&prefix),
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        scanners.push(pump::spawn_line_scanner(
            stderr,
            Arc::clone(&console),
            OutputStream::Stderr,
            Arc::clone(&prefix),
        ));
    }

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = token.cancelled() => None,
    };

    if let Some(writer) = writer {
        writer.abort();
    }

    let status = match waited {
        Some(status) => status.map_err(|source| ExecutorError::Wait {
            target: target.clone(),
            source,
        })?,
        None => {
            if let Err(e) = child.kill().await {
                debug!(%target, "failed to kill command: {e}");
            }
            for scanner in scanners {
                scanner.abort();
            }
            return Err(ExecutorError::Cancelled { target });
        }
    };

    join_all(scanners).await;

    debug!(%target, %status, "command finished");
    if status.success() {
        Ok(())
    } else {
        Err(ExecutorError::Failed { target, status })
    }
}
