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

//! Error types shared by the registry, the task executor and the session runner.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Problems with the loaded hosts, tasks and drivers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("task '{task}' collides with a host of the same name")]
    TaskCollidesWithHost { task: String },

    #[error("task '{task}' collides with a tag of the same name")]
    TaskCollidesWithTag { task: String },

    #[error("tag '{tag}' collides with a host of the same name")]
    TagCollidesWithHost { tag: String },

    #[error("task '{task}' refers to an unknown driver '{driver}'")]
    UnknownDriver { task: String, driver: String },

    #[error("task '{task}' defines both an inline script and a script file")]
    ScriptAndFile { task: String },

    #[error("invalid configuration file {}: {source}", path.display())]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Problems turning a task's selections into a host list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("filters require at least one selection (use --select or --target)")]
    FilterWithoutSelection,

    #[error("task '{task}' has no hosts to run on; specify valid targets")]
    NoHosts { task: String },

    #[error("remote task '{task}' needs at least one target")]
    RemoteWithoutTargets { task: String },
}

/// Failures while producing a script or prefix from templates.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("driver '{driver}' failed to provide a template: {source:#}")]
    Engine {
        driver: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read script file '{}': {source}", path.display())]
    ScriptFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

/// Failures of a task run.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("prepare step of task '{task}' failed: {source:#}")]
    Prepare {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to render script for {target}: {source}")]
    Render {
        target: String,
        #[source]
        source: RenderError,
    },

    #[error("failed to start '{program}' for {target}: {source}")]
    Spawn {
        target: String,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{target}: failed while waiting for the command: {source}")]
    Wait {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("{target}: command exited with {status}")]
    Failed { target: String, status: ExitStatus },

    #[error("{target}: terminated after another host failed")]
    Cancelled { target: String },

    #[error("a host worker crashed: {0}")]
    Crashed(#[from] tokio::task::JoinError),

    #[error("parallel run aborted: {source}")]
    FailFast {
        #[source]
        source: Box<ExecutorError>,
    },
}

impl ExecutorError {
    /// Host name (or `local`) the failure belongs to, when there is one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Render { target, .. }
            | Self::Spawn { target, .. }
            | Self::Wait { target, .. }
            | Self::Failed { target, .. }
            | Self::Cancelled { target } => Some(target),
            Self::FailFast { source } => source.target(),
            _ => None,
        }
    }
}

/// Which host hook list is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeConnect,
    AfterConnect,
    AfterDisconnect,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeConnect => "before_connect",
            Self::AfterConnect => "after_connect",
            Self::AfterDisconnect => "after_disconnect",
        })
    }
}

/// Failures around interactive sessions and their hooks.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook chain is deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("hook callable failed: {0:#}")]
    Callable(anyhow::Error),

    #[error("{phase} hook exited with {status}")]
    CommandFailed { phase: HookPhase, status: ExitStatus },

    #[error("failed to run {phase} hook: {source}")]
    Io {
        phase: HookPhase,
        #[source]
        source: io::Error,
    },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}
