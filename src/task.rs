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

//! Task definitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::driver::DEFAULT_DRIVER_NAME;
use crate::error::RenderError;

/// Where a task's script runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Remote,
    Local,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remote => "remote",
            Self::Local => "local",
        })
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => Err(format!(
                "invalid backend '{other}' (expected 'remote' or 'local')"
            )),
        }
    }
}

/// One piece of a task script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptFragment {
    pub name: Option<String>,
    pub code: String,
}

impl ScriptFragment {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            name: None,
            code: code.into(),
        }
    }
}

/// Which configuration layer defined a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Global,
    Local,
}

/// Registry scope exported into generated scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryScope {
    pub kind: RegistryKind,
    pub data_dir: PathBuf,
}

/// Runs in-process before host resolution.
pub type PrepareFn = Arc<dyn Fn(&Task) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Serialize)]
pub struct Task {
    pub name: String,
    /// Public name override, used for lookups and listing.
    pub alias: Option<String>,
    pub description: String,
    pub hidden: bool,
    pub disabled: bool,
    pub script: Vec<ScriptFragment>,
    /// Script read from disk instead of `script`.
    pub file: Option<PathBuf>,
    pub driver: Option<String>,
    pub targets: Vec<String>,
    pub filters: Vec<String>,
    pub backend: Backend,
    pub parallel: bool,
    pub privileged: bool,
    pub user: Option<String>,
    pub pty: bool,
    pub use_prefix: bool,
    /// Prefix template; an empty string selects the backend default.
    pub prefix: String,
    #[serde(skip)]
    pub prepare: Option<PrepareFn>,
    pub registry: Option<RegistryScope>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            description: String::new(),
            hidden: false,
            disabled: false,
            script: Vec::new(),
            file: None,
            driver: None,
            targets: Vec::new(),
            filters: Vec::new(),
            backend: Backend::Remote,
            parallel: false,
            privileged: false,
            user: None,
            pty: false,
            use_prefix: false,
            prefix: String::new(),
            prepare: None,
            registry: None,
        }
    }

    pub fn public_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn driver_name(&self) -> &str {
        self.driver.as_deref().unwrap_or(DEFAULT_DRIVER_NAME)
    }

    pub fn is_remote(&self) -> bool {
        self.backend == Backend::Remote
    }

    /// The account to switch to. A non-empty `user` wins over `privileged`.
    pub fn escalation_user(&self) -> Option<&str> {
        self.user.as_deref().filter(|user| !user.is_empty())
    }

    /// True when the script has to be wrapped in `sudo`.
    pub fn needs_escalation(&self) -> bool {
        self.privileged || self.escalation_user().is_some()
    }

    /// Script fragments to render, loading `file` when set.
    pub fn script_fragments(&self) -> Result<Vec<ScriptFragment>, RenderError> {
        match &self.file {
            Some(path) => {
                let code =
                    std::fs::read_to_string(path).map_err(|source| RenderError::ScriptFile {
                        path: path.clone(),
                        source,
                    })?;
                Ok(vec![ScriptFragment {
                    name: Some(path.display().to_string()),
                    code,
                }])
            }
            None => Ok(self.script.clone()),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("backend", &self.backend)
            .field("targets", &self.targets)
            .field("filters", &self.filters)
            .field("parallel", &self.parallel)
            .field("driver", &self.driver)
            .field("prepare", &self.prepare.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}
