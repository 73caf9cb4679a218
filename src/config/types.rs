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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::task::Backend;

/// One configuration file.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,

    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,

    #[serde(default)]
    pub drivers: BTreeMap<String, DriverConfig>,
}

impl Config {
    /// Layer `other` on top of `self`. Entries are replaced by name.
    pub fn merge(&mut self, other: Config) {
        self.hosts.extend(other.hosts);
        self.tasks.extend(other.tasks);
        self.drivers.extend(other.drivers);
    }
}

/// A scalar as written in YAML. `Port: 22` and `Port: "22"` both work.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(default)]
pub struct HostConfig {
    pub description: String,
    pub tags: Vec<String>,
    pub hidden: bool,
    pub ssh_options: Vec<String>,
    pub ssh_config: BTreeMap<String, ConfigValue>,
    pub props: BTreeMap<String, ConfigValue>,
    pub hooks: HooksConfig,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(default)]
pub struct HooksConfig {
    pub before_connect: Vec<HookConfig>,
    pub after_connect: Vec<HookConfig>,
    pub after_disconnect: Vec<HookConfig>,
}

/// A hook entry.
///
/// A plain string is used as is. `{command: ...}` runs the command locally
/// when the hook fires and uses its trimmed stdout as the hook; empty output
/// means the hook does nothing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum HookConfig {
    Command { command: String },
    Script(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScriptConfig {
    Fragment {
        #[serde(default)]
        name: Option<String>,
        code: String,
    },
    Code(String),
}

/// `script:` accepts a single block or a list of fragments.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScriptSource {
    Single(String),
    List(Vec<ScriptConfig>),
}

impl Default for ScriptSource {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ScriptSource {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(code) => code.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }
}

/// `prefix: true` uses the default prefix, a string is a prefix template.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PrefixConfig {
    Enabled(bool),
    Template(String),
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TaskConfig {
    pub description: String,
    pub alias: Option<String>,
    pub hidden: bool,
    pub disabled: bool,
    pub script: ScriptSource,
    pub file: Option<PathBuf>,
    pub driver: Option<String>,
    pub targets: Vec<String>,
    pub filters: Vec<String>,
    pub backend: Backend,
    pub parallel: bool,
    pub privileged: bool,
    pub user: Option<String>,
    pub pty: bool,
    pub prefix: PrefixConfig,
    /// Local command run before the task resolves its hosts.
    pub prepare: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DriverConfig {
    pub template: String,
    pub props: BTreeMap<String, ConfigValue>,
}
