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

//! Turning parsed configuration into registry entries.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::types::{
    Config, ConfigValue, DriverConfig, HookConfig, HostConfig, PrefixConfig, ScriptConfig,
    ScriptSource, TaskConfig,
};
use super::utils::resolve_relative;
use crate::driver::Driver;
use crate::executor::command::local_shell;
use crate::hooks::{HookValue, HostHooks};
use crate::host::Host;
use crate::registry::Registry;
use crate::task::{PrepareFn, RegistryScope, ScriptFragment, Task};

impl Config {
    /// Add every entry to `registry`, replacing same-named ones.
    ///
    /// Relative script files are resolved against `base_dir`, the directory
    /// holding the configuration file.
    pub fn apply_to(self, registry: &mut Registry, scope: &RegistryScope, base_dir: &Path) {
        for (name, driver) in self.drivers {
            registry.add_driver(driver_from_config(name, driver));
        }
        for (name, host) in self.hosts {
            registry.add_host(host_from_config(name, host));
        }
        for (name, task) in self.tasks {
            registry.add_task(task_from_config(name, task, scope, base_dir));
        }
    }
}

fn stringify(values: BTreeMap<String, ConfigValue>) -> BTreeMap<String, String> {
    values
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect()
}

fn driver_from_config(name: String, config: DriverConfig) -> Driver {
    Driver::from_template(name, config.template).with_props(stringify(config.props))
}

fn host_from_config(name: String, config: HostConfig) -> Host {
    Host {
        name,
        description: config.description,
        tags: config.tags,
        hidden: config.hidden,
        ssh_options: config.ssh_options,
        ssh_config: stringify(config.ssh_config),
        props: stringify(config.props),
        hooks: HostHooks {
            before_connect: hooks_from_config(config.hooks.before_connect),
            after_connect: hooks_from_config(config.hooks.after_connect),
            after_disconnect: hooks_from_config(config.hooks.after_disconnect),
        },
    }
}

fn hooks_from_config(hooks: Vec<HookConfig>) -> Vec<HookValue> {
    hooks
        .into_iter()
        .map(|hook| match hook {
            HookConfig::Script(script) => HookValue::Literal(script),
            HookConfig::Command { command } => {
                HookValue::callable(move || command_hook(&command))
            }
        })
        .collect()
}

/// Run `command` locally; its trimmed stdout is the hook, empty means no-op.
fn command_hook(command: &str) -> Result<Option<HookValue>> {
    let (shell, flag) = local_shell();
    let output = Command::new(shell)
        .arg(flag)
        .arg(command)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("Failed to run hook command '{command}'"))?;

    if !output.status.success() {
        bail!("hook command '{command}' exited with {}", output.status);
    }

    let script = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!script.is_empty()).then(|| HookValue::Literal(script)))
}

fn scripts_from_config(source: ScriptSource) -> Vec<ScriptFragment> {
    match source {
        ScriptSource::Single(code) => vec![ScriptFragment::new(code)],
        ScriptSource::List(items) => items
            .into_iter()
            .map(|item| match item {
                ScriptConfig::Code(code) => ScriptFragment::new(code),
                ScriptConfig::Fragment { name, code } => ScriptFragment { name, code },
            })
            .collect(),
    }
}

fn task_from_config(
    name: String,
    config: TaskConfig,
    scope: &RegistryScope,
    base_dir: &Path,
) -> Task {
    let (use_prefix, prefix) = match config.prefix {
        PrefixConfig::Enabled(enabled) => (enabled, String::new()),
        PrefixConfig::Template(template) => (true, template),
    };

    let mut task = Task::new(name);
    task.alias = config.alias.filter(|alias| !alias.is_empty());
    task.description = config.description;
    task.hidden = config.hidden;
    task.disabled = config.disabled;
    task.script = if config.script.is_empty() {
        Vec::new()
    } else {
        scripts_from_config(config.script)
    };
    task.file = config.file.map(|file| resolve_relative(base_dir, &file));
    task.driver = config.driver;
    task.targets = config.targets;
    task.filters = config.filters;
    task.backend = config.backend;
    task.parallel = config.parallel;
    task.privileged = config.privileged;
    task.user = config.user;
    task.pty = config.pty;
    task.use_prefix = use_prefix;
    task.prefix = prefix;
    task.prepare = config.prepare.map(|command| -> PrepareFn {
        Arc::new(move |task: &Task| prepare_command(&command, task))
    });
    task.registry = Some(scope.clone());
    task
}

fn prepare_command(command: &str, task: &Task) -> Result<()> {
    let (shell, flag) = local_shell();
    let status = Command::new(shell)
        .arg(flag)
        .arg(command)
        .env("FLEETSH_TASK_NAME", &task.name)
        .status()
        .with_context(|| format!("Failed to run prepare command '{command}'"))?;

    if !status.success() {
        bail!("prepare command '{command}' exited with {status}");
    }
    Ok(())
}
