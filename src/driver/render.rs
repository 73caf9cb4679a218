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

use std::path::Path;
use std::sync::Arc;

use minijinja::{context, Environment, Value};

use super::Driver;
use crate::error::RenderError;
use crate::host::Host;
use crate::task::{ScriptFragment, Task};
use crate::utils::shell::{env_key_escape, shell_escape};

/// Template used by the built-in driver.
pub const DEFAULT_TEMPLATE: &str = r#"{% include "environment" %}
{% include "functions" %}
{% for script in scripts -%}
{{ script.code }}
{% endfor %}
"#;

const ENVIRONMENT_BLOCK: &str = r#"export FLEETSH_TASK_NAME={{ task.name | shell_escape }}
export FLEETSH_SSH_CONFIG={{ ssh_config | shell_escape }}
{%- for arg in args %}
export FLEETSH_TASK_ARGS_{{ loop.index }}={{ arg | shell_escape }}
{%- endfor %}
{%- if registry %}
export FLEETSH_REGISTRY={{ registry.kind }}
export FLEETSH_DATA_DIR={{ registry.data_dir | shell_escape }}
{%- endif %}
{%- if host %}
export FLEETSH_HOST_NAME={{ host.name | shell_escape }}
{%- for tag in host.tags %}
export FLEETSH_HOST_TAGS_{{ tag | env_key_escape | to_upper }}=1
{%- endfor %}
{%- for key, value in host.props | items %}
export FLEETSH_HOST_PROPS_{{ key | env_key_escape | to_upper }}={{ value | shell_escape }}
{%- endfor %}
{%- endif %}
"#;

// The ssh_config file only exists on the machine running fleetsh.
const FUNCTIONS_BLOCK: &str = r#"{%- if host and task.backend == "local" -%}
fleetsh_ssh() {
    ssh -F "$FLEETSH_SSH_CONFIG" {{ host.name | shell_escape }} "$@"
}
{%- endif %}
"#;

/// Everything a template can see for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub ssh_config: &'a Path,
    pub task: &'a Task,
    /// `None` for a local run without hosts.
    pub host: Option<&'a Host>,
    /// Every host of the run, used for alignment.
    pub hosts: &'a [Arc<Host>],
    pub args: &'a [String],
}

impl RenderContext<'_> {
    /// Padding that lines this host's name up with the longest one in the run.
    fn alignment_padding(&self) -> usize {
        let longest = self
            .hosts
            .iter()
            .map(|host| host.name.chars().count())
            .max()
            .unwrap_or(0);
        let own = self.host.map(|host| host.name.chars().count()).unwrap_or(0);
        longest.saturating_sub(own)
    }

    fn to_value(&self, scripts: &[ScriptFragment], driver: Option<&Driver>) -> Value {
        let host_names: Vec<&str> = self.hosts.iter().map(|h| h.name.as_str()).collect();
        let driver = driver.map(|d| context! { name => d.name, props => d.props });

        context! {
            task => self.task,
            host => self.host,
            hosts => host_names,
            args => self.args,
            scripts => scripts,
            ssh_config => self.ssh_config.display().to_string(),
            registry => self.task.registry,
            driver => driver,
        }
    }
}

fn environment(ctx: &RenderContext<'_>) -> Result<Environment<'static>, RenderError> {
    let mut env = Environment::new();
    env.add_template("environment", ENVIRONMENT_BLOCK)?;
    env.add_template("functions", FUNCTIONS_BLOCK)?;

    env.add_filter("shell_escape", |value: String| shell_escape(&value));
    env.add_filter("env_key_escape", |value: String| env_key_escape(&value));
    env.add_filter("to_upper", |value: String| value.to_uppercase());
    env.add_filter("to_lower", |value: String| value.to_lowercase());
    env.add_function("shell_escape", |value: String| shell_escape(&value));

    let padding = ctx.alignment_padding();
    env.add_function("hostname_align", move |fill: String| fill.repeat(padding));

    Ok(env)
}

/// Render the script `driver` produces for one target.
pub fn generate(driver: &Driver, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let source = driver
        .template(ctx)
        .map_err(|source| RenderError::Engine {
            driver: driver.name.clone(),
            source,
        })?;
    let scripts = ctx.task.script_fragments()?;
    let env = environment(ctx)?;

    Ok(env.render_str(&source, ctx.to_value(&scripts, Some(driver)))?)
}

/// Render an output prefix template for one target.
pub fn render_prefix(template: &str, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let env = environment(ctx)?;
    Ok(env.render_str(template, ctx.to_value(&[], None))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Backend, RegistryKind, RegistryScope};
    use std::path::PathBuf;

    fn task_with_scripts() -> Task {
        let mut task = Task::new("deploy");
        task.script = vec![
            ScriptFragment::new("echo one"),
            ScriptFragment::new("echo two"),
        ];
        task
    }

    #[test]
    fn default_driver_emits_environment_then_fragments() {
        let task = task_with_scripts();
        let host = Arc::new(
            Host::new("web1")
                .with_tags(["web-tier"])
                .with_description("frontend"),
        );
        let hosts = vec![Arc::clone(&host)];
        let args = vec!["v1.2".to_string(), "two words".to_string()];
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/fleetsh.ssh_config"),
            task: &task,
            host: Some(&*host),
            hosts: &hosts,
            args: &args,
        };

        let script = generate(&Driver::builtin(), &ctx).unwrap();
        let env_pos = script.find("export FLEETSH_HOST_NAME=web1").unwrap();
        let one = script.find("echo one").unwrap();
        let two = script.find("echo two").unwrap();
        assert!(env_pos < one && one < two);
        assert!(script.contains("export FLEETSH_TASK_NAME=deploy"));
        assert!(script.contains("export FLEETSH_TASK_ARGS_1=v1.2"));
        assert!(script.contains("export FLEETSH_TASK_ARGS_2='two words'"));
        assert!(script.contains("export FLEETSH_HOST_TAGS_WEB_TIER=1"));
        assert!(!script.contains("fleetsh_ssh()"));
    }

    #[test]
    fn host_props_and_registry_are_exported() {
        let mut task = task_with_scripts();
        task.registry = Some(RegistryScope {
            kind: RegistryKind::Local,
            data_dir: PathBuf::from("/srv/project/.fleetsh"),
        });
        let mut host = Host::new("db1");
        host.props.insert("role".into(), "primary db".into());
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/cfg"),
            task: &task,
            host: Some(&host),
            hosts: &[],
            args: &[],
        };

        let script = generate(&Driver::builtin(), &ctx).unwrap();
        assert!(script.contains("export FLEETSH_HOST_PROPS_ROLE='primary db'"));
        assert!(script.contains("export FLEETSH_REGISTRY=local"));
        assert!(script.contains("export FLEETSH_DATA_DIR=/srv/project/.fleetsh"));
    }

    #[test]
    fn local_tasks_get_helper_functions() {
        let mut task = task_with_scripts();
        task.backend = Backend::Local;
        let host = Host::new("web1");
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/cfg"),
            task: &task,
            host: Some(&host),
            hosts: &[],
            args: &[],
        };

        let script = generate(&Driver::builtin(), &ctx).unwrap();
        assert!(script.contains("fleetsh_ssh() {\n    ssh -F \"$FLEETSH_SSH_CONFIG\" web1 \"$@\"\n}"));
    }

    #[test]
    fn hostless_local_task_has_no_host_variables() {
        let mut task = task_with_scripts();
        task.backend = Backend::Local;
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/cfg"),
            task: &task,
            host: None,
            hosts: &[],
            args: &[],
        };

        let script = generate(&Driver::builtin(), &ctx).unwrap();
        assert!(!script.contains("FLEETSH_HOST_NAME"));
        assert!(!script.contains("fleetsh_ssh()"));
        assert!(script.contains("echo one"));
    }

    #[test]
    fn custom_driver_sees_context() {
        let task = task_with_scripts();
        let host = Host::new("web1");
        let driver = Driver::new("wrapped", |driver, ctx| {
            Ok(format!(
                "# {} on {{{{ host.name }}}} for {}\n{{% for s in scripts %}}{{{{ s.code }}}};{{% endfor %}}",
                driver.name, ctx.task.name
            ))
        });
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/cfg"),
            task: &task,
            host: Some(&host),
            hosts: &[],
            args: &[],
        };

        let script = generate(&driver, &ctx).unwrap();
        assert_eq!(script, "# wrapped on web1 for deploy\necho one;echo two;");
    }

    #[test]
    fn engine_failure_is_reported_with_driver_name() {
        let task = task_with_scripts();
        let driver = Driver::new("broken", |_, _| Err(anyhow::anyhow!("no template")));
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/cfg"),
            task: &task,
            host: None,
            hosts: &[],
            args: &[],
        };

        let err = generate(&driver, &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Engine { ref driver, .. } if driver == "broken"));
    }

    #[test]
    fn prefix_aligns_host_names() {
        let task = Task::new("t");
        let hosts = vec![Arc::new(Host::new("a")), Arc::new(Host::new("long-name"))];
        let ctx = RenderContext {
            ssh_config: Path::new("/tmp/cfg"),
            task: &task,
            host: Some(&*hosts[0]),
            hosts: &hosts,
            args: &[],
        };

        let prefix = render_prefix("[{{ host.name }}]{{ hostname_align(\" \") }} ", &ctx).unwrap();
        assert_eq!(prefix, "[a]         ");
    }
}
