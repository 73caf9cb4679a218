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

//! Configuration tests.

use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use super::loader::{load_registry, ConfigPaths};
use super::types::{Config, ConfigValue, HookConfig, PrefixConfig, ScriptSource};
use super::utils::{expand_tilde, override_path};
use crate::error::ConfigError;
use crate::hooks::hook_script;
use crate::task::{Backend, RegistryKind, RegistryScope};
use crate::Registry;

const SAMPLE: &str = r#"
hosts:
  web1:
    description: frontend
    tags: [web, prod]
    ssh_config:
      HostName: 10.0.0.5
      Port: 2222
    props:
      role: frontend
    hooks:
      before_connect:
        - echo connecting
      after_connect:
        - command: echo remote-hook
  db1:
    tags: [db]
    hidden: true

tasks:
  deploy:
    description: Deploy the app
    targets: [web]
    parallel: true
    prefix: true
    script:
      - name: pull
        code: git pull
      - make install
  report:
    backend: local
    prefix: "[{{ host.name }}] "
    script: |
      echo report
  old:
    disabled: true
    script: echo old

drivers:
  traced:
    template: "set -x\n{% for s in scripts %}{{ s.code }}\n{% endfor %}"
"#;

fn scope() -> RegistryScope {
    RegistryScope {
        kind: RegistryKind::Local,
        data_dir: PathBuf::from("/project/.fleetsh"),
    }
}

#[test]
fn test_parse_sample() {
    let config = Config::from_yaml(SAMPLE).unwrap();

    let web1 = &config.hosts["web1"];
    assert_eq!(web1.tags, vec!["web", "prod"]);
    assert_eq!(web1.ssh_config["Port"], ConfigValue::Integer(2222));
    assert_eq!(
        web1.hooks.after_connect,
        vec![HookConfig::Command {
            command: "echo remote-hook".into()
        }]
    );

    let deploy = &config.tasks["deploy"];
    assert!(deploy.parallel);
    assert_eq!(deploy.prefix, PrefixConfig::Enabled(true));
    assert!(matches!(deploy.script, ScriptSource::List(ref items) if items.len() == 2));

    let report = &config.tasks["report"];
    assert_eq!(report.backend, Backend::Local);
    assert!(matches!(report.script, ScriptSource::Single(_)));
}

#[test]
fn test_empty_document_is_empty_config() {
    let config = Config::from_yaml("   \n").unwrap();
    assert!(config.hosts.is_empty() && config.tasks.is_empty());
}

#[test]
fn test_apply_to_registry() {
    let mut registry = Registry::new();
    Config::from_yaml(SAMPLE)
        .unwrap()
        .apply_to(&mut registry, &scope(), Path::new("/project"));

    let web1 = registry.host("web1").unwrap();
    assert_eq!(web1.ssh_config["Port"], "2222");
    assert_eq!(web1.props["role"], "frontend");

    let deploy = registry.task("deploy").unwrap();
    assert!(deploy.use_prefix);
    assert!(deploy.prefix.is_empty());
    assert_eq!(deploy.script[0].name.as_deref(), Some("pull"));
    assert_eq!(deploy.script[1].code, "make install");
    assert_eq!(deploy.registry, Some(scope()));

    let report = registry.task("report").unwrap();
    assert!(report.use_prefix);
    assert_eq!(report.prefix, "[{{ host.name }}] ");

    assert!(registry.enabled_task("old").is_none());
    assert!(registry.driver("traced").is_some());
    assert!(registry.validate().is_ok());
}

#[cfg(unix)]
#[test]
fn test_command_hooks_use_command_output() {
    let mut registry = Registry::new();
    Config::from_yaml(SAMPLE)
        .unwrap()
        .apply_to(&mut registry, &scope(), Path::new("/project"));

    let web1 = registry.host("web1").unwrap();
    assert_eq!(
        hook_script(&web1.hooks.before_connect).unwrap(),
        "echo connecting\n"
    );
    assert_eq!(
        hook_script(&web1.hooks.after_connect).unwrap(),
        "echo remote-hook\n"
    );
}

#[cfg(unix)]
#[test]
fn test_command_hook_with_empty_output_is_noop() {
    let yaml = "hosts:\n  h:\n    hooks:\n      before_connect:\n        - command: 'true'\n";
    let mut registry = Registry::new();
    Config::from_yaml(yaml)
        .unwrap()
        .apply_to(&mut registry, &scope(), Path::new("/"));

    let host = registry.host("h").unwrap();
    assert_eq!(host.hooks.before_connect[0].resolve().unwrap(), "");
}

#[test]
fn test_relative_script_file_resolves_against_config_dir() {
    let yaml = "tasks:\n  t:\n    backend: local\n    file: scripts/run.sh\n";
    let mut registry = Registry::new();
    Config::from_yaml(yaml)
        .unwrap()
        .apply_to(&mut registry, &scope(), Path::new("/project"));

    assert_eq!(
        registry.task("t").unwrap().file.as_deref(),
        Some(Path::new("/project/scripts/run.sh"))
    );
}

#[test]
fn test_override_path() {
    assert_eq!(
        override_path(Path::new("/p/fleetsh.yaml")),
        PathBuf::from("/p/fleetsh_override.yaml")
    );
    assert_eq!(
        override_path(Path::new("/p/.fleetsh.yaml")),
        PathBuf::from("/p/.fleetsh_override.yaml")
    );
}

#[test]
#[serial]
fn test_expand_tilde() {
    let original_home = std::env::var("HOME").ok();
    std::env::set_var("HOME", "/home/user");

    assert_eq!(
        expand_tilde(Path::new("~/.config/fleetsh")),
        PathBuf::from("/home/user/.config/fleetsh")
    );
    assert_eq!(
        expand_tilde(Path::new("/etc/fleetsh")),
        PathBuf::from("/etc/fleetsh")
    );

    match original_home {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }
}

struct Layout {
    _cwd: TempDir,
    _user: TempDir,
    cwd: PathBuf,
    user: PathBuf,
}

fn layout() -> Layout {
    let cwd = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    Layout {
        cwd: cwd.path().to_path_buf(),
        user: user.path().to_path_buf(),
        _cwd: cwd,
        _user: user,
    }
}

#[test]
fn test_discover_prefers_visible_name() {
    let l = layout();
    std::fs::write(l.cwd.join(".fleetsh.yaml"), "").unwrap();
    let paths = ConfigPaths::discover(&l.cwd, None, &l.user).unwrap();
    assert_eq!(paths.working, l.cwd.join(".fleetsh.yaml"));

    std::fs::write(l.cwd.join("fleetsh.yaml"), "").unwrap();
    let paths = ConfigPaths::discover(&l.cwd, None, &l.user).unwrap();
    assert_eq!(paths.working, l.cwd.join("fleetsh.yaml"));
    assert_eq!(paths.working_override, l.cwd.join("fleetsh_override.yaml"));
    assert_eq!(paths.working_data_dir, l.cwd.join(".fleetsh"));
    assert_eq!(paths.user, l.user.join("config.yaml"));
}

#[test]
fn test_explicit_config_must_exist() {
    let l = layout();
    assert!(ConfigPaths::discover(&l.cwd, Some(Path::new("missing.yaml")), &l.user).is_err());

    std::fs::write(l.cwd.join("custom.yaml"), "").unwrap();
    let paths = ConfigPaths::discover(&l.cwd, Some(Path::new("custom.yaml")), &l.user).unwrap();
    assert_eq!(paths.working, l.cwd.join("custom.yaml"));
    assert_eq!(paths.working_override, l.cwd.join("custom_override.yaml"));
}

#[tokio::test]
async fn test_load_registry_layers_overrides() {
    let l = layout();
    std::fs::write(
        l.cwd.join("fleetsh.yaml"),
        "hosts:\n  web1:\n    description: base\n  web2: {}\n",
    )
    .unwrap();
    std::fs::write(
        l.cwd.join("fleetsh_override.yaml"),
        "hosts:\n  web1:\n    description: override\n",
    )
    .unwrap();
    std::fs::write(
        l.user.join("config.yaml"),
        "hosts:\n  user-only: {}\n",
    )
    .unwrap();
    std::fs::write(
        l.user.join("config_override.yaml"),
        "tasks:\n  hello:\n    backend: local\n    script: echo hello\n",
    )
    .unwrap();

    let paths = ConfigPaths::discover(&l.cwd, None, &l.user).unwrap();
    let registry = load_registry(&paths, false).await.unwrap();

    assert_eq!(registry.host("web1").unwrap().description, "override");
    assert!(registry.host("web2").is_some());
    assert!(registry.host("user-only").is_none());
    let hello = registry.task("hello").unwrap();
    assert_eq!(hello.registry.as_ref().unwrap().kind, RegistryKind::Global);
}

#[tokio::test]
async fn test_load_registry_global_only() {
    let l = layout();
    std::fs::write(l.cwd.join("fleetsh.yaml"), "hosts:\n  local-host: {}\n").unwrap();
    std::fs::write(l.user.join("config.yaml"), "hosts:\n  user-host: {}\n").unwrap();

    let paths = ConfigPaths::discover(&l.cwd, None, &l.user).unwrap();
    let registry = load_registry(&paths, true).await.unwrap();

    assert!(registry.host("user-host").is_some());
    assert!(registry.host("local-host").is_none());
}

#[tokio::test]
async fn test_load_registry_rejects_collisions() {
    let l = layout();
    std::fs::write(
        l.cwd.join("fleetsh.yaml"),
        "hosts:\n  web1: {}\ntasks:\n  web1:\n    script: echo\n",
    )
    .unwrap();

    let paths = ConfigPaths::discover(&l.cwd, None, &l.user).unwrap();
    let err = load_registry(&paths, false).await.unwrap_err();
    assert!(err.to_string().contains("collides with a host"));
}

#[tokio::test]
async fn test_invalid_yaml_names_the_file() {
    let l = layout();
    std::fs::write(l.cwd.join("fleetsh.yaml"), "hosts: [unclosed").unwrap();

    let paths = ConfigPaths::discover(&l.cwd, None, &l.user).unwrap();
    let err = load_registry(&paths, false).await.unwrap_err();
    assert!(format!("{err:#}").contains("fleetsh.yaml"));
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::InvalidFile { .. })
    ));
}
