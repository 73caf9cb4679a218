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

//! Interactive session hooks and exit code mirroring.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fleetsh::hooks::MAX_HOOK_DEPTH;
use futures::FutureExt;
use fleetsh::{run_interactive_session, HookError, HookValue, Host, Registry, SessionOptions};
use serial_test::serial;
use tempfile::TempDir;

/// Records its arguments, one per line, and exits with 42.
fn install_fake_ssh(dir: &Path) -> PathBuf {
    let path = dir.join("fake-ssh");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nexit 42\n",
        dir.join("args.log").display()
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct Fixture {
    dir: TempDir,
    options: SessionOptions,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ssh = install_fake_ssh(dir.path());
        let mut options = SessionOptions::new(dir.path().join("ssh_config"));
        options.ssh_program = ssh.display().to_string();
        Self { dir, options }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn touch_hook(&self, name: &str) -> HookValue {
        HookValue::from(format!("touch '{}'", self.path(name).display()))
    }

    fn recorded_args(&self) -> Option<String> {
        std::fs::read_to_string(self.path("args.log")).ok()
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
#[serial]
async fn test_hooks_run_around_the_session() {
    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.before_connect = vec![fx.touch_hook("before")];
    host.hooks.after_connect = vec![HookValue::from("cd /srv/app")];
    host.hooks.after_disconnect = vec![fx.touch_hook("after")];
    let mut registry = Registry::new();
    registry.add_host(host);

    let code = run_interactive_session(&registry, &fx.options, &args(&["web1"]))
        .await
        .unwrap();

    assert_eq!(code, 42);
    assert!(fx.path("before").exists());
    assert!(fx.path("after").exists());

    let recorded = fx.recorded_args().unwrap();
    let lines: Vec<&str> = recorded.lines().collect();
    assert_eq!(lines[0], "-F");
    assert_eq!(lines[2], "-t");
    assert_eq!(lines[3], "web1");
    assert!(recorded.contains("cd /srv/app\n"));
    assert!(recorded.contains("exec $SHELL"));
}

#[tokio::test]
#[serial]
async fn test_failing_before_connect_skips_everything_else() {
    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.before_connect = vec![HookValue::from("exit 1")];
    host.hooks.after_disconnect = vec![fx.touch_hook("after")];
    let mut registry = Registry::new();
    registry.add_host(host);

    let err = run_interactive_session(&registry, &fx.options, &args(&["web1"]))
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::CommandFailed { .. }));
    assert!(fx.recorded_args().is_none());
    assert!(!fx.path("after").exists());
}

#[tokio::test]
#[serial]
async fn test_after_disconnect_runs_when_after_connect_fails() {
    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.after_connect = vec![HookValue::callable(|| anyhow::bail!("no such directory"))];
    host.hooks.after_disconnect = vec![fx.touch_hook("after")];
    let mut registry = Registry::new();
    registry.add_host(host);

    let err = run_interactive_session(&registry, &fx.options, &args(&["web1"]))
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Callable(_)));
    assert!(fx.recorded_args().is_none());
    assert!(fx.path("after").exists());
}

#[tokio::test]
#[serial]
async fn test_after_disconnect_runs_when_session_panics() {
    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.after_connect = vec![HookValue::callable(|| panic!("boom"))];
    host.hooks.after_disconnect = vec![fx.touch_hook("after")];
    let mut registry = Registry::new();
    registry.add_host(host);

    let outcome = AssertUnwindSafe(run_interactive_session(
        &registry,
        &fx.options,
        &args(&["web1"]),
    ))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert!(fx.path("after").exists());
}

#[tokio::test]
#[serial]
async fn test_slow_hook_leaves_the_runtime_responsive() {
    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.before_connect = vec![HookValue::callable(|| {
        std::thread::sleep(std::time::Duration::from_millis(800));
        Ok(None)
    })];
    let mut registry = Registry::new();
    registry.add_host(host);

    let started = std::time::Instant::now();
    let ticker = async {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        started.elapsed()
    };
    let session_args = args(&["web1"]);
    let (ticked, code) = tokio::join!(
        ticker,
        run_interactive_session(&registry, &fx.options, &session_args)
    );

    assert_eq!(code.unwrap(), 42);
    assert!(ticked < std::time::Duration::from_millis(500));
}

#[tokio::test]
#[serial]
async fn test_callable_hook_chain_resolves() {
    let fx = Fixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let marker = fx.touch_hook("chained");

    let mut host = Host::new("web1");
    host.hooks.before_connect = vec![HookValue::callable(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let marker = marker.clone();
        Ok(Some(HookValue::callable(move || Ok(Some(marker.clone())))))
    })];
    let mut registry = Registry::new();
    registry.add_host(host);

    run_interactive_session(&registry, &fx.options, &args(&["web1"]))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(fx.path("chained").exists());
}

#[tokio::test]
#[serial]
async fn test_endless_hook_chain_is_rejected() {
    fn endless() -> HookValue {
        HookValue::callable(|| Ok(Some(endless())))
    }

    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.before_connect = vec![endless()];
    let mut registry = Registry::new();
    registry.add_host(host);

    let err = run_interactive_session(&registry, &fx.options, &args(&["web1"]))
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::DepthExceeded { limit } if limit == MAX_HOOK_DEPTH));
    assert!(fx.recorded_args().is_none());
}

#[tokio::test]
#[serial]
async fn test_other_argument_shapes_skip_hooks() {
    let fx = Fixture::new();
    let mut host = Host::new("web1");
    host.hooks.before_connect = vec![fx.touch_hook("before")];
    host.hooks.after_connect = vec![HookValue::from("cd /srv/app")];
    let mut registry = Registry::new();
    registry.add_host(host);

    let code = run_interactive_session(&registry, &fx.options, &args(&["web1", "uptime"]))
        .await
        .unwrap();

    assert_eq!(code, 42);
    assert!(!fx.path("before").exists());
    let recorded = fx.recorded_args().unwrap();
    assert_eq!(recorded.lines().collect::<Vec<_>>()[2..], ["web1", "uptime"]);
}

#[tokio::test]
#[serial]
async fn test_missing_client_exits_127() {
    let fx = Fixture::new();
    let mut options = fx.options.clone();
    options.ssh_program = fx.path("missing-ssh").display().to_string();

    let code = run_interactive_session(&Registry::new(), &options, &args(&["somewhere"]))
        .await
        .unwrap();
    assert_eq!(code, 127);
}
