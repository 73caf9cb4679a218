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

//! Interactive ssh sessions with host hooks.
//!
//! When the only argument names a registered host, its hooks run around the
//! session: `before_connect` locally before ssh starts, `after_connect` on
//! the remote side in front of the login shell, and `after_disconnect`
//! locally once ssh is gone. Any other argument list is passed to ssh as is.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};

use crate::error::{HookError, HookPhase};
use crate::executor::command::CommandSpec;
use crate::executor::exit_code::{exit_code_of, spawn_failure_code};
use crate::hooks::{resolve_hooks, run_local_hook};
use crate::host::Host;
use crate::registry::Registry;

/// Appended to the after_connect script so the user ends up in a login shell.
const INTERACTIVE_SHELL: &str = "\nexec $SHELL\n";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub ssh_program: String,
    pub ssh_config_path: PathBuf,
}

impl SessionOptions {
    pub fn new(ssh_config_path: impl Into<PathBuf>) -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            ssh_config_path: ssh_config_path.into(),
        }
    }
}

/// The host whose hooks apply to `args`, if any.
pub fn hooked_host<'a>(registry: &'a Registry, args: &[String]) -> Option<&'a Arc<Host>> {
    match args {
        [only] => registry.host(only),
        _ => None,
    }
}

/// Arguments for the ssh client.
///
/// With an `after_connect` script the remote command becomes that script,
/// and a tty is requested unless the caller already asked for one.
pub fn session_command(
    options: &SessionOptions,
    args: &[String],
    after_connect: Option<&str>,
) -> CommandSpec {
    let mut ssh_args = vec![
        "-F".to_string(),
        options.ssh_config_path.display().to_string(),
    ];

    match after_connect {
        Some(script) => {
            if !args.iter().any(|arg| arg == "-t") {
                ssh_args.push("-t".to_string());
            }
            ssh_args.extend(args.iter().cloned());
            ssh_args.push(format!("{script}{INTERACTIVE_SHELL}"));
        }
        None => ssh_args.extend(args.iter().cloned()),
    }

    CommandSpec {
        program: options.ssh_program.clone(),
        args: ssh_args,
        current_dir: None,
    }
}

/// Run ssh with the terminal attached and return the exit code to mirror.
///
/// `after_disconnect` runs however the session ends, including a panic
/// while it was running. A failing `before_connect` hook aborts before ssh
/// is started, and then no other hook runs.
pub async fn run_interactive_session(
    registry: &Registry,
    options: &SessionOptions,
    args: &[String],
) -> Result<i32, HookError> {
    let host = hooked_host(registry, args);

    if let Some(host) = host {
        if !host.hooks.before_connect.is_empty() {
            let script = resolve_hooks(&host.hooks.before_connect).await?;
            run_local_hook(HookPhase::BeforeConnect, &script).await?;
        }
    }

    let session = AssertUnwindSafe(connect(options, args, host.map(|h| h.as_ref())))
        .catch_unwind()
        .await;

    let after = match host {
        Some(host) if !host.hooks.after_disconnect.is_empty() => {
            after_disconnect(host).await
        }
        _ => Ok(()),
    };

    match session {
        Err(panic) => {
            if let Err(e) = after {
                error!("after_disconnect hook failed: {e}");
            }
            std::panic::resume_unwind(panic)
        }
        Ok(result) => {
            let code = result?;
            after?;
            Ok(code)
        }
    }
}

async fn after_disconnect(host: &Host) -> Result<(), HookError> {
    let script = resolve_hooks(&host.hooks.after_disconnect).await?;
    run_local_hook(HookPhase::AfterDisconnect, &script).await
}

async fn connect(
    options: &SessionOptions,
    args: &[String],
    host: Option<&Host>,
) -> Result<i32, HookError> {
    let after_connect = match host {
        Some(host) if !host.hooks.after_connect.is_empty() => {
            Some(resolve_hooks(&host.hooks.after_connect).await?)
        }
        _ => None,
    };

    let command = session_command(options, args, after_connect.as_deref());
    debug!(command = %command, "starting interactive session");

    let spawned = command
        .to_command()
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            error!("failed to start '{}': {e}", command.program);
            return Ok(spawn_failure_code(&e));
        }
    };

    let status = child.wait().await.map_err(|source| HookError::Spawn {
        program: command.program.clone(),
        source,
    })?;
    Ok(exit_code_of(status))
}
