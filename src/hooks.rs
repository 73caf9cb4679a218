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

//! Host lifecycle hooks.
//!
//! A hook is either a literal shell fragment or a callable that yields the
//! next hook value. Callables may return another callable, so resolution
//! walks the chain until it reaches a literal or a no-op.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use crate::error::{HookError, HookPhase};
use crate::executor::command::local_shell;

/// Upper bound on callable chains.
pub const MAX_HOOK_DEPTH: usize = 32;

/// A callable hook. `Ok(None)` means "do nothing".
pub type HookFn = Arc<dyn Fn() -> anyhow::Result<Option<HookValue>> + Send + Sync>;

#[derive(Clone)]
pub enum HookValue {
    Literal(String),
    Callable(HookFn),
}

impl fmt::Debug for HookValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(script) => f.debug_tuple("Literal").field(script).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<&str> for HookValue {
    fn from(script: &str) -> Self {
        Self::Literal(script.to_string())
    }
}

impl From<String> for HookValue {
    fn from(script: String) -> Self {
        Self::Literal(script)
    }
}

impl HookValue {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Option<HookValue>> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    /// Resolve to a shell fragment, following callables up to [`MAX_HOOK_DEPTH`] levels.
    pub fn resolve(&self) -> Result<String, HookError> {
        let mut current = self.clone();
        let mut depth = 0;
        loop {
            match current {
                Self::Literal(script) => return Ok(script),
                Self::Callable(f) => {
                    if depth == MAX_HOOK_DEPTH {
                        return Err(HookError::DepthExceeded {
                            limit: MAX_HOOK_DEPTH,
                        });
                    }
                    depth += 1;
                    match f().map_err(HookError::Callable)? {
                        Some(next) => current = next,
                        None => return Ok(String::new()),
                    }
                }
            }
        }
    }
}

/// The before/after hook lists attached to a host.
#[derive(Debug, Clone, Default)]
pub struct HostHooks {
    pub before_connect: Vec<HookValue>,
    pub after_connect: Vec<HookValue>,
    pub after_disconnect: Vec<HookValue>,
}

impl HostHooks {
    pub fn is_empty(&self) -> bool {
        self.before_connect.is_empty()
            && self.after_connect.is_empty()
            && self.after_disconnect.is_empty()
    }

    pub fn for_phase(&self, phase: HookPhase) -> &[HookValue] {
        match phase {
            HookPhase::BeforeConnect => &self.before_connect,
            HookPhase::AfterConnect => &self.after_connect,
            HookPhase::AfterDisconnect => &self.after_disconnect,
        }
    }
}

/// Resolve every hook and join them, one fragment per line.
pub fn hook_script(hooks: &[HookValue]) -> Result<String, HookError> {
    let mut script = String::new();
    for hook in hooks {
        script.push_str(&hook.resolve()?);
        script.push('\n');
    }
    Ok(script)
}

/// [`hook_script`] on the blocking pool, since callables may run commands.
///
/// A panic inside a callable is re-raised in the caller.
pub async fn resolve_hooks(hooks: &[HookValue]) -> Result<String, HookError> {
    let hooks = hooks.to_vec();
    match tokio::task::spawn_blocking(move || hook_script(&hooks)).await {
        Ok(result) => result,
        Err(err) => match err.try_into_panic() {
            Ok(panic) => std::panic::resume_unwind(panic),
            Err(err) => Err(HookError::Callable(err.into())),
        },
    }
}

/// Run a resolved hook script in the local shell with the terminal attached.
pub async fn run_local_hook(phase: HookPhase, script: &str) -> Result<(), HookError> {
    let (shell, flag) = local_shell();
    tracing::debug!(%phase, "running local hook script");

    let status = Command::new(shell)
        .arg(flag)
        .arg(script)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| HookError::Io { phase, source })?;

    if status.success() {
        Ok(())
    } else {
        Err(HookError::CommandFailed { phase, status })
    }
}
