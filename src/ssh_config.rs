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

//! Generated OpenSSH client configuration.
//!
//! Every registered host becomes a `Host` block so that `ssh -F <file> <name>`
//! works for remote tasks and interactive sessions alike.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::host::Host;

/// Render `Host` blocks for `hosts`, in the given order.
pub fn generate(hosts: &[Arc<Host>]) -> String {
    let mut out = String::new();
    for host in hosts {
        let _ = writeln!(out, "Host {}", host.name);
        for (key, value) in &host.ssh_config {
            let _ = writeln!(out, "    {key} {value}");
        }
        out.push('\n');
    }
    out
}

/// Write the configuration for `hosts` to `path` and return what was written.
pub fn write_config(path: &Path, hosts: &[Arc<Host>]) -> Result<Vec<u8>> {
    let content = generate(hosts).into_bytes();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write ssh config to {}", path.display()))?;
    tracing::debug!(path = %path.display(), hosts = hosts.len(), "wrote ssh config");
    Ok(content)
}
