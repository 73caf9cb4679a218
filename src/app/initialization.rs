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

//! Application initialization and configuration loading

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use fleetsh::cli::Cli;
use fleetsh::config::{load_registry, ConfigPaths};
use fleetsh::executor::Console;
use fleetsh::ssh_config::write_config;
use fleetsh::Registry;

/// Everything the dispatcher needs once configuration is loaded.
pub struct AppContext {
    pub registry: Arc<Registry>,
    pub console: Arc<Console>,
    pub working_dir: PathBuf,
    /// Generated ssh_config; removed when the context is dropped.
    pub ssh_config: NamedTempFile,
    /// Content written to `ssh_config`.
    pub ssh_config_content: Vec<u8>,
}

impl AppContext {
    pub fn ssh_config_path(&self) -> &Path {
        self.ssh_config.path()
    }
}

pub async fn initialize(cli: &Cli, console: Arc<Console>) -> Result<AppContext> {
    if let Some(dir) = &cli.working_dir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change directory to {}", dir.display()))?;
    }
    let working_dir =
        std::env::current_dir().context("Failed to determine the current directory")?;

    let paths = ConfigPaths::discover_default(&working_dir, cli.config.as_deref())?;
    tracing::info!(
        working = %paths.working.display(),
        user = %paths.user.display(),
        global = cli.global,
        "loading configuration"
    );
    let registry = load_registry(&paths, cli.global).await?;

    let ssh_config = tempfile::Builder::new()
        .prefix("fleetsh.ssh_config.")
        .tempfile()
        .context("Failed to create the temporary ssh_config")?;
    let hosts: Vec<_> = registry.hosts().cloned().collect();
    let ssh_config_content = write_config(ssh_config.path(), &hosts)?;

    Ok(AppContext {
        registry: Arc::new(registry),
        console,
        working_dir,
        ssh_config,
        ssh_config_content,
    })
}
