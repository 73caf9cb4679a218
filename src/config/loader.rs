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

//! Configuration discovery, loading and layering.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::Config;
use super::utils::{expand_tilde, override_path, resolve_relative, user_config_dir};
use crate::error::ConfigError;
use crate::registry::Registry;
use crate::task::{RegistryKind, RegistryScope};

/// Working configuration file names, in lookup order.
pub const WORKING_CONFIG_NAMES: [&str; 2] = ["fleetsh.yaml", ".fleetsh.yaml"];
/// Directory next to the working configuration that holds task data.
pub const WORKING_DATA_DIR: &str = ".fleetsh";
pub const USER_CONFIG_NAME: &str = "config.yaml";

impl Config {
    /// Load configuration from a file. A missing file yields an empty config.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!("Config file not found at {:?}", expanded_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path).await.with_context(|| {
            format!(
                "Failed to read configuration file at {}",
                expanded_path.display()
            )
        })?;

        Self::from_yaml(&content).map_err(|source| {
            ConfigError::InvalidFile {
                path: expanded_path,
                source,
            }
            .into()
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Every configuration location relevant to one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Working configuration; may not exist.
    pub working: PathBuf,
    pub working_override: PathBuf,
    pub working_data_dir: PathBuf,
    pub user: PathBuf,
    pub user_override: PathBuf,
    pub user_data_dir: PathBuf,
}

impl ConfigPaths {
    /// Locate configuration files.
    ///
    /// An explicit path must exist. Otherwise the first of
    /// [`WORKING_CONFIG_NAMES`] found in `cwd` is used, falling back to the
    /// first name. The user configuration lives in `user_dir`.
    pub fn discover(cwd: &Path, explicit: Option<&Path>, user_dir: &Path) -> Result<Self> {
        let working = match explicit {
            Some(path) => {
                let path = resolve_relative(cwd, path);
                if !path.is_file() {
                    bail!("Configuration file {} does not exist", path.display());
                }
                path
            }
            None => WORKING_CONFIG_NAMES
                .iter()
                .map(|name| cwd.join(name))
                .find(|path| path.is_file())
                .unwrap_or_else(|| cwd.join(WORKING_CONFIG_NAMES[0])),
        };

        let working_dir = working.parent().unwrap_or(cwd).to_path_buf();
        let user = user_dir.join(USER_CONFIG_NAME);

        Ok(Self {
            working_override: override_path(&working),
            working_data_dir: working_dir.join(WORKING_DATA_DIR),
            working,
            user_override: override_path(&user),
            user_data_dir: user_dir.to_path_buf(),
            user,
        })
    }

    /// Discover with the default per-user directory.
    pub fn discover_default(cwd: &Path, explicit: Option<&Path>) -> Result<Self> {
        Self::discover(cwd, explicit, &user_config_dir())
    }

    fn local_scope(&self) -> RegistryScope {
        RegistryScope {
            kind: RegistryKind::Local,
            data_dir: self.working_data_dir.clone(),
        }
    }

    fn global_scope(&self) -> RegistryScope {
        RegistryScope {
            kind: RegistryKind::Global,
            data_dir: self.user_data_dir.clone(),
        }
    }
}

async fn apply_file(
    registry: &mut Registry,
    path: &Path,
    scope: &RegistryScope,
) -> Result<()> {
    tracing::debug!(path = %path.display(), kind = ?scope.kind, "loading configuration");
    let base_dir = path.parent().unwrap_or(Path::new("."));
    Config::load(path)
        .await?
        .apply_to(registry, scope, base_dir);
    Ok(())
}

/// Build the registry for one invocation.
///
/// The working file is used unless `global_only` is set or it does not
/// exist, in which case the user file is used. Override files are then
/// layered on top: the working override (unless `global_only`) and finally
/// the user override. The result is validated.
pub async fn load_registry(paths: &ConfigPaths, global_only: bool) -> Result<Registry> {
    let mut registry = Registry::new();

    if !global_only && paths.working.is_file() {
        apply_file(&mut registry, &paths.working, &paths.local_scope()).await?;
    } else if paths.user.is_file() {
        apply_file(&mut registry, &paths.user, &paths.global_scope()).await?;
    }

    if !global_only && paths.working_override.is_file() {
        apply_file(&mut registry, &paths.working_override, &paths.local_scope()).await?;
    }
    if paths.user_override.is_file() {
        apply_file(&mut registry, &paths.user_override, &paths.global_scope()).await?;
    }

    registry.validate()?;
    Ok(registry)
}
