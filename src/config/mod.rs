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

//! Configuration management for fleetsh.

mod convert;
mod loader;
#[cfg(test)]
mod tests;
mod types;
mod utils;

// Re-export public types
pub use loader::{load_registry, ConfigPaths, USER_CONFIG_NAME, WORKING_CONFIG_NAMES};
pub use types::{
    Config, ConfigValue, DriverConfig, HookConfig, HooksConfig, HostConfig, PrefixConfig,
    ScriptConfig, ScriptSource, TaskConfig,
};
pub use utils::{expand_tilde, override_path, user_config_dir};
