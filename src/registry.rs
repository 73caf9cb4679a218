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

//! In-memory store of hosts, tasks and drivers.
//!
//! Entries are keyed by name; adding an entry with an existing name replaces
//! it, which is how override files take effect.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::driver::Driver;
use crate::error::ConfigError;
use crate::host::Host;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Registry {
    hosts: BTreeMap<String, Arc<Host>>,
    tasks: BTreeMap<String, Arc<Task>>,
    drivers: BTreeMap<String, Arc<Driver>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry holding only the built-in default driver.
    pub fn new() -> Self {
        let mut registry = Self {
            hosts: BTreeMap::new(),
            tasks: BTreeMap::new(),
            drivers: BTreeMap::new(),
        };
        registry.add_driver(Driver::builtin());
        registry
    }

    pub fn add_host(&mut self, host: Host) -> &mut Self {
        self.hosts.insert(host.name.clone(), Arc::new(host));
        self
    }

    pub fn add_task(&mut self, task: Task) -> &mut Self {
        self.tasks.insert(task.name.clone(), Arc::new(task));
        self
    }

    pub fn add_driver(&mut self, driver: Driver) -> &mut Self {
        self.drivers.insert(driver.name.clone(), Arc::new(driver));
        self
    }

    pub fn host(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.get(name)
    }

    /// Hosts ordered by name.
    pub fn hosts(&self) -> impl Iterator<Item = &Arc<Host>> {
        self.hosts.values()
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    /// Tasks ordered by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    /// Look up a runnable task by its public name.
    pub fn enabled_task(&self, public_name: &str) -> Option<&Arc<Task>> {
        self.tasks
            .values()
            .find(|task| !task.disabled && task.public_name() == public_name)
    }

    pub fn driver(&self, name: &str) -> Option<&Arc<Driver>> {
        self.drivers.get(name)
    }

    /// Every tag used by any host, sorted and deduplicated.
    pub fn tags(&self) -> Vec<String> {
        self.hosts
            .values()
            .flat_map(|host| host.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check cross-references once all configuration layers are loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tags: BTreeSet<String> = self.tags().into_iter().collect();

        for tag in &tags {
            if self.hosts.contains_key(tag) {
                return Err(ConfigError::TagCollidesWithHost { tag: tag.clone() });
            }
        }

        for task in self.tasks.values() {
            let public = task.public_name();
            if self.hosts.contains_key(public) {
                return Err(ConfigError::TaskCollidesWithHost {
                    task: public.to_string(),
                });
            }
            if tags.contains(public) {
                return Err(ConfigError::TaskCollidesWithTag {
                    task: public.to_string(),
                });
            }
            if task.file.is_some() && !task.script.is_empty() {
                return Err(ConfigError::ScriptAndFile {
                    task: public.to_string(),
                });
            }
            if !self.drivers.contains_key(task.driver_name()) {
                return Err(ConfigError::UnknownDriver {
                    task: public.to_string(),
                    driver: task.driver_name().to_string(),
                });
            }
        }

        Ok(())
    }
}
