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

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::hooks::HostHooks;

/// A named remote machine known to the registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Host {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub hidden: bool,
    /// Extra ssh client arguments placed before everything else.
    pub ssh_options: Vec<String>,
    /// Emitted as `Key Value` lines in the generated ssh_config.
    pub ssh_config: BTreeMap<String, String>,
    pub props: BTreeMap<String, String>,
    #[serde(skip)]
    pub hooks: HostHooks,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// True when `expr` is this host's name or one of its tags.
    pub fn matches(&self, expr: &str) -> bool {
        self.name == expr || self.has_tag(expr)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
