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

//! Drivers turn a task into the shell script that actually runs.
//!
//! A driver's engine produces template text; the template is then rendered
//! with the task, the target host and the task arguments in scope. Two named
//! blocks are always available to include: `environment` (exported
//! `FLEETSH_*` variables) and `functions` (shell helpers).

mod render;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use render::{generate, render_prefix, RenderContext, DEFAULT_TEMPLATE};

pub const DEFAULT_DRIVER_NAME: &str = "default";

/// Produces template text for a render. Called once per host.
pub type DriverEngine =
    Arc<dyn Fn(&Driver, &RenderContext<'_>) -> anyhow::Result<String> + Send + Sync>;

#[derive(Clone)]
pub struct Driver {
    pub name: String,
    pub props: BTreeMap<String, String>,
    engine: DriverEngine,
}

impl Driver {
    pub fn new<F>(name: impl Into<String>, engine: F) -> Self
    where
        F: Fn(&Driver, &RenderContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            props: BTreeMap::new(),
            engine: Arc::new(engine),
        }
    }

    /// A driver whose engine always yields the same template text.
    pub fn from_template(name: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        Self::new(name, move |_, _| Ok(template.clone()))
    }

    /// The driver used when a task names none.
    pub fn builtin() -> Self {
        Self::from_template(DEFAULT_DRIVER_NAME, DEFAULT_TEMPLATE)
    }

    pub fn with_props(mut self, props: BTreeMap<String, String>) -> Self {
        self.props = props;
        self
    }

    pub fn template(&self, ctx: &RenderContext<'_>) -> anyhow::Result<String> {
        (self.engine)(self, ctx)
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("name", &self.name)
            .field("props", &self.props)
            .finish_non_exhaustive()
    }
}
