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

//! Host selection.
//!
//! Selections are unioned, filters are intersected with the result. Both
//! match a host by name or by tag. The result is sorted by host name and
//! never contains duplicates.

use std::sync::Arc;

use crate::error::ResolutionError;
use crate::host::Host;
use crate::registry::Registry;

pub struct HostQuery<'a> {
    registry: &'a Registry,
    selections: Vec<String>,
    filters: Vec<String>,
    visible_only: bool,
}

impl<'a> HostQuery<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            selections: Vec::new(),
            filters: Vec::new(),
            visible_only: false,
        }
    }

    pub fn select<I, S>(mut self, selections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selections
            .extend(selections.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn filter<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filters
            .extend(filters.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    /// Hosts matching the query. An empty selection matches nothing; a host
    /// passes the filters when it matches any one of them.
    pub fn resolve(&self) -> Vec<Arc<Host>> {
        self.registry
            .hosts()
            .filter(|host| self.selections.iter().any(|s| host.matches(s)))
            .filter(|host| self.filters.is_empty() || self.filters.iter().any(|f| host.matches(f)))
            .filter(|host| !(self.visible_only && host.hidden))
            .cloned()
            .collect()
    }
}

/// Filters only narrow a selection; on their own they are an error.
pub fn check_selection<S: AsRef<str>>(
    selections: &[S],
    filters: &[S],
) -> Result<(), ResolutionError> {
    if selections.is_empty() && !filters.is_empty() {
        Err(ResolutionError::FilterWithoutSelection)
    } else {
        Ok(())
    }
}

/// Resolve `selections` narrowed by `filters` against `registry`.
pub fn resolve_hosts<S: AsRef<str>>(
    registry: &Registry,
    selections: &[S],
    filters: &[S],
    visible_only: bool,
) -> Vec<Arc<Host>> {
    HostQuery::new(registry)
        .select(selections)
        .filter(filters)
        .visible_only(visible_only)
        .resolve()
}
