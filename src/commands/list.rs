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

//! `--hosts`, `--tags` and `--tasks` listings.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::HostListing;
use crate::host::Host;
use crate::query::{check_selection, resolve_hosts};
use crate::registry::Registry;
use crate::ssh_config;
use crate::ui::PlainTable;

/// List the hosts matching `listing`, as a table or as ssh_config.
///
/// With no selection every host is listed. Hidden hosts are left out unless
/// `all` is set.
pub fn list_hosts<W: Write>(
    out: &mut W,
    registry: &Registry,
    listing: &HostListing,
    all: bool,
    quiet: bool,
) -> Result<()> {
    check_selection(&listing.selections, &listing.filters)?;
    let hosts: Vec<Arc<Host>> = if listing.selections.is_empty() {
        registry
            .hosts()
            .filter(|host| all || !host.hidden)
            .cloned()
            .collect()
    } else {
        resolve_hosts(registry, &listing.selections, &listing.filters, !all)
    };

    if listing.ssh_config {
        writeln!(out, "{}", ssh_config::generate(&hosts))?;
        return Ok(());
    }

    let mut table = PlainTable::new();
    if !quiet {
        table.set_header(["NAME", "DESCRIPTION", "TAGS", "HIDDEN"]);
    }
    for host in &hosts {
        if quiet {
            table.append([host.name.as_str()]);
        } else {
            table.append([
                host.name.clone(),
                host.description.clone(),
                host.tags.join(","),
                host.hidden.to_string(),
            ]);
        }
    }
    table.render(out)?;
    Ok(())
}

pub fn list_tags<W: Write>(out: &mut W, registry: &Registry, quiet: bool) -> Result<()> {
    let mut table = PlainTable::new();
    if !quiet {
        table.set_header(["NAME"]);
    }
    for tag in registry.tags() {
        table.append([tag]);
    }
    table.render(out)?;
    Ok(())
}

/// List tasks by public name. Hidden and disabled tasks need `all`.
pub fn list_tasks<W: Write>(out: &mut W, registry: &Registry, all: bool, quiet: bool) -> Result<()> {
    let mut table = PlainTable::new();
    if !quiet {
        table.set_header(["NAME", "DESCRIPTION", "HIDDEN"]);
    }

    let mut tasks: Vec<_> = registry
        .tasks()
        .filter(|task| all || (!task.hidden && !task.disabled))
        .collect();
    tasks.sort_by(|a, b| a.public_name().cmp(b.public_name()));

    for task in tasks {
        if quiet {
            table.append([task.public_name()]);
        } else {
            table.append([
                task.public_name().to_string(),
                task.description.clone(),
                task.hidden.to_string(),
            ]);
        }
    }
    table.render(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .add_host(
                Host::new("web1")
                    .with_tags(["web", "prod"])
                    .with_description("frontend"),
            )
            .add_host(Host::new("web2").with_tags(["web"]))
            .add_host(Host::new("bastion").with_tags(["ops"]).hidden(true));

        let mut deploy = Task::new("deploy");
        deploy.description = "ship it".into();
        let mut secret = Task::new("secret");
        secret.hidden = true;
        let mut renamed = Task::new("internal-name");
        renamed.alias = Some("alpha".into());
        registry.add_task(deploy).add_task(secret).add_task(renamed);
        registry
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_hosts_table_hides_hidden_hosts() {
        let out = render(|buf| {
            let listing = HostListing {
                selections: vec!["web".into(), "ops".into()],
                ..Default::default()
            };
            list_hosts(buf, &registry(), &listing, false, false)
        });

        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("web1") && lines[1].contains("web,prod"));
        assert!(lines[2].starts_with("web2"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_hosts_quiet_all() {
        let out = render(|buf| {
            let listing = HostListing {
                selections: vec!["web".into(), "ops".into()],
                ..Default::default()
            };
            list_hosts(buf, &registry(), &listing, true, true)
        });
        assert_eq!(out, "bastion\nweb1\nweb2\n");
    }

    #[test]
    fn test_hosts_without_selection_lists_everything() {
        let listing = HostListing::default();
        let out = render(|buf| list_hosts(buf, &registry(), &listing, false, true));
        assert_eq!(out, "web1\nweb2\n");

        let out = render(|buf| list_hosts(buf, &registry(), &listing, true, true));
        assert_eq!(out, "bastion\nweb1\nweb2\n");
    }

    #[test]
    fn test_hosts_filter_without_select_is_rejected() {
        let listing = HostListing {
            filters: vec!["prod".into()],
            ..Default::default()
        };
        let err = list_hosts(&mut Vec::<u8>::new(), &registry(), &listing, false, false).unwrap_err();
        assert!(err.to_string().contains("filters require"));
    }

    #[test]
    fn test_hosts_as_ssh_config() {
        let out = render(|buf| {
            let listing = HostListing {
                selections: vec!["web".into()],
                filters: vec!["prod".into()],
                ssh_config: true,
            };
            list_hosts(buf, &registry(), &listing, false, false)
        });
        assert!(out.starts_with("Host web1\n"));
        assert!(!out.contains("web2"));
    }

    #[test]
    fn test_tags_are_sorted_and_unique() {
        let out = render(|buf| list_tags(buf, &registry(), true));
        assert_eq!(out, "ops\nprod\nweb\n");
    }

    #[test]
    fn test_tasks_use_public_names() {
        let out = render(|buf| list_tasks(buf, &registry(), false, true));
        assert_eq!(out, "alpha\ndeploy\n");

        let out = render(|buf| list_tasks(buf, &registry(), true, true));
        assert_eq!(out, "alpha\ndeploy\nsecret\n");
    }
}
