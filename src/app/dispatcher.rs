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

//! Routes an [`Invocation`] to its implementation.

use std::io;
use std::sync::Arc;

use anyhow::Result;

use fleetsh::cli::{Cli, Invocation, Mode};
use fleetsh::commands::aliases::print_aliases;
use fleetsh::commands::list::{list_hosts, list_tags, list_tasks};
use fleetsh::{run_interactive_session, run_task, ExecutorOptions, SessionOptions, TaskExecutor};

use super::initialization::AppContext;
use super::utils::show_usage;

/// Run the mode selected by `cli` and return the exit code.
pub async fn dispatch(cli: &Cli, ctx: &AppContext) -> Result<i32> {
    let invocation = Invocation::from_cli(cli, &ctx.registry)?;
    tracing::debug!(mode = ?invocation.mode, "dispatching");

    match invocation.mode {
        Mode::Aliases => print_aliases(&mut io::stdout(), &executable())?,
        Mode::ListHosts(listing) => list_hosts(
            &mut io::stdout(),
            &ctx.registry,
            &listing,
            invocation.all,
            invocation.quiet,
        )?,
        Mode::ListTags => list_tags(&mut io::stdout(), &ctx.registry, invocation.quiet)?,
        Mode::ListTasks => list_tasks(
            &mut io::stdout(),
            &ctx.registry,
            invocation.all,
            invocation.quiet,
        )?,
        Mode::PrintConfig => println!("{}", String::from_utf8_lossy(&ctx.ssh_config_content)),
        Mode::GenConfig => {}
        Mode::Exec(task) => run_task(&executor(ctx), &task, &[]).await?,
        Mode::RunTask { task, args } => run_task(&executor(ctx), &task, &args).await?,
        Mode::Usage => show_usage(),
        Mode::Session(args) => {
            let options = SessionOptions::new(ctx.ssh_config_path());
            return Ok(run_interactive_session(&ctx.registry, &options, &args).await?);
        }
    }

    Ok(0)
}

/// Path of the running binary, for code that calls back into it.
fn executable() -> String {
    std::env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "fleetsh".to_string())
}

fn executor(ctx: &AppContext) -> TaskExecutor {
    TaskExecutor::new(
        Arc::clone(&ctx.registry),
        ctx.ssh_config_path(),
        Arc::clone(&ctx.console),
    )
    .with_options(ExecutorOptions {
        working_dir: ctx.working_dir.clone(),
        ..ExecutorOptions::default()
    })
}
