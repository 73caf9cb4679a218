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

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::task::Backend;

/// Command line of the `fleetsh` binary.
///
/// Only long options are defined so that every short flag reaches the ssh
/// client untouched. Options must come before the first plain argument;
/// everything from there on is kept verbatim in `args`.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "fleetsh",
    version,
    about = "Run shell tasks across a fleet of hosts, or ssh into one of them",
    long_about = "fleetsh wraps the ssh client with a YAML registry of hosts, tags and tasks.\n\
        Hosts become entries of a generated ssh_config. Tasks render one shell script per\n\
        selected host and run it over ssh or locally, sequentially or in parallel.\n\
        Anything that is not a task is passed to ssh as an interactive session.",
    after_help = "EXAMPLES:\n  \
        Log in to a configured host:      fleetsh web1\n  \
        Run a task with arguments:        fleetsh deploy v1.2\n  \
        Ad-hoc command on tagged hosts:   fleetsh --exec --target web --parallel uptime\n  \
        List hosts of a tag:              fleetsh --hosts --select web\n  \
        Show the generated ssh_config:    fleetsh --print",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    #[arg(long, action = ArgAction::Help, help = "Print help")]
    pub help: Option<bool>,

    #[arg(long, action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,

    // General options
    #[arg(
        long,
        env = "FLEETSH_CONFIG",
        value_name = "FILE",
        help = "Load the working configuration from FILE instead of ./fleetsh.yaml"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Change to DIR before loading configuration")]
    pub working_dir: Option<PathBuf>,

    #[arg(long, help = "Ignore the working directory configuration")]
    pub global: bool,

    #[arg(long, conflicts_with = "no_color", help = "Force coloured output")]
    pub color: bool,

    #[arg(long, help = "Disable coloured output")]
    pub no_color: bool,

    #[arg(long, env = "FLEETSH_DEBUG", help = "Enable debug logging")]
    pub debug: bool,

    #[arg(
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity (repeat for more detail)"
    )]
    pub verbose: u8,

    #[arg(long, help = "Print the generated ssh_config and exit")]
    pub print: bool,

    #[arg(long, help = "Only generate the ssh_config")]
    pub gen: bool,

    #[arg(long, help = "Print shell functions wrapping scp and rsync")]
    pub aliases: bool,

    // Listing
    #[arg(long, help = "List hosts")]
    pub hosts: bool,

    #[arg(
        long,
        value_name = "TAG|HOST",
        help = "With --hosts: only hosts matching any selection"
    )]
    pub select: Vec<String>,

    #[arg(
        long,
        value_name = "TAG|HOST",
        help = "With --hosts or --exec: keep only selected hosts matching any filter"
    )]
    pub filter: Vec<String>,

    #[arg(long, help = "With --hosts: print the selected hosts as ssh_config")]
    pub ssh_config: bool,

    #[arg(long, help = "With --hosts or --tasks: include hidden entries")]
    pub all: bool,

    #[arg(long, help = "With --hosts, --tags or --tasks: print names only")]
    pub quiet: bool,

    #[arg(long, help = "List tags")]
    pub tags: bool,

    #[arg(long, help = "List tasks")]
    pub tasks: bool,

    // Ad-hoc execution
    #[arg(long, help = "Run the arguments as a command on the target hosts")]
    pub exec: bool,

    #[arg(
        long,
        value_name = "TAG|HOST",
        help = "With --exec: hosts to run the command on"
    )]
    pub target: Vec<String>,

    #[arg(
        long,
        value_name = "remote|local",
        help = "With --exec: run on the remote hosts or on this machine"
    )]
    pub backend: Option<Backend>,

    #[arg(long, help = "With --exec: prefix every output line")]
    pub prefix: bool,

    #[arg(
        long,
        value_name = "TEMPLATE",
        help = "With --exec: custom output prefix template"
    )]
    pub prefix_string: Option<String>,

    #[arg(long, help = "With --exec: run as root through sudo")]
    pub privileged: bool,

    #[arg(long, value_name = "USER", help = "With --exec: run as USER through sudo")]
    pub user: Option<String>,

    #[arg(long, help = "With --exec: run on all hosts at once")]
    pub parallel: bool,

    #[arg(long, help = "With --exec: allocate a pseudo-terminal (ssh -t -t)")]
    pub pty: bool,

    #[arg(long, help = "With --exec: treat the argument as a script file")]
    pub script_file: bool,

    #[arg(long, value_name = "NAME", help = "With --exec: render with driver NAME")]
    pub driver: Option<String>,

    /// Task name and its arguments, the --exec command, or ssh arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Log verbosity after applying `--debug`.
    pub fn verbosity(&self) -> u8 {
        crate::utils::effective_verbosity(self.verbose, self.debug)
    }

    /// Explicit colour choice, if one was made.
    pub fn color_override(&self) -> Option<bool> {
        if self.no_color {
            Some(false)
        } else if self.color {
            Some(true)
        } else {
            None
        }
    }

    pub fn is_listing(&self) -> bool {
        self.hosts || self.tags || self.tasks
    }
}
