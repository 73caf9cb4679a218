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

//! Utility functions for the application

/// Show a short usage message, like ssh does without arguments.
pub fn show_usage() {
    println!("usage: fleetsh [<options>] [<ssh options and args...>]");
    println!("       fleetsh [<options>] <task> [<task args...>]");
    println!("       fleetsh [<options>] --exec [--target <tag|host>]... <command...>");
    println!("       fleetsh --hosts | --tags | --tasks [--all] [--quiet]");
    println!();
    println!(
        "fleetsh {} runs shell tasks across the hosts of fleetsh.yaml.",
        env!("CARGO_PKG_VERSION")
    );
    println!("For more information, try 'fleetsh --help'");
}
