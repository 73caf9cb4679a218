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

//! Running tasks on hosts: command lines, stream plumbing and dispatch.

pub mod command;
mod console;
pub mod exit_code;
mod pump;
mod runner;

pub use command::{local_command, remote_command, CommandSpec};
pub use console::{CapturedOutput, Console, ConsoleInput, OutputStream, ERROR_PREFIX};
pub use exit_code::{exit_code_of, spawn_failure_code, EXIT_ERR};
pub use pump::{STDIN_CHANNEL_CAPACITY, STDIN_CHUNK_SIZE};
pub use runner::{
    ExecutorOptions, TaskExecutor, DEFAULT_LOCAL_PREFIX, DEFAULT_REMOTE_PREFIX, HOSTLESS_PREFIX,
};
