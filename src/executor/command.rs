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

//! Command lines for running a rendered script on a host or locally.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::host::Host;
use crate::task::Task;
use crate::utils::shell::{join_escaped, shell_escape};

/// Program and arguments of a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Start directory; inherited when `None`.
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_escaped(
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str)),
        ))
    }
}

/// The local shell and the flag that makes it run a script argument.
pub fn local_shell() -> (&'static str, &'static str) {
    if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("bash", "-c")
    }
}

/// Wrap `script` in `sudo` when the task asks for it.
///
/// A named user takes precedence over `privileged`. When `cd_into` is set
/// the wrapped script first changes into it, because a login shell starts
/// in the target user's home.
pub fn escalate(script: &str, task: &Task, cd_into: Option<&Path>) -> String {
    if !task.needs_escalation() {
        return script.to_string();
    }

    let body = match cd_into {
        Some(dir) => format!("cd {}\n{script}", shell_escape(&dir.to_string_lossy())),
        None => script.to_string(),
    };

    match task.escalation_user() {
        Some(user) => format!(
            "sudo -u {} bash -l -c {}",
            shell_escape(user),
            shell_escape(&body)
        ),
        None => format!("sudo bash -l -c {}", shell_escape(&body)),
    }
}

/// `ssh [host options] [-t -t] -F <config> <host> bash -c <script>`
pub fn remote_command(
    ssh_program: &str,
    ssh_config: &Path,
    task: &Task,
    host: &Host,
    script: &str,
) -> CommandSpec {
    let script = escalate(script, task, None);

    let mut args = host.ssh_options.clone();
    if task.pty {
        args.extend(["-t".to_string(), "-t".to_string()]);
    }
    args.extend([
        "-F".to_string(),
        ssh_config.display().to_string(),
        host.name.clone(),
        "bash".to_string(),
        "-c".to_string(),
        shell_escape(&script),
    ]);

    CommandSpec {
        program: ssh_program.to_string(),
        args,
        current_dir: None,
    }
}

/// Run `script` through the local shell from `working_dir`.
pub fn local_command(task: &Task, working_dir: &Path, script: &str) -> CommandSpec {
    let (shell, flag) = local_shell();
    CommandSpec {
        program: shell.to_string(),
        args: vec![flag.to_string(), escalate(script, task, Some(working_dir))],
        current_dir: Some(working_dir.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_script_is_left_alone() {
        let task = Task::new("t");
        assert_eq!(escalate("echo hi", &task, None), "echo hi");
    }

    #[test]
    fn privileged_uses_sudo_login_shell() {
        let mut task = Task::new("t");
        task.privileged = true;
        assert_eq!(
            escalate("echo hi", &task, None),
            "sudo bash -l -c 'echo hi'"
        );
    }

    #[test]
    fn user_takes_precedence_over_privileged() {
        let mut task = Task::new("t");
        task.privileged = true;
        task.user = Some("deploy".into());
        assert_eq!(
            escalate("whoami", &task, None),
            "sudo -u deploy bash -l -c whoami"
        );
    }

    #[test]
    fn local_escalation_changes_directory_first() {
        let mut task = Task::new("t");
        task.user = Some("deploy".into());
        let cmd = local_command(&task, Path::new("/srv/app"), "make");
        assert_eq!(cmd.args[1], "sudo -u deploy bash -l -c 'cd /srv/app\nmake'");
        assert_eq!(cmd.current_dir.as_deref(), Some(Path::new("/srv/app")));
    }

    #[test]
    fn remote_command_layout() {
        let mut task = Task::new("t");
        task.pty = true;
        let mut host = Host::new("web1");
        host.ssh_options = vec!["-o".into(), "BatchMode=yes".into()];

        let cmd = remote_command("ssh", Path::new("/tmp/cfg"), &task, &host, "echo hi");
        assert_eq!(cmd.program, "ssh");
        assert_eq!(
            cmd.args,
            vec!["-o", "BatchMode=yes", "-t", "-t", "-F", "/tmp/cfg", "web1", "bash", "-c", "'echo hi'"]
        );
    }

    #[test]
    fn remote_privileged_script_is_escaped_twice() {
        let mut task = Task::new("t");
        task.privileged = true;
        let host = Host::new("web1");

        let cmd = remote_command("ssh", Path::new("/tmp/cfg"), &task, &host, "id -u");
        assert_eq!(
            cmd.args.last().unwrap(),
            &shell_escape("sudo bash -l -c 'id -u'")
        );
    }
}
