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

//! `--aliases`: shell functions that reuse the generated ssh_config.

use std::io::Write;

use anyhow::Result;

use crate::utils::shell::shell_escape;

/// Shell code defining `escp` and `ersync` on top of `executable --exec`.
pub fn aliases_code(executable: &str) -> String {
    let exe = shell_escape(executable);
    format!(
        r#"# Shell functions wrapping scp and rsync with fleetsh hosts.
# Load them from your shell rc file:
#   eval "$(fleetsh --aliases)"
function escp() {{
    {exe} --exec 'scp -F $FLEETSH_SSH_CONFIG' "$@"
}}
function ersync() {{
    {exe} --exec 'rsync -e "ssh -F $FLEETSH_SSH_CONFIG"' "$@"
}}
"#
    )
}

pub fn print_aliases<W: Write>(out: &mut W, executable: &str) -> Result<()> {
    out.write_all(aliases_code(executable).as_bytes())?;
    Ok(())
}
