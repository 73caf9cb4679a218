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

//! Line-atomic output shared by every host of a run.
//!
//! A prefix and its line are written while holding the stream lock, so
//! concurrent hosts interleave only at line boundaries. A [`Console`] is
//! either bound to the process stdio or to in-memory buffers for tests and
//! embedding.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use owo_colors::OwoColorize;
use tokio::io::AsyncRead;

/// Leading text of every error line printed by fleetsh.
pub const ERROR_PREFIX: &str = "fleetsh error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Input forwarded to host commands.
pub type ConsoleInput = Box<dyn AsyncRead + Send + Unpin>;

type Sink = Box<dyn Write + Send>;

struct Streams {
    stdout: Sink,
    stderr: Sink,
}

impl Streams {
    fn get(&mut self, stream: OutputStream) -> &mut Sink {
        match stream {
            OutputStream::Stdout => &mut self.stdout,
            OutputStream::Stderr => &mut self.stderr,
        }
    }
}

pub struct Console {
    streams: Mutex<Streams>,
    input: Mutex<Option<ConsoleInput>>,
    inherit_stdio: bool,
    color: bool,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("inherit_stdio", &self.inherit_stdio)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl Console {
    /// Console bound to the process's stdin, stdout and stderr.
    pub fn stdio(color: bool) -> Self {
        Self {
            streams: Mutex::new(Streams {
                stdout: Box::new(io::stdout()),
                stderr: Box::new(io::stderr()),
            }),
            input: Mutex::new(Some(Box::new(tokio::io::stdin()))),
            inherit_stdio: true,
            color,
        }
    }

    /// Console reading from `input` and recording everything written.
    pub fn captured<R>(input: R) -> (Self, CapturedOutput)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let captured = CapturedOutput::default();
        let console = Self {
            streams: Mutex::new(Streams {
                stdout: Box::new(captured.stdout.clone()),
                stderr: Box::new(captured.stderr.clone()),
            }),
            input: Mutex::new(Some(Box::new(input))),
            inherit_stdio: false,
            color: false,
        };
        (console, captured)
    }

    /// Whether child processes may be wired straight to the terminal.
    pub fn inherits_stdio(&self) -> bool {
        self.inherit_stdio
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Take the input stream. Only the first caller gets it.
    pub fn take_input(&self) -> Option<ConsoleInput> {
        self.input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Write `prefix` and `line` followed by a newline as one unit.
    pub fn write_line(&self, stream: OutputStream, prefix: &str, line: &[u8]) -> io::Result<()> {
        let mut buf = Vec::with_capacity(prefix.len() + line.len() + 16);
        if !prefix.is_empty() {
            if self.color {
                write!(buf, "{}", prefix.cyan())?;
            } else {
                buf.extend_from_slice(prefix.as_bytes());
            }
        }
        buf.extend_from_slice(line);
        buf.push(b'\n');

        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        let sink = streams.get(stream);
        sink.write_all(&buf)?;
        sink.flush()
    }

    /// Print a `fleetsh error:` line on the error stream.
    pub fn report_error(&self, message: &dyn fmt::Display) {
        let text = format!("{ERROR_PREFIX}{message}");
        let line = if self.color {
            text.red().to_string()
        } else {
            text
        };
        if let Err(e) = self.write_line(OutputStream::Stderr, "", line.as_bytes()) {
            tracing::debug!("failed to report error on console: {e}");
        }
    }
}

/// In-memory streams of a captured [`Console`].
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

impl CapturedOutput {
    pub fn stdout_bytes(&self) -> Vec<u8> {
        self.stdout.contents()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.contents()).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr.contents()).into_owned()
    }
}

#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
