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

//! Byte pumps between the console and host commands.
//!
//! Console input is read in fixed-size chunks and broadcast to one bounded
//! channel per host. Each host drains its channel into the command's stdin.
//! Command output is split into lines and written through the console.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::console::{Console, OutputStream};

pub const STDIN_CHUNK_SIZE: usize = 1024;
pub const STDIN_CHANNEL_CAPACITY: usize = 256;

pub type Chunk = Arc<[u8]>;

/// One bounded channel per host.
pub fn channels(count: usize) -> (Vec<mpsc::Sender<Chunk>>, Vec<mpsc::Receiver<Chunk>>) {
    (0..count)
        .map(|_| mpsc::channel(STDIN_CHANNEL_CAPACITY))
        .unzip()
}

/// Broadcast `input` to every sender until EOF, then close all channels.
///
/// Chunks reach each channel in the order they were read. Channels whose
/// receiver is gone are skipped from then on.
pub fn spawn_stdin_pump<R>(mut input: R, senders: Vec<mpsc::Sender<Chunk>>) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut senders: Vec<Option<mpsc::Sender<Chunk>>> =
            senders.into_iter().map(Some).collect();
        let mut buf = vec![0u8; STDIN_CHUNK_SIZE];

        loop {
            let n = match input.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("failed to read input: {e}");
                    break;
                }
            };

            let chunk: Chunk = Arc::from(&buf[..n]);
            for slot in senders.iter_mut() {
                let closed = match slot {
                    Some(tx) => tx.send(Arc::clone(&chunk)).await.is_err(),
                    None => false,
                };
                if closed {
                    *slot = None;
                }
            }

            if senders.iter().all(Option::is_none) {
                trace!("every host stopped reading input");
                break;
            }
        }
    })
}

fn log_forward_error(target: &str, err: &io::Error) {
    if err.kind() == io::ErrorKind::BrokenPipe {
        debug!(%target, "command closed its stdin");
    } else {
        error!("failed to forward input to {target}: {err}");
    }
}

/// Drain `rx` into `dest`, closing `dest` when the channel closes.
pub fn spawn_stdin_writer<W>(
    mut rx: mpsc::Receiver<Chunk>,
    mut dest: W,
    target: String,
) -> JoinHandle<()>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if let Err(e) = dest.write_all(&chunk).await {
                log_forward_error(&target, &e);
                return;
            }
        }
        if let Err(e) = dest.shutdown().await {
            log_forward_error(&target, &e);
        }
    })
}

/// Copy `input` straight into `dest` for a single consumer.
pub fn spawn_stdin_copy<R, W>(mut input: R, mut dest: W, target: String) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = tokio::io::copy(&mut input, &mut dest).await {
            log_forward_error(&target, &e);
            return;
        }
        if let Err(e) = dest.shutdown().await {
            log_forward_error(&target, &e);
        }
    })
}

/// Split `source` into lines and write each through the console.
pub fn spawn_line_scanner<R>(
    source: R,
    console: Arc<Console>,
    stream: OutputStream,
    prefix: Arc<str>,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(source);
        let mut line = Vec::with_capacity(256);
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if line.last() == Some(&b'\n') {
                        line.pop();
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                    }
                    if let Err(e) = console.write_line(stream, &prefix, &line) {
                        debug!("console write failed: {e}");
                        break;
                    }
                }
                Err(e) => {
                    console.report_error(&format_args!("failed to read command output: {e}"));
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_channel_gets_every_chunk_in_order() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let (senders, receivers) = channels(3);
        let pump = spawn_stdin_pump(std::io::Cursor::new(data.clone()), senders);

        let mut collected = Vec::new();
        for mut rx in receivers {
            let mut bytes = Vec::new();
            while let Some(chunk) = rx.recv().await {
                assert!(chunk.len() <= STDIN_CHUNK_SIZE);
                bytes.extend_from_slice(&chunk);
            }
            collected.push(bytes);
        }
        pump.await.unwrap();

        for bytes in collected {
            assert_eq!(bytes, data);
        }
    }

    #[tokio::test]
    async fn dropped_receivers_do_not_block_others() {
        let data = vec![b'z'; 4096];
        let (senders, mut receivers) = channels(2);
        drop(receivers.remove(0));
        let pump = spawn_stdin_pump(std::io::Cursor::new(data.clone()), senders);

        let mut rx = receivers.remove(0);
        let mut bytes = Vec::new();
        while let Some(chunk) = rx.recv().await {
            bytes.extend_from_slice(&chunk);
        }
        pump.await.unwrap();
        assert_eq!(bytes, data);
    }

    #[tokio::test]
    async fn scanner_strips_line_endings() {
        let (console, captured) = Console::captured(tokio::io::empty());
        let console = Arc::new(console);
        let source = std::io::Cursor::new(b"one\r\ntwo\nlast".to_vec());

        spawn_line_scanner(source, console, OutputStream::Stdout, Arc::from("[h] "))
            .await
            .unwrap();
        assert_eq!(captured.stdout(), "[h] one\n[h] two\n[h] last\n");
    }
}
