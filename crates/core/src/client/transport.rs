//! Newline-delimited JSON transport over sidecar stdio.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;

/// Writer half of the pipe: one JSON document per line.
pub struct PipeWriter {
	stdin: ChildStdin,
}

impl PipeWriter {
	pub fn new(stdin: ChildStdin) -> Self {
		Self { stdin }
	}

	/// Serializes `message` and writes it as a single line.
	pub async fn send(&mut self, message: &Value) -> Result<()> {
		let mut line = serde_json::to_vec(message)?;
		line.push(b'\n');
		self.stdin.write_all(&line).await?;
		self.stdin.flush().await?;
		Ok(())
	}
}

/// Spawns the background read loop for the sidecar's stdout.
///
/// Each parsed line is forwarded on the returned channel; malformed lines are
/// logged and skipped. The channel closes when the sidecar closes its stdout.
pub fn spawn_reader(stdout: ChildStdout) -> mpsc::UnboundedReceiver<Value> {
	let (tx, rx) = mpsc::unbounded_channel();

	tokio::spawn(async move {
		let mut lines = BufReader::new(stdout).lines();
		loop {
			match lines.next_line().await {
				Ok(Some(line)) => {
					let line = line.trim();
					if line.is_empty() {
						continue;
					}
					match serde_json::from_str::<Value>(line) {
						Ok(value) => {
							if tx.send(value).is_err() {
								return;
							}
						}
						Err(err) => {
							warn!(target = "wagate.client", error = %err, "discarding malformed sidecar line");
						}
					}
				}
				Ok(None) => break,
				Err(err) => {
					warn!(target = "wagate.client", error = %err, "sidecar stdout read failed");
					break;
				}
			}
		}
		debug!(target = "wagate.client", "sidecar stdout closed");
	});

	rx
}
