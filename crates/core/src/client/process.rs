//! Sidecar-process implementation of the protocol-client seam.
//!
//! Spawns the configured client command with piped stdio, hands it the stored
//! credentials via an `init` request, and exposes the resulting connection.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use wagate_protocol::{Credentials, RequestOp};

use super::connection::Connection;
use super::transport::{PipeWriter, spawn_reader};
use super::{ChatClient, ClientConnection, ConnectionHandle};
use crate::error::{CoreError, Result};

/// Upper bound on the sidecar `init` handshake so a wedged process fails the
/// attempt instead of pinning the session at Connecting forever.
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Protocol client backed by an external sidecar process.
pub struct ProcessClient {
	program: String,
	args: Vec<String>,
	init_timeout: Duration,
}

impl ProcessClient {
	/// Creates a client from a program-and-arguments command line.
	pub fn new(command: &[String]) -> Result<Self> {
		let (program, args) = command
			.split_first()
			.ok_or_else(|| CoreError::Client("client command must not be empty".into()))?;
		Ok(Self {
			program: program.clone(),
			args: args.to_vec(),
			init_timeout: INIT_TIMEOUT,
		})
	}
}

#[async_trait]
impl ChatClient for ProcessClient {
	async fn connect(&self, creds: Option<Credentials>) -> Result<ClientConnection> {
		let mut child = Command::new(&self.program)
			.args(&self.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true)
			.spawn()
			.map_err(|err| CoreError::Client(format!("failed to spawn sidecar `{}`: {err}", self.program)))?;

		let stdin = child
			.stdin
			.take()
			.ok_or_else(|| CoreError::Client("sidecar stdin unavailable".into()))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| CoreError::Client("sidecar stdout unavailable".into()))?;

		let inbound = spawn_reader(stdout);
		let connection = Arc::new(Connection::new(PipeWriter::new(stdin)));
		let (event_tx, event_rx) = mpsc::unbounded_channel();
		tokio::spawn(Arc::clone(&connection).run(inbound, event_tx));

		debug!(target = "wagate.client", program = %self.program, pid = child.id(), "sidecar spawned");

		let init = connection.request(RequestOp::Init { creds });
		match tokio::time::timeout(self.init_timeout, init).await {
			Ok(Ok(_)) => {}
			Ok(Err(err)) => {
				kill_child(&mut child).await;
				return Err(err);
			}
			Err(_) => {
				kill_child(&mut child).await;
				return Err(CoreError::Client("sidecar init timed out".into()));
			}
		}

		let handle = Arc::new(ProcessHandle {
			connection,
			child: Mutex::new(child),
		});

		Ok(ClientConnection { handle, events: event_rx })
	}
}

struct ProcessHandle {
	connection: Arc<Connection>,
	child: Mutex<Child>,
}

#[async_trait]
impl ConnectionHandle for ProcessHandle {
	async fn send_text(&self, jid: &str, text: &str) -> Result<Option<String>> {
		let result = self
			.connection
			.request(RequestOp::Send {
				jid: jid.to_string(),
				text: text.to_string(),
			})
			.await?;
		Ok(result.get("message_id").and_then(|id| id.as_str()).map(str::to_string))
	}

	async fn logout(&self) -> Result<()> {
		self.connection.request(RequestOp::Logout).await?;
		Ok(())
	}

	async fn shutdown(&self) {
		kill_child(&mut *self.child.lock().await).await;
	}
}

async fn kill_child(child: &mut Child) {
	if let Err(err) = child.start_kill() {
		// Already exited is the common case here.
		debug!(target = "wagate.client", error = %err, "sidecar kill skipped");
	}
	if let Err(err) = child.wait().await {
		warn!(target = "wagate.client", error = %err, "failed to reap sidecar");
	}
}
