//! Protocol-client seam and its implementations.
//!
//! [`ChatClient`] is the boundary between the session lifecycle and the wire
//! protocol: the manager asks it for a connection and consumes the lifecycle
//! events it emits. [`process::ProcessClient`] drives a real sidecar process;
//! [`fake::FakeClient`] is the in-memory double used by tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use wagate_protocol::{Credentials, CredentialsPatch, DisconnectCause, Identity};

use crate::error::Result;

pub mod connection;
pub mod fake;
pub mod process;
pub mod transport;

/// Lifecycle event emitted by a live connection.
#[derive(Debug, Clone)]
pub enum ClientEvent {
	/// A pairing code was issued; only the latest one is meaningful.
	PairingCode(String),
	/// Credential material changed and must be persisted before anything else.
	CredsUpdate(CredentialsPatch),
	/// The handshake completed and the network assigned an identity.
	Open(Identity),
	/// The connection closed for the given cause.
	Closed(DisconnectCause),
}

/// Factory for live connections to the chat network.
#[async_trait]
pub trait ChatClient: Send + Sync + 'static {
	/// Starts a connection attempt with the stored credentials (if any).
	///
	/// Returning `Ok` means the client is up and will emit events; it does
	/// not mean the session is paired or connected yet.
	async fn connect(&self, creds: Option<Credentials>) -> Result<ClientConnection>;
}

/// Operations available on a live connection.
///
/// Exclusively owned by the session manager; a new connection supersedes the
/// old handle wholesale.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
	/// Transmits a text message, returning the protocol-assigned id if present.
	async fn send_text(&self, jid: &str, text: &str) -> Result<Option<String>>;

	/// Requests a graceful protocol-level logout.
	async fn logout(&self) -> Result<()>;

	/// Tears the connection down; further events from it are meaningless.
	async fn shutdown(&self);
}

/// A started connection: the handle for issuing requests plus its event stream.
pub struct ClientConnection {
	pub handle: Arc<dyn ConnectionHandle>,
	pub events: mpsc::UnboundedReceiver<ClientEvent>,
}
