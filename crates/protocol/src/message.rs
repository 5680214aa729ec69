//! Request/response/event envelopes for the sidecar channel.
//!
//! Every line written to the sidecar is a [`Request`]; every line read back
//! is either a [`Response`] correlated by `id` or an unsolicited [`Event`].
//! Events are distinguished from responses by the absence of the `id` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Credentials, CredentialsPatch, DisconnectCause, Identity};

/// Request sent to the sidecar client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Unique request ID for correlating the response.
	pub id: u32,
	/// Operation and its parameters.
	#[serde(flatten)]
	pub op: RequestOp,
}

/// Operations understood by the sidecar client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "snake_case")]
pub enum RequestOp {
	/// First request after spawn: hand over stored credentials (if any) and
	/// start the connection attempt.
	Init {
		creds: Option<Credentials>,
	},
	/// Transmit a text message to a normalized protocol address.
	Send {
		jid: String,
		text: String,
	},
	/// Request a graceful protocol-level logout.
	Logout,
}

/// Response to a [`Request`], correlated by `id`.
///
/// `result` and `error` are mutually exclusive; a response with neither is a
/// success with no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
}

/// Error details carried by a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Unsolicited lifecycle event emitted by the sidecar client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
	/// A fresh pairing code was issued; supersedes any earlier code.
	PairingCode { code: String },
	/// Credential material changed and must be persisted.
	CredsUpdate { patch: CredentialsPatch },
	/// Connection state changed.
	Connection {
		status: ConnectionStatus,
		/// Present when `status` is `open`.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		identity: Option<Identity>,
		/// Present when `status` is `close`.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		cause: Option<DisconnectCause>,
	},
}

/// Connection event direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	Open,
	Close,
}

/// Discriminated union of inbound messages.
///
/// Uses serde's `untagged` to distinguish based on presence of `id`:
/// messages with `id` are responses, messages without are events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(Response),
	Event(Event),
}
