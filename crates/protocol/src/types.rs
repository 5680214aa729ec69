//! Domain data shared across the sidecar channel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Network suffix appended to a normalized recipient for direct messages.
pub const DIRECT_ADDRESS_SUFFIX: &str = "@s.whatsapp.net";

/// Device identity reported by the network once a session is established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Network-assigned account identifier (phone-derived).
	pub id: String,
	/// Display name registered for the device, when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Full durable credential map, one opaque record per key.
pub type Credentials = BTreeMap<String, Value>;

/// Partial credential update emitted by the client during a handshake.
///
/// Keys overwrite the corresponding records in the durable map; absent keys
/// are left untouched, so applying the same patch twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialsPatch(pub BTreeMap<String, Value>);

/// Reason reported by the client when the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectCause {
	/// Remote side invalidated the session permanently.
	LoggedOut,
	/// Server closed the connection.
	ConnectionClosed,
	/// Network-level drop.
	ConnectionLost,
	/// Another device took over the session stream.
	ConnectionReplaced,
	/// Handshake or keepalive timed out.
	TimedOut,
	/// Server asked for a stream restart.
	RestartRequired,
	/// Stored session state was rejected by the server.
	BadSession,
	/// Anything the client could not classify.
	#[serde(other)]
	Unknown,
}
