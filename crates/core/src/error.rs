//! Error taxonomy for the session lifecycle and dispatch layers.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the session lifecycle and message dispatch.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Caller error; retrying the same request will not help.
	#[error("{0}")]
	BadRequest(String),

	/// No live session; the caller should pair the device and retry.
	#[error("device not connected; scan the pairing code first")]
	NotConnected,

	/// Transmission failed at the protocol layer; carries the underlying cause.
	#[error("send failed: {0}")]
	Send(String),

	/// Sidecar client failure (spawn, handshake, or request error).
	#[error("client error: {0}")]
	Client(String),

	/// The client channel closed before a response arrived.
	#[error("client channel closed before a response arrived")]
	ChannelClosed,

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CoreError {
	/// Stable machine-readable code used by the HTTP surface.
	pub fn code(&self) -> &'static str {
		match self {
			Self::BadRequest(_) => "bad_request",
			Self::NotConnected => "not_connected",
			Self::Send(_) => "send_error",
			Self::Client(_) | Self::ChannelClosed | Self::Io(_) | Self::Json(_) => "internal",
		}
	}
}
