//! Outbound message dispatch.
//!
//! Validates a send request, guarantees a session exists, normalizes the
//! recipient into a protocol address, and delegates transmission to the
//! connection handle. Reconnection on failure stays the session manager's
//! job; the dispatcher never retries.

use std::sync::Arc;

use tracing::debug;
use wagate_protocol::DIRECT_ADDRESS_SUFFIX;

use crate::client::ChatClient;
use crate::error::{CoreError, Result};
use crate::session::SessionManager;

/// Service facade for `POST /send`.
pub struct MessageDispatcher<C: ChatClient> {
	manager: Arc<SessionManager<C>>,
}

impl<C: ChatClient> MessageDispatcher<C> {
	pub fn new(manager: Arc<SessionManager<C>>) -> Self {
		Self { manager }
	}

	/// Sends `text` to `to`, returning the protocol-assigned message id when
	/// the client reports one.
	pub async fn send(&self, to: &str, text: &str) -> Result<Option<String>> {
		if to.is_empty() || text.is_empty() {
			return Err(CoreError::BadRequest("to and message are required".into()));
		}

		let jid = normalize_recipient(to);

		if !self.manager.is_connected() {
			// One attempt only; callers re-pair and retry, we don't loop.
			if let Err(err) = self.manager.ensure_session().await {
				debug!(target = "wagate.dispatch", error = %err, "ensure_session failed before send");
			}
		}
		if !self.manager.is_connected() {
			return Err(CoreError::NotConnected);
		}
		let handle = self.manager.connection_handle().ok_or(CoreError::NotConnected)?;

		handle
			.send_text(&jid, text)
			.await
			.map_err(|err| CoreError::Send(err.to_string()))
	}
}

/// Normalizes a raw phone-like string into a direct-message protocol address.
///
/// Strips every non-digit and appends the network suffix. Total over any
/// input: with no digits left the address is degenerate and the client is
/// expected to reject it downstream.
pub fn normalize_recipient(raw: &str) -> String {
	let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
	format!("{digits}{DIRECT_ADDRESS_SUFFIX}")
}
