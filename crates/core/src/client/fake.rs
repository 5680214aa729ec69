//! Fake protocol client for testing the session lifecycle without a sidecar.
//!
//! # Example
//!
//! ```ignore
//! let (client, controller) = FakeClient::new();
//! let manager = SessionManager::new(client, store);
//!
//! manager.ensure_session().await?;
//! controller.emit(ClientEvent::Open(identity));
//! assert!(manager.status().connected);
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use wagate_protocol::Credentials;

use super::{ChatClient, ClientConnection, ClientEvent, ConnectionHandle};
use crate::error::{CoreError, Result};

#[derive(Default)]
struct Shared {
	connect_calls: AtomicUsize,
	logout_calls: AtomicUsize,
	fail_connect: AtomicBool,
	connect_delay: Mutex<Option<Duration>>,
	send_error: Mutex<Option<String>>,
	message_id: Mutex<Option<String>>,
	sent: Mutex<Vec<(String, String)>>,
	creds_seen: Mutex<Vec<Option<Credentials>>>,
	event_senders: Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>,
}

/// In-memory [`ChatClient`] double.
pub struct FakeClient {
	shared: Arc<Shared>,
}

/// Controller for injecting events and inspecting client interactions.
pub struct FakeController {
	shared: Arc<Shared>,
}

impl FakeClient {
	/// Creates the fake and its controller.
	pub fn new() -> (Self, FakeController) {
		let shared = Arc::new(Shared {
			message_id: Mutex::new(Some("MSG-1".to_string())),
			..Shared::default()
		});
		(
			Self { shared: Arc::clone(&shared) },
			FakeController { shared },
		)
	}
}

#[async_trait]
impl ChatClient for FakeClient {
	async fn connect(&self, creds: Option<Credentials>) -> Result<ClientConnection> {
		let delay = *self.shared.connect_delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		self.shared.connect_calls.fetch_add(1, Ordering::SeqCst);
		self.shared.creds_seen.lock().unwrap().push(creds);

		if self.shared.fail_connect.load(Ordering::SeqCst) {
			return Err(CoreError::Client("fake connect failure".into()));
		}

		let (event_tx, event_rx) = mpsc::unbounded_channel();
		self.shared.event_senders.lock().unwrap().push(event_tx);

		Ok(ClientConnection {
			handle: Arc::new(FakeHandle { shared: Arc::clone(&self.shared) }),
			events: event_rx,
		})
	}
}

struct FakeHandle {
	shared: Arc<Shared>,
}

#[async_trait]
impl ConnectionHandle for FakeHandle {
	async fn send_text(&self, jid: &str, text: &str) -> Result<Option<String>> {
		if let Some(message) = self.shared.send_error.lock().unwrap().clone() {
			return Err(CoreError::Client(message));
		}
		self.shared.sent.lock().unwrap().push((jid.to_string(), text.to_string()));
		Ok(self.shared.message_id.lock().unwrap().clone())
	}

	async fn logout(&self) -> Result<()> {
		self.shared.logout_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn shutdown(&self) {}
}

impl FakeController {
	/// Emits an event on the most recent connection.
	pub fn emit(&self, event: ClientEvent) {
		let senders = self.shared.event_senders.lock().unwrap();
		if let Some(sender) = senders.last() {
			let _ = sender.send(event);
		}
	}

	/// Emits an event on the `index`-th connection (0-based), live or stale.
	pub fn emit_on(&self, index: usize, event: ClientEvent) {
		let senders = self.shared.event_senders.lock().unwrap();
		if let Some(sender) = senders.get(index) {
			let _ = sender.send(event);
		}
	}

	/// Number of `connect` calls observed.
	pub fn connect_calls(&self) -> usize {
		self.shared.connect_calls.load(Ordering::SeqCst)
	}

	/// Number of protocol logout requests observed.
	pub fn logout_calls(&self) -> usize {
		self.shared.logout_calls.load(Ordering::SeqCst)
	}

	/// Makes subsequent `connect` calls fail (or succeed again).
	pub fn fail_connect(&self, fail: bool) {
		self.shared.fail_connect.store(fail, Ordering::SeqCst);
	}

	/// Delays `connect` completion, to widen race windows in tests.
	pub fn set_connect_delay(&self, delay: Option<Duration>) {
		*self.shared.connect_delay.lock().unwrap() = delay;
	}

	/// Makes subsequent sends fail with the given cause.
	pub fn set_send_error(&self, message: Option<&str>) {
		*self.shared.send_error.lock().unwrap() = message.map(str::to_string);
	}

	/// Sets the message id returned by subsequent sends.
	pub fn set_message_id(&self, id: Option<&str>) {
		*self.shared.message_id.lock().unwrap() = id.map(str::to_string);
	}

	/// Messages transmitted through any connection, as `(jid, text)` pairs.
	pub fn sent(&self) -> Vec<(String, String)> {
		self.shared.sent.lock().unwrap().clone()
	}

	/// Credentials passed to each `connect` call, in order.
	pub fn creds_seen(&self) -> Vec<Option<Credentials>> {
		self.shared.creds_seen.lock().unwrap().clone()
	}
}
