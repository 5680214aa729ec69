//! Request/response correlation over the sidecar channel.
//!
//! Outbound requests get sequential ids and a oneshot callback; the read loop
//! correlates responses by id and forwards unsolicited events to the session
//! layer. Messages with an `id` are responses, messages without are events.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};
use wagate_protocol::{ConnectionStatus, DisconnectCause, ErrorPayload, Event, Message, Request, RequestOp};

use super::ClientEvent;
use super::transport::PipeWriter;
use crate::error::{CoreError, Result};

/// Correlation layer for one sidecar connection.
///
/// Thread-safe behind an `Arc`; concurrent requests are supported.
pub struct Connection {
	last_id: AtomicU32,
	callbacks: Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>,
	writer: Mutex<PipeWriter>,
}

impl Connection {
	pub fn new(writer: PipeWriter) -> Self {
		Self {
			last_id: AtomicU32::new(0),
			callbacks: Mutex::new(HashMap::new()),
			writer: Mutex::new(writer),
		}
	}

	/// Sends a request to the sidecar and awaits its response payload.
	pub async fn request(&self, op: RequestOp) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().await.insert(id, tx);

		let request = serde_json::to_value(Request { id, op })?;
		if let Err(err) = self.writer.lock().await.send(&request).await {
			self.callbacks.lock().await.remove(&id);
			return Err(err);
		}

		rx.await.map_err(|_| CoreError::ChannelClosed).and_then(|result| result)
	}

	/// Runs the dispatch loop until the sidecar channel closes.
	///
	/// Responses complete their pending request; events are forwarded on
	/// `events`. Pending requests are failed when the loop ends.
	pub async fn run(self: Arc<Self>, mut inbound: mpsc::UnboundedReceiver<Value>, events: mpsc::UnboundedSender<ClientEvent>) {
		while let Some(value) = inbound.recv().await {
			match serde_json::from_value::<Message>(value.clone()) {
				Ok(Message::Response(response)) => {
					let callback = self.callbacks.lock().await.remove(&response.id);
					let Some(callback) = callback else {
						warn!(target = "wagate.client", id = response.id, "response without a pending request");
						continue;
					};
					let result = match response.error {
						Some(error) => Err(request_error(error)),
						None => Ok(response.result.unwrap_or(Value::Null)),
					};
					let _ = callback.send(result);
				}
				Ok(Message::Event(event)) => {
					let Some(event) = map_event(event) else {
						continue;
					};
					if events.send(event).is_err() {
						// Consumer went away; keep serving responses.
						debug!(target = "wagate.client", "event consumer dropped");
					}
				}
				Err(err) => {
					warn!(target = "wagate.client", error = %err, message = %value, "unparseable sidecar message");
				}
			}
		}

		debug!(target = "wagate.client", "dispatch loop ended");
		for (_, callback) in self.callbacks.lock().await.drain() {
			let _ = callback.send(Err(CoreError::ChannelClosed));
		}
	}
}

fn request_error(error: ErrorPayload) -> CoreError {
	match error.name.as_deref() {
		Some(name) => CoreError::Client(format!("{name}: {}", error.message)),
		None => CoreError::Client(error.message),
	}
}

fn map_event(event: Event) -> Option<ClientEvent> {
	match event {
		Event::PairingCode { code } => Some(ClientEvent::PairingCode(code)),
		Event::CredsUpdate { patch } => Some(ClientEvent::CredsUpdate(patch)),
		Event::Connection { status: ConnectionStatus::Open, identity, .. } => match identity {
			Some(identity) => Some(ClientEvent::Open(identity)),
			None => {
				warn!(target = "wagate.client", "open event without identity; ignoring");
				None
			}
		},
		Event::Connection { status: ConnectionStatus::Close, cause, .. } => {
			Some(ClientEvent::Closed(cause.unwrap_or(DisconnectCause::Unknown)))
		}
	}
}
