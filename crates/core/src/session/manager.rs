//! Session orchestration: connection ownership and lifecycle supervision.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use wagate_protocol::Identity;

use super::credentials::CredentialStore;
use super::pairing::PairingChannel;
use super::state::{self, Effect, SessionStatus, StatusSnapshot};
use crate::client::{ChatClient, ClientEvent, ConnectionHandle};
use crate::error::Result;

const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Owns the single live connection to the chat network.
///
/// All lifecycle entry points (`ensure_session`, `logout`) serialize on one
/// async mutex, so concurrent callers collapse into at most one in-flight
/// connection attempt. Each attempt gets an epoch; events and retries from a
/// superseded epoch are dropped.
pub struct SessionManager<C: ChatClient> {
	client: C,
	store: CredentialStore,
	pairing: PairingChannel,
	connect_lock: Mutex<()>,
	/// Orders credential writes against erasure so erase is the last write.
	store_lock: StdMutex<()>,
	shared: StdMutex<Shared>,
}

struct Shared {
	status: SessionStatus,
	identity: Option<Identity>,
	epoch: u64,
	handle: Option<Arc<dyn ConnectionHandle>>,
	retry_attempts: u32,
}

impl<C: ChatClient> SessionManager<C> {
	/// Creates a manager around `client` and `store`. Starts Idle.
	pub fn new(client: C, store: CredentialStore) -> Arc<Self> {
		Arc::new(Self {
			client,
			store,
			pairing: PairingChannel::default(),
			connect_lock: Mutex::new(()),
			store_lock: StdMutex::new(()),
			shared: StdMutex::new(Shared {
				status: SessionStatus::Idle,
				identity: None,
				epoch: 0,
				handle: None,
				retry_attempts: 0,
			}),
		})
	}

	/// Ensures a connection attempt exists. Idempotent.
	///
	/// Returns immediately when a session is already connecting, pairing, or
	/// connected. Callers arriving during an in-flight attempt wait on the
	/// lock and then observe that attempt's outcome instead of starting
	/// their own.
	pub async fn ensure_session(self: &Arc<Self>) -> Result<()> {
		let _permit = self.connect_lock.lock().await;

		let epoch = {
			let mut shared = self.shared.lock().unwrap();
			match shared.status {
				SessionStatus::Connecting | SessionStatus::AwaitingPairing | SessionStatus::Connected => {
					return Ok(());
				}
				SessionStatus::Idle | SessionStatus::LoggedOut => {}
			}
			shared.status = SessionStatus::Connecting;
			shared.epoch += 1;
			shared.epoch
		};

		let creds = match self.store.load() {
			Ok(creds) => creds,
			Err(err) => {
				self.abort_attempt(epoch);
				return Err(err);
			}
		};
		let paired = creds.is_some();

		let connection = match self.client.connect(creds).await {
			Ok(connection) => connection,
			Err(err) => {
				self.abort_attempt(epoch);
				return Err(err);
			}
		};

		self.shared.lock().unwrap().handle = Some(Arc::clone(&connection.handle));
		info!(target = "wagate.session", epoch, paired, "connection attempt started");

		tokio::spawn(Arc::clone(self).consume_events(epoch, connection.events));
		Ok(())
	}

	/// Returns a read-only snapshot for status queries.
	pub fn status(&self) -> StatusSnapshot {
		let shared = self.shared.lock().unwrap();
		let connected = shared.status == SessionStatus::Connected;
		StatusSnapshot {
			connected,
			identity: if connected { shared.identity.clone() } else { None },
			pairing_code: if connected { None } else { self.pairing.latest() },
		}
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionStatus {
		self.shared.lock().unwrap().status
	}

	pub fn is_connected(&self) -> bool {
		self.shared.lock().unwrap().status == SessionStatus::Connected
	}

	/// The live connection handle, when one exists.
	pub fn connection_handle(&self) -> Option<Arc<dyn ConnectionHandle>> {
		self.shared.lock().unwrap().handle.clone()
	}

	/// Tears the session down and erases credentials. Never fails from the
	/// caller's perspective; best-effort step failures are logged.
	pub async fn logout(&self) {
		let _permit = self.connect_lock.lock().await;

		let handle = {
			let mut shared = self.shared.lock().unwrap();
			// Supersede the connection first so in-flight events go stale.
			shared.epoch += 1;
			shared.status = SessionStatus::Idle;
			shared.identity = None;
			shared.retry_attempts = 0;
			shared.handle.take()
		};
		self.pairing.clear();

		if let Some(handle) = handle {
			if let Err(err) = handle.logout().await {
				warn!(target = "wagate.session", error = %err, "protocol logout failed; erasing credentials anyway");
			}
			handle.shutdown().await;
		}

		let erased = {
			let _guard = self.store_lock.lock().unwrap();
			self.store.erase()
		};
		match erased {
			Ok(()) => info!(target = "wagate.session", "logged out; credentials erased"),
			Err(err) => warn!(target = "wagate.session", error = %err, "credential erase failed during logout"),
		}
	}

	async fn consume_events(self: Arc<Self>, epoch: u64, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
		while let Some(event) = events.recv().await {
			let (effects, effect_epoch) = {
				let mut shared = self.shared.lock().unwrap();
				if shared.epoch != epoch {
					debug!(target = "wagate.session", epoch, "dropping event from superseded connection");
					return;
				}
				let (next, effects) = state::transition(shared.status, event);
				shared.status = next;
				// A terminal close supersedes the connection, so anything it
				// still emits (a late creds_update in particular) goes stale.
				if next == SessionStatus::LoggedOut {
					shared.epoch += 1;
				}
				(effects, shared.epoch)
			};
			for effect in effects {
				self.apply(effect_epoch, effect);
			}
		}
		debug!(target = "wagate.session", epoch, "event stream ended");
	}

	fn apply(self: &Arc<Self>, epoch: u64, effect: Effect) {
		match effect {
			Effect::PersistCreds(patch) => {
				let _guard = self.store_lock.lock().unwrap();
				if self.shared.lock().unwrap().epoch != epoch {
					// A logout won the race; its erase is the last write.
					return;
				}
				if let Err(err) = self.store.save(&patch) {
					warn!(target = "wagate.session", error = %err, "failed to persist credential update");
				}
			}
			Effect::PublishPairing(code) => {
				debug!(target = "wagate.session", "pairing code issued");
				self.pairing.publish(code);
			}
			Effect::ClearPairing => self.pairing.clear(),
			Effect::SetIdentity(identity) => {
				info!(target = "wagate.session", device = %identity.id, "session connected");
				let mut shared = self.shared.lock().unwrap();
				shared.identity = Some(identity);
				shared.retry_attempts = 0;
			}
			Effect::ClearIdentity => {
				self.shared.lock().unwrap().identity = None;
			}
			Effect::DropHandle => {
				let mut shared = self.shared.lock().unwrap();
				if shared.epoch == epoch {
					shared.handle = None;
				}
			}
			Effect::EraseCredentials => {
				let erased = {
					let _guard = self.store_lock.lock().unwrap();
					self.store.erase()
				};
				match erased {
					Ok(()) => info!(target = "wagate.session", "remote logout; credentials erased"),
					Err(err) => warn!(target = "wagate.session", error = %err, "failed to erase credentials"),
				}
			}
			Effect::ScheduleReconnect => self.schedule_reconnect(epoch),
		}
	}

	/// Schedules a supervised reconnect with exponential backoff.
	///
	/// The retry is fire-and-forget: it never blocks event delivery and its
	/// failure is logged, left for the next disconnect or external
	/// `ensure_session` call to recover from.
	fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
		let attempts = {
			let mut shared = self.shared.lock().unwrap();
			let attempts = shared.retry_attempts;
			shared.retry_attempts = shared.retry_attempts.saturating_add(1);
			attempts
		};
		let delay = backoff_delay(attempts);
		debug!(target = "wagate.session", epoch, attempts, delay_ms = delay.as_millis() as u64, "scheduling reconnect");

		let manager = Arc::clone(self);
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			{
				let shared = manager.shared.lock().unwrap();
				// A logout or a newer attempt supersedes this retry.
				if shared.epoch != epoch || shared.status != SessionStatus::Idle {
					return;
				}
			}
			if let Err(err) = manager.ensure_session().await {
				warn!(target = "wagate.session", error = %err, "supervised reconnect failed");
			}
		});
	}

	fn abort_attempt(&self, epoch: u64) {
		let mut shared = self.shared.lock().unwrap();
		if shared.epoch == epoch {
			shared.status = SessionStatus::Idle;
		}
	}
}

fn backoff_delay(attempts: u32) -> Duration {
	let factor = 1u32 << attempts.min(6);
	BACKOFF_BASE.saturating_mul(factor).min(BACKOFF_CAP)
}
