//! Session states and the pure transition function.
//!
//! Every lifecycle edge is expressed as `(status, event) -> (status, effects)`
//! so the state machine is unit-testable without a network. The manager's
//! event consumer applies the returned effects in order.

use serde::Serialize;
use wagate_protocol::{CredentialsPatch, Identity};

use super::policy::{self, ReconnectDecision};
use crate::client::ClientEvent;

/// Lifecycle state of the single process-wide session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
	/// No connection and no attempt in flight.
	Idle,
	/// A connection attempt is in flight.
	Connecting,
	/// A pairing code was issued and awaits out-of-band confirmation.
	AwaitingPairing,
	/// Handshake complete; the session can send.
	Connected,
	/// The remote side invalidated the session; credentials are gone.
	LoggedOut,
}

/// Read-only view served to status queries.
///
/// The pairing code is never populated alongside a connected identity.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
	pub connected: bool,
	pub identity: Option<Identity>,
	pub pairing_code: Option<String>,
}

/// Side effect requested by a transition, executed by the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
	/// Write-through credential persistence, before anything else observes
	/// the update.
	PersistCreds(CredentialsPatch),
	/// Retain the freshly issued pairing code for status queries.
	PublishPairing(String),
	/// Drop the retained pairing code.
	ClearPairing,
	/// Record the network-assigned identity and reset the retry counter.
	SetIdentity(Identity),
	/// Forget the identity of a connection that no longer exists.
	ClearIdentity,
	/// Discard the superseded connection handle.
	DropHandle,
	/// Schedule a supervised reconnect attempt with backoff.
	ScheduleReconnect,
	/// Wipe the durable credential records.
	EraseCredentials,
}

/// Applies `event` to `status`, returning the next status and its effects.
pub fn transition(status: SessionStatus, event: ClientEvent) -> (SessionStatus, Vec<Effect>) {
	match event {
		ClientEvent::CredsUpdate(patch) => (status, vec![Effect::PersistCreds(patch)]),
		ClientEvent::PairingCode(code) => {
			// A live session never regresses to pairing.
			if status == SessionStatus::Connected {
				(status, Vec::new())
			} else {
				(SessionStatus::AwaitingPairing, vec![Effect::PublishPairing(code)])
			}
		}
		ClientEvent::Open(identity) => (
			SessionStatus::Connected,
			vec![Effect::SetIdentity(identity), Effect::ClearPairing],
		),
		ClientEvent::Closed(cause) => match policy::decide(cause) {
			ReconnectDecision::Reconnect => (
				SessionStatus::Idle,
				vec![Effect::DropHandle, Effect::ClearIdentity, Effect::ScheduleReconnect],
			),
			ReconnectDecision::Terminate => (
				SessionStatus::LoggedOut,
				vec![
					Effect::DropHandle,
					Effect::ClearIdentity,
					Effect::ClearPairing,
					Effect::EraseCredentials,
				],
			),
		},
	}
}

#[cfg(test)]
mod tests {
	use wagate_protocol::DisconnectCause;

	use super::*;

	fn identity(id: &str) -> Identity {
		Identity { id: id.into(), name: None }
	}

	#[test]
	fn pairing_code_moves_connecting_to_awaiting() {
		let (status, effects) = transition(SessionStatus::Connecting, ClientEvent::PairingCode("2@abc".into()));
		assert_eq!(status, SessionStatus::AwaitingPairing);
		assert_eq!(effects, vec![Effect::PublishPairing("2@abc".into())]);
	}

	#[test]
	fn pairing_code_is_ignored_once_connected() {
		let (status, effects) = transition(SessionStatus::Connected, ClientEvent::PairingCode("2@abc".into()));
		assert_eq!(status, SessionStatus::Connected);
		assert!(effects.is_empty());
	}

	#[test]
	fn open_connects_and_clears_pairing() {
		let (status, effects) = transition(SessionStatus::AwaitingPairing, ClientEvent::Open(identity("12345")));
		assert_eq!(status, SessionStatus::Connected);
		assert_eq!(effects, vec![Effect::SetIdentity(identity("12345")), Effect::ClearPairing]);
	}

	#[test]
	fn transient_close_loops_back_to_idle_with_retry() {
		let (status, effects) = transition(SessionStatus::Connected, ClientEvent::Closed(DisconnectCause::ConnectionLost));
		assert_eq!(status, SessionStatus::Idle);
		assert!(effects.contains(&Effect::ScheduleReconnect));
		assert!(!effects.contains(&Effect::EraseCredentials));
	}

	#[test]
	fn terminal_close_erases_credentials() {
		let (status, effects) = transition(SessionStatus::Connected, ClientEvent::Closed(DisconnectCause::LoggedOut));
		assert_eq!(status, SessionStatus::LoggedOut);
		assert!(effects.contains(&Effect::EraseCredentials));
		assert!(!effects.contains(&Effect::ScheduleReconnect));
	}

	#[test]
	fn creds_update_persists_in_any_state() {
		for status in [SessionStatus::Connecting, SessionStatus::AwaitingPairing, SessionStatus::Connected] {
			let (next, effects) = transition(status, ClientEvent::CredsUpdate(CredentialsPatch::default()));
			assert_eq!(next, status);
			assert_eq!(effects.len(), 1);
			assert!(matches!(effects[0], Effect::PersistCreds(_)));
		}
	}
}
