//! Reconnect policy: pure decision table over disconnect causes.

use wagate_protocol::DisconnectCause;

/// What the session manager should do after a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
	/// Transient cause: go back to Idle and try again.
	Reconnect,
	/// Authoritative remote logout: wipe credentials and stay down.
	Terminate,
}

/// Decides how to react to `cause`.
///
/// Only an explicit remote logout is terminal. Everything else - including a
/// rejected stored session - retries with credentials intact, so a
/// misclassified transient cause never costs the pairing.
pub fn decide(cause: DisconnectCause) -> ReconnectDecision {
	match cause {
		DisconnectCause::LoggedOut => ReconnectDecision::Terminate,
		DisconnectCause::ConnectionClosed
		| DisconnectCause::ConnectionLost
		| DisconnectCause::ConnectionReplaced
		| DisconnectCause::TimedOut
		| DisconnectCause::RestartRequired
		| DisconnectCause::BadSession
		| DisconnectCause::Unknown => ReconnectDecision::Reconnect,
	}
}
