//! Session lifecycle subsystem.
//!
//! This module centralizes connection ownership, pairing/connection state,
//! credential persistence, and the reconnect policy applied on disconnects.

/// Durable credential persistence for one device identity.
pub mod credentials;
/// Session orchestration: ensure/status/logout and event reactions.
pub mod manager;
/// Latest-pairing-token cell served to status queries.
pub mod pairing;
/// Pure reconnect-or-terminate decision on disconnect causes.
pub mod policy;
/// Session states and the pure transition function.
pub mod state;

pub use credentials::CredentialStore;
pub use manager::SessionManager;
pub use pairing::PairingChannel;
pub use policy::ReconnectDecision;
pub use state::{SessionStatus, StatusSnapshot};
