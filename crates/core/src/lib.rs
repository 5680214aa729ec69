//! Session lifecycle core for the wagate gateway.
//!
//! This crate owns the single live connection to the chat network: when to
//! (re)establish it, how pairing and credential material flow through it, and
//! the idempotent ensure-session operation shared by concurrent callers. The
//! wire protocol itself is delegated to an external sidecar client reached
//! through the [`client::ChatClient`] seam.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod session;

pub use dispatch::MessageDispatcher;
pub use error::{CoreError, Result};
pub use session::SessionManager;
