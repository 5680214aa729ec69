//! Wire types for the wagate sidecar client channel.
//!
//! This crate contains the serde-serializable types exchanged with the
//! external protocol-client process over newline-delimited JSON. These types
//! represent the "protocol layer" - the shapes of data as they appear on the
//! wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Stable: Changes only when the sidecar channel changes
//!
//! The session lifecycle built on top of these types lives in `wagate-core`.

pub mod message;
pub mod types;

pub use message::*;
pub use types::*;
