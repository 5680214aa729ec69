//! HTTP surface, configuration, and logging for the wagate binary.

pub mod config;
pub mod http;
pub mod logging;
