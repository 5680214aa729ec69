//! Latest-pairing-token cell.

use std::sync::Mutex;

/// Holds the most recently issued pairing code.
///
/// Only the latest code is retained; a newer code or a successful connection
/// supersedes it.
#[derive(Debug, Default)]
pub struct PairingChannel {
	latest: Mutex<Option<String>>,
}

impl PairingChannel {
	/// Replaces the retained code.
	pub fn publish(&self, code: String) {
		*self.latest.lock().unwrap() = Some(code);
	}

	/// Drops the retained code.
	pub fn clear(&self) {
		*self.latest.lock().unwrap() = None;
	}

	/// Returns the most recently issued code, if any.
	pub fn latest(&self) -> Option<String> {
		self.latest.lock().unwrap().clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn latest_code_wins() {
		let channel = PairingChannel::default();
		assert_eq!(channel.latest(), None);

		channel.publish("first".into());
		channel.publish("second".into());
		assert_eq!(channel.latest(), Some("second".into()));

		channel.clear();
		assert_eq!(channel.latest(), None);
	}
}
