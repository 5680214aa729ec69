//! Durable credential persistence for one device identity.
//!
//! The store keeps one JSON file per credential record under a single
//! directory, so incremental handshake updates rewrite only the record they
//! touch. Saves go through a temp file, fsync, and rename: once `save`
//! returns, a fresh process observes the update.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use wagate_protocol::{Credentials, CredentialsPatch};

use crate::error::Result;

/// On-disk shape of one credential record.
///
/// The key is embedded so loads never have to decode escaped file names.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
	key: String,
	value: serde_json::Value,
}

/// Credential store over a directory of per-record JSON files.
#[derive(Debug, Clone)]
pub struct CredentialStore {
	dir: PathBuf,
}

impl CredentialStore {
	/// Creates a store rooted at `dir`. The directory is created lazily on
	/// the first save.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Returns the store's directory.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Loads the full credential map, or `None` when nothing was ever saved.
	pub fn load(&self) -> Result<Option<Credentials>> {
		let entries = match fs::read_dir(&self.dir) {
			Ok(entries) => entries,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};

		let mut creds = Credentials::new();
		for entry in entries {
			let path = entry?.path();
			if path.extension().is_none_or(|ext| ext != "json") {
				continue;
			}
			let record: Record = match serde_json::from_slice(&fs::read(&path)?) {
				Ok(record) => record,
				Err(err) => {
					warn!(target = "wagate.creds", path = %path.display(), error = %err, "skipping unreadable credential record");
					continue;
				}
			};
			creds.insert(record.key, record.value);
		}

		if creds.is_empty() { Ok(None) } else { Ok(Some(creds)) }
	}

	/// Applies `patch` to the durable state, one record at a time.
	///
	/// Applying the same patch twice yields the same durable state.
	pub fn save(&self, patch: &CredentialsPatch) -> Result<()> {
		if patch.0.is_empty() {
			return Ok(());
		}
		fs::create_dir_all(&self.dir)?;

		for (key, value) in &patch.0 {
			let record = Record {
				key: key.clone(),
				value: value.clone(),
			};
			let name = record_file_name(key);
			let tmp = self.dir.join(format!("{name}.tmp"));
			let path = self.dir.join(format!("{name}.json"));

			let mut file = File::create(&tmp)?;
			file.write_all(&serde_json::to_vec(&record)?)?;
			file.sync_all()?;
			fs::rename(&tmp, &path)?;
		}
		Ok(())
	}

	/// Removes every stored record. Safe to call when nothing exists.
	pub fn erase(&self) -> Result<()> {
		match fs::remove_dir_all(&self.dir) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

/// Escapes `key` into a file-system-safe name.
///
/// Every byte outside `[A-Za-z0-9._-]` (including `%` itself) becomes `%XX`,
/// so distinct keys always map to distinct files.
fn record_file_name(key: &str) -> String {
	use std::fmt::Write;

	let mut name = String::with_capacity(key.len());
	for byte in key.bytes() {
		match byte {
			b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => name.push(byte as char),
			_ => {
				let _ = write!(name, "%{byte:02X}");
			}
		}
	}
	name
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use tempfile::TempDir;

	use super::*;

	fn patch(entries: &[(&str, serde_json::Value)]) -> CredentialsPatch {
		CredentialsPatch(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
	}

	#[test]
	fn load_on_empty_store_returns_none() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));
		assert!(store.load().unwrap().is_none());
	}

	#[test]
	fn save_survives_a_fresh_store() {
		let tmp = TempDir::new().unwrap();
		let dir = tmp.path().join("auth");

		let store = CredentialStore::new(&dir);
		store.save(&patch(&[("creds", json!({"registered": true}))])).unwrap();

		// Fresh store over the same directory simulates a process restart.
		let reopened = CredentialStore::new(&dir);
		let creds = reopened.load().unwrap().unwrap();
		assert_eq!(creds["creds"]["registered"], true);
	}

	#[test]
	fn incremental_saves_merge_by_key() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));

		store.save(&patch(&[("creds", json!({"v": 1})), ("app-state-sync-key-AAA", json!("k1"))])).unwrap();
		store.save(&patch(&[("creds", json!({"v": 2}))])).unwrap();

		let creds = store.load().unwrap().unwrap();
		assert_eq!(creds.len(), 2);
		assert_eq!(creds["creds"]["v"], 2);
		assert_eq!(creds["app-state-sync-key-AAA"], "k1");
	}

	#[test]
	fn saving_the_same_patch_twice_is_idempotent() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));

		let update = patch(&[("creds", json!({"noise": "abc"}))]);
		store.save(&update).unwrap();
		let first = store.load().unwrap();
		store.save(&update).unwrap();
		assert_eq!(store.load().unwrap(), first);
	}

	#[test]
	fn keys_with_odd_characters_round_trip() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));

		store.save(&patch(&[("app-state-sync-key-Zm9v/bar==", json!("secret"))])).unwrap();
		let creds = store.load().unwrap().unwrap();
		assert_eq!(creds["app-state-sync-key-Zm9v/bar=="], "secret");
	}

	#[test]
	fn keys_differing_only_in_escaped_characters_stay_distinct() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));

		store
			.save(&patch(&[
				("app-state-sync-key-a/b==", json!("slash")),
				("app-state-sync-key-a-b==", json!("dash")),
			]))
			.unwrap();

		let creds = store.load().unwrap().unwrap();
		assert_eq!(creds.len(), 2);
		assert_eq!(creds["app-state-sync-key-a/b=="], "slash");
		assert_eq!(creds["app-state-sync-key-a-b=="], "dash");
	}

	#[test]
	fn erase_is_a_noop_when_nothing_exists() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));
		store.erase().unwrap();
		store.erase().unwrap();
	}

	#[test]
	fn erase_removes_everything() {
		let tmp = TempDir::new().unwrap();
		let store = CredentialStore::new(tmp.path().join("auth"));
		store.save(&patch(&[("creds", json!(1))])).unwrap();

		store.erase().unwrap();
		assert!(store.load().unwrap().is_none());
	}
}
