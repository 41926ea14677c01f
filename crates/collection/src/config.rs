//! Synchronization policy.
//!
//! Every field has a default, so a policy file only lists what it overrides:
//!
//! ```toml
//! typing_timeout_ms = 150
//! retry_empty_once = false
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_diff::DiffOptions;

use crate::error::ConfigError;

/// Default debounce for query edits.
pub const TYPING_TIMEOUT: Duration = Duration::from_millis(300);

/// Tunables for a [`crate::SearchCollection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncPolicy {
	/// Quiet period after the last query edit before the source is rebuilt.
	pub typing_timeout_ms: u64,
	/// Reconcile once more when a reload leaves the list empty while the
	/// source still reports more rows.
	pub retry_empty_once: bool,
	/// Count passed to `load_more` when a reload fetches the first page.
	/// Zero lets the source pick its own page size.
	pub first_page: u32,
	/// Combined old + new length at which diffs run on the blocking pool.
	pub offload_threshold: usize,
	/// Emit moves for reordered rows.
	pub detect_moves: bool,
	/// LCS table cap; larger changes replace the differing section wholesale.
	pub max_table_cells: usize,
	/// Capacity of the [`crate::ListEvent`] broadcast channel.
	pub event_buffer: usize,
}

impl Default for SyncPolicy {
	fn default() -> Self {
		let diff = DiffOptions::default();
		Self {
			typing_timeout_ms: TYPING_TIMEOUT.as_millis() as u64,
			retry_empty_once: true,
			first_page: 0,
			offload_threshold: 1024,
			detect_moves: diff.detect_moves,
			max_table_cells: diff.max_table_cells,
			event_buffer: 64,
		}
	}
}

impl SyncPolicy {
	/// Parses and validates a policy from TOML.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let policy: Self = toml::from_str(input)?;
		policy.validate()?;
		Ok(policy)
	}

	/// Checks invariants serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.event_buffer == 0 {
			return Err(ConfigError::Invalid("event_buffer must be at least 1".into()));
		}
		Ok(())
	}

	pub fn typing_timeout(&self) -> Duration {
		Duration::from_millis(self.typing_timeout_ms)
	}

	pub fn diff_options(&self) -> DiffOptions {
		DiffOptions {
			detect_moves: self.detect_moves,
			max_table_cells: self.max_table_cells,
		}
	}

	pub fn with_typing_timeout(mut self, timeout: Duration) -> Self {
		self.typing_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn with_retry_empty_once(mut self, enabled: bool) -> Self {
		self.retry_empty_once = enabled;
		self
	}

	pub fn with_offload_threshold(mut self, threshold: usize) -> Self {
		self.offload_threshold = threshold;
		self
	}

	pub fn with_first_page(mut self, count: u32) -> Self {
		self.first_page = count;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let policy = SyncPolicy::from_toml_str("").unwrap();
		assert_eq!(policy, SyncPolicy::default());
		assert_eq!(policy.typing_timeout(), TYPING_TIMEOUT);
		assert!(policy.retry_empty_once);
	}

	#[test]
	fn overrides_selected_fields() {
		let policy = SyncPolicy::from_toml_str(
			r#"
			typing_timeout_ms = 150
			retry_empty_once = false
			offload_threshold = 10
			"#,
		)
		.unwrap();
		assert_eq!(policy.typing_timeout(), Duration::from_millis(150));
		assert!(!policy.retry_empty_once);
		assert_eq!(policy.offload_threshold, 10);
		assert_eq!(policy.event_buffer, 64);
	}

	#[test]
	fn rejects_unknown_keys() {
		let err = SyncPolicy::from_toml_str("typing_timeout = 5").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)), "got {err}");
	}

	#[test]
	fn rejects_zero_event_buffer() {
		let err = SyncPolicy::from_toml_str("event_buffer = 0").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)), "got {err}");
	}

	#[test]
	fn diff_options_follow_policy() {
		let policy = SyncPolicy {
			detect_moves: false,
			max_table_cells: 9,
			..SyncPolicy::default()
		};
		let options = policy.diff_options();
		assert!(!options.detect_moves);
		assert_eq!(options.max_table_cells, 9);
	}
}
