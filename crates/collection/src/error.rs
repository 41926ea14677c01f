//! Error types for collection synchronization and policy parsing.

use thiserror::Error;

/// Error produced by collaborator code (source factories and page loads).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`crate::SearchCollection`] triggers.
///
/// Cancellation is not an error: superseded work ends quietly with
/// [`crate::ReconcileOutcome::Stale`] or an empty [`crate::PageResult`].
#[derive(Debug, Error)]
pub enum SyncError {
	/// The source factory rejected the current sender/query.
	#[error("failed to construct source: {0}")]
	SourceConstruction(#[source] BoxError),

	/// The active source failed to produce a page.
	#[error("failed to load page: {0}")]
	PageLoad(#[source] BoxError),

	/// A reconciliation task was torn down before it reported.
	#[error("reconciliation task ended early: {0}")]
	Detached(String),
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur when parsing a [`crate::SyncPolicy`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or fields.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A field holds a value the engine cannot run with.
	#[error("invalid sync policy: {0}")]
	Invalid(String),
}
