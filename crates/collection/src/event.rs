use std::sync::Arc;

use sift_diff::ListOp;

/// What the engine is currently doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
	#[default]
	Idle,
	/// Reconciling the displayed list against a new source.
	Reconciling,
	/// Fetching a page for the display layer.
	Paging,
}

/// Result of [`crate::SearchCollection::request_more`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageResult {
	/// Rows produced by the source for this request.
	pub produced: u32,
}

/// How a reconciliation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
	/// The diff was committed to the displayed list.
	Applied { generation: u64, ops: usize },
	/// The source pages and nothing has been loaded yet; the first
	/// `request_more` call will populate the list.
	Deferred,
	/// A newer trigger superseded this one; nothing was committed.
	Stale,
}

/// Change notifications for the display layer.
#[derive(Debug, Clone)]
pub enum ListEvent<T> {
	/// A diff was committed. `len` is the list length afterwards.
	Changed {
		generation: u64,
		ops: Arc<[ListOp<T>]>,
		len: usize,
	},
	EmptyChanged(bool),
	LoadingChanged(bool),
	/// A debounced query could not build a source; the list is unchanged.
	SourceFailed(Arc<str>),
}
