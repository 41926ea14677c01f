//! Source abstraction consumed by the synchronization engine.
//!
//! A source is anything that can hand out its current rows. Sources that
//! produce rows in batches also implement [`IncrementalSource`]. The
//! capability is fixed when the [`SourceAdapter`] is built, so the engine
//! never probes types at runtime.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;

mod memory;

pub use memory::{PagedSource, StaticSource};

/// Rows currently held by a source.
pub trait ItemSource: Send + Sync + 'static {
	type Item: Clone + Send + Sync + 'static;

	/// Returns a copy of every row produced so far, in display order.
	fn snapshot(&self) -> Vec<Self::Item>;

	/// Number of rows produced so far.
	fn len(&self) -> usize {
		self.snapshot().len()
	}

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Source that produces rows page by page.
#[async_trait]
pub trait IncrementalSource: ItemSource {
	/// Returns true while further pages may exist.
	fn has_more(&self) -> bool;

	/// Loads up to `count` more rows (zero means one default-sized page) and
	/// returns how many were produced.
	async fn load_more(&self, count: u32) -> Result<u32, BoxError>;
}

/// Capability-tagged handle to the active source.
pub enum SourceAdapter<T> {
	/// All rows are available up front.
	Complete(Arc<dyn ItemSource<Item = T>>),
	/// Rows arrive through [`IncrementalSource::load_more`].
	Incremental(Arc<dyn IncrementalSource<Item = T>>),
}

impl<T> Clone for SourceAdapter<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Complete(source) => Self::Complete(Arc::clone(source)),
			Self::Incremental(source) => Self::Incremental(Arc::clone(source)),
		}
	}
}

impl<T> fmt::Debug for SourceAdapter<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = if self.supports_paging() { "Incremental" } else { "Complete" };
		f.debug_struct("SourceAdapter")
			.field("kind", &kind)
			.field("len", &self.len())
			.field("has_more", &self.has_more())
			.finish()
	}
}

impl<T> SourceAdapter<T>
where
	T: Clone + Send + Sync + 'static,
{
	/// Wraps a source whose rows are all available.
	pub fn complete<S>(source: S) -> Self
	where
		S: ItemSource<Item = T>,
	{
		Self::Complete(Arc::new(source))
	}

	/// Wraps a paging source.
	pub fn incremental<S>(source: S) -> Self
	where
		S: IncrementalSource<Item = T>,
	{
		Self::Incremental(Arc::new(source))
	}

	/// Wraps a fixed list of rows.
	pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
		Self::complete(StaticSource::new(items))
	}

	pub fn supports_paging(&self) -> bool {
		matches!(self, Self::Incremental(_))
	}

	/// Returns true while the source can still produce rows. Always false for
	/// complete sources.
	pub fn has_more(&self) -> bool {
		match self {
			Self::Complete(_) => false,
			Self::Incremental(source) => source.has_more(),
		}
	}

	/// Requests more rows. Complete sources resolve to zero.
	pub async fn load_more(&self, count: u32) -> Result<u32, BoxError> {
		match self {
			Self::Complete(_) => Ok(0),
			Self::Incremental(source) => source.load_more(count).await,
		}
	}

	pub fn snapshot(&self) -> Vec<T> {
		match self {
			Self::Complete(source) => source.snapshot(),
			Self::Incremental(source) => source.snapshot(),
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::Complete(source) => source.len(),
			Self::Incremental(source) => source.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
