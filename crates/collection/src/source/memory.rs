use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{IncrementalSource, ItemSource};
use crate::error::BoxError;

/// Source over a fixed list of rows.
#[derive(Debug, Clone)]
pub struct StaticSource<T> {
	items: Arc<[T]>,
}

impl<T> StaticSource<T> {
	pub fn new(items: impl IntoIterator<Item = T>) -> Self {
		Self {
			items: items.into_iter().collect(),
		}
	}
}

impl<T> ItemSource for StaticSource<T>
where
	T: Clone + Send + Sync + 'static,
{
	type Item = T;

	fn snapshot(&self) -> Vec<T> {
		self.items.to_vec()
	}

	fn len(&self) -> usize {
		self.items.len()
	}
}

/// Source that reveals an in-memory backing list one page at a time.
#[derive(Debug)]
pub struct PagedSource<T> {
	backing: Vec<T>,
	page_size: usize,
	loaded: Mutex<usize>,
}

impl<T> PagedSource<T> {
	/// Creates a source with nothing loaded yet.
	///
	/// A `page_size` of zero is treated as one.
	pub fn new(backing: impl IntoIterator<Item = T>, page_size: usize) -> Self {
		Self {
			backing: backing.into_iter().collect(),
			page_size: page_size.max(1),
			loaded: Mutex::new(0),
		}
	}

	pub fn page_size(&self) -> usize {
		self.page_size
	}

	/// Total rows the source can produce.
	pub fn total(&self) -> usize {
		self.backing.len()
	}
}

impl<T> ItemSource for PagedSource<T>
where
	T: Clone + Send + Sync + 'static,
{
	type Item = T;

	fn snapshot(&self) -> Vec<T> {
		let loaded = *self.loaded.lock();
		self.backing[..loaded].to_vec()
	}

	fn len(&self) -> usize {
		*self.loaded.lock()
	}
}

#[async_trait]
impl<T> IncrementalSource for PagedSource<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn has_more(&self) -> bool {
		*self.loaded.lock() < self.backing.len()
	}

	async fn load_more(&self, count: u32) -> Result<u32, BoxError> {
		let want = if count == 0 { self.page_size } else { count as usize };
		let mut loaded = self.loaded.lock();
		let (end, produced) = next_page(*loaded, want, self.backing.len());
		*loaded = end;
		Ok(produced)
	}
}

/// End of the next page and the rows it adds. A page never exceeds
/// `u32::MAX` rows so the count always fits the load result.
fn next_page(loaded: usize, want: usize, total: usize) -> (usize, u32) {
	let want = u32::try_from(want).unwrap_or(u32::MAX);
	let end = loaded.saturating_add(want as usize).min(total);
	(end, (end - loaded) as u32)
}
