/// Decides how two list elements relate during a diff.
///
/// `same_item` matches elements across the old and new lists (the same
/// logical row). `same_content` is only consulted for matched pairs; when it
/// fails the differ emits an update for that row.
pub trait DiffHandler<T> {
	/// Returns true when `old` and `new` denote the same logical item.
	fn same_item(&self, old: &T, new: &T) -> bool;

	/// Returns true when a matched pair needs no update.
	fn same_content(&self, old: &T, new: &T) -> bool;
}

/// Uses [`PartialEq`] for both identity and content.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqHandler;

impl<T: PartialEq> DiffHandler<T> for EqHandler {
	fn same_item(&self, old: &T, new: &T) -> bool {
		old == new
	}

	fn same_content(&self, old: &T, new: &T) -> bool {
		old == new
	}
}

/// Matches items by a derived key and compares content with [`PartialEq`].
#[derive(Debug, Clone, Copy)]
pub struct KeyHandler<F> {
	key: F,
}

impl<F> KeyHandler<F> {
	/// Creates a handler that treats items with equal keys as the same item.
	pub fn new(key: F) -> Self {
		Self { key }
	}
}

impl<T, K, F> DiffHandler<T> for KeyHandler<F>
where
	T: PartialEq,
	K: PartialEq,
	F: Fn(&T) -> K,
{
	fn same_item(&self, old: &T, new: &T) -> bool {
		(self.key)(old) == (self.key)(new)
	}

	fn same_content(&self, old: &T, new: &T) -> bool {
		old == new
	}
}

/// Handler built from two predicates.
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<I, C> {
	same_item: I,
	same_content: C,
}

impl<I, C> FnHandler<I, C> {
	pub fn new(same_item: I, same_content: C) -> Self {
		Self { same_item, same_content }
	}
}

impl<T, I, C> DiffHandler<T> for FnHandler<I, C>
where
	I: Fn(&T, &T) -> bool,
	C: Fn(&T, &T) -> bool,
{
	fn same_item(&self, old: &T, new: &T) -> bool {
		(self.same_item)(old, new)
	}

	fn same_content(&self, old: &T, new: &T) -> bool {
		(self.same_content)(old, new)
	}
}
