/// One edit against an ordered list.
///
/// Indices always refer to the list as it stands when the op is applied, so a
/// sequence of ops must be applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOp<T> {
	/// Inserts `item` so that it ends up at `index`.
	Insert { index: usize, item: T },
	/// Removes the element at `index`.
	Remove { index: usize },
	/// Removes the element at `from`, then inserts it at `to` in the shortened list.
	Move { from: usize, to: usize },
	/// Replaces the element at `index` with `item`.
	Update { index: usize, item: T },
}

impl<T: Clone> ListOp<T> {
	/// Applies this op to `list`.
	///
	/// # Panics
	///
	/// Panics when an index is out of bounds for `list`.
	pub fn apply_to(&self, list: &mut Vec<T>) {
		match self {
			Self::Insert { index, item } => list.insert(*index, item.clone()),
			Self::Remove { index } => {
				list.remove(*index);
			}
			Self::Move { from, to } => {
				let item = list.remove(*from);
				list.insert(*to, item);
			}
			Self::Update { index, item } => list[*index] = item.clone(),
		}
	}
}

/// Applies `ops` to `list` in order.
pub fn apply<T: Clone>(ops: &[ListOp<T>], list: &mut Vec<T>) {
	for op in ops {
		op.apply_to(list);
	}
}

/// Counts of each op kind in a [`Diff`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
	pub inserted: usize,
	pub removed: usize,
	pub moved: usize,
	pub updated: usize,
}

/// Ordered edit script produced by [`crate::calculate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T> {
	ops: Vec<ListOp<T>>,
}

impl<T> Default for Diff<T> {
	fn default() -> Self {
		Self { ops: Vec::new() }
	}
}

impl<T> Diff<T> {
	pub(crate) fn from_ops(ops: Vec<ListOp<T>>) -> Self {
		Self { ops }
	}

	/// Returns the ops in application order.
	pub fn ops(&self) -> &[ListOp<T>] {
		&self.ops
	}

	/// Consumes the diff, returning its ops.
	pub fn into_ops(self) -> Vec<ListOp<T>> {
		self.ops
	}

	/// Returns true when the two lists were already equivalent.
	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	/// Number of ops.
	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn stats(&self) -> DiffStats {
		let mut stats = DiffStats::default();
		for op in &self.ops {
			match op {
				ListOp::Insert { .. } => stats.inserted += 1,
				ListOp::Remove { .. } => stats.removed += 1,
				ListOp::Move { .. } => stats.moved += 1,
				ListOp::Update { .. } => stats.updated += 1,
			}
		}
		stats
	}
}

impl<T: Clone> Diff<T> {
	/// Applies every op to `list` in order.
	pub fn apply_to(&self, list: &mut Vec<T>) {
		apply(&self.ops, list);
	}
}
