//! LCS-based edit script computation.
//!
//! # Pipeline
//!
//! 1. Trim the common prefix and suffix (by identity). Typical refreshes only
//!    touch a few rows, so the quadratic table usually covers a short middle.
//! 2. Fill a suffix-LCS table over the middle and walk it forward, producing
//!    an alignment of kept, removed and inserted rows. Ties prefer removal.
//! 3. Optionally pair removed and inserted rows with the same identity into
//!    moves (first unpaired removal wins, scanning in index order).
//! 4. Emit plain removals back to front, then walk the new list left to
//!    right emitting inserts, moves and updates against a simulated list.
//!
//! The emitted script applies in a single forward pass: every index refers to
//! the list as produced by the ops before it.

use crate::handler::DiffHandler;
use crate::op::{Diff, ListOp};

/// Tuning knobs for [`calculate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
	/// Pair removals and insertions of the same item into [`ListOp::Move`].
	pub detect_moves: bool,
	/// Upper bound on LCS table cells for the trimmed middle section.
	///
	/// Larger sections are replaced wholesale (remove all, insert all).
	pub max_table_cells: usize,
}

impl Default for DiffOptions {
	fn default() -> Self {
		Self {
			detect_moves: true,
			max_table_cells: 1 << 24,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
	Kept(usize),
	Moved(usize),
	Inserted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
	Kept,
	Moved,
	Removed,
}

/// Placeholder for inserted rows in the simulated list.
const INSERTED: usize = usize::MAX;

/// Computes the ops that turn `old` into `new`.
///
/// Deterministic for a given input pair. Runs in O(n·m) time and space over
/// the section left after trimming the common prefix and suffix.
pub fn calculate<T, H>(old: &[T], new: &[T], handler: &H, options: DiffOptions) -> Diff<T>
where
	T: Clone,
	H: DiffHandler<T> + ?Sized,
{
	let (mut fates, mut origins) = align(old, new, handler, options.max_table_cells);
	if options.detect_moves {
		pair_moves(old, new, handler, &mut fates, &mut origins);
	}
	Diff::from_ops(emit(old, new, handler, &fates, &origins))
}

/// Classifies every old row and records where every new row comes from.
fn align<T, H>(old: &[T], new: &[T], handler: &H, max_cells: usize) -> (Vec<Fate>, Vec<Origin>)
where
	H: DiffHandler<T> + ?Sized,
{
	let mut fates = vec![Fate::Removed; old.len()];
	let mut origins = vec![Origin::Inserted; new.len()];

	let shortest = old.len().min(new.len());
	let mut prefix = 0;
	while prefix < shortest && handler.same_item(&old[prefix], &new[prefix]) {
		fates[prefix] = Fate::Kept;
		origins[prefix] = Origin::Kept(prefix);
		prefix += 1;
	}

	let mut suffix = 0;
	while suffix < shortest - prefix {
		let i = old.len() - 1 - suffix;
		let j = new.len() - 1 - suffix;
		if !handler.same_item(&old[i], &new[j]) {
			break;
		}
		fates[i] = Fate::Kept;
		origins[j] = Origin::Kept(i);
		suffix += 1;
	}

	let old_mid = &old[prefix..old.len() - suffix];
	let new_mid = &new[prefix..new.len() - suffix];
	let (a, b) = (old_mid.len(), new_mid.len());
	if a == 0 || b == 0 {
		return (fates, origins);
	}

	let fits = a.checked_add(1).zip(b.checked_add(1)).and_then(|(r, c)| r.checked_mul(c)).is_some_and(|cells| cells <= max_cells);
	if !fits {
		return (fates, origins);
	}

	// table[i * cols + j] = LCS length of old_mid[i..] and new_mid[j..].
	let cols = b + 1;
	let mut table = vec![0u32; (a + 1) * cols];
	for i in (0..a).rev() {
		for j in (0..b).rev() {
			table[i * cols + j] = if handler.same_item(&old_mid[i], &new_mid[j]) {
				table[(i + 1) * cols + j + 1] + 1
			} else {
				table[(i + 1) * cols + j].max(table[i * cols + j + 1])
			};
		}
	}

	let (mut i, mut j) = (0, 0);
	while i < a && j < b {
		if handler.same_item(&old_mid[i], &new_mid[j]) {
			fates[prefix + i] = Fate::Kept;
			origins[prefix + j] = Origin::Kept(prefix + i);
			i += 1;
			j += 1;
		} else if table[(i + 1) * cols + j] >= table[i * cols + j + 1] {
			i += 1;
		} else {
			j += 1;
		}
	}

	(fates, origins)
}

fn pair_moves<T, H>(old: &[T], new: &[T], handler: &H, fates: &mut [Fate], origins: &mut [Origin])
where
	H: DiffHandler<T> + ?Sized,
{
	let mut removed: Vec<usize> = (0..old.len()).filter(|&i| fates[i] == Fate::Removed).collect();
	if removed.is_empty() {
		return;
	}
	for j in 0..new.len() {
		if origins[j] != Origin::Inserted {
			continue;
		}
		if let Some(slot) = removed.iter().position(|&i| handler.same_item(&old[i], &new[j])) {
			let i = removed.remove(slot);
			fates[i] = Fate::Moved;
			origins[j] = Origin::Moved(i);
			if removed.is_empty() {
				break;
			}
		}
	}
}

fn emit<T, H>(old: &[T], new: &[T], handler: &H, fates: &[Fate], origins: &[Origin]) -> Vec<ListOp<T>>
where
	T: Clone,
	H: DiffHandler<T> + ?Sized,
{
	let mut ops = Vec::new();

	for index in (0..old.len()).rev() {
		if fates[index] == Fate::Removed {
			ops.push(ListOp::Remove { index });
		}
	}

	// Simulated list of surviving old indices; inserted rows hold `INSERTED`.
	let mut current: Vec<usize> = (0..old.len()).filter(|&i| fates[i] != Fate::Removed).collect();
	// Everything before `cursor` is either final or a moved row still waiting
	// for its target.
	let mut cursor = 0;

	for (j, item) in new.iter().enumerate() {
		match origins[j] {
			Origin::Inserted => {
				ops.push(ListOp::Insert {
					index: cursor,
					item: item.clone(),
				});
				current.insert(cursor, INSERTED);
				cursor += 1;
			}
			Origin::Kept(i) => {
				let at = locate(&current, i);
				debug_assert!(at >= cursor, "kept rows must stay in order");
				if !handler.same_content(&old[i], item) {
					ops.push(ListOp::Update {
						index: at,
						item: item.clone(),
					});
				}
				cursor = at + 1;
			}
			Origin::Moved(i) => {
				let from = locate(&current, i);
				let to = if from < cursor { cursor - 1 } else { cursor };
				if from != to {
					ops.push(ListOp::Move { from, to });
					current.remove(from);
					current.insert(to, i);
				}
				if !handler.same_content(&old[i], item) {
					ops.push(ListOp::Update {
						index: to,
						item: item.clone(),
					});
				}
				cursor = to + 1;
			}
		}
	}

	debug_assert_eq!(current.len(), new.len());
	ops
}

fn locate(current: &[usize], old_index: usize) -> usize {
	current
		.iter()
		.position(|&i| i == old_index)
		.unwrap_or_else(|| unreachable!("old row {old_index} missing from simulated list"))
}
