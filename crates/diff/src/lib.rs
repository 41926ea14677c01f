//! Minimal-edit list diffing.
//!
//! [`calculate`] turns an old and a new ordered list into a [`Diff`]: an
//! ordered script of [`ListOp`]s that, applied front to back, rewrites the old
//! list into the new one. Rows are matched through a [`DiffHandler`]: matched
//! rows whose content changed produce an update instead of a remove/insert
//! pair, and with [`DiffOptions::detect_moves`] reordered rows produce moves.
//!
//! # Example
//!
//! ```
//! use sift_diff::{DiffOptions, EqHandler, ListOp, calculate};
//!
//! let old = [1, 2, 3, 4];
//! let new = [1, 3, 4, 5];
//! let diff = calculate(&old, &new, &EqHandler, DiffOptions::default());
//! assert_eq!(diff.ops(), &[ListOp::Remove { index: 1 }, ListOp::Insert { index: 3, item: 5 }]);
//!
//! let mut list = old.to_vec();
//! diff.apply_to(&mut list);
//! assert_eq!(list, new);
//! ```

mod handler;
mod lcs;
mod op;

pub use handler::{DiffHandler, EqHandler, FnHandler, KeyHandler};
pub use lcs::{DiffOptions, calculate};
pub use op::{Diff, DiffStats, ListOp, apply};
