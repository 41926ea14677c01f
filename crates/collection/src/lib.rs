//! Diff-synchronized search collections.
//!
//! A [`SearchCollection`] keeps a displayed list in step with a query-driven
//! source. Query edits are debounced, each trigger runs under its own
//! generation, and changes reach the list as minimal edit scripts computed by
//! [`sift_diff`], so rows that did not change keep their identity.
//!
//! Sources are built by a caller-supplied factory from the current sender and
//! query. A source either holds all its rows ([`ItemSource`]) or produces them
//! page by page ([`IncrementalSource`]); the display layer pulls further pages
//! through [`SearchCollection::request_more`].
//!
//! ```no_run
//! use sift_collection::{EqHandler, SearchCollection, SourceAdapter, SyncPolicy};
//!
//! # async fn demo() {
//! let names = ["alpha", "beta", "gamma"];
//! let collection = SearchCollection::new(
//! 	move |_: Option<&()>, query: &str| {
//! 		let query = query.to_owned();
//! 		Ok(SourceAdapter::from_items(names.into_iter().filter(move |n| n.contains(&query))))
//! 	},
//! 	EqHandler,
//! 	SyncPolicy::default(),
//! );
//!
//! collection.set_query("a");
//! let mut events = collection.subscribe();
//! while let Ok(event) = events.recv().await {
//! 	println!("{event:?}");
//! }
//! # }
//! ```

mod collection;
mod config;
mod error;
mod event;
mod source;

pub use collection::{ReconcileHandle, SearchCollection};
pub use config::{SyncPolicy, TYPING_TIMEOUT};
pub use error::{BoxError, ConfigError, Result, SyncError};
pub use event::{ListEvent, PageResult, ReconcileOutcome, SyncPhase};
pub use sift_diff::{DiffHandler, EqHandler, FnHandler, KeyHandler, ListOp};
pub use source::{IncrementalSource, ItemSource, PagedSource, SourceAdapter, StaticSource};
