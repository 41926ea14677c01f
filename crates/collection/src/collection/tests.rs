use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sift_diff::{EqHandler, ListOp};
use tokio::sync::Semaphore;

use super::*;
use crate::source::{IncrementalSource, ItemSource, PagedSource};

/// Paging source driven by a queue of pages.
#[derive(Default)]
struct ScriptedSource {
	rows: Mutex<Vec<&'static str>>,
	pages: Mutex<VecDeque<Vec<&'static str>>>,
	/// Reports more rows forever, producing nothing once the queue drains.
	endless: bool,
	fail: bool,
	/// When set, each load waits for one permit.
	gate: Option<Arc<Semaphore>>,
	loads: AtomicUsize,
}

impl ScriptedSource {
	fn pages(pages: impl IntoIterator<Item = Vec<&'static str>>) -> Self {
		Self {
			pages: Mutex::new(pages.into_iter().collect()),
			..Self::default()
		}
	}

	fn gated(mut self, gate: &Arc<Semaphore>) -> Self {
		self.gate = Some(Arc::clone(gate));
		self
	}

	fn loads(&self) -> usize {
		self.loads.load(Ordering::SeqCst)
	}
}

impl ItemSource for ScriptedSource {
	type Item = &'static str;

	fn snapshot(&self) -> Vec<&'static str> {
		self.rows.lock().clone()
	}
}

#[async_trait]
impl IncrementalSource for ScriptedSource {
	fn has_more(&self) -> bool {
		self.endless || !self.pages.lock().is_empty()
	}

	async fn load_more(&self, _count: u32) -> std::result::Result<u32, BoxError> {
		self.loads.fetch_add(1, Ordering::SeqCst);
		if let Some(gate) = &self.gate {
			gate.acquire().await?.forget();
		}
		if self.fail {
			return Err("backend unavailable".into());
		}
		let page = self.pages.lock().pop_front().unwrap_or_default();
		let produced = page.len() as u32;
		self.rows.lock().extend(page);
		Ok(produced)
	}
}

fn paging(source: &Arc<ScriptedSource>) -> SourceAdapter<&'static str> {
	SourceAdapter::Incremental(Arc::clone(source) as Arc<dyn IncrementalSource<Item = &'static str>>)
}

fn fixed(rows: &[&'static str]) -> SearchCollection<&'static str> {
	let rows = rows.to_vec();
	SearchCollection::new(move |_: Option<&()>, _: &str| Ok(SourceAdapter::from_items(rows.clone())), EqHandler, SyncPolicy::default())
}

fn manual() -> SearchCollection<&'static str> {
	SearchCollection::new(
		|_: Option<&()>, _: &str| Err::<SourceAdapter<&'static str>, BoxError>("no factory".into()),
		EqHandler,
		SyncPolicy::default(),
	)
}

async fn settle() {
	tokio::time::sleep(Duration::from_millis(400)).await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn settled_query_populates_list() {
	let collection = fixed(&["A", "B", "C"]);
	assert!(collection.is_empty());

	collection.set_query("");
	settle().await;

	assert_eq!(*collection.current_list(), vec!["A", "B", "C"]);
	assert!(!collection.is_empty());
	assert!(!collection.has_more());
	assert!(!collection.is_loading());
	assert!(collection.is_initialized());
	assert_eq!(collection.phase(), SyncPhase::Idle);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn typing_burst_builds_one_source() {
	let calls = Arc::new(Mutex::new(Vec::<String>::new()));
	let seen = Arc::clone(&calls);
	let collection = SearchCollection::new(
		move |_: Option<&()>, query: &str| {
			seen.lock().push(query.to_owned());
			Ok(SourceAdapter::from_items(query.chars().collect::<Vec<_>>()))
		},
		EqHandler,
		SyncPolicy::default(),
	);

	collection.set_query("a");
	tokio::time::sleep(Duration::from_millis(100)).await;
	collection.set_query("ab");
	tokio::time::sleep(Duration::from_millis(100)).await;
	collection.set_query("abc");
	assert_eq!(collection.query(), "abc");
	assert!(calls.lock().is_empty());

	settle().await;

	assert_eq!(*calls.lock(), vec!["abc".to_owned()]);
	assert_eq!(*collection.current_list(), vec!['a', 'b', 'c']);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dropping_collection_drops_pending_query() {
	let calls = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&calls);
	let collection = SearchCollection::<u32>::new(
		move |_: Option<&()>, _: &str| {
			seen.fetch_add(1, Ordering::SeqCst);
			Ok(SourceAdapter::from_items([1]))
		},
		EqHandler,
		SyncPolicy::default(),
	);

	collection.set_query("a");
	drop(collection);
	settle().await;

	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unchanged_source_keeps_list_instance() {
	let collection = manual();
	let first = collection.update(SourceAdapter::from_items(["a", "b", "c"])).wait().await.unwrap();
	assert_eq!(first, ReconcileOutcome::Applied { generation: 1, ops: 3 });

	let before = collection.current_list();
	let second = collection.update(SourceAdapter::from_items(["a", "b", "c"])).wait().await.unwrap();

	assert_eq!(second, ReconcileOutcome::Applied { generation: 2, ops: 0 });
	assert!(Arc::ptr_eq(&before, &collection.current_list()));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reload_uses_sender_and_latest_query() {
	let collection = SearchCollection::with_sender(
		|sender: Option<&u32>, query: &str| {
			let rows: Vec<String> = (0..sender.copied().unwrap_or(0)).map(|i| format!("{query}{i}")).collect();
			Ok(SourceAdapter::from_items(rows))
		},
		Some(2),
		EqHandler,
		SyncPolicy::default(),
	);

	collection.set_query("q");
	collection.reload().unwrap().wait().await.unwrap();
	assert_eq!(*collection.current_list(), vec!["q0".to_owned(), "q1".to_owned()]);

	// The explicit reload already consumed the pending query.
	settle().await;
	assert_eq!(collection.generation(), 2);

	collection.update_sender(3).unwrap().wait().await.unwrap();
	assert_eq!(collection.sender(), Some(3));
	assert_eq!(collection.current_list().len(), 3);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_factory_leaves_state_alone() {
	let collection = SearchCollection::with_sender(
		|sender: Option<&u32>, query: &str| {
			if sender == Some(&2) || query == "bad" {
				return Err("cannot build".into());
			}
			Ok(SourceAdapter::from_items(["x"]))
		},
		Some(1),
		EqHandler,
		SyncPolicy::default(),
	);
	let mut events = collection.subscribe();
	collection.reload().unwrap().wait().await.unwrap();
	while events.try_recv().is_ok() {}

	let err = collection.update_sender(2).unwrap_err();
	assert!(matches!(err, SyncError::SourceConstruction(_)));
	assert_eq!(collection.sender(), Some(1));
	assert_eq!(*collection.current_list(), vec!["x"]);

	collection.set_query("bad");
	settle().await;

	assert!(matches!(events.try_recv(), Ok(ListEvent::SourceFailed(_))));
	assert_eq!(*collection.current_list(), vec!["x"]);
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn commit_publishes_events_in_order() {
	let collection = manual();
	let mut events = collection.subscribe();

	collection.update(SourceAdapter::from_items(["a"])).wait().await.unwrap();

	assert!(matches!(events.try_recv(), Ok(ListEvent::LoadingChanged(true))));
	match events.try_recv() {
		Ok(ListEvent::Changed { generation, ops, len }) => {
			assert_eq!(generation, 1);
			assert_eq!(&*ops, &[ListOp::Insert { index: 0, item: "a" }]);
			assert_eq!(len, 1);
		}
		other => panic!("expected Changed, got {other:?}"),
	}
	assert!(matches!(events.try_recv(), Ok(ListEvent::EmptyChanged(false))));
	assert!(matches!(events.try_recv(), Ok(ListEvent::LoadingChanged(false))));
	assert!(events.try_recv().is_err());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn paging_source_defers_first_page() {
	let collection = SearchCollection::<u32>::new(
		|_: Option<&()>, _: &str| Err::<SourceAdapter<u32>, BoxError>("unused".into()),
		EqHandler,
		SyncPolicy::default(),
	);

	let outcome = collection.update(SourceAdapter::incremental(PagedSource::new(0..5, 2))).wait().await.unwrap();
	assert_eq!(outcome, ReconcileOutcome::Deferred);
	assert!(collection.current_list().is_empty());
	assert!(!collection.is_initialized());
	assert!(!collection.is_loading());
	assert!(collection.has_more());

	assert_eq!(collection.request_more(0).await.unwrap().produced, 2);
	assert_eq!(*collection.current_list(), vec![0, 1]);
	assert!(collection.is_initialized());

	assert_eq!(collection.request_more(0).await.unwrap().produced, 2);
	assert_eq!(collection.request_more(0).await.unwrap().produced, 1);
	assert_eq!(*collection.current_list(), vec![0, 1, 2, 3, 4]);
	assert!(!collection.has_more());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn initialized_paging_source_loads_first_page_on_reload() {
	let collection = manual();
	collection.request_more(10).await.unwrap();

	let source = Arc::new(ScriptedSource::pages([vec!["a", "b"], vec!["c"]]));
	let outcome = collection.update(paging(&source)).wait().await.unwrap();

	assert_eq!(outcome, ReconcileOutcome::Applied { generation: 2, ops: 2 });
	assert_eq!(*collection.current_list(), vec!["a", "b"]);
	assert!(collection.has_more());
	assert_eq!(source.loads(), 1);
}

/// Paging source with nothing left to load whose loads always fail.
fn exhausted(rows: &[&'static str]) -> Arc<ScriptedSource> {
	Arc::new(ScriptedSource {
		rows: Mutex::new(rows.to_vec()),
		fail: true,
		..ScriptedSource::default()
	})
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn exhausted_paging_source_applies_without_loading() {
	let source = exhausted(&["a", "b"]);
	let collection = manual();

	let outcome = collection.update(paging(&source)).wait().await.unwrap();

	assert_eq!(outcome, ReconcileOutcome::Applied { generation: 1, ops: 2 });
	assert_eq!(source.loads(), 0);
	assert_eq!(*collection.current_list(), vec!["a", "b"]);
	assert!(collection.is_initialized());
	assert!(!collection.has_more());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_exhausted_source_after_init_skips_first_page() {
	let source = exhausted(&[]);
	let collection = manual();
	collection.request_more(0).await.unwrap();

	let outcome = collection.update(paging(&source)).wait().await.unwrap();

	assert_eq!(outcome, ReconcileOutcome::Applied { generation: 2, ops: 0 });
	assert_eq!(source.loads(), 0);
	assert!(collection.is_empty());
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn request_more_without_source_produces_nothing() {
	let collection = manual();
	assert_eq!(collection.request_more(5).await.unwrap(), PageResult { produced: 0 });
	assert!(collection.is_initialized());
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn concurrent_request_more_is_skipped() {
	let gate = Arc::new(Semaphore::new(0));
	let source = Arc::new(ScriptedSource::pages([vec!["a", "b"], vec!["c"]]).gated(&gate));
	let collection = Arc::new(manual());
	assert_eq!(collection.update(paging(&source)).wait().await.unwrap(), ReconcileOutcome::Deferred);

	let first = tokio::spawn({
		let collection = Arc::clone(&collection);
		async move { collection.request_more(2).await }
	});
	while source.loads() == 0 {
		tokio::task::yield_now().await;
	}
	assert!(collection.is_loading());
	assert_eq!(collection.phase(), SyncPhase::Paging);

	assert_eq!(collection.request_more(2).await.unwrap().produced, 0);
	assert_eq!(source.loads(), 1);

	gate.add_permits(1);
	assert_eq!(first.await.unwrap().unwrap().produced, 2);
	assert_eq!(*collection.current_list(), vec!["a", "b"]);
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_reload_retries_once() {
	let source = Arc::new(ScriptedSource {
		endless: true,
		..ScriptedSource::default()
	});
	let collection = manual();
	assert_eq!(collection.update(paging(&source)).wait().await.unwrap(), ReconcileOutcome::Deferred);
	assert_eq!(collection.request_more(0).await.unwrap().produced, 0);
	assert_eq!(source.loads(), 1);

	let outcome = collection.update(paging(&source)).wait().await.unwrap();

	assert!(matches!(outcome, ReconcileOutcome::Applied { ops: 0, .. }));
	assert_eq!(source.loads(), 3);
	assert!(collection.is_empty());
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_retry_can_be_disabled() {
	let source = Arc::new(ScriptedSource {
		endless: true,
		..ScriptedSource::default()
	});
	let collection = SearchCollection::new(
		|_: Option<&()>, _: &str| Err::<SourceAdapter<&'static str>, BoxError>("unused".into()),
		EqHandler,
		SyncPolicy::default().with_retry_empty_once(false),
	);
	collection.request_more(0).await.unwrap();

	collection.update(paging(&source)).wait().await.unwrap();

	assert_eq!(source.loads(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn newer_update_wins_over_blocked_load() {
	let gate = Arc::new(Semaphore::new(0));
	let slow = Arc::new(ScriptedSource::pages([vec!["old"]]).gated(&gate));
	let collection = manual();
	collection.request_more(0).await.unwrap();

	let blocked = collection.update(paging(&slow));
	while slow.loads() == 0 {
		tokio::task::yield_now().await;
	}
	let blocked_generation = collection.generation();

	let fresh = collection.update(SourceAdapter::from_items(["new"])).wait().await.unwrap();
	gate.add_permits(1);

	assert_eq!(blocked.wait().await.unwrap(), ReconcileOutcome::Stale);
	match fresh {
		ReconcileOutcome::Applied { generation, .. } => assert!(generation > blocked_generation),
		other => panic!("expected Applied, got {other:?}"),
	}
	assert_eq!(*collection.current_list(), vec!["new"]);
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn query_edit_cancels_inflight_reload() {
	let gate = Arc::new(Semaphore::new(0));
	let slow = Arc::new(ScriptedSource::pages([vec!["old"]]).gated(&gate));
	let collection = fixed(&["typed"]);
	collection.request_more(0).await.unwrap();

	let blocked = collection.update(paging(&slow));
	while slow.loads() == 0 {
		tokio::task::yield_now().await;
	}
	collection.set_query("t");

	assert_eq!(blocked.wait().await.unwrap(), ReconcileOutcome::Stale);
	assert!(!collection.is_loading());
	assert!(collection.current_list().is_empty());

	settle().await;
	assert_eq!(*collection.current_list(), vec!["typed"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cancel_discards_pending_reload() {
	let collection = manual();
	let before = collection.generation();

	let handle = collection.update(SourceAdapter::from_items(["a"]));
	let generation = collection.cancel();

	assert!(generation > before + 1);
	assert_eq!(handle.wait().await.unwrap(), ReconcileOutcome::Stale);
	assert!(collection.current_list().is_empty());
	assert!(!collection.is_loading());
	assert!(!collection.is_initialized());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn page_failure_clears_loading() {
	let source = Arc::new(ScriptedSource {
		endless: true,
		fail: true,
		..ScriptedSource::default()
	});
	let collection = manual();
	collection.update(paging(&source)).wait().await.unwrap();

	let err = collection.request_more(3).await.unwrap_err();

	assert!(matches!(err, SyncError::PageLoad(_)));
	assert!(!collection.is_loading());
	assert!(collection.is_initialized());
	assert_eq!(collection.phase(), SyncPhase::Idle);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn first_page_failure_surfaces_through_handle() {
	let source = Arc::new(ScriptedSource {
		endless: true,
		fail: true,
		..ScriptedSource::default()
	});
	let collection = manual();
	collection.request_more(0).await.unwrap();

	let err = collection.update(paging(&source)).wait().await.unwrap_err();

	assert!(matches!(err, SyncError::PageLoad(_)));
	assert!(!collection.is_loading());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn large_diff_runs_on_blocking_pool() {
	let collection = SearchCollection::<u32>::new(
		|_: Option<&()>, _: &str| Err::<SourceAdapter<u32>, BoxError>("unused".into()),
		EqHandler,
		SyncPolicy::default().with_offload_threshold(0),
	);

	let outcome = collection.update(SourceAdapter::from_items(0..50)).wait().await.unwrap();
	assert_eq!(outcome, ReconcileOutcome::Applied { generation: 1, ops: 50 });

	let reversed: Vec<u32> = (0..50).rev().collect();
	collection.update(SourceAdapter::from_items(reversed.clone())).wait().await.unwrap();
	assert_eq!(*collection.current_list(), reversed);
}
