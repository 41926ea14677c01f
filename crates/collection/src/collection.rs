//! Diff-synchronized search collection.
//!
//! [`SearchCollection`] owns the list shown to the user and keeps it in step
//! with whatever source the current sender and query produce. Four triggers
//! feed it:
//!
//! * [`SearchCollection::set_query`]: debounced; rebuilds the source once
//!   typing settles.
//! * [`SearchCollection::reload`] / [`SearchCollection::update_sender`] /
//!   [`SearchCollection::update`]: rebuild or replace the source immediately.
//! * [`SearchCollection::request_more`]: asks the active source for another
//!   page.
//!
//! # Generations
//!
//! Every trigger mints a new generation and cancels the previous one. Work
//! runs off the state lock (page fetches, diffs on the blocking pool for
//! large lists) and only commits if its generation is still current when it
//! reacquires the lock. A superseded generation never touches the list, no
//! matter when it finishes.
//!
//! # Loading
//!
//! The loading flag belongs to the generation that raised it. A superseded
//! task clears it only if no newer task has claimed it since, so the flag is
//! false exactly when nothing is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use sift_diff::{Diff, DiffHandler, calculate};
use sift_worker::{CancellationToken, Debounced, GenerationClock, GenerationToken, TaskClass, spawn, spawn_blocking};
use tokio::sync::broadcast;

use crate::config::SyncPolicy;
use crate::error::{BoxError, Result, SyncError};
use crate::event::{ListEvent, PageResult, ReconcileOutcome, SyncPhase};
use crate::source::SourceAdapter;

mod handle;
mod state;

pub use handle::ReconcileHandle;
use state::SyncState;

type Factory<T, S> = dyn Fn(Option<&S>, &str) -> std::result::Result<SourceAdapter<T>, BoxError> + Send + Sync;
type Handler<T> = dyn DiffHandler<T> + Send + Sync;

/// Ordered list kept in sync with a query-driven, possibly paged source.
///
/// `T` is the row type, `S` the opaque sender handed to the source factory.
pub struct SearchCollection<T, S = ()> {
	inner: Arc<Inner<T, S>>,
}

struct Inner<T, S> {
	factory: Box<Factory<T, S>>,
	handler: Arc<Handler<T>>,
	policy: SyncPolicy,
	query: Debounced<String>,
	clock: GenerationClock,
	/// Parent scope for debounce timers; cancelled when the collection drops.
	lifetime: CancellationToken,
	state: Mutex<SyncState<T, S>>,
	list: ArcSwap<Vec<T>>,
	is_empty: AtomicBool,
	loading: AtomicBool,
	initialized: AtomicBool,
	events: broadcast::Sender<ListEvent<T>>,
}

impl<T, S> SearchCollection<T, S>
where
	T: Clone + Send + Sync + 'static,
	S: Clone + Send + Sync + 'static,
{
	/// Creates an empty collection without a sender.
	///
	/// Nothing is loaded until a trigger runs.
	pub fn new<F, H>(factory: F, handler: H, policy: SyncPolicy) -> Self
	where
		F: Fn(Option<&S>, &str) -> std::result::Result<SourceAdapter<T>, BoxError> + Send + Sync + 'static,
		H: DiffHandler<T> + Send + Sync + 'static,
	{
		Self::with_sender(factory, None, handler, policy)
	}

	/// Creates an empty collection bound to `sender`.
	pub fn with_sender<F, H>(factory: F, sender: Option<S>, handler: H, policy: SyncPolicy) -> Self
	where
		F: Fn(Option<&S>, &str) -> std::result::Result<SourceAdapter<T>, BoxError> + Send + Sync + 'static,
		H: DiffHandler<T> + Send + Sync + 'static,
	{
		let (events, _) = broadcast::channel(policy.event_buffer.max(1));
		let delay = policy.typing_timeout();
		let inner = Arc::new_cyclic(|weak: &Weak<Inner<T, S>>| {
			let weak = weak.clone();
			let query = Debounced::new(String::new(), delay, move |query: String| {
				if let Some(inner) = weak.upgrade() {
					inner.query_settled(query);
				}
			});
			Inner {
				factory: Box::new(factory),
				handler: Arc::new(handler),
				policy,
				query,
				clock: GenerationClock::new(),
				lifetime: CancellationToken::new(),
				state: Mutex::new(SyncState::new(sender)),
				list: ArcSwap::from_pointee(Vec::new()),
				is_empty: AtomicBool::new(true),
				loading: AtomicBool::new(false),
				initialized: AtomicBool::new(false),
				events,
			}
		});
		Self { inner }
	}

	/// Stores `text` as the query and rebuilds the source once the typing
	/// timeout passes without another call.
	///
	/// In-flight work is cancelled right away. Factory failures at fire time
	/// are published as [`ListEvent::SourceFailed`].
	pub fn set_query(&self, text: impl Into<String>) {
		self.inner.state.lock().mint(&self.inner.clock);
		self.inner.query.set(text.into(), &self.inner.lifetime);
	}

	/// Rebuilds the source from the current sender and latest query, skipping
	/// the debounce.
	///
	/// # Errors
	///
	/// Returns [`SyncError::SourceConstruction`] if the factory fails; the
	/// collection is left untouched.
	pub fn reload(&self) -> Result<ReconcileHandle> {
		let sender = self.inner.state.lock().sender.clone();
		let source = self.inner.build(sender.as_ref(), &self.inner.query.get())?;
		self.inner.query.cancel_pending();
		Ok(self.inner.reconcile(source))
	}

	/// Replaces the sender and reloads.
	///
	/// # Errors
	///
	/// Returns [`SyncError::SourceConstruction`] if the factory fails; the
	/// previous sender stays in place.
	pub fn update_sender(&self, sender: S) -> Result<ReconcileHandle> {
		let source = self.inner.build(Some(&sender), &self.inner.query.get())?;
		self.inner.state.lock().sender = Some(sender);
		self.inner.query.cancel_pending();
		Ok(self.inner.reconcile(source))
	}

	/// Reconciles against a source built by the caller.
	pub fn update(&self, source: SourceAdapter<T>) -> ReconcileHandle {
		self.inner.query.cancel_pending();
		self.inner.reconcile(source)
	}

	/// Asks the active source for up to `count` more rows and shows them.
	///
	/// Returns zero without touching the source while other work is loading.
	///
	/// # Errors
	///
	/// Returns [`SyncError::PageLoad`] if the source fails. The loading flag is
	/// cleared either way.
	pub async fn request_more(&self, count: u32) -> Result<PageResult> {
		self.inner.request_more(count).await
	}

	/// Cancels in-flight work and any pending query fire. Returns the new
	/// generation.
	pub fn cancel(&self) -> u64 {
		self.inner.query.cancel_pending();
		self.inner.state.lock().mint(&self.inner.clock).generation()
	}

	/// Snapshot of the displayed list.
	pub fn current_list(&self) -> Arc<Vec<T>> {
		self.inner.list.load_full()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty.load(Ordering::Acquire)
	}

	pub fn is_loading(&self) -> bool {
		self.inner.loading.load(Ordering::Acquire)
	}

	/// True once a reconciliation has committed or a page request has run.
	pub fn is_initialized(&self) -> bool {
		self.inner.initialized.load(Ordering::Acquire)
	}

	/// Whether the active source can produce more rows.
	pub fn has_more(&self) -> bool {
		let source = self.inner.state.lock().source.clone();
		source.is_some_and(|source| source.has_more())
	}

	pub fn phase(&self) -> SyncPhase {
		self.inner.state.lock().phase()
	}

	/// Current generation; bumps on every trigger.
	pub fn generation(&self) -> u64 {
		self.inner.state.lock().generation()
	}

	/// Latest query, including one still waiting out the debounce.
	pub fn query(&self) -> String {
		self.inner.query.get()
	}

	pub fn sender(&self) -> Option<S> {
		self.inner.state.lock().sender.clone()
	}

	/// Active source, if any trigger has produced one.
	pub fn source(&self) -> Option<SourceAdapter<T>> {
		self.inner.state.lock().source.clone()
	}

	pub fn policy(&self) -> &SyncPolicy {
		&self.inner.policy
	}

	/// Subscribes to change notifications.
	pub fn subscribe(&self) -> broadcast::Receiver<ListEvent<T>> {
		self.inner.events.subscribe()
	}
}

impl<T, S> std::fmt::Debug for SearchCollection<T, S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SearchCollection")
			.field("len", &self.inner.list.load().len())
			.field("loading", &self.inner.loading.load(Ordering::Acquire))
			.field("initialized", &self.inner.initialized.load(Ordering::Acquire))
			.finish_non_exhaustive()
	}
}

impl<T, S> Drop for SearchCollection<T, S> {
	fn drop(&mut self) {
		// Also cancels the armed debounce scope, a child of `lifetime`.
		self.inner.lifetime.cancel();
		self.inner.state.lock().cancel();
	}
}

impl<T, S> Inner<T, S>
where
	T: Clone + Send + Sync + 'static,
	S: Clone + Send + Sync + 'static,
{
	fn build(&self, sender: Option<&S>, query: &str) -> Result<SourceAdapter<T>> {
		(self.factory)(sender, query).map_err(|err| {
			tracing::warn!(error = %err, query, "collection.source_failed");
			SyncError::SourceConstruction(err)
		})
	}

	fn query_settled(self: &Arc<Self>, query: String) {
		let sender = self.state.lock().sender.clone();
		match self.build(sender.as_ref(), &query) {
			Ok(source) => {
				self.reconcile(source);
			}
			Err(err) => self.publish(ListEvent::SourceFailed(err.to_string().into())),
		}
	}

	fn reconcile(self: &Arc<Self>, source: SourceAdapter<T>) -> ReconcileHandle {
		let complete = !source.supports_paging() || !source.has_more();
		let token = {
			let mut state = self.state.lock();
			state.source = Some(source.clone());
			if !complete && !self.initialized.load(Ordering::Acquire) {
				let token = state.mint(&self.clock);
				tracing::debug!(generation = token.generation(), "collection.deferred");
				return ReconcileHandle::ready(ReconcileOutcome::Deferred);
			}
			self.begin(&mut state, SyncPhase::Reconciling)
		};
		tracing::debug!(generation = token.generation(), paging = source.supports_paging(), "collection.reload");
		let inner = Arc::clone(self);
		ReconcileHandle::spawned(spawn(TaskClass::Interactive, inner.run_reload(source, token)))
	}

	async fn run_reload(self: Arc<Self>, source: SourceAdapter<T>, mut token: GenerationToken) -> Result<ReconcileOutcome> {
		let mut retried = false;
		loop {
			// Exhausted sources are shown as they stand.
			if source.supports_paging() && source.has_more() && source.is_empty() {
				let loaded = tokio::select! {
					biased;
					_ = token.cancelled() => None,
					loaded = source.load_more(self.policy.first_page) => Some(loaded),
				};
				match loaded {
					None => {
						self.finish(&token);
						tracing::trace!(generation = token.generation(), "collection.stale");
						return Ok(ReconcileOutcome::Stale);
					}
					Some(Err(err)) => {
						self.finish(&token);
						tracing::warn!(generation = token.generation(), error = %err, "collection.page_failed");
						return Err(SyncError::PageLoad(err));
					}
					Some(Ok(produced)) => {
						tracing::trace!(generation = token.generation(), produced, "collection.first_page");
					}
				}
			}

			let outcome = self.synchronize(&token, source.snapshot()).await;
			if outcome == ReconcileOutcome::Stale {
				return Ok(outcome);
			}

			// Some sources report more rows after producing an empty first page.
			let retry = self.policy.retry_empty_once && !retried && self.list.load().is_empty() && source.has_more();
			if !retry {
				return Ok(outcome);
			}
			let Some(next) = self.restart(&token) else {
				return Ok(outcome);
			};
			tracing::debug!(generation = next.generation(), "collection.retry_empty");
			retried = true;
			token = next;
		}
	}

	async fn request_more(&self, count: u32) -> Result<PageResult> {
		let (token, source) = {
			let mut state = self.state.lock();
			if state.is_loading() {
				tracing::trace!(count, "collection.page_skipped");
				return Ok(PageResult::default());
			}
			let source = state.source.clone();
			(self.begin(&mut state, SyncPhase::Paging), source)
		};

		let result = match source {
			Some(source) => self.page(&token, &source, count).await,
			None => Ok(PageResult::default()),
		};
		self.initialized.store(true, Ordering::Release);
		self.finish(&token);
		result
	}

	async fn page(&self, token: &GenerationToken, source: &SourceAdapter<T>, count: u32) -> Result<PageResult> {
		let loaded = tokio::select! {
			biased;
			_ = token.cancelled() => return Ok(PageResult::default()),
			loaded = source.load_more(count) => loaded,
		};
		let produced = loaded.map_err(|err| {
			tracing::warn!(generation = token.generation(), error = %err, "collection.page_failed");
			SyncError::PageLoad(err)
		})?;
		tracing::debug!(generation = token.generation(), count, produced, "collection.page");

		if produced > 0 && !token.is_cancelled() {
			self.synchronize(token, source.snapshot()).await;
		}
		Ok(PageResult { produced })
	}

	/// Diffs the displayed list against `target` and commits the result.
	async fn synchronize(&self, token: &GenerationToken, target: Vec<T>) -> ReconcileOutcome {
		let base = self.list.load_full();
		match self.compute(token, Arc::clone(&base), target).await {
			Some(diff) => self.commit(token, &base, diff),
			None => {
				self.finish(token);
				tracing::trace!(generation = token.generation(), "collection.stale");
				ReconcileOutcome::Stale
			}
		}
	}

	async fn compute(&self, token: &GenerationToken, base: Arc<Vec<T>>, target: Vec<T>) -> Option<Diff<T>> {
		if token.is_cancelled() {
			return None;
		}
		let options = self.policy.diff_options();
		if base.len() + target.len() < self.policy.offload_threshold {
			return Some(calculate(base.as_slice(), target.as_slice(), &*self.handler, options));
		}

		let handler = Arc::clone(&self.handler);
		let task = spawn_blocking(TaskClass::CpuBlocking, move || calculate(base.as_slice(), target.as_slice(), &*handler, options));
		tokio::select! {
			biased;
			_ = token.cancelled() => None,
			joined = task => match joined {
				Ok(diff) => Some(diff),
				Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
				Err(_) => None,
			},
		}
	}

	fn commit(&self, token: &GenerationToken, base: &Arc<Vec<T>>, diff: Diff<T>) -> ReconcileOutcome {
		let mut state = self.state.lock();
		if !state.is_current(token) {
			self.release(&mut state, token);
			tracing::trace!(generation = token.generation(), "collection.stale");
			return ReconcileOutcome::Stale;
		}

		let generation = token.generation();
		let ops = diff.len();
		if !diff.is_empty() {
			// Only the current generation commits, so nothing replaced the base.
			debug_assert!(Arc::ptr_eq(base, &self.list.load_full()));
			let mut next = Vec::clone(base);
			diff.apply_to(&mut next);
			let len = next.len();
			self.list.store(Arc::new(next));
			self.publish(ListEvent::Changed {
				generation,
				ops: diff.into_ops().into(),
				len,
			});
		}
		self.refresh_empty();
		self.initialized.store(true, Ordering::Release);
		self.release(&mut state, token);
		tracing::debug!(generation, ops, "collection.apply");
		ReconcileOutcome::Applied { generation, ops }
	}

	/// Mints a generation that owns the loading flag.
	fn begin(&self, state: &mut SyncState<T, S>, phase: SyncPhase) -> GenerationToken {
		let token = state.mint(&self.clock);
		state.claim_loading(&token, phase);
		self.set_loading(true);
		token
	}

	/// Starts a follow-up generation if `token` has not been superseded.
	fn restart(&self, token: &GenerationToken) -> Option<GenerationToken> {
		let mut state = self.state.lock();
		if !state.is_current(token) {
			return None;
		}
		Some(self.begin(&mut state, SyncPhase::Reconciling))
	}

	fn finish(&self, token: &GenerationToken) {
		let mut state = self.state.lock();
		self.release(&mut state, token);
	}

	fn release(&self, state: &mut SyncState<T, S>, token: &GenerationToken) {
		if state.release_loading(token) {
			self.set_loading(false);
		}
	}

	fn set_loading(&self, loading: bool) {
		if self.loading.swap(loading, Ordering::AcqRel) != loading {
			self.publish(ListEvent::LoadingChanged(loading));
		}
	}

	fn refresh_empty(&self) {
		let empty = self.list.load().is_empty();
		if self.is_empty.swap(empty, Ordering::AcqRel) != empty {
			self.publish(ListEvent::EmptyChanged(empty));
		}
	}

	fn publish(&self, event: ListEvent<T>) {
		// No subscribers is fine.
		let _ = self.events.send(event);
	}
}

#[cfg(test)]
mod tests;
