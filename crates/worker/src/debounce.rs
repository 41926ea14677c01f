//! Debounced value with a quiescence-triggered callback.
//!
//! [`Debounced`] stores the latest value synchronously and fires a callback
//! once the value has been left alone for a fixed delay. Every
//! [`Debounced::set`] supersedes the pending fire of the previous one, so a
//! burst of updates produces a single callback carrying the last value.
//!
//! Each `set` arms its timer under a caller-supplied cancellation scope.
//! Cancelling that scope before the delay elapses drops the fire for that
//! value without touching the stored value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{TaskClass, spawn};

type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Timer armed by one `set`, carrying the value that timer delivers.
struct Armed<T> {
	seq: u64,
	scope: CancellationToken,
	value: T,
}

struct DebounceInner<T> {
	latest: Mutex<T>,
	/// Lock order: `armed` before `latest`.
	armed: Mutex<Option<Armed<T>>>,
	seq: AtomicU64,
	/// Serializes callback invocations.
	fire_gate: Mutex<()>,
	callback: Callback<T>,
}

impl<T> DebounceInner<T> {
	fn fire(&self, seq: u64) {
		let _gate = self.fire_gate.lock();
		let Some(value) = self.take(seq).filter(|armed| !armed.scope.is_cancelled()).map(|armed| armed.value) else {
			return;
		};
		tracing::trace!(seq, "debounce.fire");
		(self.callback)(value);
	}

	/// Clears the armed slot if it still belongs to `seq`.
	fn take(&self, seq: u64) -> Option<Armed<T>> {
		let mut armed = self.armed.lock();
		if armed.as_ref().is_some_and(|current| current.seq == seq) {
			armed.take()
		} else {
			None
		}
	}

	fn cancel_pending(&self) {
		if let Some(armed) = self.armed.lock().take() {
			armed.scope.cancel();
		}
	}
}

/// A value whose changes are reported after a quiet period.
pub struct Debounced<T> {
	delay: Duration,
	inner: Arc<DebounceInner<T>>,
}

impl<T> std::fmt::Debug for Debounced<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Debounced")
			.field("delay", &self.delay)
			.field("pending", &self.inner.armed.lock().is_some())
			.finish_non_exhaustive()
	}
}

impl<T> Debounced<T>
where
	T: Clone + Send + 'static,
{
	/// Creates a debounced value holding `initial`.
	///
	/// `callback` runs on the worker runtime once `delay` passes without
	/// another [`Self::set`], receiving the value of the last `set`.
	pub fn new(initial: T, delay: Duration, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
		Self {
			delay,
			inner: Arc::new(DebounceInner {
				latest: Mutex::new(initial),
				armed: Mutex::new(None),
				seq: AtomicU64::new(0),
				fire_gate: Mutex::new(()),
				callback: Box::new(callback),
			}),
		}
	}

	/// Returns the latest value.
	pub fn get(&self) -> T {
		self.inner.latest.lock().clone()
	}

	/// Stores `value` and re-arms the timer under `cancel`.
	///
	/// Any pending fire from an earlier `set` is dropped.
	pub fn set(&self, value: T, cancel: &CancellationToken) {
		let scope = cancel.child_token();
		let (seq, previous) = {
			let mut armed = self.inner.armed.lock();
			let seq = self.inner.seq.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
			*self.inner.latest.lock() = value.clone();
			let previous = armed.replace(Armed {
				seq,
				scope: scope.clone(),
				value,
			});
			(seq, previous)
		};
		if let Some(previous) = previous {
			previous.scope.cancel();
		}

		let inner = Arc::clone(&self.inner);
		let delay = self.delay;
		spawn(TaskClass::Background, async move {
			tokio::select! {
				biased;
				_ = scope.cancelled() => {
					inner.take(seq);
					tracing::trace!(seq, "debounce.cancelled");
				}
				_ = tokio::time::sleep(delay) => inner.fire(seq),
			}
		});
	}
}

impl<T> Debounced<T> {
	/// Drops the pending fire, keeping the stored value.
	pub fn cancel_pending(&self) {
		self.inner.cancel_pending();
	}

	/// Returns true while a fire is scheduled.
	pub fn is_pending(&self) -> bool {
		self.inner.armed.lock().is_some()
	}
}

impl<T> Drop for Debounced<T> {
	fn drop(&mut self) {
		self.inner.cancel_pending();
	}
}
