use sift_worker::{GenerationClock, GenerationToken};

use crate::event::SyncPhase;
use crate::source::SourceAdapter;

/// Mutable engine state guarded by the collection's state lock.
///
/// Holding the lock is the commit point: generation checks and list swaps
/// happen under it, so commits never interleave.
pub(super) struct SyncState<T, S> {
	pub(super) sender: Option<S>,
	pub(super) source: Option<SourceAdapter<T>>,
	token: GenerationToken,
	/// Generation that raised the loading flag, if any.
	loading_owner: Option<u64>,
	phase: SyncPhase,
}

impl<T, S> SyncState<T, S> {
	pub(super) fn new(sender: Option<S>) -> Self {
		Self {
			sender,
			source: None,
			token: GenerationToken::fresh(0),
			loading_owner: None,
			phase: SyncPhase::Idle,
		}
	}

	/// Cancels the current generation and installs a new one.
	pub(super) fn mint(&mut self, clock: &GenerationClock) -> GenerationToken {
		self.token.cancel();
		self.token = GenerationToken::fresh(clock.next());
		self.token.clone()
	}

	pub(super) fn is_current(&self, token: &GenerationToken) -> bool {
		!token.is_cancelled() && token.generation() == self.token.generation()
	}

	pub(super) fn generation(&self) -> u64 {
		self.token.generation()
	}

	pub(super) fn cancel(&self) {
		self.token.cancel();
	}

	pub(super) fn is_loading(&self) -> bool {
		self.loading_owner.is_some()
	}

	pub(super) fn phase(&self) -> SyncPhase {
		self.phase
	}

	/// Marks `token`'s generation as the owner of the loading flag.
	pub(super) fn claim_loading(&mut self, token: &GenerationToken, phase: SyncPhase) {
		self.loading_owner = Some(token.generation());
		self.phase = phase;
	}

	/// Drops the loading flag if `token` still owns it. Returns true when the
	/// flag was cleared.
	pub(super) fn release_loading(&mut self, token: &GenerationToken) -> bool {
		if self.loading_owner != Some(token.generation()) {
			return false;
		}
		self.loading_owner = None;
		self.phase = SyncPhase::Idle;
		true
	}
}
