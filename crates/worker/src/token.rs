use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Source of generation numbers. Clones share one counter.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	issued: Arc<AtomicU64>,
}

impl GenerationClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Issues the next generation. The first call returns 1.
	pub fn next(&self) -> u64 {
		self.issued.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// A generation number paired with its own cancellation scope.
///
/// Cancellation is permanent. Owners still compare [`Self::generation`]
/// against their current generation before committing, so a token that lost
/// a race stays inert even before its task observes the cancel.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	scope: CancellationToken,
}

impl GenerationToken {
	/// Token for `generation` with a scope nothing else can cancel.
	pub fn fresh(generation: u64) -> Self {
		Self {
			generation,
			scope: CancellationToken::new(),
		}
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.scope.is_cancelled()
	}

	pub fn cancel(&self) {
		self.scope.cancel();
	}

	/// Resolves once the token is cancelled.
	pub async fn cancelled(&self) {
		self.scope.cancelled().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_one_counter() {
		let clock = GenerationClock::new();
		let other = clock.clone();
		assert_eq!(clock.next(), 1);
		assert_eq!(other.next(), 2);
		assert_eq!(clock.next(), 3);
	}

	#[test]
	fn cancel_reaches_every_clone() {
		let token = GenerationToken::fresh(3);
		let held = token.clone();
		assert!(!held.is_cancelled());
		token.cancel();
		assert!(held.is_cancelled());
		assert_eq!(held.generation(), 3);
	}

	#[tokio::test]
	async fn cancelled_resolves_after_cancel() {
		let token = GenerationToken::fresh(1);
		let waiter = token.clone();
		token.cancel();
		waiter.cancelled().await;
	}
}
