use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};
use crate::event::ReconcileOutcome;

/// Completion handle for a reload, sender change or direct source update.
///
/// Dropping the handle lets the reconciliation finish in the background.
#[derive(Debug)]
pub struct ReconcileHandle {
	state: HandleState,
}

#[derive(Debug)]
enum HandleState {
	Ready(ReconcileOutcome),
	Running(JoinHandle<Result<ReconcileOutcome>>),
}

impl ReconcileHandle {
	pub(super) fn ready(outcome: ReconcileOutcome) -> Self {
		Self {
			state: HandleState::Ready(outcome),
		}
	}

	pub(super) fn spawned(handle: JoinHandle<Result<ReconcileOutcome>>) -> Self {
		Self {
			state: HandleState::Running(handle),
		}
	}

	/// Returns true once the reconciliation has stopped running.
	pub fn is_finished(&self) -> bool {
		match &self.state {
			HandleState::Ready(_) => true,
			HandleState::Running(handle) => handle.is_finished(),
		}
	}

	/// Waits for the reconciliation to end.
	///
	/// # Panics
	///
	/// Re-raises a panic from the diff computation.
	pub async fn wait(self) -> Result<ReconcileOutcome> {
		match self.state {
			HandleState::Ready(outcome) => Ok(outcome),
			HandleState::Running(handle) => match handle.await {
				Ok(result) => result,
				Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
				Err(err) => Err(SyncError::Detached(err.to_string())),
			},
		}
	}
}
