//! Worker primitives shared by sift crates.
//!
//! * [`spawn`] / [`spawn_blocking`] route work onto the ambient tokio runtime
//!   (or a shared fallback runtime) and tag it with a [`TaskClass`].
//! * [`GenerationClock`] / [`GenerationToken`] give each unit of work a
//!   monotonically increasing generation plus a cancellation scope.
//! * [`Debounced`] holds a value and reports it after a quiet period.

mod class;
mod debounce;
mod spawn;
mod token;

pub use class::TaskClass;
pub use debounce::Debounced;
pub use spawn::{spawn, spawn_blocking};
pub use token::{GenerationClock, GenerationToken};
pub use tokio_util::sync::CancellationToken;
