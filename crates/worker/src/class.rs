/// What kind of work a spawned task does. Recorded on every spawn event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Reconciliation whose result the user is waiting to see.
	Interactive,
	/// Debounce timers.
	Background,
	/// Diffs large enough to leave the async workers.
	CpuBlocking,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::CpuBlocking => "cpu_blocking",
		}
	}
}
