/// Classification of spawned coordinator tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// One-shot worker compiling a single file through the back-end.
	Compile,
	/// Single-shot long-compilation timer armed alongside a worker.
	Timer,
}

impl TaskClass {
	/// Returns the stable lowercase label used in tracing fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Compile => "compile",
			Self::Timer => "timer",
		}
	}
}
