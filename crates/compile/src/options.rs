//! Batch options and observer callbacks.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::Symbol;

/// Observer invoked with the file a worker just finished or exceeded the
/// long-compilation threshold on.
pub type FileCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Observer invoked inline while the defining worker is held on its ack;
/// it should be fast.
pub type ModuleCallback = Arc<dyn Fn(&Path, &Symbol, &[u8]) + Send + Sync>;

/// Options for one compilation batch.
#[derive(Clone, Default)]
pub struct CompileOptions {
	pub(crate) long_compilation_threshold: Option<Duration>,
	pub(crate) max_concurrency: Option<usize>,
	pub(crate) warnings_as_errors: bool,
	pub(crate) dest: Option<PathBuf>,
	pub(crate) on_file_done: Option<FileCallback>,
	pub(crate) on_long_compilation: Option<FileCallback>,
	pub(crate) on_module_compiled: Option<ModuleCallback>,
}

/// Default long-compilation threshold.
pub const LONG_COMPILATION_THRESHOLD: Duration = Duration::from_millis(5000);

impl CompileOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets how long a worker may run before `on_long_compilation` fires.
	///
	/// The timer is armed once per spawn and never re-armed after a
	/// suspension release; it answers "is this file slow to compile?",
	/// not "has this file been around a long time?".
	#[must_use]
	pub fn long_compilation_threshold(mut self, threshold: Duration) -> Self {
		self.long_compilation_threshold = Some(threshold);
		self
	}

	/// Overrides the concurrency cap (default: hardware parallelism,
	/// floored at two).
	#[must_use]
	pub fn max_concurrency(mut self, cap: usize) -> Self {
		self.max_concurrency = Some(cap);
		self
	}

	/// Fails an otherwise-successful batch when the back-end's warnings
	/// registry is non-empty.
	#[must_use]
	pub fn warnings_as_errors(mut self, enabled: bool) -> Self {
		self.warnings_as_errors = enabled;
		self
	}

	/// Output-path annotation handed through to the back-end.
	#[must_use]
	pub fn dest(mut self, dest: impl Into<PathBuf>) -> Self {
		self.dest = Some(dest.into());
		self
	}

	/// Called once per successfully compiled file after its worker exits.
	#[must_use]
	pub fn on_file_done(mut self, callback: impl Fn(&Path) + Send + Sync + 'static) -> Self {
		self.on_file_done = Some(Arc::new(callback));
		self
	}

	/// Called if a worker is still alive `long_compilation_threshold`
	/// after its spawn. At most once per worker.
	#[must_use]
	pub fn on_long_compilation(mut self, callback: impl Fn(&Path) + Send + Sync + 'static) -> Self {
		self.on_long_compilation = Some(Arc::new(callback));
		self
	}

	/// Called for every module definition, before any waiter is released
	/// against it.
	#[must_use]
	pub fn on_module_compiled(mut self, callback: impl Fn(&Path, &Symbol, &[u8]) + Send + Sync + 'static) -> Self {
		self.on_module_compiled = Some(Arc::new(callback));
		self
	}

	pub(crate) fn threshold(&self) -> Duration {
		self.long_compilation_threshold.unwrap_or(LONG_COMPILATION_THRESHOLD)
	}
}

impl fmt::Debug for CompileOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompileOptions")
			.field("long_compilation_threshold", &self.threshold())
			.field("max_concurrency", &self.max_concurrency)
			.field("warnings_as_errors", &self.warnings_as_errors)
			.field("dest", &self.dest)
			.field("on_file_done", &self.on_file_done.is_some())
			.field("on_long_compilation", &self.on_long_compilation.is_some())
			.field("on_module_compiled", &self.on_module_compiled.is_some())
			.finish()
	}
}
