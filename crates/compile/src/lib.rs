//! Parallel compilation coordinator.
//!
//! Drives the compilation of a set of source files across concurrent
//! workers while resolving inter-file dependencies discovered dynamically
//! during compilation. A file may block waiting on a module or struct
//! declaration that another, not-yet-compiled file is expected to produce;
//! the coordinator suspends that worker, schedules other files into the
//! freed slot, releases suspended workers as definitions land, converts
//! unsatisfiable waits into ordinary undefined-symbol errors, and
//! diagnoses true dependency cycles as a deadlock.
//!
//! The compiler back-end, symbol resolver, and warnings registry are
//! external collaborators behind the [`Backend`] trait; this crate owns
//! only the coordination. On any fatal worker error or deadlock the whole
//! batch fails: partial results are never reported.

mod coordinator;
mod log;
mod protocol;
mod report;
mod scheduler;
mod wait_graph;
mod worker;

pub mod backend;
pub mod error;
pub mod options;

use std::path::PathBuf;
use std::sync::Arc;

pub use backend::{Backend, BackendContext, Warning};
pub use error::{BatchError, CompileError, DeadlockEntry, Frame};
pub use options::{CompileOptions, FileCallback, ModuleCallback, LONG_COMPILATION_THRESHOLD};
pub use protocol::{DefKind, Resolution, Symbol, WaitKind, WorkerId};

use coordinator::Coordinator;

/// Compiles `sources`, returning the modules produced in definition order.
///
/// Output placement is left to the back-end; `options.dest` is passed
/// through as an annotation only.
pub async fn files(backend: Arc<dyn Backend>, sources: Vec<PathBuf>, options: CompileOptions) -> Result<Vec<Symbol>, BatchError> {
	Coordinator::new(backend, sources, options).run().await
}

/// Compiles `sources`, instructing the back-end to write bytecode
/// artifacts under `path`.
pub async fn files_to_path(
	backend: Arc<dyn Backend>,
	sources: Vec<PathBuf>,
	path: impl Into<PathBuf>,
	options: CompileOptions,
) -> Result<Vec<Symbol>, BatchError> {
	let options = options.dest(path.into());
	Coordinator::new(backend, sources, options).run().await
}
