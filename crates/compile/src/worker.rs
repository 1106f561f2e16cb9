//! One-shot compilation worker and its long-compilation timer.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use kiln_task::TaskClass;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::{Backend, BackendContext};
use crate::error::CompileError;
use crate::protocol::{Event, ExitCause, WorkerId};

/// Coordinator-side record for one live worker.
#[derive(Debug)]
pub(crate) struct WorkerRecord {
	pub file: PathBuf,
	pub task: JoinHandle<()>,
	pub timer: JoinHandle<()>,
}

impl WorkerRecord {
	/// Forcibly terminates the worker and its timer.
	pub fn abort(&self) {
		self.task.abort();
		self.timer.abort();
	}

	/// Cancels the long-compilation timer only.
	pub fn cancel_timer(&self) {
		self.timer.abort();
	}
}

/// Spawns one worker and arms its single-shot long-compilation timer.
///
/// The worker drives the back-end under a catch-all unwind boundary and
/// emits exactly one terminal [`Event::Exited`]; a panicking back-end
/// surfaces as an ordinary failure instead of taking peers down. The timer
/// is armed on spawn only and never re-armed after a suspension release.
pub(crate) fn spawn(
	id: WorkerId,
	file: PathBuf,
	dest: Option<PathBuf>,
	backend: Arc<dyn Backend>,
	events: mpsc::UnboundedSender<Event>,
	threshold: Duration,
) -> WorkerRecord {
	tracing::debug!(worker = %id, file = %file.display(), "compile.spawn");

	let task = {
		let file = file.clone();
		let events = events.clone();
		kiln_task::spawn(TaskClass::Compile, async move {
			let ctx = BackendContext::new(id, file.clone(), events.clone());
			let outcome = AssertUnwindSafe(backend.compile(&file, dest.as_deref(), &ctx)).catch_unwind().await;
			let cause = match outcome {
				Ok(Ok(())) => ExitCause::Shutdown { file },
				Ok(Err(error)) => ExitCause::Failure { file, error },
				Err(payload) => ExitCause::Failure {
					file,
					error: CompileError::from_panic(payload),
				},
			};
			let _ = events.send(Event::Exited { worker: id, cause });
		})
	};

	let timer = kiln_task::spawn(TaskClass::Timer, async move {
		tokio::time::sleep(threshold).await;
		let _ = events.send(Event::LongTimeout { worker: id });
	});

	WorkerRecord { file, task, timer }
}
