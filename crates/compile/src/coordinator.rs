//! Single-threaded coordinator event loop.
//!
//! # Mental model
//!
//! * The coordinator owns every piece of batch state (pending queue,
//!   running set, wait-graph, result log) and mutates it only inside its
//!   event loop; there are no shared locks.
//! * All worker traffic arrives on one channel, so event arrival order is
//!   the single point of ordering. Each handler runs to completion before
//!   the next event is looked at.
//! * After every event: admit pending files into free slots, then derive
//!   the batch phase. A stall (nothing pending, everyone suspended) is
//!   resolved by releasing waits nobody will ever satisfy; a stall with
//!   no such waits is a dependency cycle and fails the batch.
//!
//! # Invariants
//!
//! * A worker id is in the running map for its whole life; wait-graph
//!   membership marks the suspended subset.
//! * Active workers (`running − wait`) never exceed the cap.
//! * The result-log entry for a symbol is appended before any `found`
//!   verdict citing that symbol is sent, and the defining worker's ack is
//!   sent before any release against its module.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use crate::backend::Backend;
use crate::error::{BatchError, CompileError, DeadlockEntry};
use crate::log::ResultLog;
use crate::options::CompileOptions;
use crate::protocol::{DefKind, Event, ExitCause, Resolution, Symbol, WorkerId};
use crate::report;
use crate::scheduler::{Scheduler, Verdict};
use crate::wait_graph::{WaitEntry, WaitGraph};
use crate::worker::{self, WorkerRecord};

pub(crate) struct Coordinator {
	backend: Arc<dyn Backend>,
	options: CompileOptions,
	events_tx: mpsc::UnboundedSender<Event>,
	events_rx: mpsc::UnboundedReceiver<Event>,
	scheduler: Scheduler,
	running: FxHashMap<WorkerId, WorkerRecord>,
	wait: WaitGraph,
	log: ResultLog,
	next_worker: u64,
}

impl Coordinator {
	pub fn new(backend: Arc<dyn Backend>, sources: Vec<PathBuf>, options: CompileOptions) -> Self {
		let cap = options.max_concurrency.unwrap_or_else(Scheduler::default_cap);
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		Self {
			backend,
			options,
			events_tx,
			events_rx,
			scheduler: Scheduler::new(sources, cap),
			running: FxHashMap::default(),
			wait: WaitGraph::new(),
			log: ResultLog::new(),
			next_worker: 0,
		}
	}

	/// Drives the batch to completion.
	pub async fn run(mut self) -> Result<Vec<Symbol>, BatchError> {
		self.admit();
		loop {
			match self.scheduler.verdict(self.running.len(), self.wait.len()) {
				Verdict::Done => return self.finish(),
				Verdict::Stalled => {
					if let Some(error) = self.resolve_stall() {
						return Err(error);
					}
				}
				Verdict::Continue => {}
			}

			// The coordinator holds its own sender, so the channel cannot
			// close while the loop runs.
			let Some(event) = self.events_rx.recv().await else {
				return self.finish();
			};
			self.handle(event)?;
			self.admit();
		}
	}

	/// Spawns pending files while active workers stay under the cap.
	fn admit(&mut self) {
		while let Some(file) = self.scheduler.next_admission(self.running.len(), self.wait.len()) {
			let id = WorkerId(self.next_worker);
			self.next_worker += 1;
			let record = worker::spawn(
				id,
				file,
				self.options.dest.clone(),
				Arc::clone(&self.backend),
				self.events_tx.clone(),
				self.options.threshold(),
			);
			self.running.insert(id, record);
		}
	}

	fn handle(&mut self, event: Event) -> Result<(), BatchError> {
		match event {
			Event::StructAvailable { symbol } => {
				tracing::debug!(symbol = %symbol, "compile.struct_available");
				self.log.append(DefKind::Struct, symbol.clone());
				self.release(&symbol, DefKind::Struct);
			}
			Event::ModuleAvailable {
				worker,
				symbol,
				file,
				bytecode,
				ack,
			} => {
				tracing::debug!(worker = %worker, symbol = %symbol, "compile.module_available");
				if let Some(callback) = &self.options.on_module_compiled {
					callback(&file, &symbol, &bytecode);
				}
				let _ = ack.send(());
				if let Some(record) = self.running.get(&worker) {
					record.cancel_timer();
				}
				self.log.append(DefKind::Module, symbol.clone());
				self.release(&symbol, DefKind::Module);
			}
			Event::Waiting {
				worker,
				kind,
				on,
				defining,
				reply,
			} => {
				if self.log.satisfies(kind, &on) {
					let _ = reply.send(Resolution::Found);
				} else {
					tracing::debug!(worker = %worker, on = %on, "compile.suspend");
					self.wait.suspend(WaitEntry {
						worker,
						reply,
						kind,
						waiting_on: on,
						defining,
					});
				}
			}
			Event::LongTimeout { worker } => {
				// Stale timeouts for already-reaped workers are drained here.
				if let Some(record) = self.running.get(&worker) {
					tracing::warn!(worker = %worker, file = %record.file.display(), "compile.long_compilation");
					if let Some(callback) = &self.options.on_long_compilation {
						callback(&record.file);
					}
				}
			}
			Event::Exited { worker, cause } => match cause {
				ExitCause::Shutdown { file } => {
					tracing::debug!(worker = %worker, file = %file.display(), "compile.worker.exit");
					if let Some(callback) = &self.options.on_file_done {
						callback(&file);
					}
					self.reap(worker);
				}
				ExitCause::Failure { file, error } => {
					tracing::warn!(worker = %worker, file = %file.display(), kind = %error.kind, "compile.worker.failed");
					self.reap(worker);
					return Err(self.fatal(file, error));
				}
			},
		}
		Ok(())
	}

	/// Replies `Found` to every suspended worker a definition releases.
	fn release(&mut self, symbol: &Symbol, def: DefKind) {
		for entry in self.wait.release_matching(symbol, def) {
			tracing::debug!(worker = %entry.worker, symbol = %symbol, "compile.release");
			let _ = entry.reply.send(Resolution::Found);
		}
	}

	/// Removes one finished worker: timer, running slot, and any spurious
	/// wait entry it left behind.
	fn reap(&mut self, worker: WorkerId) {
		if let Some(record) = self.running.remove(&worker) {
			record.cancel_timer();
		}
		let _ = self.wait.remove(worker);
	}

	/// Resolves a global stall.
	///
	/// Waits on symbols no suspended worker is defining are released with
	/// `NotFound`; the back-end then raises its ordinary undefined-symbol
	/// error, which is strictly more informative than a deadlock report.
	/// If no such wait exists the graph is a cycle: diagnose and abort.
	fn resolve_stall(&mut self) -> Option<BatchError> {
		if !self.wait.is_cyclic_closed() {
			let releasable = self.wait.no_definer_entries();
			tracing::debug!(count = releasable.len(), "compile.stall.release_not_found");
			for id in releasable {
				if let Some(entry) = self.wait.remove(id) {
					let _ = entry.reply.send(Resolution::NotFound);
				}
			}
			return None;
		}

		let mut participants: Vec<DeadlockEntry> = self
			.wait
			.entries()
			.map(|entry| DeadlockEntry {
				file: self.running.get(&entry.worker).map(|record| record.file.clone()).unwrap_or_default(),
				waiting_on: entry.waiting_on.clone(),
			})
			.collect();
		participants.sort_by(|a, b| a.file.cmp(&b.file));

		tracing::error!(count = participants.len(), "compile.deadlock");
		report::emit_deadlock(&participants);
		self.kill_all();
		Some(BatchError::Deadlock { participants })
	}

	/// Aborts the batch after one worker's fatal failure.
	fn fatal(&mut self, file: PathBuf, error: CompileError) -> BatchError {
		report::emit_compile_error(&file, &error, self.backend.internal_modules());
		self.kill_all();
		BatchError::Compile { file, error }
	}

	/// Forcibly terminates every outstanding worker and timer.
	fn kill_all(&mut self) {
		for (_, record) in self.running.drain() {
			record.abort();
		}
	}

	/// Successful termination: apply the warnings-as-errors tripwire, then
	/// project the result log.
	fn finish(self) -> Result<Vec<Symbol>, BatchError> {
		if self.options.warnings_as_errors {
			let count = self.backend.warnings().len();
			if count > 0 {
				report::emit_warnings_notice(count);
				return Err(BatchError::WarningsAsErrors { count });
			}
		}
		Ok(self.log.modules())
	}
}
