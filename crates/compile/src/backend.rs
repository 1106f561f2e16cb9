//! Compiler back-end seam.
//!
//! The coordinator never parses or resolves anything itself; it drives a
//! [`Backend`] that turns one file into bytecode. Whenever the back-end
//! hits a reference to a symbol nobody has defined yet, it calls back into
//! the coordinator through the [`BackendContext`] it was handed and blocks
//! until a verdict arrives. The context is plumbed explicitly; there is no
//! task-local side-channel for the current coordinator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::CompileError;
use crate::protocol::{Event, Resolution, Symbol, WaitKind, WorkerId};

/// One warning recorded by the back-end's registry during the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
	/// File the warning was raised against.
	pub file: PathBuf,
	/// Warning text.
	pub message: String,
}

/// The external compiler back-end driven by each worker.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
	/// Compiles one file, publishing definitions and awaiting missing
	/// symbols through `ctx`. `dest` is the artifact output directory when
	/// the batch was started via [`crate::files_to_path`]; otherwise it is
	/// an annotation the back-end may ignore.
	async fn compile(&self, file: &Path, dest: Option<&Path>, ctx: &BackendContext) -> Result<(), CompileError>;

	/// Modules whose stack frames are considered compiler-internal and
	/// pruned from the top of printed exceptions.
	fn internal_modules(&self) -> &[&str] {
		&[]
	}

	/// Warnings accumulated by the registry across the batch, consulted
	/// once after successful completion.
	fn warnings(&self) -> Vec<Warning> {
		Vec::new()
	}
}

/// Per-worker handle through which the back-end messages the coordinator.
///
/// Each worker owns exactly one context. The only suspension points in a
/// worker's life are inside [`BackendContext::require`] (awaiting a
/// verdict) and [`BackendContext::publish_module`] (awaiting the ack).
pub struct BackendContext {
	worker: WorkerId,
	file: PathBuf,
	events: mpsc::UnboundedSender<Event>,
}

impl BackendContext {
	pub(crate) fn new(worker: WorkerId, file: PathBuf, events: mpsc::UnboundedSender<Event>) -> Self {
		Self { worker, file, events }
	}

	/// Blocks until `on` is defined strongly enough for `kind`, or until
	/// the coordinator rules that nothing running will ever define it.
	///
	/// `defining` names the symbol this file is itself mid-way through
	/// producing, if any; the coordinator uses it for deadlock analysis.
	/// If the coordinator is already gone the request resolves `NotFound`,
	/// letting the back-end fail with its ordinary undefined-symbol error.
	pub async fn require(&self, kind: WaitKind, on: Symbol, defining: Option<Symbol>) -> Resolution {
		let (reply, rx) = oneshot::channel();
		let sent = self.events.send(Event::Waiting {
			worker: self.worker,
			kind,
			on,
			defining,
			reply,
		});
		if sent.is_err() {
			return Resolution::NotFound;
		}
		rx.await.unwrap_or(Resolution::NotFound)
	}

	/// Announces a finished module definition.
	///
	/// Returns once the coordinator has logged the symbol, so no other
	/// worker can be released against the module before it is registered.
	pub async fn publish_module(&self, symbol: Symbol, bytecode: Vec<u8>) {
		let (ack, rx) = oneshot::channel();
		let sent = self.events.send(Event::ModuleAvailable {
			worker: self.worker,
			symbol,
			file: self.file.clone(),
			bytecode,
			ack,
		});
		if sent.is_ok() {
			let _ = rx.await;
		}
	}

	/// Announces a struct-shape declaration. Fire and forget.
	pub fn publish_struct(&self, symbol: Symbol) {
		let _ = self.events.send(Event::StructAvailable { symbol });
	}
}
