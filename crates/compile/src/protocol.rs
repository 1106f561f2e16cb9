//! Worker ↔ coordinator protocol types.
//!
//! Every worker-originated message travels on one channel carrying the
//! [`Event`] union, so the coordinator observes a single total order over
//! all traffic. Replies flow back on per-request oneshot channels.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::CompileError;

/// Unique handle for one running worker, stable for the worker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub(crate) u64);

impl fmt::Display for WorkerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "w{}", self.0)
	}
}

/// Name introduced by compiling some file that other files may reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
	/// Creates a symbol from its name.
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	/// Returns the symbol name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Symbol {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// Strength of a definition appended to the result log.
///
/// A full module definition releases both module and struct waits; a
/// struct-shape declaration releases only struct waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKind {
	Module,
	Struct,
}

impl DefKind {
	/// Returns whether a definition of this strength releases a wait of `kind`.
	pub const fn satisfies(self, kind: WaitKind) -> bool {
		match (self, kind) {
			(Self::Module, _) => true,
			(Self::Struct, WaitKind::Struct) => true,
			(Self::Struct, WaitKind::Module) => false,
		}
	}
}

/// Strength of definition a suspended worker needs before it can resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitKind {
	Module,
	Struct,
}

/// Coordinator verdict for one outstanding `waiting` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	/// The symbol is defined; retrying the lookup will succeed.
	Found,
	/// No running worker will ever define the symbol; proceed and let the
	/// back-end raise its undefined-symbol error naturally.
	NotFound,
}

pub(crate) type ReplyTx = oneshot::Sender<Resolution>;
pub(crate) type AckTx = oneshot::Sender<()>;

/// Terminal cause reported by one worker task.
///
/// Panics inside the back-end are converted at the worker boundary into a
/// `Failure` carrying a synthesized [`CompileError`], so a crashing worker
/// never takes the coordinator or its peers down with it.
#[derive(Debug)]
pub(crate) enum ExitCause {
	Shutdown { file: PathBuf },
	Failure { file: PathBuf, error: CompileError },
}

/// Tagged union of every message the coordinator can receive.
#[derive(Debug)]
pub(crate) enum Event {
	/// A struct-shape declaration landed; no ack required.
	StructAvailable { symbol: Symbol },
	/// A module definition landed. The emitting worker blocks until `ack`
	/// fires, guaranteeing the log entry precedes any release against it.
	ModuleAvailable {
		worker: WorkerId,
		symbol: Symbol,
		file: PathBuf,
		bytecode: Vec<u8>,
		ack: AckTx,
	},
	/// A worker hit an undefined symbol and is suspended awaiting `reply`.
	Waiting {
		worker: WorkerId,
		kind: WaitKind,
		on: Symbol,
		defining: Option<Symbol>,
		reply: ReplyTx,
	},
	/// A worker's single-shot long-compilation timer fired.
	LongTimeout { worker: WorkerId },
	/// A worker terminated; exactly one per worker.
	Exited { worker: WorkerId, cause: ExitCause },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn module_definition_satisfies_both_wait_kinds() {
		assert!(DefKind::Module.satisfies(WaitKind::Module));
		assert!(DefKind::Module.satisfies(WaitKind::Struct));
	}

	#[test]
	fn struct_definition_satisfies_struct_waits_only() {
		assert!(DefKind::Struct.satisfies(WaitKind::Struct));
		assert!(!DefKind::Struct.satisfies(WaitKind::Module));
	}

	#[test]
	fn symbols_compare_by_name() {
		assert_eq!(Symbol::new("Parser"), Symbol::from("Parser"));
		assert_ne!(Symbol::new("Parser"), Symbol::new("Lexer"));
	}
}
