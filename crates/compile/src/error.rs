//! Error types for batch compilation.

use std::any::Any;
use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Symbol;

/// One stack frame reported by the back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	/// Module the frame executes in; drives internal-frame pruning.
	pub module: String,
	/// Human-readable callsite, e.g. `expand_macro (macros.src:41)`.
	pub callsite: String,
}

impl Frame {
	/// Creates a frame from its module and callsite.
	pub fn new(module: impl Into<String>, callsite: impl Into<String>) -> Self {
		Self {
			module: module.into(),
			callsite: callsite.into(),
		}
	}
}

/// Exception raised by the back-end while compiling one file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("** ({kind}) {reason}")]
pub struct CompileError {
	/// Exception class, e.g. `UndefinedSymbol` or `panic`.
	pub kind: String,
	/// Human-readable reason.
	pub reason: String,
	/// Stack at raise time, outermost frame first.
	pub stack: Vec<Frame>,
}

impl CompileError {
	/// Creates an error with an empty stack.
	pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			reason: reason.into(),
			stack: Vec::new(),
		}
	}

	/// Attaches the raise-time stack.
	#[must_use]
	pub fn with_stack(mut self, stack: Vec<Frame>) -> Self {
		self.stack = stack;
		self
	}

	/// Converts a caught unwind payload into a `panic`-kind error.
	pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
		let reason = if let Some(msg) = payload.downcast_ref::<&str>() {
			(*msg).to_string()
		} else if let Some(msg) = payload.downcast_ref::<String>() {
			msg.clone()
		} else {
			"worker panicked".to_string()
		};
		Self::new("panic", reason)
	}

	/// Synthetic error attached to each file caught in a deadlock.
	pub(crate) fn deadlocked(waiting_on: &Symbol) -> Self {
		Self::new("deadlock", format!("deadlocked waiting on module {waiting_on}"))
	}
}

/// One participant row in a deadlock diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlockEntry {
	/// File whose worker was suspended when the batch stalled.
	pub file: PathBuf,
	/// Symbol the worker was blocked on.
	pub waiting_on: Symbol,
}

/// Failure of an entire compilation batch.
///
/// The coordinator never recovers within a batch: the first fatal worker
/// failure, a dependency cycle, or the warnings-as-errors tripwire aborts
/// everything. Partial results are not reported.
#[derive(Debug, Error)]
pub enum BatchError {
	/// A worker's back-end raised; all peers were killed.
	#[error("compilation error on file {}", .file.display())]
	Compile {
		file: PathBuf,
		#[source]
		error: CompileError,
	},

	/// Every suspended worker was blocked on a symbol another suspended
	/// worker was defining; no forward progress was possible.
	#[error("deadlock between {} files", .participants.len())]
	Deadlock { participants: Vec<DeadlockEntry> },

	/// The batch compiled cleanly but the warnings registry was non-empty
	/// and the warnings-as-errors policy is enabled.
	#[error("{count} warning(s) emitted while warnings-as-errors is enabled")]
	WarningsAsErrors { count: usize },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn panic_payload_str_becomes_reason() {
		let err = CompileError::from_panic(Box::new("boom"));
		assert_eq!(err.kind, "panic");
		assert_eq!(err.reason, "boom");
	}

	#[test]
	fn panic_payload_string_becomes_reason() {
		let err = CompileError::from_panic(Box::new(String::from("index out of bounds")));
		assert_eq!(err.reason, "index out of bounds");
	}

	#[test]
	fn opaque_panic_payload_gets_fallback_reason() {
		let err = CompileError::from_panic(Box::new(17u64));
		assert_eq!(err.reason, "worker panicked");
	}

	#[test]
	fn display_carries_kind_and_reason() {
		let err = CompileError::new("UndefinedSymbol", "symbol Lexer is undefined");
		assert_eq!(err.to_string(), "** (UndefinedSymbol) symbol Lexer is undefined");
	}
}
