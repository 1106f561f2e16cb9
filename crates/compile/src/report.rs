//! Stderr diagnostics for failed batches.
//!
//! Formatting is split from emission so the exact text is testable; the
//! coordinator calls the `emit_*` wrappers, which write to standard error.

use std::path::Path;

use crate::error::{CompileError, DeadlockEntry, Frame};

/// Strips leading frames whose module belongs to the back-end's internal
/// module set. Non-internal frames are kept in order, including any later
/// internal ones.
pub(crate) fn prune_stack<'a>(stack: &'a [Frame], internal_modules: &[&str]) -> &'a [Frame] {
	let first_external = stack
		.iter()
		.position(|frame| !internal_modules.contains(&frame.module.as_str()))
		.unwrap_or(stack.len());
	&stack[first_external..]
}

/// Formats one compilation error block, header included.
pub(crate) fn format_compile_error(file: &Path, error: &CompileError, internal_modules: &[&str]) -> String {
	let mut out = format!("== Compilation error on file {} ==\n{error}\n", file.display());
	for frame in prune_stack(&error.stack, internal_modules) {
		out.push_str(&format!("    {}: {}\n", frame.module, frame.callsite));
	}
	out
}

/// Formats the deadlock block: one synthetic error per file, then the
/// summary table right-aligned on the longest file path.
pub(crate) fn format_deadlock(participants: &[DeadlockEntry]) -> String {
	let mut out = String::new();
	for entry in participants {
		let error = CompileError::deadlocked(&entry.waiting_on);
		out.push_str(&format_compile_error(&entry.file, &error, &[]));
	}

	let width = participants.iter().map(|entry| entry.file.display().to_string().len()).max().unwrap_or(0);

	out.push_str("\nCompilation failed because of a deadlock between files.\n");
	out.push_str("The following files depended on the following modules:\n\n");
	for entry in participants {
		out.push_str(&format!("    {:>width$} => {}\n", entry.file.display().to_string(), entry.waiting_on));
	}
	out
}

/// Formats the single-line warnings-as-errors notice.
pub(crate) fn format_warnings_notice(count: usize) -> String {
	format!("Compilation failed: {count} warning(s) emitted while warnings-as-errors is enabled\n")
}

pub(crate) fn emit_compile_error(file: &Path, error: &CompileError, internal_modules: &[&str]) {
	eprint!("{}", format_compile_error(file, error, internal_modules));
}

pub(crate) fn emit_deadlock(participants: &[DeadlockEntry]) {
	eprint!("{}", format_deadlock(participants));
}

pub(crate) fn emit_warnings_notice(count: usize) {
	eprint!("{}", format_warnings_notice(count));
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;
	use crate::protocol::Symbol;

	// ── stack pruning ──

	#[test]
	fn leading_internal_frames_are_stripped() {
		let stack = vec![
			Frame::new("kiln.codegen", "emit (codegen.src:10)"),
			Frame::new("kiln.expand", "expand (expand.src:4)"),
			Frame::new("user.parser", "parse (parser.src:88)"),
			Frame::new("kiln.codegen", "emit (codegen.src:22)"),
		];
		let pruned = prune_stack(&stack, &["kiln.codegen", "kiln.expand"]);
		assert_eq!(pruned.len(), 2);
		assert_eq!(pruned[0].module, "user.parser");
		assert_eq!(pruned[1].module, "kiln.codegen");
	}

	#[test]
	fn fully_internal_stack_prunes_to_nothing() {
		let stack = vec![Frame::new("kiln.codegen", "emit")];
		assert!(prune_stack(&stack, &["kiln.codegen"]).is_empty());
	}

	#[test]
	fn empty_internal_set_keeps_everything() {
		let stack = vec![Frame::new("kiln.codegen", "emit")];
		assert_eq!(prune_stack(&stack, &[]).len(), 1);
	}

	// ── error blocks ──

	#[test]
	fn error_block_has_header_and_frames() {
		let error = CompileError::new("SyntaxError", "unexpected token")
			.with_stack(vec![Frame::new("user.parser", "parse (parser.src:3)")]);
		let text = format_compile_error(Path::new("src/a.src"), &error, &[]);
		assert_eq!(
			text,
			"== Compilation error on file src/a.src ==\n\
			 ** (SyntaxError) unexpected token\n    user.parser: parse (parser.src:3)\n"
		);
	}

	// ── deadlock block ──

	#[test]
	fn deadlock_table_right_aligns_on_longest_path() {
		let participants = vec![
			DeadlockEntry {
				file: PathBuf::from("x.src"),
				waiting_on: Symbol::new("Y"),
			},
			DeadlockEntry {
				file: PathBuf::from("deeply/nested/y.src"),
				waiting_on: Symbol::new("X"),
			},
		];
		let text = format_deadlock(&participants);

		assert!(text.contains("== Compilation error on file x.src =="));
		assert!(text.contains("** (deadlock) deadlocked waiting on module Y"));
		assert!(text.contains(&format!("    {:>19} => Y\n", "x.src")));
		assert!(text.contains("    deeply/nested/y.src => X\n"));
	}

	#[test]
	fn warnings_notice_is_single_line() {
		let text = format_warnings_notice(3);
		assert_eq!(text.matches('\n').count(), 1);
	}
}
