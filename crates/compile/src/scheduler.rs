//! Pending-file queue and admission under the concurrency cap.
//!
//! Suspended workers hold no scheduler slot: they consume no CPU, so the
//! cap applies to `running − suspended`. They still count toward the
//! running set because they must be reaped.

use std::collections::VecDeque;
use std::path::PathBuf;

/// Global batch phase derived after every coordinator event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
	/// Nothing pending, nothing running: the batch succeeded.
	Done,
	/// Nothing pending and every running worker is suspended.
	Stalled,
	/// Keep consuming events.
	Continue,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
	pending: VecDeque<PathBuf>,
	cap: usize,
}

impl Scheduler {
	pub fn new(files: impl IntoIterator<Item = PathBuf>, cap: usize) -> Self {
		Self {
			pending: files.into_iter().collect(),
			cap: cap.max(1),
		}
	}

	/// Default concurrency cap: hardware parallelism, floored at two so a
	/// single suspended lane cannot starve the batch.
	pub fn default_cap() -> usize {
		std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).max(2)
	}

	/// Pops the next file to spawn, if a slot is free.
	///
	/// `running` counts all live workers, `suspended` the subset parked in
	/// the wait-graph; only the difference occupies slots.
	pub fn next_admission(&mut self, running: usize, suspended: usize) -> Option<PathBuf> {
		let active = running.saturating_sub(suspended);
		if active < self.cap {
			self.pending.pop_front()
		} else {
			None
		}
	}

	/// Classifies the batch state after one event was handled.
	pub fn verdict(&self, running: usize, suspended: usize) -> Verdict {
		if !self.pending.is_empty() {
			return Verdict::Continue;
		}
		if running == 0 {
			Verdict::Done
		} else if suspended == running {
			Verdict::Stalled
		} else {
			Verdict::Continue
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn sched(files: usize, cap: usize) -> Scheduler {
		Scheduler::new((0..files).map(|i| PathBuf::from(format!("f{i}.src"))), cap)
	}

	#[rstest]
	#[case::free_slot(1, 0, true)]
	#[case::at_cap(2, 0, false)]
	#[case::suspension_frees_a_slot(2, 1, true)]
	#[case::all_suspended(4, 4, true)]
	fn admission_counts_active_workers_only(#[case] running: usize, #[case] suspended: usize, #[case] admitted: bool) {
		let mut sched = sched(8, 2);
		assert_eq!(sched.next_admission(running, suspended).is_some(), admitted);
	}

	#[test]
	fn admission_drains_in_input_order() {
		let mut sched = sched(3, 4);
		let order: Vec<_> = std::iter::from_fn(|| sched.next_admission(0, 0)).collect();
		assert_eq!(order, [PathBuf::from("f0.src"), PathBuf::from("f1.src"), PathBuf::from("f2.src")]);
	}

	#[test]
	fn cap_is_floored_at_one() {
		let mut sched = sched(1, 0);
		assert!(sched.next_admission(0, 0).is_some());
	}

	#[test]
	fn default_cap_is_at_least_two() {
		assert!(Scheduler::default_cap() >= 2);
	}

	#[rstest]
	#[case::all_done(0, 0, Verdict::Done)]
	#[case::worker_active(2, 1, Verdict::Continue)]
	#[case::everyone_suspended(2, 2, Verdict::Stalled)]
	fn verdict_with_empty_queue(#[case] running: usize, #[case] suspended: usize, #[case] expected: Verdict) {
		let sched = sched(0, 2);
		assert_eq!(sched.verdict(running, suspended), expected);
	}

	#[test]
	fn pending_files_always_continue() {
		let sched = sched(1, 2);
		assert_eq!(sched.verdict(0, 0), Verdict::Continue);
		assert_eq!(sched.verdict(2, 2), Verdict::Continue);
	}
}
