//! Suspended-worker bookkeeping.
//!
//! # Mental model
//!
//! * Pure data model: who is suspended, what symbol each waits on, and
//!   what symbol each is itself mid-way through defining.
//! * Two indices over the same entries: by worker id and by awaited
//!   symbol. Both lookups are hot, so every mutation keeps them in sync.
//! * The graph answers two global questions: which entries are safe to
//!   release with a not-found verdict, and whether the graph has closed
//!   into a cycle with no possible progress.
//!
//! # Invariants
//!
//! * A worker appears at most once; a second `suspend` for a live id is a
//!   bug in the worker protocol.
//! * No two entries share the same non-empty `defining` symbol.
//! * `by_symbol` holds exactly the ids of `by_worker` entries awaiting
//!   that symbol, in suspension order.

use rustc_hash::FxHashMap;

use crate::protocol::{DefKind, ReplyTx, Symbol, WaitKind, WorkerId};

/// One suspended worker: what it awaits and what it was producing.
#[derive(Debug)]
pub(crate) struct WaitEntry {
	pub worker: WorkerId,
	pub reply: ReplyTx,
	pub kind: WaitKind,
	pub waiting_on: Symbol,
	pub defining: Option<Symbol>,
}

#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
	by_worker: FxHashMap<WorkerId, WaitEntry>,
	by_symbol: FxHashMap<Symbol, Vec<WorkerId>>,
}

impl WaitGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.by_worker.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_worker.is_empty()
	}

	/// Iterates entries in arbitrary order.
	pub fn entries(&self) -> impl Iterator<Item = &WaitEntry> {
		self.by_worker.values()
	}

	/// Inserts one suspension.
	pub fn suspend(&mut self, entry: WaitEntry) {
		debug_assert!(!self.by_worker.contains_key(&entry.worker), "worker {} suspended twice", entry.worker);
		if self.by_worker.contains_key(&entry.worker) {
			tracing::error!(worker = %entry.worker, "wait_graph.suspend: duplicate entry dropped");
			return;
		}
		self.by_symbol.entry(entry.waiting_on.clone()).or_default().push(entry.worker);
		self.by_worker.insert(entry.worker, entry);
	}

	/// Pops every entry awaiting `symbol` that a definition of strength
	/// `def` releases, in suspension order.
	pub fn release_matching(&mut self, symbol: &Symbol, def: DefKind) -> Vec<WaitEntry> {
		let Some(ids) = self.by_symbol.remove(symbol) else {
			return Vec::new();
		};

		let mut released = Vec::new();
		let mut kept = Vec::new();
		for id in ids {
			let satisfied = self.by_worker.get(&id).is_some_and(|entry| def.satisfies(entry.kind));
			if satisfied {
				if let Some(entry) = self.by_worker.remove(&id) {
					released.push(entry);
				}
			} else {
				kept.push(id);
			}
		}
		if !kept.is_empty() {
			self.by_symbol.insert(symbol.clone(), kept);
		}
		released
	}

	/// Drops any entry for `worker`. Idempotent.
	pub fn remove(&mut self, worker: WorkerId) -> Option<WaitEntry> {
		let entry = self.by_worker.remove(&worker)?;
		if let Some(ids) = self.by_symbol.get_mut(&entry.waiting_on) {
			ids.retain(|id| *id != worker);
			if ids.is_empty() {
				self.by_symbol.remove(&entry.waiting_on);
			}
		}
		Some(entry)
	}

	/// Ids of entries whose awaited symbol no *other* entry is defining.
	///
	/// These are safe to release with a not-found verdict: nothing still
	/// running will ever produce what they wait for.
	pub fn no_definer_entries(&self) -> Vec<WorkerId> {
		let definers: FxHashMap<&Symbol, WorkerId> = self
			.by_worker
			.values()
			.filter_map(|entry| entry.defining.as_ref().map(|symbol| (symbol, entry.worker)))
			.collect();

		let mut ids: Vec<WorkerId> = self
			.by_worker
			.values()
			.filter(|entry| match definers.get(&entry.waiting_on) {
				None => true,
				Some(definer) => *definer == entry.worker,
			})
			.map(|entry| entry.worker)
			.collect();
		ids.sort_unstable();
		ids
	}

	/// True iff the graph is non-empty and every entry awaits a symbol
	/// another entry is defining. No forward progress is possible.
	pub fn is_cyclic_closed(&self) -> bool {
		!self.is_empty() && self.no_definer_entries().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use tokio::sync::oneshot;

	use super::*;
	use crate::protocol::Resolution;

	fn entry(worker: u64, kind: WaitKind, on: &str, defining: Option<&str>) -> (WaitEntry, oneshot::Receiver<Resolution>) {
		let (reply, rx) = oneshot::channel();
		let entry = WaitEntry {
			worker: WorkerId(worker),
			reply,
			kind,
			waiting_on: Symbol::new(on),
			defining: defining.map(Symbol::new),
		};
		(entry, rx)
	}

	// ── release_matching ──

	#[test]
	fn module_definition_releases_module_and_struct_waits() {
		let mut graph = WaitGraph::new();
		let (e1, _rx1) = entry(1, WaitKind::Module, "A", None);
		let (e2, _rx2) = entry(2, WaitKind::Struct, "A", None);
		graph.suspend(e1);
		graph.suspend(e2);

		let released = graph.release_matching(&Symbol::new("A"), DefKind::Module);
		assert_eq!(released.len(), 2);
		assert!(graph.is_empty());
	}

	#[test]
	fn struct_definition_leaves_module_waits_suspended() {
		let mut graph = WaitGraph::new();
		let (e1, _rx1) = entry(1, WaitKind::Module, "A", None);
		let (e2, _rx2) = entry(2, WaitKind::Struct, "A", None);
		graph.suspend(e1);
		graph.suspend(e2);

		let released = graph.release_matching(&Symbol::new("A"), DefKind::Struct);
		assert_eq!(released.len(), 1);
		assert_eq!(released[0].worker, WorkerId(2));
		assert_eq!(graph.len(), 1);

		// The kept module wait is still indexed and released by a module.
		let released = graph.release_matching(&Symbol::new("A"), DefKind::Module);
		assert_eq!(released.len(), 1);
		assert_eq!(released[0].worker, WorkerId(1));
	}

	#[test]
	fn release_preserves_suspension_order() {
		let mut graph = WaitGraph::new();
		for id in [3, 1, 2] {
			let (e, _rx) = entry(id, WaitKind::Module, "A", None);
			graph.suspend(e);
		}

		let order: Vec<_> = graph.release_matching(&Symbol::new("A"), DefKind::Module).iter().map(|e| e.worker.0).collect();
		assert_eq!(order, [3, 1, 2]);
	}

	#[test]
	fn release_of_unknown_symbol_is_empty() {
		let mut graph = WaitGraph::new();
		assert!(graph.release_matching(&Symbol::new("Ghost"), DefKind::Module).is_empty());
	}

	// ── remove ──

	#[test]
	fn remove_is_idempotent_and_prunes_symbol_index() {
		let mut graph = WaitGraph::new();
		let (e, _rx) = entry(1, WaitKind::Module, "A", None);
		graph.suspend(e);

		assert!(graph.remove(WorkerId(1)).is_some());
		assert!(graph.remove(WorkerId(1)).is_none());
		assert!(graph.release_matching(&Symbol::new("A"), DefKind::Module).is_empty());
	}

	// ── stall analysis ──

	#[test]
	fn entry_with_no_definer_is_releasable() {
		let mut graph = WaitGraph::new();
		let (e1, _rx1) = entry(1, WaitKind::Module, "NeverDefined", Some("M"));
		graph.suspend(e1);

		assert_eq!(graph.no_definer_entries(), [WorkerId(1)]);
		assert!(!graph.is_cyclic_closed());
	}

	#[test]
	fn two_cycle_is_closed() {
		let mut graph = WaitGraph::new();
		let (e1, _rx1) = entry(1, WaitKind::Module, "Y", Some("X"));
		let (e2, _rx2) = entry(2, WaitKind::Module, "X", Some("Y"));
		graph.suspend(e1);
		graph.suspend(e2);

		assert!(graph.no_definer_entries().is_empty());
		assert!(graph.is_cyclic_closed());
	}

	#[test]
	fn self_wait_does_not_close_the_graph() {
		// A worker awaiting the symbol it is itself defining has no *other*
		// definer and must be released rather than diagnosed as deadlock.
		let mut graph = WaitGraph::new();
		let (e, _rx) = entry(1, WaitKind::Module, "X", Some("X"));
		graph.suspend(e);

		assert_eq!(graph.no_definer_entries(), [WorkerId(1)]);
		assert!(!graph.is_cyclic_closed());
	}

	#[test]
	fn worker_waiting_into_a_cycle_is_also_deadlocked() {
		let mut graph = WaitGraph::new();
		let (e1, _rx1) = entry(1, WaitKind::Module, "Y", Some("X"));
		let (e2, _rx2) = entry(2, WaitKind::Module, "X", Some("Y"));
		let (e3, _rx3) = entry(3, WaitKind::Module, "X", Some("Z"));
		graph.suspend(e1);
		graph.suspend(e2);
		graph.suspend(e3);

		// Nobody waits on Z, but every waited-on symbol has a suspended
		// definer, so no entry is releasable.
		assert!(graph.is_cyclic_closed());
	}

	#[test]
	fn empty_graph_is_not_cyclic() {
		let graph = WaitGraph::new();
		assert!(!graph.is_cyclic_closed());
	}
}
