//! Append-only log of completed definitions.
//!
//! Emission order is the order the coordinator processed the corresponding
//! events; the batch's return value is the module-only projection of this
//! log in that order.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::protocol::{DefKind, Symbol, WaitKind};

#[derive(Debug, Default)]
pub(crate) struct ResultLog {
	entries: Vec<(DefKind, Symbol)>,
	seen: FxHashSet<(DefKind, Symbol)>,
	/// Strongest definition recorded per symbol (module beats struct).
	strongest: FxHashMap<Symbol, DefKind>,
}

impl ResultLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `{kind, symbol}` unless that exact pair is already present.
	pub fn append(&mut self, kind: DefKind, symbol: Symbol) {
		if !self.seen.insert((kind, symbol.clone())) {
			return;
		}
		let upgrades = match self.strongest.get(&symbol) {
			None => true,
			Some(DefKind::Struct) => kind == DefKind::Module,
			Some(DefKind::Module) => false,
		};
		if upgrades {
			self.strongest.insert(symbol.clone(), kind);
		}
		self.entries.push((kind, symbol));
	}

	/// Returns whether a logged definition releases a wait of `kind` on `symbol`.
	pub fn satisfies(&self, kind: WaitKind, symbol: &Symbol) -> bool {
		self.strongest.get(symbol).is_some_and(|def| def.satisfies(kind))
	}

	/// Final projection: modules only, in emission order.
	pub fn modules(&self) -> Vec<Symbol> {
		self.entries
			.iter()
			.filter(|(kind, _)| *kind == DefKind::Module)
			.map(|(_, symbol)| symbol.clone())
			.collect()
	}
}
