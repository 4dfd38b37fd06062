use log::info;

use super::cycle::would_create_cycle;
use super::error::EditorError;
use super::types::{Connection, Point, Rule, RuleId, RulePatch};

/// Owns the live rules and connections.
///
/// Connections are kept unique per ordered pair and acyclic at all times.
#[derive(Clone, Debug)]
pub struct GraphStore {
	rules: Vec<Rule>,
	connections: Vec<Connection>,
	next_id: RuleId,
}

impl Default for GraphStore {
	fn default() -> Self {
		Self::new()
	}
}

impl GraphStore {
	pub fn new() -> Self {
		Self {
			rules: Vec::new(),
			connections: Vec::new(),
			next_id: 1,
		}
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	pub fn connections(&self) -> &[Connection] {
		&self.connections
	}

	pub fn rule(&self, id: RuleId) -> Option<&Rule> {
		self.rules.iter().find(|r| r.id == id)
	}

	pub fn connection(&self, id: &str) -> Option<&Connection> {
		self.connections.iter().find(|c| c.id == id)
	}

	pub fn contains(&self, id: RuleId) -> bool {
		self.rule(id).is_some()
	}

	/// The id the next created rule will get.
	pub fn create_rule(&mut self, position: Point, now: f64) -> Rule {
		let rule = Rule::new(self.next_id, position, now);
		self.next_id += 1;
		self.rules.push(rule.clone());
		info!("created rule {} at ({}, {})", rule.id, position.x, position.y);
		rule
	}

	/// Merges `patch` into rule `id`. A patch that only carries a blank label is rejected.
	pub fn update_rule(&mut self, id: RuleId, patch: RulePatch) -> Result<(), EditorError> {
		let rule = self
			.rules
			.iter_mut()
			.find(|r| r.id == id)
			.ok_or(EditorError::RuleNotFound(id))?;
		let blank_label = patch.label.as_deref().is_some_and(|l| l.trim().is_empty());
		let others = RulePatch {
			label: None,
			..patch.clone()
		};
		if blank_label && others == RulePatch::default() {
			return Err(EditorError::EmptyLabel(id));
		}
		rule.apply(patch);
		Ok(())
	}

	/// Sets the label of rule `id` to the trimmed `label`.
	pub fn rename_rule(&mut self, id: RuleId, label: &str) -> Result<(), EditorError> {
		if !self.contains(id) {
			return Err(EditorError::RuleNotFound(id));
		}
		if label.trim().is_empty() {
			return Err(EditorError::EmptyLabel(id));
		}
		self.update_rule(id, RulePatch::label(label))
	}

	pub fn move_rule(&mut self, id: RuleId, position: Point) -> Result<(), EditorError> {
		self.update_rule(id, RulePatch::position(position))
	}

	/// Removes rule `id` and every connection touching it.
	pub fn delete_rule(&mut self, id: RuleId) -> Result<Rule, EditorError> {
		let idx = self
			.rules
			.iter()
			.position(|r| r.id == id)
			.ok_or(EditorError::RuleNotFound(id))?;
		let rule = self.rules.remove(idx);
		let before = self.connections.len();
		self.connections.retain(|c| !c.touches(id));
		info!(
			"deleted rule {id} and {} connection(s)",
			before - self.connections.len()
		);
		Ok(rule)
	}

	pub fn create_connection(&mut self, from: RuleId, to: RuleId) -> Result<Connection, EditorError> {
		if from == to {
			return Err(EditorError::SelfConnection(from));
		}
		for id in [from, to] {
			if !self.contains(id) {
				return Err(EditorError::RuleNotFound(id));
			}
		}
		if self.connections.iter().any(|c| c.from == from && c.to == to) {
			return Err(EditorError::DuplicateConnection { from, to });
		}
		if would_create_cycle(&self.connections, from, to) {
			return Err(EditorError::CycleRejected { from, to });
		}
		let conn = Connection::new(from, to);
		self.connections.push(conn.clone());
		info!("created connection {}", conn.id);
		Ok(conn)
	}

	pub fn delete_connection(&mut self, id: &str) -> Result<Connection, EditorError> {
		let idx = self
			.connections
			.iter()
			.position(|c| c.id == id)
			.ok_or_else(|| EditorError::ConnectionNotFound(id.to_owned()))?;
		let conn = self.connections.remove(idx);
		info!("deleted connection {id}");
		Ok(conn)
	}

	/// Replaces the live rules and connections, e.g. from a history snapshot.
	/// The id counter is not rewound.
	pub fn restore(&mut self, rules: Vec<Rule>, connections: Vec<Connection>) {
		self.rules = rules;
		self.connections = connections;
	}

	pub fn incoming(&self, id: RuleId) -> usize {
		self.connections.iter().filter(|c| c.to == id).count()
	}

	pub fn outgoing(&self, id: RuleId) -> usize {
		self.connections.iter().filter(|c| c.from == id).count()
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::components::rule_graph::cycle::is_acyclic;

	fn store_with(n: usize) -> GraphStore {
		let mut store = GraphStore::new();
		for i in 0..n {
			store.create_rule(Point::new(i as f64 * 100.0, 0.0), 0.0);
		}
		store
	}

	#[test]
	fn ids_are_never_reused() {
		let mut store = store_with(2);
		store.delete_rule(2).unwrap();
		let rule = store.create_rule(Point::default(), 0.0);
		assert_eq!(rule.id, 3);
	}

	#[test]
	fn duplicate_connection_is_rejected_once_created() {
		let mut store = store_with(2);
		store.create_connection(1, 2).unwrap();
		assert_eq!(
			store.create_connection(1, 2),
			Err(EditorError::DuplicateConnection { from: 1, to: 2 })
		);
		assert_eq!(store.connections().len(), 1);
	}

	#[test]
	fn two_node_cycle_is_rejected() {
		let mut store = store_with(2);
		store.create_connection(1, 2).unwrap();
		assert_eq!(
			store.create_connection(2, 1),
			Err(EditorError::CycleRejected { from: 2, to: 1 })
		);
		assert_eq!(store.connections().len(), 1);
	}

	#[test]
	fn self_connection_is_rejected() {
		let mut store = store_with(1);
		assert_eq!(store.create_connection(1, 1), Err(EditorError::SelfConnection(1)));
	}

	#[test]
	fn connection_to_missing_rule_is_rejected() {
		let mut store = store_with(1);
		assert_eq!(store.create_connection(1, 9), Err(EditorError::RuleNotFound(9)));
	}

	#[test]
	fn delete_rule_removes_only_incident_connections() {
		let mut store = store_with(3);
		store.create_connection(1, 2).unwrap();
		store.create_connection(2, 3).unwrap();
		store.create_connection(1, 3).unwrap();
		store.delete_rule(2).unwrap();
		let ids: Vec<_> = store.connections().iter().map(|c| c.id.as_str()).collect();
		assert_eq!(ids, ["1-3"]);
		assert_eq!(store.rules().len(), 2);
	}

	#[test]
	fn deletes_are_idempotent() {
		let mut store = store_with(1);
		store.delete_rule(1).unwrap();
		assert_eq!(store.delete_rule(1), Err(EditorError::RuleNotFound(1)));
		assert!(store.delete_connection("1-2").is_err());
	}

	#[test]
	fn rename_trims_and_rejects_blank() {
		let mut store = store_with(1);
		store.rename_rule(1, "  Eligibility gate ").unwrap();
		assert_eq!(store.rule(1).unwrap().label, "Eligibility gate");
		assert_eq!(store.rename_rule(1, " \t "), Err(EditorError::EmptyLabel(1)));
		assert_eq!(store.rule(1).unwrap().label, "Eligibility gate");
	}

	#[test]
	fn update_missing_rule_is_not_found() {
		let mut store = store_with(1);
		assert_eq!(
			store.update_rule(5, RulePatch::label("x")),
			Err(EditorError::RuleNotFound(5))
		);
	}

	#[test]
	fn move_changes_only_position() {
		let mut store = store_with(1);
		let before = store.rule(1).unwrap().clone();
		store.move_rule(1, Point::new(40.0, 50.0)).unwrap();
		let after = store.rule(1).unwrap();
		assert_eq!(after.position, Point::new(40.0, 50.0));
		assert_eq!(after.label, before.label);
	}

	#[test]
	fn connection_counts() {
		let mut store = store_with(3);
		store.create_connection(1, 2).unwrap();
		store.create_connection(1, 3).unwrap();
		assert_eq!(store.outgoing(1), 2);
		assert_eq!(store.incoming(3), 1);
		assert_eq!(store.incoming(1), 0);
	}

	proptest! {
		#[test]
		fn connections_stay_acyclic(pairs in prop::collection::vec((1u32..=8, 1u32..=8), 0..64)) {
			let mut store = store_with(8);
			for (from, to) in pairs {
				let _ = store.create_connection(from, to);
				prop_assert!(is_acyclic(store.connections()));
			}
			let mut seen = std::collections::HashSet::new();
			for conn in store.connections() {
				prop_assert!(seen.insert((conn.from, conn.to)));
				prop_assert_ne!(conn.from, conn.to);
			}
		}
	}
}
