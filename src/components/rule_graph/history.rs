//! Bounded undo log of graph snapshots.
//!
//! Entries are value copies, so later edits to the live graph never alter them.
//! An optional saved watermark marks the oldest index undo may return to.

use std::fmt;

use log::{debug, info};

use super::types::{Connection, Rule, RuleId};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// The action that produced a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryAction {
	Initial,
	CreateRule,
	DeleteRule,
	CreateConnection,
	DeleteConnection,
	EditRuleLabel,
	UpdateRuleDetails,
	/// First move of a drag. Only recorded when move tracking is enabled.
	MoveRule,
}

impl HistoryAction {
	pub fn label(self) -> &'static str {
		match self {
			Self::Initial => "Initial",
			Self::CreateRule => "Create Rule",
			Self::DeleteRule => "Delete Rule",
			Self::CreateConnection => "Create Connection",
			Self::DeleteConnection => "Delete Connection",
			Self::EditRuleLabel => "Edit Rule Label",
			Self::UpdateRuleDetails => "Update Rule Details",
			Self::MoveRule => "Move Rule",
		}
	}
}

impl fmt::Display for HistoryAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
	pub rules: Vec<Rule>,
	pub connections: Vec<Connection>,
	pub selected: Option<RuleId>,
	pub action: HistoryAction,
	pub timestamp: f64,
	pub is_saved: bool,
}

#[derive(Clone, Debug)]
pub struct HistoryLog {
	entries: Vec<HistoryEntry>,
	index: usize,
	saved: Option<usize>,
	limit: usize,
	track_moves: bool,
}

impl Default for HistoryLog {
	fn default() -> Self {
		Self::new(DEFAULT_HISTORY_LIMIT, false)
	}
}

impl HistoryLog {
	/// A log holding the single `Initial` snapshot of an empty graph.
	pub fn new(limit: usize, track_moves: bool) -> Self {
		Self {
			entries: vec![HistoryEntry {
				rules: Vec::new(),
				connections: Vec::new(),
				selected: None,
				action: HistoryAction::Initial,
				timestamp: 0.0,
				is_saved: false,
			}],
			index: 0,
			saved: None,
			limit: limit.max(1),
			track_moves,
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn saved_index(&self) -> Option<usize> {
		self.saved
	}

	#[cfg(test)]
	pub fn entries(&self) -> &[HistoryEntry] {
		&self.entries
	}

	pub fn current(&self) -> &HistoryEntry {
		&self.entries[self.index]
	}

	pub fn is_tracked(&self, action: HistoryAction) -> bool {
		match action {
			HistoryAction::CreateRule
			| HistoryAction::DeleteRule
			| HistoryAction::CreateConnection
			| HistoryAction::DeleteConnection
			| HistoryAction::EditRuleLabel
			| HistoryAction::UpdateRuleDetails => true,
			HistoryAction::MoveRule => self.track_moves,
			HistoryAction::Initial => false,
		}
	}

	/// Appends a snapshot for `action`, discarding any entries past the current index.
	/// Returns false if the action is not one that history tracks.
	pub fn record(
		&mut self,
		action: HistoryAction,
		rules: &[Rule],
		connections: &[Connection],
		selected: Option<RuleId>,
		now: f64,
	) -> bool {
		if !self.is_tracked(action) {
			debug!("not recording untracked action {action}");
			return false;
		}

		self.entries.truncate(self.index + 1);
		self.entries.push(HistoryEntry {
			rules: rules.to_vec(),
			connections: connections.to_vec(),
			selected,
			action,
			timestamp: now,
			is_saved: false,
		});
		if self.entries.len() > self.limit {
			self.entries.remove(0);
			self.saved = self.saved.and_then(|s| s.checked_sub(1));
		}
		self.index = self.entries.len() - 1;
		true
	}

	/// Oldest index undo may return to.
	fn floor(&self) -> usize {
		self.saved.unwrap_or(0)
	}

	pub fn can_undo(&self) -> bool {
		self.index > self.floor()
	}

	pub fn can_redo(&self) -> bool {
		self.index + 1 < self.entries.len()
	}

	/// Steps back one entry and returns the snapshot to restore.
	pub fn undo(&mut self) -> Option<&HistoryEntry> {
		if !self.can_undo() {
			debug!("undo blocked at index {} (floor {})", self.index, self.floor());
			return None;
		}
		let undone = &self.entries[self.index];
		let (action, recorded_at) = (undone.action, undone.timestamp);
		self.index -= 1;
		info!("undo {action} recorded at {recorded_at:.0} ms, now at {}", self.index);
		Some(&self.entries[self.index])
	}

	/// Steps forward one entry and returns the snapshot to restore.
	pub fn redo(&mut self) -> Option<&HistoryEntry> {
		if !self.can_redo() {
			return None;
		}
		self.index += 1;
		info!("redo {}, now at {}", self.entries[self.index].action, self.index);
		Some(&self.entries[self.index])
	}

	/// Protects the current entry and everything before it from undo.
	pub fn mark_saved(&mut self) {
		self.saved = Some(self.index);
		self.entries[self.index].is_saved = true;
		info!("marked history index {} as saved", self.index);
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::components::rule_graph::types::Point;

	fn rules(n: u32) -> Vec<Rule> {
		(1..=n).map(|id| Rule::new(id, Point::default(), 0.0)).collect()
	}

	fn record_n(log: &mut HistoryLog, n: u32) {
		for i in 1..=n {
			log.record(HistoryAction::CreateRule, &rules(i), &[], None, i as f64);
		}
	}

	#[test]
	fn starts_with_initial_entry() {
		let log = HistoryLog::default();
		assert_eq!(log.len(), 1);
		assert_eq!(log.index(), 0);
		assert_eq!(log.current().action, HistoryAction::Initial);
		assert!(!log.can_undo());
	}

	#[test]
	fn untracked_actions_are_not_recorded() {
		let mut log = HistoryLog::default();
		assert!(!log.record(HistoryAction::MoveRule, &[], &[], None, 0.0));
		assert!(!log.record(HistoryAction::Initial, &[], &[], Some(1), 0.0));
		assert_eq!(log.len(), 1);
	}

	#[test]
	fn move_tracking_variant_records_moves() {
		let mut log = HistoryLog::new(50, true);
		assert!(log.record(HistoryAction::MoveRule, &[], &[], None, 0.0));
		assert_eq!(log.len(), 2);
	}

	#[test]
	fn undo_restores_previous_snapshot() {
		let mut log = HistoryLog::default();
		record_n(&mut log, 2);
		let entry = log.undo().unwrap();
		assert_eq!(entry.rules.len(), 1);
		assert_eq!(log.index(), 1);
	}

	#[test]
	fn record_after_undo_discards_future() {
		let mut log = HistoryLog::default();
		record_n(&mut log, 3);
		log.undo();
		log.undo();
		assert!(log.can_redo());
		log.record(HistoryAction::DeleteRule, &[], &[], None, 9.0);
		assert_eq!(log.len(), 3);
		assert!(!log.can_redo());
		assert_eq!(log.current().action, HistoryAction::DeleteRule);
	}

	#[test]
	fn redo_walks_forward() {
		let mut log = HistoryLog::default();
		record_n(&mut log, 2);
		log.undo();
		let entry = log.redo().unwrap();
		assert_eq!(entry.rules.len(), 2);
		assert!(log.redo().is_none());
	}

	#[test]
	fn cap_evicts_oldest() {
		let mut log = HistoryLog::default();
		record_n(&mut log, 60);
		assert_eq!(log.len(), 50);
		assert_eq!(log.index(), 49);
		assert_eq!(log.entries()[0].rules.len(), 11);
	}

	#[test]
	fn undo_cannot_cross_watermark() {
		let mut log = HistoryLog::default();
		record_n(&mut log, 3);
		log.undo();
		log.mark_saved();
		assert_eq!(log.saved_index(), Some(2));
		assert!(log.entries()[2].is_saved);
		assert!(log.undo().is_none());
		assert_eq!(log.index(), 2);
	}

	#[test]
	fn eviction_shifts_watermark_down() {
		let mut log = HistoryLog::default();
		record_n(&mut log, 49);
		log.mark_saved();
		assert_eq!(log.saved_index(), Some(49));
		record_n(&mut log, 1);
		assert_eq!(log.saved_index(), Some(48));
	}

	#[test]
	fn watermark_evicted_past_start_is_unset() {
		let mut log = HistoryLog::new(3, false);
		log.mark_saved();
		record_n(&mut log, 3);
		assert_eq!(log.saved_index(), None);
		assert!(log.undo().is_some());
		assert!(log.undo().is_some());
		assert!(log.undo().is_none());
		assert_eq!(log.index(), 0);
	}

	#[test]
	fn snapshots_are_independent_copies() {
		let mut log = HistoryLog::default();
		let mut live = rules(1);
		log.record(HistoryAction::CreateRule, &live, &[], None, 0.0);
		live[0].label = "changed".into();
		assert_eq!(log.current().rules[0].label, "Rule 1");
	}

	proptest! {
		#[test]
		fn index_never_drops_below_floor(ops in prop::collection::vec(0u8..3, 0..200)) {
			let mut log = HistoryLog::default();
			for (i, op) in ops.into_iter().enumerate() {
				match op {
					0 => { log.record(HistoryAction::CreateConnection, &[], &[], None, i as f64); }
					1 => { log.undo(); }
					_ => log.mark_saved(),
				}
				prop_assert!(log.len() <= 50);
				prop_assert!(log.index() < log.len());
				prop_assert!(log.index() >= log.saved_index().unwrap_or(0));
			}
		}
	}
}
