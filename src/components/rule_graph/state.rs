use log::{debug, info, warn};

use super::config::EditorConfig;
use super::error::{EditorError, Notice};
use super::history::{HistoryAction, HistoryLog};
use super::interaction::{
	ContextMenu, DragGesture, Interaction, Key, KeyInput, MenuAction, MenuTarget, Pointer,
	PointerButton,
};
use super::pan::PanController;
use super::schedule::{Deferred, DeferredQueue};
use super::store::GraphStore;
use super::types::{Connection, Point, Rule, RuleDetails, RuleId, RulePatch};

/// Flags that swallow the next click after a gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClickGuard {
	/// Set while dragging; cleared `drag_release_ms` after release.
	pub drag_release: bool,
	/// Set while dragging; cleared `drag_cooldown_ms` after `drag_release`.
	pub drag_cooldown: bool,
	/// Set when a pan ends; cleared `pan_settle_ms` later.
	pub pan_settle: bool,
}

impl ClickGuard {
	fn suppresses(&self) -> bool {
		self.drag_release || self.drag_cooldown || self.pan_settle
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectedSummary {
	pub rule: Rule,
	pub incoming: usize,
	pub outgoing: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelEditor {
	pub rule: RuleId,
	pub center: Point,
	pub draft: String,
}

/// Everything the overlays around the canvas need, as one value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayModel {
	pub rule_count: usize,
	pub connection_count: usize,
	/// Number of undoable steps up to and including the current one.
	pub history_position: usize,
	pub history_len: usize,
	/// Number of protected steps, if a save watermark is set.
	pub saved_position: Option<usize>,
	/// Whether the current step is the saved one.
	pub at_saved: bool,
	/// The action undo would revert next.
	pub last_action: Option<&'static str>,
	pub can_undo: bool,
	pub can_redo: bool,
	pub selected: Option<SelectedSummary>,
	pub context_menu: Option<ContextMenu>,
	pub label_editor: Option<LabelEditor>,
	pub details: Option<(RuleId, RuleDetails)>,
	pub notice: Option<String>,
	pub pan_offset: f64,
	pub panning: bool,
}

/// The rule editor: graph store, undo history, pan ratchet and the interaction
/// state machine behind one event-driven entry point.
///
/// Every method that takes `now` is an event on the editor's single event loop.
/// Input events first run deferred actions due strictly before `now`; [`Self::tick`]
/// also runs those due exactly at `now`.
pub struct RuleCanvasState {
	pub config: EditorConfig,
	store: GraphStore,
	history: HistoryLog,
	pan: PanController,
	queue: DeferredQueue,
	interaction: Interaction,
	guard: ClickGuard,
	notice: Option<Notice>,
}

impl Default for RuleCanvasState {
	fn default() -> Self {
		Self::new(EditorConfig::default())
	}
}

impl RuleCanvasState {
	pub fn new(config: EditorConfig) -> Self {
		Self {
			store: GraphStore::new(),
			history: HistoryLog::new(config.history_limit, config.track_drag_moves),
			pan: PanController::new(config.pan_min_y, config.pan_max_y),
			queue: DeferredQueue::new(),
			interaction: Interaction::Idle,
			guard: ClickGuard::default(),
			notice: None,
			config,
		}
	}

	// -- read accessors --

	pub fn rules(&self) -> &[Rule] {
		self.store.rules()
	}

	pub fn connections(&self) -> &[Connection] {
		self.store.connections()
	}

	#[cfg(test)]
	pub fn rule(&self, id: RuleId) -> Option<&Rule> {
		self.store.rule(id)
	}

	pub fn selected(&self) -> Option<RuleId> {
		self.interaction.selected()
	}

	#[cfg(test)]
	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	#[cfg(test)]
	pub fn history(&self) -> &HistoryLog {
		&self.history
	}

	pub fn history_len(&self) -> usize {
		self.history.len()
	}

	pub fn history_index(&self) -> usize {
		self.history.index()
	}

	pub fn saved_index(&self) -> Option<usize> {
		self.history.saved_index()
	}

	pub fn notice(&self) -> Option<&Notice> {
		self.notice.as_ref()
	}

	pub fn pan_offset(&self) -> f64 {
		self.pan.offset()
	}

	#[cfg(test)]
	pub fn click_guard(&self) -> ClickGuard {
		self.guard
	}

	pub fn context_menu(&self) -> Option<&ContextMenu> {
		match &self.interaction {
			Interaction::ContextMenu(menu) => Some(menu),
			_ => None,
		}
	}

	pub fn dragging(&self) -> Option<RuleId> {
		match &self.interaction {
			Interaction::Dragging(g) => Some(g.rule),
			_ => None,
		}
	}

	/// The details form being edited, if any.
	pub fn details_draft(&self) -> Option<&RuleDetails> {
		match &self.interaction {
			Interaction::EditingDetails { form, .. } => Some(form),
			_ => None,
		}
	}

	pub fn is_panning(&self) -> bool {
		matches!(self.interaction, Interaction::Panning { .. })
	}

	pub fn is_editing_label(&self) -> bool {
		matches!(self.interaction, Interaction::EditingLabel { .. })
	}

	pub fn overlay(&self) -> OverlayModel {
		let selected = self.selected().and_then(|id| {
			self.store.rule(id).map(|rule| SelectedSummary {
				rule: rule.clone(),
				incoming: self.store.incoming(id),
				outgoing: self.store.outgoing(id),
			})
		});
		let label_editor = match &self.interaction {
			Interaction::EditingLabel { rule, draft } => {
				self.store.rule(*rule).map(|r| LabelEditor {
					rule: *rule,
					center: r.position,
					draft: draft.clone(),
				})
			}
			_ => None,
		};
		let details = match &self.interaction {
			Interaction::EditingDetails { rule, form, .. } => Some((*rule, form.clone())),
			_ => None,
		};
		OverlayModel {
			rule_count: self.store.rules().len(),
			connection_count: self.store.connections().len(),
			history_position: self.history_index() + 1,
			history_len: self.history_len(),
			saved_position: self.saved_index().map(|s| s + 1),
			at_saved: self.history.current().is_saved,
			last_action: Some(self.history.current().action)
				.filter(|a| *a != HistoryAction::Initial)
				.map(HistoryAction::label),
			can_undo: self.history.can_undo(),
			can_redo: self.history.can_redo(),
			selected,
			context_menu: self.context_menu().cloned(),
			label_editor,
			details,
			notice: self.notice().map(|n| n.message.clone()),
			pan_offset: self.pan.offset(),
			panning: self.is_panning(),
		}
	}

	// -- hit testing --

	/// The topmost rule whose circle contains `p`.
	pub fn rule_at(&self, p: Point) -> Option<RuleId> {
		self.store
			.rules()
			.iter()
			.rev()
			.find(|r| r.position.distance(p) <= self.config.rule_radius)
			.map(|r| r.id)
	}

	/// The drawn segment of a connection: from the source center to the target's rim.
	pub fn connection_segment(&self, conn: &Connection) -> Option<(Point, Point)> {
		let from = self.store.rule(conn.from)?.position;
		let to = self.store.rule(conn.to)?.position;
		let dist = from.distance(to);
		if dist < 0.001 {
			return None;
		}
		let (ux, uy) = ((to.x - from.x) / dist, (to.y - from.y) / dist);
		let r = self.config.rule_radius;
		Some((from, to.offset(-ux * r, -uy * r)))
	}

	pub fn connection_at(&self, p: Point) -> Option<String> {
		let slop = self.config.connection_hit_width / 2.0;
		self.store
			.connections()
			.iter()
			.rev()
			.find(|c| {
				self.connection_segment(c)
					.is_some_and(|(a, b)| distance_to_segment(p, a, b) <= slop)
			})
			.map(|c| c.id.clone())
	}

	// -- time --

	/// Runs deferred actions due by `now`. Returns true if visible state changed.
	pub fn tick(&mut self, now: f64) -> bool {
		self.advance(now, true)
	}

	fn advance(&mut self, now: f64, inclusive: bool) -> bool {
		let due = self.queue.take_due(now, inclusive);
		let changed = !due.is_empty();
		for action in due {
			match action {
				Deferred::ReleaseDrag => self.guard.drag_release = false,
				Deferred::EndDragCooldown => self.guard.drag_cooldown = false,
				Deferred::SettlePan => self.guard.pan_settle = false,
				Deferred::ExpireNotice => {
					self.notice.take_if(|n| n.is_expired(now));
				}
			}
		}
		changed
	}

	fn report(&mut self, err: EditorError, now: f64) {
		match err.user_message() {
			Some(message) => {
				warn!("{err}");
				self.queue.cancel_all(Deferred::ExpireNotice);
				let expires_at = now + self.config.notice_duration_ms;
				self.queue
					.schedule(now, self.config.notice_duration_ms, Deferred::ExpireNotice);
				self.notice = Some(Notice {
					message: message.to_owned(),
					expires_at,
				});
			}
			None => debug!("{err}"),
		}
	}

	fn record(&mut self, action: HistoryAction, now: f64) {
		let selected = self.selected();
		self.history.record(
			action,
			self.store.rules(),
			self.store.connections(),
			selected,
			now,
		);
	}

	// -- raw input --

	pub fn pointer_down(&mut self, pointer: Pointer, now: f64) {
		self.advance(now, false);
		// Edits and menus are closed by the click that follows, not by the press.
		if self.interaction.is_editing()
			|| matches!(
				self.interaction,
				Interaction::Dragging(_) | Interaction::Panning { .. } | Interaction::ContextMenu(_)
			) {
			return;
		}

		if pointer.is_pan_trigger() {
			self.begin_pan(pointer.screen_y);
			return;
		}
		if pointer.button != PointerButton::Primary {
			return;
		}
		if let Some(id) = self.rule_at(pointer.position) {
			self.start_drag(id, pointer.position, now);
		}
	}

	pub fn pointer_move(&mut self, pointer: Pointer, now: f64) {
		self.advance(now, false);
		match self.interaction {
			Interaction::Panning { .. } => {
				self.pan.drag_to(pointer.screen_y);
			}
			Interaction::Dragging(_) => self.update_drag(pointer.position, now),
			_ => {}
		}
	}

	pub fn pointer_up(&mut self, now: f64) {
		self.advance(now, false);
		match self.interaction {
			Interaction::Panning { .. } => self.end_pan(now),
			Interaction::Dragging(_) => self.end_drag(now),
			_ => {}
		}
	}

	/// A primary click, delivered after the pointer-up that ends it.
	pub fn click(&mut self, position: Point, now: f64) {
		self.advance(now, false);

		if let Interaction::ContextMenu(menu) = &self.interaction {
			self.interaction = Interaction::resting(menu.selected);
		}

		if self.guard.drag_release || self.guard.drag_cooldown {
			debug!("click swallowed after drag");
			self.guard.drag_release = false;
			self.guard.drag_cooldown = false;
			self.queue.cancel_all(Deferred::ReleaseDrag);
			self.queue.cancel_all(Deferred::EndDragCooldown);
			return;
		}
		if self.guard.suppresses() {
			debug!("click swallowed after pan");
			return;
		}

		let target = self.rule_at(position);
		match &self.interaction {
			Interaction::EditingLabel { rule, .. } => {
				if target == Some(*rule) {
					return;
				}
				self.commit_label_edit(now);
				if target.is_none() {
					return;
				}
			}
			Interaction::EditingDetails { .. } => {
				self.close_details();
				return;
			}
			Interaction::Dragging(_) | Interaction::Panning { .. } => return,
			_ => {}
		}

		match target {
			Some(id) => self.select_or_connect(id, now),
			None if self.selected().is_some() => self.interaction = Interaction::Idle,
			None => {
				self.create_rule_at(position, now);
			}
		}
	}

	/// A secondary click: opens the context menu for whatever is under `position`.
	pub fn context_click(&mut self, position: Point, now: f64) {
		self.advance(now, false);
		if !matches!(
			self.interaction,
			Interaction::Idle | Interaction::Connecting { .. } | Interaction::ContextMenu(_)
		) {
			return;
		}
		if let Some(id) = self.rule_at(position) {
			self.open_context_menu(MenuTarget::Rule(id));
		} else if let Some(id) = self.connection_at(position) {
			self.open_context_menu(MenuTarget::Connection(id));
		} else {
			self.close_context_menu();
		}
	}

	/// Returns true if the key was handled and should not reach anything else.
	pub fn key_down(&mut self, key: KeyInput, now: f64) -> bool {
		self.advance(now, false);

		if matches!(self.interaction, Interaction::EditingLabel { .. }) {
			return match key.key {
				Key::Enter => {
					self.commit_label_edit(now);
					true
				}
				Key::Escape => {
					self.cancel_label_edit();
					true
				}
				_ => false,
			};
		}

		match (key.key, key.ctrl, key.shift) {
			(Key::Char('z'), true, false) => self.undo(now),
			(Key::Char('z'), true, true) | (Key::Char('y'), true, _) => self.redo(now),
			(Key::Char('s'), true, _) => self.mark_saved(),
			(Key::Escape, ..) if matches!(self.interaction, Interaction::EditingDetails { .. }) => {
				self.close_details()
			}
			_ => return false,
		}
		true
	}

	// -- commands --

	pub fn create_rule_at(&mut self, position: Point, now: f64) -> RuleId {
		let rule = self.store.create_rule(position, now);
		self.record(HistoryAction::CreateRule, now);
		rule.id
	}

	/// Clicking a rule: select it, deselect it, or connect the selection to it.
	pub fn select_or_connect(&mut self, id: RuleId, now: f64) {
		if !self.store.contains(id) {
			self.report(EditorError::RuleNotFound(id), now);
			return;
		}
		match self.selected() {
			None => self.interaction = Interaction::Connecting { source: id },
			Some(source) if source == id => self.interaction = Interaction::Idle,
			Some(source) => {
				self.interaction = Interaction::Idle;
				match self.store.create_connection(source, id) {
					Ok(_) => self.record(HistoryAction::CreateConnection, now),
					Err(err) => self.report(err, now),
				}
			}
		}
	}

	pub fn start_drag(&mut self, id: RuleId, pointer: Point, now: f64) {
		if self.selected().is_some() || self.interaction.is_editing() {
			return;
		}
		let Some(rule) = self.store.rule(id) else {
			self.report(EditorError::RuleNotFound(id), now);
			return;
		};
		let grab_offset = Point::new(pointer.x - rule.position.x, pointer.y - rule.position.y);
		self.interaction = Interaction::Dragging(DragGesture {
			rule: id,
			grab_offset,
			moved: false,
		});
	}

	pub fn update_drag(&mut self, pointer: Point, now: f64) {
		let Interaction::Dragging(mut gesture) = self.interaction else {
			return;
		};
		let position = pointer.offset(-gesture.grab_offset.x, -gesture.grab_offset.y);
		if let Err(err) = self.store.move_rule(gesture.rule, position) {
			self.interaction = Interaction::Idle;
			self.report(err, now);
			return;
		}

		self.queue.cancel_all(Deferred::ReleaseDrag);
		self.queue.cancel_all(Deferred::EndDragCooldown);
		self.guard.drag_release = true;
		self.guard.drag_cooldown = true;
		if !gesture.moved {
			gesture.moved = true;
			self.interaction = Interaction::Dragging(gesture);
			self.record(HistoryAction::MoveRule, now);
		}
	}

	pub fn end_drag(&mut self, now: f64) {
		let Interaction::Dragging(gesture) = self.interaction else {
			return;
		};
		self.interaction = Interaction::Idle;
		if gesture.moved {
			self.schedule_drag_release(now);
			debug!("rule {} dropped", gesture.rule);
		}
	}

	/// Starts the two-stage countdown that lifts post-drag click suppression.
	fn schedule_drag_release(&mut self, now: f64) {
		let release = self.config.drag_release_ms;
		self.queue.cancel_all(Deferred::ReleaseDrag);
		self.queue.cancel_all(Deferred::EndDragCooldown);
		self.queue.schedule(now, release, Deferred::ReleaseDrag);
		self.queue.schedule(
			now,
			release + self.config.drag_cooldown_ms,
			Deferred::EndDragCooldown,
		);
	}

	fn begin_pan(&mut self, screen_y: f64) {
		let selected = match &self.interaction {
			Interaction::Idle | Interaction::Connecting { .. } => self.interaction.selected(),
			_ => return,
		};
		self.pan.begin(screen_y);
		self.interaction = Interaction::Panning { selected };
	}

	fn end_pan(&mut self, now: f64) {
		let Interaction::Panning { selected } = self.interaction else {
			return;
		};
		self.pan.end();
		self.interaction = Interaction::resting(selected);
		self.guard.pan_settle = true;
		self.queue.cancel_all(Deferred::SettlePan);
		self.queue
			.schedule(now, self.config.pan_settle_ms, Deferred::SettlePan);
	}

	/// Pans the view vertically by `delta`. Returns true if the offset moved.
	pub fn pan(&mut self, delta: f64) -> bool {
		self.pan.pan_by(delta)
	}

	pub fn delete_rule(&mut self, id: RuleId, now: f64) {
		match self.store.delete_rule(id) {
			Ok(_) => {
				if self.interaction.involves(id) {
					self.interaction = Interaction::Idle;
				}
				self.record(HistoryAction::DeleteRule, now);
			}
			Err(err) => self.report(err, now),
		}
	}

	pub fn delete_connection(&mut self, id: &str, now: f64) {
		match self.store.delete_connection(id) {
			Ok(_) => {
				if let Interaction::ContextMenu(menu) = &self.interaction {
					if menu.target == MenuTarget::Connection(id.to_owned()) {
						self.interaction = Interaction::resting(menu.selected);
					}
				}
				self.record(HistoryAction::DeleteConnection, now);
			}
			Err(err) => self.report(err, now),
		}
	}

	/// Renames rule `id`. Blank labels are discarded and an unchanged label records nothing.
	pub fn rename_rule(&mut self, id: RuleId, label: &str, now: f64) {
		let unchanged = self.store.rule(id).is_some_and(|r| r.label == label.trim());
		match self.store.rename_rule(id, label) {
			Ok(()) if unchanged => debug!("label of rule {id} unchanged"),
			Ok(()) => {
				info!("renamed rule {id}");
				self.record(HistoryAction::EditRuleLabel, now);
			}
			Err(err) => self.report(err, now),
		}
	}

	pub fn update_rule_details(&mut self, id: RuleId, details: RuleDetails, now: f64) {
		match self.store.update_rule(id, RulePatch::from(details)) {
			Ok(()) => {
				info!("updated details of rule {id}");
				self.record(HistoryAction::UpdateRuleDetails, now);
			}
			Err(err) => self.report(err, now),
		}
	}

	/// Steps back one history entry. Ignored while a label is being typed.
	pub fn undo(&mut self, now: f64) {
		if self.is_editing_label() {
			debug!("undo ignored during label edit");
			return;
		}
		let Some(entry) = self.history.undo() else {
			return;
		};
		let (rules, connections, selected) =
			(entry.rules.clone(), entry.connections.clone(), entry.selected);
		self.restore(rules, connections, selected, now);
	}

	pub fn redo(&mut self, now: f64) {
		if self.is_editing_label() {
			debug!("redo ignored during label edit");
			return;
		}
		let Some(entry) = self.history.redo() else {
			return;
		};
		let (rules, connections, selected) =
			(entry.rules.clone(), entry.connections.clone(), entry.selected);
		self.restore(rules, connections, selected, now);
	}

	fn restore(
		&mut self,
		rules: Vec<Rule>,
		connections: Vec<Connection>,
		selected: Option<RuleId>,
		now: f64,
	) {
		// An interrupted drag still owes its release countdown.
		if matches!(self.interaction, Interaction::Dragging(gesture) if gesture.moved) {
			self.schedule_drag_release(now);
		}
		self.store.restore(rules, connections);
		let selected = selected.filter(|id| self.store.contains(*id));
		self.interaction = Interaction::resting(selected);
		if self.pan.end() {
			debug!("pan gesture interrupted by history change");
		}
	}

	pub fn mark_saved(&mut self) {
		self.history.mark_saved();
	}

	// -- context menu --

	pub fn open_context_menu(&mut self, target: MenuTarget) {
		let (anchor, selected) = match &target {
			MenuTarget::Rule(id) => {
				let Some(rule) = self.store.rule(*id) else {
					debug!("no rule {id} for context menu");
					return;
				};
				let (dx, dy) = self.config.menu_offset;
				let anchor = rule.position.offset(self.config.rule_radius + dx, dy);
				(anchor, Some(*id))
			}
			MenuTarget::Connection(id) => {
				let Some(conn) = self.store.connection(id) else {
					debug!("no connection {id} for context menu");
					return;
				};
				let (Some(a), Some(b)) = (self.store.rule(conn.from), self.store.rule(conn.to)) else {
					return;
				};
				(a.position.midpoint(b.position), self.selected())
			}
		};
		self.interaction = Interaction::ContextMenu(ContextMenu {
			anchor,
			target,
			selected,
		});
	}

	pub fn close_context_menu(&mut self) {
		if let Interaction::ContextMenu(menu) = &self.interaction {
			self.interaction = Interaction::resting(menu.selected);
		}
	}

	pub fn choose_menu_action(&mut self, action: MenuAction, now: f64) {
		let Interaction::ContextMenu(menu) = &self.interaction else {
			return;
		};
		let menu = menu.clone();
		self.interaction = Interaction::resting(menu.selected);
		match (menu.target, action) {
			(MenuTarget::Rule(id), MenuAction::EditLabel) => self.begin_label_edit(id),
			(MenuTarget::Rule(id), MenuAction::EditDetails) => self.open_details(id),
			(MenuTarget::Rule(id), MenuAction::Delete) => self.delete_rule(id, now),
			(MenuTarget::Connection(id), MenuAction::Delete) => self.delete_connection(&id, now),
			(MenuTarget::Connection(_), _) => {}
		}
	}

	// -- label editing --

	pub fn begin_label_edit(&mut self, id: RuleId) {
		if let Some(rule) = self.store.rule(id) {
			self.interaction = Interaction::EditingLabel {
				rule: id,
				draft: rule.label.clone(),
			};
		}
	}

	pub fn set_label_draft(&mut self, text: &str) {
		if let Interaction::EditingLabel { draft, .. } = &mut self.interaction {
			*draft = text.to_owned();
		}
	}

	pub fn commit_label_edit(&mut self, now: f64) {
		if !matches!(self.interaction, Interaction::EditingLabel { .. }) {
			return;
		}
		if let Interaction::EditingLabel { rule, draft } = std::mem::take(&mut self.interaction) {
			self.rename_rule(rule, &draft, now);
		}
	}

	pub fn cancel_label_edit(&mut self) {
		if matches!(self.interaction, Interaction::EditingLabel { .. }) {
			self.interaction = Interaction::Idle;
		}
	}

	// -- details editing --

	pub fn open_details(&mut self, id: RuleId) {
		if let Some(rule) = self.store.rule(id) {
			self.interaction = Interaction::EditingDetails {
				rule: id,
				form: rule.details(),
				selected: self.interaction.selected(),
			};
		}
	}

	pub fn set_details_draft(&mut self, details: RuleDetails) {
		if let Interaction::EditingDetails { form, .. } = &mut self.interaction {
			*form = details;
		}
	}

	pub fn save_details(&mut self, now: f64) {
		if !matches!(self.interaction, Interaction::EditingDetails { .. }) {
			return;
		}
		if let Interaction::EditingDetails {
			rule,
			form,
			selected,
		} = std::mem::take(&mut self.interaction)
		{
			self.interaction = Interaction::resting(selected);
			self.update_rule_details(rule, form, now);
		}
	}

	pub fn close_details(&mut self) {
		if let Interaction::EditingDetails { selected, .. } = self.interaction {
			self.interaction = Interaction::resting(selected);
		}
	}
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len_sq = dx * dx + dy * dy;
	if len_sq == 0.0 {
		return p.distance(a);
	}
	let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
	p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}
