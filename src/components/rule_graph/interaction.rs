//! Interaction modes of the rule canvas and the raw input events that drive them.

use super::types::{Point, RuleDetails, RuleId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerButton {
	#[default]
	Primary,
	Middle,
	Secondary,
}

/// A pointer event. `position` is in canvas coordinates, `screen_y` in viewport pixels
/// (pan gestures follow the screen, not the canvas they move).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
	pub position: Point,
	pub screen_y: f64,
	pub button: PointerButton,
	pub ctrl: bool,
}

impl Pointer {
	pub fn primary(position: Point) -> Self {
		Self {
			position,
			screen_y: position.y,
			button: PointerButton::Primary,
			ctrl: false,
		}
	}

	pub fn with_button(mut self, button: PointerButton) -> Self {
		self.button = button;
		self
	}

	pub fn with_ctrl(mut self) -> Self {
		self.ctrl = true;
		self
	}

	pub fn with_screen_y(mut self, screen_y: f64) -> Self {
		self.screen_y = screen_y;
		self
	}

	/// Middle button, or Ctrl with the primary button.
	pub fn is_pan_trigger(&self) -> bool {
		self.button == PointerButton::Middle || (self.button == PointerButton::Primary && self.ctrl)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
	Escape,
	Enter,
	Char(char),
	Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
	pub key: Key,
	/// Ctrl, or Cmd on macOS.
	pub ctrl: bool,
	pub shift: bool,
}

impl KeyInput {
	#[cfg(test)]
	pub fn plain(key: Key) -> Self {
		Self {
			key,
			ctrl: false,
			shift: false,
		}
	}

	#[cfg(test)]
	pub fn ctrl(c: char) -> Self {
		Self {
			key: Key::Char(c),
			ctrl: true,
			shift: false,
		}
	}

	/// Builds an input from a DOM `KeyboardEvent.key` value.
	pub fn from_key_name(name: &str, ctrl: bool, shift: bool) -> Self {
		let mut chars = name.chars();
		let key = match (name, chars.next(), chars.next()) {
			("Escape", ..) => Key::Escape,
			("Enter", ..) => Key::Enter,
			(_, Some(c), None) => Key::Char(c.to_ascii_lowercase()),
			_ => Key::Other,
		};
		Self { key, ctrl, shift }
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuTarget {
	Rule(RuleId),
	Connection(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
	EditLabel,
	EditDetails,
	Delete,
}

impl MenuAction {
	pub fn title(self) -> &'static str {
		match self {
			Self::EditLabel => "Edit Label",
			Self::EditDetails => "Edit Details",
			Self::Delete => "Delete",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
	pub anchor: Point,
	pub target: MenuTarget,
	/// Selection to return to when the menu closes.
	pub selected: Option<RuleId>,
}

impl ContextMenu {
	pub fn actions(&self) -> &'static [MenuAction] {
		match self.target {
			MenuTarget::Rule(_) => &[MenuAction::EditLabel, MenuAction::EditDetails, MenuAction::Delete],
			MenuTarget::Connection(_) => &[MenuAction::Delete],
		}
	}
}

/// A rule being dragged. The grab offset keeps the grab point fixed relative to the rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragGesture {
	pub rule: RuleId,
	pub grab_offset: Point,
	pub moved: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Interaction {
	#[default]
	Idle,
	/// A rule is selected as the source of the next connection.
	Connecting { source: RuleId },
	Dragging(DragGesture),
	EditingLabel { rule: RuleId, draft: String },
	EditingDetails {
		rule: RuleId,
		form: RuleDetails,
		selected: Option<RuleId>,
	},
	ContextMenu(ContextMenu),
	Panning { selected: Option<RuleId> },
}

impl Interaction {
	/// Idle, or connecting from `selected`.
	pub fn resting(selected: Option<RuleId>) -> Self {
		match selected {
			Some(source) => Self::Connecting { source },
			None => Self::Idle,
		}
	}

	pub fn selected(&self) -> Option<RuleId> {
		match self {
			Self::Connecting { source } => Some(*source),
			Self::ContextMenu(menu) => menu.selected,
			Self::EditingDetails { selected, .. } | Self::Panning { selected } => *selected,
			Self::Idle | Self::Dragging(_) | Self::EditingLabel { .. } => None,
		}
	}

	pub fn is_editing(&self) -> bool {
		matches!(self, Self::EditingLabel { .. } | Self::EditingDetails { .. })
	}

	/// Whether this mode refers to `rule` in any way.
	pub fn involves(&self, rule: RuleId) -> bool {
		match self {
			Self::Idle => false,
			Self::Connecting { source } => *source == rule,
			Self::Dragging(g) => g.rule == rule,
			Self::EditingLabel { rule: r, .. } => *r == rule,
			Self::EditingDetails { rule: r, selected, .. } => *r == rule || *selected == Some(rule),
			Self::ContextMenu(menu) => {
				menu.target == MenuTarget::Rule(rule) || menu.selected == Some(rule)
			}
			Self::Panning { selected } => *selected == Some(rule),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_is_idle() {
		assert_eq!(Interaction::default(), Interaction::Idle);
		assert_eq!(Interaction::default().selected(), None);
	}

	#[test]
	fn resting_restores_selection() {
		assert_eq!(Interaction::resting(Some(3)), Interaction::Connecting { source: 3 });
		assert_eq!(Interaction::resting(None), Interaction::Idle);
	}

	#[test]
	fn selection_is_exclusive_with_drag_and_label_edit() {
		let drag = Interaction::Dragging(DragGesture {
			rule: 1,
			grab_offset: Point::default(),
			moved: false,
		});
		assert_eq!(drag.selected(), None);
		let edit = Interaction::EditingLabel {
			rule: 1,
			draft: String::new(),
		};
		assert_eq!(edit.selected(), None);
	}

	#[test]
	fn menus_offer_target_specific_actions() {
		let rule_menu = ContextMenu {
			anchor: Point::default(),
			target: MenuTarget::Rule(1),
			selected: Some(1),
		};
		assert_eq!(rule_menu.actions().len(), 3);
		let conn_menu = ContextMenu {
			target: MenuTarget::Connection("1-2".into()),
			..rule_menu
		};
		assert_eq!(conn_menu.actions(), [MenuAction::Delete]);
	}

	#[test]
	fn key_names_map_to_keys() {
		assert_eq!(KeyInput::from_key_name("Escape", false, false).key, Key::Escape);
		assert_eq!(KeyInput::from_key_name("Z", true, true).key, Key::Char('z'));
		assert_eq!(KeyInput::from_key_name("ArrowUp", false, false).key, Key::Other);
	}

	#[test]
	fn pan_triggers() {
		let p = Pointer::primary(Point::default());
		assert!(!p.is_pan_trigger());
		assert!(p.with_ctrl().is_pan_trigger());
		assert!(p.with_button(PointerButton::Middle).is_pan_trigger());
		assert!(!p.with_button(PointerButton::Secondary).with_ctrl().is_pan_trigger());
	}
}
