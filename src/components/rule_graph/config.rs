use super::history::DEFAULT_HISTORY_LIMIT;

/// Tunable constants for the rule editor.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
	/// Maximum number of history snapshots kept.
	pub history_limit: usize,
	/// How long a user-facing notice stays visible.
	pub notice_duration_ms: f64,
	/// First stage of click suppression after a drag that moved.
	pub drag_release_ms: f64,
	/// Second stage, counted from the end of the first.
	pub drag_cooldown_ms: f64,
	/// Click suppression after a pan gesture ends.
	pub pan_settle_ms: f64,
	pub rule_radius: f64,
	/// Width of the invisible stroke used to hit-test connections.
	pub connection_hit_width: f64,
	/// Rule context menu anchor, relative to the rule's right edge at its center height.
	pub menu_offset: (f64, f64),
	pub pan_min_y: f64,
	pub pan_max_y: f64,
	/// Record the first move of every drag as an undoable step.
	pub track_drag_moves: bool,
}

impl Default for EditorConfig {
	fn default() -> Self {
		Self {
			history_limit: DEFAULT_HISTORY_LIMIT,
			notice_duration_ms: 3000.0,
			drag_release_ms: 50.0,
			drag_cooldown_ms: 100.0,
			pan_settle_ms: 100.0,
			rule_radius: 35.0,
			connection_hit_width: 12.0,
			menu_offset: (25.0, -35.0),
			pan_min_y: -2500.0,
			pan_max_y: 2500.0,
			track_drag_moves: false,
		}
	}
}
