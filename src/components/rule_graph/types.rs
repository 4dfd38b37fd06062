use std::fmt;
use std::str::FromStr;

/// Identifier of a rule. Assigned from a monotonically increasing counter and never reused.
pub type RuleId = u32;

/// A point in canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn offset(self, dx: f64, dy: f64) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}

	pub fn distance(self, other: Point) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		(dx * dx + dy * dy).sqrt()
	}

	pub fn midpoint(self, other: Point) -> Self {
		Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleStatus {
	#[default]
	Active,
	Inactive,
	Draft,
}

impl RuleStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Active => "Active",
			Self::Inactive => "Inactive",
			Self::Draft => "Draft",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Priority {
	Low,
	#[default]
	Medium,
	High,
}

impl Priority {
	pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "Low",
			Self::Medium => "Medium",
			Self::High => "High",
		}
	}
}

impl fmt::Display for Priority {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Priority {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"Low" => Ok(Self::Low),
			"Medium" => Ok(Self::Medium),
			"High" => Ok(Self::High),
			other => Err(format!("unknown priority: {other}")),
		}
	}
}

/// A rule node on the canvas. `position` is the center of the rule's circle.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
	pub id: RuleId,
	pub position: Point,
	pub label: String,
	pub description: String,
	pub status: RuleStatus,
	pub eligibility: String,
	pub conditions: String,
	pub action: String,
	pub alter_action: String,
	pub priority: Priority,
	/// Creation time in milliseconds since the epoch.
	pub created_at: f64,
}

impl Rule {
	/// A rule with the default field values for `id`.
	pub fn new(id: RuleId, position: Point, created_at: f64) -> Self {
		Self {
			id,
			position,
			label: format!("Rule {id}"),
			description: format!("This is rule {id}"),
			status: RuleStatus::Active,
			eligibility: String::new(),
			conditions: String::new(),
			action: String::new(),
			alter_action: String::new(),
			priority: Priority::Medium,
			created_at,
		}
	}

	pub fn details(&self) -> RuleDetails {
		RuleDetails {
			label: self.label.clone(),
			description: self.description.clone(),
			eligibility: self.eligibility.clone(),
			conditions: self.conditions.clone(),
			action: self.action.clone(),
			alter_action: self.alter_action.clone(),
			priority: self.priority,
		}
	}

	/// Merges `patch` into the rule. A label that is blank after trimming is ignored.
	pub(crate) fn apply(&mut self, patch: RulePatch) {
		if let Some(label) = patch.label {
			let label = label.trim();
			if !label.is_empty() {
				self.label = label.to_owned();
			}
		}
		if let Some(position) = patch.position {
			self.position = position;
		}
		if let Some(status) = patch.status {
			self.status = status;
		}
		if let Some(priority) = patch.priority {
			self.priority = priority;
		}
		for (slot, value) in [
			(&mut self.description, patch.description),
			(&mut self.eligibility, patch.eligibility),
			(&mut self.conditions, patch.conditions),
			(&mut self.action, patch.action),
			(&mut self.alter_action, patch.alter_action),
		] {
			if let Some(value) = value {
				*slot = value;
			}
		}
	}
}

/// The editable fields of a rule, as shown in the details form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleDetails {
	pub label: String,
	pub description: String,
	pub eligibility: String,
	pub conditions: String,
	pub action: String,
	pub alter_action: String,
	pub priority: Priority,
}

/// A partial update of a rule. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RulePatch {
	pub position: Option<Point>,
	pub label: Option<String>,
	pub description: Option<String>,
	pub status: Option<RuleStatus>,
	pub eligibility: Option<String>,
	pub conditions: Option<String>,
	pub action: Option<String>,
	pub alter_action: Option<String>,
	pub priority: Option<Priority>,
}

impl RulePatch {
	pub fn label(label: impl Into<String>) -> Self {
		Self {
			label: Some(label.into()),
			..Self::default()
		}
	}

	pub fn position(position: Point) -> Self {
		Self {
			position: Some(position),
			..Self::default()
		}
	}
}

impl From<RuleDetails> for RulePatch {
	fn from(details: RuleDetails) -> Self {
		Self {
			position: None,
			label: Some(details.label),
			description: Some(details.description),
			status: None,
			eligibility: Some(details.eligibility),
			conditions: Some(details.conditions),
			action: Some(details.action),
			alter_action: Some(details.alter_action),
			priority: Some(details.priority),
		}
	}
}

/// A directed dependency between two rules. The id is derived from the endpoints as `"from-to"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
	pub id: String,
	pub from: RuleId,
	pub to: RuleId,
}

impl Connection {
	pub fn new(from: RuleId, to: RuleId) -> Self {
		Self {
			id: Self::id_for(from, to),
			from,
			to,
		}
	}

	pub fn id_for(from: RuleId, to: RuleId) -> String {
		format!("{from}-{to}")
	}

	pub fn touches(&self, rule: RuleId) -> bool {
		self.from == rule || self.to == rule
	}
}
