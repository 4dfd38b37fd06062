use thiserror::Error;

use super::types::RuleId;

/// A rejected editor transition. None of these are fatal: the editor logs them and,
/// when [`EditorError::user_message`] says so, shows a transient [`Notice`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditorError {
	#[error("connection {from}-{to} already exists")]
	DuplicateConnection { from: RuleId, to: RuleId },

	#[error("connection {from}-{to} would create a cycle")]
	CycleRejected { from: RuleId, to: RuleId },

	#[error("rule {0} cannot depend on itself")]
	SelfConnection(RuleId),

	#[error("rule {0} not found")]
	RuleNotFound(RuleId),

	#[error("connection {0} not found")]
	ConnectionNotFound(String),

	#[error("label for rule {0} is blank")]
	EmptyLabel(RuleId),
}

impl EditorError {
	/// The message shown to the user, if this rejection is surfaced at all.
	pub fn user_message(&self) -> Option<&'static str> {
		match self {
			Self::CycleRejected { .. } => Some("Cannot create chain: this would create a cycle"),
			_ => None,
		}
	}
}

/// A transient user-facing message that disappears at `expires_at`.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
	pub message: String,
	pub expires_at: f64,
}

impl Notice {
	pub fn is_expired(&self, now: f64) -> bool {
		now >= self.expires_at
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_cycles_reach_the_user() {
		assert!(EditorError::CycleRejected { from: 1, to: 2 }.user_message().is_some());
		assert!(EditorError::DuplicateConnection { from: 1, to: 2 }.user_message().is_none());
		assert!(EditorError::EmptyLabel(1).user_message().is_none());
		assert!(EditorError::RuleNotFound(1).user_message().is_none());
	}

	#[test]
	fn notice_expires_at_deadline() {
		let notice = Notice {
			message: "x".into(),
			expires_at: 3000.0,
		};
		assert!(!notice.is_expired(2999.0));
		assert!(notice.is_expired(3000.0));
	}
}
