//! Deferred actions on the editor's single event loop, driven by virtual time.
//!
//! Nothing here runs on its own: the owner calls [`DeferredQueue::take_due`] with the
//! current time and applies the returned actions in order.

/// An action scheduled to run later on the event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
	/// Stage one of post-drag click suppression ends.
	ReleaseDrag,
	/// Stage two of post-drag click suppression ends.
	EndDragCooldown,
	/// Click suppression after a pan gesture ends.
	SettlePan,
	/// The current notice expires.
	ExpireNotice,
}

#[derive(Clone, Debug)]
struct Scheduled {
	due: f64,
	seq: u64,
	action: Deferred,
}

#[derive(Clone, Debug, Default)]
pub struct DeferredQueue {
	pending: Vec<Scheduled>,
	next_seq: u64,
}

impl DeferredQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn schedule(&mut self, now: f64, delay_ms: f64, action: Deferred) {
		self.pending.push(Scheduled {
			due: now + delay_ms.max(0.0),
			seq: self.next_seq,
			action,
		});
		self.next_seq += 1;
	}

	/// Cancels every pending instance of `action`.
	pub fn cancel_all(&mut self, action: Deferred) {
		self.pending.retain(|s| s.action != action);
	}

	#[cfg(test)]
	pub fn is_pending(&self, action: Deferred) -> bool {
		self.pending.iter().any(|s| s.action == action)
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Removes and returns the actions due by `now`, ordered by due time and then
	/// scheduling order. With `inclusive` false, actions due exactly at `now` stay queued.
	pub fn take_due(&mut self, now: f64, inclusive: bool) -> Vec<Deferred> {
		let is_due = |s: &Scheduled| if inclusive { s.due <= now } else { s.due < now };
		let (mut due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(is_due);
		self.pending = rest;
		due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
		due.into_iter().map(|s| s.action).collect()
	}
}
