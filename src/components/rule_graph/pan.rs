//! Vertical pan with a one-way ratchet: panning up past the current offset is ignored
//! until the user has panned down at least once since the last reset.

use log::debug;

#[derive(Clone, Copy, Debug, PartialEq)]
struct PanGesture {
	start_pointer_y: f64,
	start_offset: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanController {
	offset: f64,
	allow_up: bool,
	gesture: Option<PanGesture>,
	min: f64,
	max: f64,
}

impl Default for PanController {
	fn default() -> Self {
		Self::new(f64::NEG_INFINITY, f64::INFINITY)
	}
}

impl PanController {
	pub fn new(min: f64, max: f64) -> Self {
		Self {
			offset: 0.0,
			allow_up: false,
			gesture: None,
			min,
			max,
		}
	}

	pub fn offset(&self) -> f64 {
		self.offset
	}

	/// Whether upward pans are accepted yet.
	#[cfg(test)]
	pub fn can_pan_up(&self) -> bool {
		self.allow_up
	}

	#[cfg(test)]
	pub fn is_active(&self) -> bool {
		self.gesture.is_some()
	}

	/// Starts a pan gesture with the pointer at screen height `pointer_y`.
	pub fn begin(&mut self, pointer_y: f64) {
		self.gesture = Some(PanGesture {
			start_pointer_y: pointer_y,
			start_offset: self.offset,
		});
	}

	/// Follows the pointer during a gesture. Returns true if the offset changed.
	pub fn drag_to(&mut self, pointer_y: f64) -> bool {
		let Some(g) = self.gesture else {
			return false;
		};
		self.request(g.start_offset + (pointer_y - g.start_pointer_y))
	}

	/// Ends the gesture. Returns true if one was active.
	pub fn end(&mut self) -> bool {
		self.gesture.take().is_some()
	}

	/// Pans by `delta` outside of a gesture. Returns true if the offset changed.
	pub fn pan_by(&mut self, delta: f64) -> bool {
		self.request(self.offset + delta)
	}

	/// Back to the initial offset with upward panning locked again.
	#[cfg(test)]
	pub fn reset(&mut self) {
		*self = Self::new(self.min, self.max);
	}

	fn request(&mut self, target: f64) -> bool {
		let target = target.clamp(self.min, self.max);
		if target < self.offset && !self.allow_up {
			debug!("pan up to {target} blocked until a downward pan");
			return false;
		}
		if target > self.offset {
			self.allow_up = true;
		}
		let changed = target != self.offset;
		self.offset = target;
		changed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pan_up_blocked_before_any_pan_down() {
		let mut pan = PanController::default();
		assert!(!pan.pan_by(-40.0));
		assert_eq!(pan.offset(), 0.0);
		assert!(!pan.can_pan_up());
	}

	#[test]
	fn any_pan_down_unlocks_pan_up() {
		let mut pan = PanController::default();
		assert!(pan.pan_by(1.0));
		assert!(pan.can_pan_up());
		assert!(pan.pan_by(-100.0));
		assert_eq!(pan.offset(), -99.0);
	}

	#[test]
	fn unlock_persists_until_reset() {
		let mut pan = PanController::default();
		pan.pan_by(10.0);
		pan.pan_by(-5.0);
		pan.pan_by(-5.0);
		assert!(pan.pan_by(-5.0));
		pan.reset();
		assert_eq!(pan.offset(), 0.0);
		assert!(!pan.pan_by(-1.0));
	}

	#[test]
	fn gesture_follows_pointer_from_start_offset() {
		let mut pan = PanController::default();
		pan.begin(100.0);
		assert!(pan.is_active());
		assert!(!pan.drag_to(80.0));
		assert!(pan.drag_to(130.0));
		assert_eq!(pan.offset(), 30.0);
		assert!(pan.drag_to(90.0));
		assert_eq!(pan.offset(), -10.0);
		assert!(pan.end());
		assert!(!pan.end());
		assert!(!pan.drag_to(0.0));
	}

	#[test]
	fn offset_is_clamped_to_bounds() {
		let mut pan = PanController::new(-50.0, 50.0);
		pan.pan_by(500.0);
		assert_eq!(pan.offset(), 50.0);
		pan.pan_by(-500.0);
		assert_eq!(pan.offset(), -50.0);
	}
}
