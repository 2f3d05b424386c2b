use std::time::Duration;

use glam::Vec2;

use super::segmenter::{Line, Segmenter};
use super::smoother::Smoother;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GestureState {
	Began,
	Changed,
	Ended,
	Cancelled,
}

impl GestureState {
	pub fn is_terminal(self) -> bool {
		matches!(self, GestureState::Ended | GestureState::Cancelled)
	}
}

/// A point delivered by the input source. The timestamp is measured from any fixed origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputPoint {
	pub position: Vec2,
	pub timestamp: Option<Duration>,
}

impl InputPoint {
	pub fn new(x: f32, y: f32) -> Self {
		Self {
			position: Vec2::new(x, y),
			timestamp: None,
		}
	}

	pub fn at(self, timestamp: Duration) -> Self {
		Self {
			timestamp: Some(timestamp),
			..self
		}
	}
}

/// Per-stroke input state shared by every brush: smoothing plus segmenting, driven by the
/// gesture lifecycle.
#[derive(Debug, Default, Clone)]
pub struct StrokeInput {
	smoother: Smoother,
	segmenter: Segmenter,
}

impl StrokeInput {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_active(&self) -> bool {
		self.smoother.is_started()
	}

	/// Feeds one gesture event and returns the lines that are ready to stamp.
	pub fn update(
		&mut self,
		position: Vec2,
		state: GestureState,
		point_size: f32,
		point_step: f32,
	) -> Vec<Line> {
		match state {
			GestureState::Began => {
				self.segmenter.reset(Some(position));
				self.smoother.begin(position);
				// The anchor is pushed twice so the first arc starts exactly on it.
				let mut lines = vec![Line::new(position, position, point_size, point_step)];
				lines.extend(self.push(position, point_size, point_step, false));
				lines
			}
			GestureState::Changed => {
				if !self.smoother.is_started() || self.segmenter.last_rendered() == Some(position) {
					return Vec::new();
				}
				self.push(position, point_size, point_step, false)
			}
			GestureState::Ended | GestureState::Cancelled => {
				let lines = if self.smoother.point_count() >= 3 {
					self.push(position, point_size, point_step, true)
				} else {
					Vec::new()
				};
				self.smoother.finish();
				self.segmenter.reset(None);
				lines
			}
		}
	}

	/// Abandons the current stroke without producing output.
	pub fn reset(&mut self) {
		self.smoother.finish();
		self.segmenter.reset(None);
	}

	/// Runs a complete recorded stroke at once.
	pub fn replay(&mut self, points: &[Vec2], point_size: f32, point_step: f32) -> Vec<Line> {
		let Some((&first, rest)) = points.split_first() else {
			return Vec::new();
		};
		let mut lines = self.update(first, GestureState::Began, point_size, point_step);
		let Some((&last, middle)) = rest.split_last() else {
			lines.extend(self.update(first, GestureState::Ended, point_size, point_step));
			return lines;
		};
		for &point in middle {
			lines.extend(self.update(point, GestureState::Changed, point_size, point_step));
		}
		lines.extend(self.update(last, GestureState::Changed, point_size, point_step));
		lines.extend(self.update(last, GestureState::Ended, point_size, point_step));
		lines
	}

	fn push(&mut self, position: Vec2, point_size: f32, point_step: f32, is_end: bool) -> Vec<Line> {
		let points = self.smoother.push(position);
		self.segmenter.segment(&points, point_size, point_step, is_end)
	}
}
