use glam::Vec2;

/// One piece of a stroke, stamped uniformly by a brush.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
	pub start: Vec2,
	pub end: Vec2,
	pub point_size: f32,
	pub point_step: f32,
}

impl Line {
	pub fn new(start: Vec2, end: Vec2, point_size: f32, point_step: f32) -> Self {
		Self {
			start,
			end,
			point_size,
			point_step,
		}
	}

	pub fn length(&self) -> f32 {
		self.start.distance(self.end)
	}

	/// Direction of travel in radians.
	pub fn angle(&self) -> f32 {
		let delta = self.end - self.start;
		delta.y.atan2(delta.x)
	}
}

/// Cuts smoothed positions into [`Line`]s at least `point_step` long, remembering where the
/// previous call stopped so consecutive batches join without gaps.
#[derive(Debug, Default, Clone)]
pub struct Segmenter {
	last_rendered: Option<Vec2>,
}

impl Segmenter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last_rendered(&self) -> Option<Vec2> {
		self.last_rendered
	}

	pub fn reset(&mut self, last_rendered: Option<Vec2>) {
		self.last_rendered = last_rendered;
	}

	pub fn segment(
		&mut self,
		points: &[Vec2],
		point_size: f32,
		point_step: f32,
		is_end: bool,
	) -> Vec<Line> {
		if points.len() < 2 {
			return Vec::new();
		}
		let mut previous = self.last_rendered.unwrap_or(points[0]);
		let last = points.len() - 1;
		let mut lines = Vec::new();
		for (i, &point) in points.iter().enumerate().skip(1) {
			if (is_end && i == last) || point_step <= 1.0 || previous.distance(point) >= point_step {
				lines.push(Line::new(previous, point, point_size, point_step));
				previous = point;
				self.last_rendered = Some(point);
			}
		}
		lines
	}
}
