use glam::Vec2;

/// Turns raw input points into a dense polyline by running a quadratic Bezier between the
/// midpoints of consecutive raw points.
#[derive(Debug, Default, Clone)]
pub struct Smoother {
	points: Vec<Vec2>,
	step: usize,
}

fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
	(a + b) * 0.5
}

fn quadratic(begin: Vec2, control: Vec2, end: Vec2, t: f32) -> Vec2 {
	let u = 1.0 - t;
	begin * (u * u) + control * (2.0 * t * u) + end * (t * t)
}

impl Smoother {
	pub fn new() -> Self {
		Self::default()
	}

	/// Restarts with `point` as the only anchor.
	pub fn begin(&mut self, point: Vec2) {
		self.step = 0;
		self.points.clear();
		self.points.push(point);
	}

	/// Appends a raw point. Nothing is produced until three raw points exist.
	pub fn push(&mut self, point: Vec2) -> Vec<Vec2> {
		self.points.push(point);
		if self.points.len() < 3 {
			return Vec::new();
		}
		self.step += 1;
		self.generate()
	}

	pub fn finish(&mut self) {
		self.step = 0;
		self.points.clear();
	}

	/// Number of raw points pushed since `begin`, including the anchor.
	pub fn point_count(&self) -> usize {
		self.points.len()
	}

	pub fn is_started(&self) -> bool {
		!self.points.is_empty()
	}

	fn generate(&self) -> Vec<Vec2> {
		let step = self.step;
		let points = &self.points;
		let end = midpoint(points[step], points[step + 1]);
		let (begin, control) = if step == 1 {
			let begin = points[0];
			(begin, midpoint(midpoint(begin, points[1]), points[1]))
		} else {
			(midpoint(points[step - 1], points[step]), points[step])
		};

		let segments = ((begin.distance(end) / 3.0) as usize).max(2);
		let mut output: Vec<Vec2> = (0..segments)
			.map(|i| quadratic(begin, control, end, i as f32 / segments as f32))
			.collect();
		output.push(end);
		output
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use itertools::Itertools;

	#[test]
	fn needs_three_points() {
		let mut smoother = Smoother::new();
		smoother.begin(Vec2::ZERO);
		assert!(smoother.push(Vec2::new(1.0, 0.0)).is_empty());
		assert!(!smoother.push(Vec2::new(2.0, 0.0)).is_empty());
	}

	#[test]
	fn first_arc_starts_at_anchor() {
		let mut smoother = Smoother::new();
		smoother.begin(Vec2::new(0.0, 0.0));
		smoother.push(Vec2::new(10.0, 0.0));
		let arc = smoother.push(Vec2::new(20.0, 0.0));
		assert_eq!(arc[0], Vec2::ZERO);
		assert_relative_eq!(arc.last().unwrap().x, 15.0);
		// 15 units of travel -> 5 segments plus the end point.
		assert_eq!(arc.len(), 6);
	}

	#[test]
	fn straight_strokes_are_sampled_every_three_units() {
		let mut smoother = Smoother::new();
		smoother.begin(Vec2::ZERO);
		let emitted: Vec<_> = (1..10)
			.flat_map(|i| smoother.push(Vec2::new(30.0 * i as f32, 0.0)))
			.collect();
		for (a, b) in emitted.iter().tuple_windows() {
			assert!(a.distance(*b) <= 3.0 + 1e-3, "{a} -> {b}");
		}
	}

	#[test]
	fn segments_stay_short_and_output_grows() {
		let mut smoother = Smoother::new();
		smoother.begin(Vec2::ZERO);
		let mut emitted = Vec::new();
		let mut counts = Vec::new();
		for i in 1..40 {
			let t = i as f32;
			emitted.extend(smoother.push(Vec2::new(t * 7.0, (t * 0.4).sin() * 30.0)));
			counts.push(emitted.len());
		}
		assert!(counts.iter().tuple_windows().all(|(a, b)| a <= b));
		// The segment count truncates, so short arcs can stretch to 1.5x the nominal spacing.
		for (a, b) in emitted.iter().tuple_windows() {
			assert!(a.distance(*b) <= 4.8, "{a} -> {b}");
		}
	}

	#[test]
	fn finish_resets() {
		let mut smoother = Smoother::new();
		smoother.begin(Vec2::ZERO);
		smoother.push(Vec2::ONE);
		smoother.finish();
		assert!(!smoother.is_started());
		assert_eq!(smoother.point_count(), 0);
	}
}
