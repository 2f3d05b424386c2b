use glam::Vec2;

/// An axis-aligned box in canvas units. Empty boxes have `min > max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	min: Vec2,
	max: Vec2,
}

impl Rect {
	pub fn new(min: Vec2, max: Vec2) -> Self {
		Self { min, max }
	}

	pub fn from_size(width: f32, height: f32) -> Self {
		Self::new(Vec2::ZERO, Vec2::new(width, height))
	}

	pub fn empty() -> Self {
		Self::new(Vec2::MAX, Vec2::MIN)
	}

	pub fn is_empty(&self) -> bool {
		self.min.x > self.max.x || self.min.y > self.max.y
	}

	pub fn min(&self) -> Vec2 {
		self.min
	}

	pub fn max(&self) -> Vec2 {
		self.max
	}

	pub fn width(&self) -> f32 {
		(self.max.x - self.min.x).max(0.0)
	}

	pub fn height(&self) -> f32 {
		(self.max.y - self.min.y).max(0.0)
	}

	pub fn expanded_to_contain(self, point: Vec2) -> Self {
		Self::new(self.min.min(point), self.max.max(point))
	}

	pub fn containing(points: impl IntoIterator<Item = Vec2>) -> Self {
		points
			.into_iter()
			.fold(Self::empty(), |b, p| b.expanded_to_contain(p))
	}

	pub fn contains(&self, point: Vec2) -> bool {
		point.x < self.max.x
			&& point.y < self.max.y
			&& !(point.x < self.min.x)
			&& !(point.y < self.min.y)
	}

	/// Grows the box by `amount` on every side. Empty boxes stay empty.
	pub fn outset(self, amount: f32) -> Self {
		if self.is_empty() {
			return self;
		}
		Self::new(self.min - Vec2::splat(amount), self.max + Vec2::splat(amount))
	}

	pub fn union(self, other: Self) -> Self {
		Self::new(self.min.min(other.min), self.max.max(other.max))
	}

	pub fn intersection(self, other: Self) -> Self {
		Self::new(self.min.max(other.min), self.max.min(other.max))
	}

	/// Rounds outward to whole pixels and clamps into a `width` x `height` canvas.
	pub fn to_pixel_rect(self, width: u32, height: u32) -> Option<PixelRect> {
		let clamped = self.intersection(Rect::from_size(width as f32, height as f32));
		if clamped.is_empty() {
			return None;
		}
		let x0 = clamped.min.x.floor() as u32;
		let y0 = clamped.min.y.floor() as u32;
		let x1 = (clamped.max.x.ceil() as u32).min(width);
		let y1 = (clamped.max.y.ceil() as u32).min(height);
		(x1 > x0 && y1 > y0).then(|| PixelRect::new(x0, y0, x1 - x0, y1 - y0))
	}
}

/// A rectangle of whole pixels inside a canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{x},{y} {width}x{height}")]
pub struct PixelRect {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

impl PixelRect {
	pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
		Self {
			x,
			y,
			width,
			height,
		}
	}

	pub fn full(width: u32, height: u32) -> Self {
		Self::new(0, 0, width, height)
	}

	pub fn right(&self) -> u32 {
		self.x + self.width
	}

	pub fn bottom(&self) -> u32 {
		self.y + self.height
	}

	pub fn area(&self) -> u64 {
		self.width as u64 * self.height as u64
	}

	pub fn union(self, other: Self) -> Self {
		let x = self.x.min(other.x);
		let y = self.y.min(other.y);
		let right = self.right().max(other.right());
		let bottom = self.bottom().max(other.bottom());
		Self::new(x, y, right - x, bottom - y)
	}

	pub fn contains_rect(&self, other: &Self) -> bool {
		other.x >= self.x
			&& other.y >= self.y
			&& other.right() <= self.right()
			&& other.bottom() <= self.bottom()
	}

	pub fn to_rect(self) -> Rect {
		Rect::new(
			Vec2::new(self.x as f32, self.y as f32),
			Vec2::new(self.right() as f32, self.bottom() as f32),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn containing_points() {
		let rect = Rect::containing([Vec2::new(10.0, 10.0), Vec2::new(10.0, 100.0)]);
		assert_eq!(rect.min(), Vec2::new(10.0, 10.0));
		assert_eq!(rect.max(), Vec2::new(10.0, 100.0));
		assert!(!rect.is_empty());
		assert!(Rect::empty().is_empty());
	}

	#[test]
	fn pixel_rect_is_clamped_and_rounded_outward() {
		let rect = Rect::new(Vec2::new(-23.3, 4.5), Vec2::new(43.3, 300.0));
		assert_eq!(rect.to_pixel_rect(256, 256), Some(PixelRect::new(0, 4, 44, 252)));
		let outside = Rect::new(Vec2::new(300.0, 300.0), Vec2::new(400.0, 400.0));
		assert_eq!(outside.to_pixel_rect(256, 256), None);
	}

	#[test]
	fn pixel_rect_union() {
		let a = PixelRect::new(0, 0, 10, 10);
		let b = PixelRect::new(5, 20, 10, 10);
		assert_eq!(a.union(b), PixelRect::new(0, 0, 15, 30));
		assert!(a.union(b).contains_rect(&a));
	}
}
