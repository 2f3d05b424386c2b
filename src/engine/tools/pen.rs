use std::sync::Arc;

use glam::Vec2;

use super::{
	line_width, smoothed_path, Arrowhead, ArrowheadRequest, DrawingElement, ToolContext,
	ToolError,
};
use crate::engine::raster::RasterImage;
use crate::engine::stroke::GestureState;
use crate::engine::tool_state::{DrawingColor, ToolKey};
use crate::geom::{PixelRect, Rect};

/// Extra room around the stroke for anti-aliasing.
const BOUNDS_MARGIN: f32 = 30.0;

/// Angle between the shaft and each barb.
pub const ARROWHEAD_ANGLE: f32 = 0.610_865_2;

pub fn arrowhead_length(width: f32) -> f32 {
	(width * 4.0).max(16.0)
}

/// Barbs at the last point, aimed along the direction from the last point at least one head
/// length back (or the first point of shorter strokes).
pub fn arrowhead(request: &ArrowheadRequest) -> Option<Arrowhead> {
	let tip = *request.points.last()?;
	let length = arrowhead_length(request.width);
	let from = request
		.points
		.iter()
		.rev()
		.find(|point| point.distance(tip) >= length)
		.or(request.points.first())?;
	let back = (*from - tip).try_normalize()?;
	Some(Arrowhead {
		tip,
		left: tip + Vec2::from_angle(ARROWHEAD_ANGLE).rotate(back) * length,
		right: tip + Vec2::from_angle(-ARROWHEAD_ANGLE).rotate(back) * length,
	})
}

#[derive(Clone, Debug)]
pub enum PenStyle {
	Plain(DrawingColor),
	Arrow(DrawingColor),
	/// A translucent glow under a core blended toward white.
	Neon(DrawingColor),
	/// Punches the stroke out of the canvas.
	Eraser,
	/// Reveals the precomputed blurred canvas under the stroke.
	Blur(Option<Arc<RasterImage>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowState {
	Drawing,
	AwaitingArrowhead,
	Finalized,
}

/// Vector strokes rasterized on the CPU when the gesture ends.
#[derive(Debug)]
pub struct PenTool {
	style: PenStyle,
	canvas_size: (u32, u32),
	width: f32,
	points: Vec<Vec2>,
	arrow: ArrowState,
	arrowhead: Option<Arrowhead>,
}

impl PenTool {
	pub fn new(style: PenStyle, canvas_size: (u32, u32), fraction: f32) -> Self {
		Self {
			style,
			canvas_size,
			width: line_width(canvas_size, fraction),
			points: Vec::new(),
			arrow: ArrowState::Drawing,
			arrowhead: None,
		}
	}

	pub fn width(&self) -> f32 {
		self.width
	}

	pub fn points(&self) -> &[Vec2] {
		&self.points
	}

	pub fn arrow_state(&self) -> ArrowState {
		self.arrow
	}

	fn margin(&self) -> f32 {
		match self.style {
			PenStyle::Neon(_) => self.width * 1.5 + BOUNDS_MARGIN,
			_ => self.width + BOUNDS_MARGIN,
		}
	}

	fn path(&self) -> Option<tiny_skia::Path> {
		let mut builder = tiny_skia::PathBuilder::new();
		builder.push_path(&smoothed_path(&self.points)?);
		if let Some(head) = &self.arrowhead {
			builder.move_to(head.left.x, head.left.y);
			builder.line_to(head.tip.x, head.tip.y);
			builder.line_to(head.right.x, head.right.y);
		}
		builder.finish()
	}

	fn stroke(&self, width: f32) -> tiny_skia::Stroke {
		tiny_skia::Stroke {
			width,
			line_cap: tiny_skia::LineCap::Round,
			line_join: tiny_skia::LineJoin::Round,
			..Default::default()
		}
	}

	/// A clip-sized layer with `passes` of the path stroked into it.
	fn stroked_layer(
		&self,
		clip: PixelRect,
		path: &tiny_skia::Path,
		passes: &[(f32, DrawingColor)],
	) -> RasterImage {
		let mut layer = RasterImage::new(clip.width, clip.height);
		if let Some(mut pixmap) = layer.pixmap_mut() {
			let transform = tiny_skia::Transform::from_translate(-(clip.x as f32), -(clip.y as f32));
			for &(width, color) in passes {
				let mut paint = tiny_skia::Paint::default();
				paint.set_color(color.to_tiny_skia());
				paint.anti_alias = true;
				pixmap.stroke_path(path, &paint, &self.stroke(width), transform, None);
			}
		}
		layer
	}

	/// An opaque white layer with the stroke cut out of it.
	fn erase_mask(&self, clip: PixelRect, path: &tiny_skia::Path) -> RasterImage {
		let mut mask = RasterImage::filled(clip.width, clip.height, [255, 255, 255, 255]);
		if let Some(mut pixmap) = mask.pixmap_mut() {
			let transform = tiny_skia::Transform::from_translate(-(clip.x as f32), -(clip.y as f32));
			let mut paint = tiny_skia::Paint::default();
			paint.set_color(tiny_skia::Color::WHITE);
			paint.anti_alias = true;
			paint.blend_mode = tiny_skia::BlendMode::Xor;
			pixmap.stroke_path(path, &paint, &self.stroke(self.width), transform, None);
		}
		mask
	}
}

impl DrawingElement for PenTool {
	fn key(&self) -> ToolKey {
		match self.style {
			PenStyle::Plain(_) => ToolKey::Pen,
			PenStyle::Arrow(_) => ToolKey::Arrow,
			PenStyle::Neon(_) => ToolKey::Neon,
			PenStyle::Eraser => ToolKey::Eraser,
			PenStyle::Blur(_) => ToolKey::Blur,
		}
	}

	fn update_path(&mut self, point: Vec2, state: GestureState, _context: &mut ToolContext<'_>) {
		if self.arrow != ArrowState::Drawing {
			return;
		}
		if state == GestureState::Began {
			self.points.clear();
		}
		if self.points.last() != Some(&point) {
			self.points.push(point);
		}
	}

	fn is_valid(&self) -> bool {
		self.points.len() >= 2
	}

	fn bounds(&self) -> Rect {
		let head = self
			.arrowhead
			.iter()
			.flat_map(|head| [head.left, head.right]);
		Rect::containing(self.points.iter().copied().chain(head)).outset(self.margin())
	}

	fn draw(
		&mut self,
		target: &mut RasterImage,
		clip: PixelRect,
		_context: &mut ToolContext<'_>,
	) -> Result<(), ToolError> {
		let Some(path) = self.path() else {
			return Ok(());
		};
		match &self.style {
			PenStyle::Plain(color) | PenStyle::Arrow(color) => {
				let layer = self.stroked_layer(clip, &path, &[(self.width, *color)]);
				target.composite_patch(&layer, clip.x, clip.y);
			}
			PenStyle::Neon(color) => {
				let glow = color.with_alpha(color.alpha * 0.35);
				let core = color.mix(DrawingColor::WHITE, 0.7).with_alpha(color.alpha);
				let layer = self.stroked_layer(
					clip,
					&path,
					&[
						(self.width * 3.0, glow),
						(self.width * 2.0, glow),
						(self.width * 0.6, core),
					],
				);
				target.composite_patch(&layer, clip.x, clip.y);
			}
			PenStyle::Eraser => {
				let mask = self.erase_mask(clip, &path);
				target.blt(&mask, clip.x, clip.y);
			}
			PenStyle::Blur(blurred) => {
				let Some(blurred) = blurred else {
					tracing::warn!("blur stroke without a blurred image");
					return Ok(());
				};
				let (width, height) = self.canvas_size;
				let mut layer = blurred.scaled(width, height).crop(clip);
				let mask = self.stroked_layer(clip, &path, &[(self.width, DrawingColor::WHITE)]);
				layer.blt(&mask, 0, 0);
				target.composite_patch(&layer, clip.x, clip.y);
			}
		}
		Ok(())
	}

	fn has_arrow(&self) -> bool {
		matches!(self.style, PenStyle::Arrow(_))
	}

	fn request_arrowhead(&mut self) -> Option<ArrowheadRequest> {
		if !self.has_arrow() || self.arrow != ArrowState::Drawing {
			return None;
		}
		self.arrow = ArrowState::AwaitingArrowhead;
		Some(ArrowheadRequest {
			points: self.points.clone(),
			width: self.width,
		})
	}

	fn apply_arrowhead(&mut self, arrowhead: Option<Arrowhead>) {
		self.arrowhead = arrowhead;
		self.arrow = ArrowState::Finalized;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	const SIZE: (u32, u32) = (256, 256);

	fn vertical_stroke(style: PenStyle) -> PenTool {
		let mut pen = PenTool::new(style, SIZE, 0.25);
		let points: Vec<_> = (0..10).map(|i| Vec2::new(10.0, 10.0 + 10.0 * i as f32)).collect();
		pen.replay(&points, &mut ToolContext::cpu(1.0));
		pen
	}

	fn draw(pen: &mut PenTool, target: &mut RasterImage) -> anyhow::Result<PixelRect> {
		let clip = pen.pixel_bounds(SIZE.0, SIZE.1).expect("bounds inside canvas");
		pen.draw(target, clip, &mut ToolContext::cpu(1.0))?;
		Ok(clip)
	}

	#[test]
	fn pen_strokes_inside_its_bounds() -> anyhow::Result<()> {
		let mut pen = vertical_stroke(PenStyle::Plain(DrawingColor::BLACK));
		assert!(pen.is_valid());
		let mut image = RasterImage::new(SIZE.0, SIZE.1);
		let clip = draw(&mut pen, &mut image)?;
		assert_eq!(clip.x, 0);
		assert_eq!(image.pixel(10, 50), [0, 0, 0, 255]);
		assert_eq!(image.pixel(200, 50)[3], 0);
		let margin = pen.width() + BOUNDS_MARGIN;
		assert_relative_eq!(pen.bounds().max().y, 100.0 + margin);
		Ok(())
	}

	#[test]
	fn single_point_is_not_valid() {
		let mut pen = PenTool::new(PenStyle::Plain(DrawingColor::BLACK), SIZE, 0.25);
		pen.update_path(Vec2::ONE, GestureState::Began, &mut ToolContext::cpu(1.0));
		pen.update_path(Vec2::ONE, GestureState::Ended, &mut ToolContext::cpu(1.0));
		assert!(!pen.is_valid());
	}

	#[test]
	fn eraser_clears_under_the_stroke_only() -> anyhow::Result<()> {
		let mut image = RasterImage::filled(SIZE.0, SIZE.1, [20, 40, 60, 255]);
		let mut eraser = vertical_stroke(PenStyle::Eraser);
		draw(&mut eraser, &mut image)?;
		assert_eq!(image.pixel(10, 50)[3], 0);
		assert_eq!(image.pixel(60, 50), [20, 40, 60, 255]);
		assert_eq!(image.pixel(200, 200), [20, 40, 60, 255]);
		Ok(())
	}

	#[test]
	fn blur_reveals_blurred_image() -> anyhow::Result<()> {
		let blurred = Arc::new(RasterImage::filled(64, 64, [0, 0, 255, 255]));
		let mut pen = vertical_stroke(PenStyle::Blur(Some(blurred)));
		let mut image = RasterImage::filled(SIZE.0, SIZE.1, [255, 255, 255, 255]);
		draw(&mut pen, &mut image)?;
		assert_eq!(image.pixel(10, 50), [0, 0, 255, 255]);
		assert_eq!(image.pixel(60, 50), [255, 255, 255, 255]);
		Ok(())
	}

	#[test]
	fn neon_core_is_lighter_than_color() -> anyhow::Result<()> {
		let mut pen = vertical_stroke(PenStyle::Neon(DrawingColor::new(0.0, 0.5, 0.0, 1.0)));
		let mut image = RasterImage::new(SIZE.0, SIZE.1);
		draw(&mut pen, &mut image)?;
		let core = image.pixel(10, 50);
		assert_eq!(core[3], 255);
		assert!(core[0] > 100, "core {core:?}");
		assert!(image.pixel(10 + pen.width() as u32, 50)[3] > 0);
		Ok(())
	}

	#[test]
	fn arrowhead_points_back_along_the_shaft() {
		let request = ArrowheadRequest {
			points: vec![Vec2::ZERO, Vec2::new(50.0, 0.0), Vec2::new(100.0, 0.0)],
			width: 2.0,
		};
		let head = arrowhead(&request).expect("head");
		assert_eq!(head.tip, Vec2::new(100.0, 0.0));
		let length = arrowhead_length(2.0);
		assert_relative_eq!(head.left.distance(head.tip), length, epsilon = 1e-4);
		assert!(head.left.x < 100.0 && head.right.x < 100.0);
		assert_relative_eq!(head.left.y, -head.right.y, epsilon = 1e-4);
		assert_relative_eq!(
			(head.tip - head.left).angle_between(Vec2::X).abs(),
			ARROWHEAD_ANGLE,
			epsilon = 1e-4
		);
	}

	#[test]
	fn arrowhead_needs_a_direction() {
		let request = ArrowheadRequest {
			points: vec![Vec2::ONE],
			width: 2.0,
		};
		assert!(arrowhead(&request).is_none());
	}

	#[test]
	fn arrow_goes_through_its_states() {
		let mut arrow = vertical_stroke(PenStyle::Arrow(DrawingColor::BLACK));
		assert!(arrow.has_arrow());
		assert_eq!(arrow.arrow_state(), ArrowState::Drawing);
		let request = arrow.request_arrowhead().expect("request");
		assert_eq!(arrow.arrow_state(), ArrowState::AwaitingArrowhead);
		assert!(arrow.request_arrowhead().is_none());
		// Input is ignored once the shaft is done.
		arrow.update_path(Vec2::new(90.0, 90.0), GestureState::Changed, &mut ToolContext::cpu(1.0));
		assert_eq!(arrow.points().len(), 10);
		let before = arrow.bounds();
		arrow.apply_arrowhead(arrowhead(&request));
		assert_eq!(arrow.arrow_state(), ArrowState::Finalized);
		assert!(arrow.bounds().max().y >= before.max().y);
	}

	#[test]
	fn plain_pen_has_no_arrow() {
		let mut pen = vertical_stroke(PenStyle::Plain(DrawingColor::BLACK));
		assert!(!pen.has_arrow());
		assert!(pen.request_arrowhead().is_none());
	}
}
