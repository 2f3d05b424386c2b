use glam::Vec2;

use super::{line_width, DrawingElement, ToolContext, ToolError};
use crate::engine::raster::RasterImage;
use crate::engine::stroke::GestureState;
use crate::engine::tool_state::{DrawingColor, ToolKey};
use crate::geom::{PixelRect, Rect};

/// Straight polyline through the raw points, stroked with a dash pattern.
#[derive(Debug)]
pub struct DashTool {
	color: DrawingColor,
	width: f32,
	pattern: [f32; 2],
	points: Vec<Vec2>,
}

/// On/off lengths for a stroke `width` wide. Without a gap size the dash length repeats as
/// the gap.
pub fn dash_pattern(width: f32, dash_size: Option<f32>) -> [f32; 2] {
	let dash = width * 2.0;
	match dash_size {
		Some(gap) => [dash, dash * gap.max(0.0)],
		None => [dash, dash],
	}
}

impl DashTool {
	pub fn new(
		color: DrawingColor,
		dash_size: Option<f32>,
		canvas_size: (u32, u32),
		fraction: f32,
	) -> Self {
		let width = line_width(canvas_size, fraction * 0.75);
		Self {
			color,
			width,
			pattern: dash_pattern(width, dash_size),
			points: Vec::new(),
		}
	}

	pub fn width(&self) -> f32 {
		self.width
	}

	fn path(&self) -> Option<tiny_skia::Path> {
		let (first, rest) = self.points.split_first()?;
		let mut builder = tiny_skia::PathBuilder::new();
		builder.move_to(first.x, first.y);
		for point in rest {
			builder.line_to(point.x, point.y);
		}
		builder.finish()
	}
}

impl DrawingElement for DashTool {
	fn key(&self) -> ToolKey {
		ToolKey::Dash
	}

	fn update_path(&mut self, point: Vec2, state: GestureState, _context: &mut ToolContext<'_>) {
		if state == GestureState::Began {
			self.points.clear();
		}
		if self.points.last() != Some(&point) {
			self.points.push(point);
		}
	}

	fn is_valid(&self) -> bool {
		!self.points.is_empty()
	}

	fn bounds(&self) -> Rect {
		Rect::containing(self.points.iter().copied()).outset(self.width + 30.0)
	}

	fn draw(
		&mut self,
		target: &mut RasterImage,
		clip: PixelRect,
		_context: &mut ToolContext<'_>,
	) -> Result<(), ToolError> {
		let mut layer = RasterImage::new(clip.width, clip.height);
		let transform = tiny_skia::Transform::from_translate(-(clip.x as f32), -(clip.y as f32));
		let mut paint = tiny_skia::Paint::default();
		paint.set_color(self.color.to_tiny_skia());
		paint.anti_alias = true;

		// A tap leaves a round dot.
		if let [point] = self.points[..] {
			if let (Some(mut pixmap), Some(dot)) = (
				layer.pixmap_mut(),
				tiny_skia::PathBuilder::from_circle(point.x, point.y, self.width / 2.0),
			) {
				pixmap.fill_path(&dot, &paint, tiny_skia::FillRule::Winding, transform, None);
			}
			target.composite_patch(&layer, clip.x, clip.y);
			return Ok(());
		}

		let Some(path) = self.path() else {
			return Ok(());
		};
		if let Some(mut pixmap) = layer.pixmap_mut() {
			let stroke = tiny_skia::Stroke {
				width: self.width,
				line_cap: tiny_skia::LineCap::Round,
				line_join: tiny_skia::LineJoin::Round,
				dash: tiny_skia::StrokeDash::new(self.pattern.to_vec(), 0.0),
				..Default::default()
			};
			pixmap.stroke_path(&path, &paint, &stroke, transform, None);
		}
		target.composite_patch(&layer, clip.x, clip.y);
		Ok(())
	}
}
