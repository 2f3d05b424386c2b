use glam::Vec2;

use super::{DrawingElement, ToolContext, ToolError};
use crate::engine::raster::RasterImage;
use crate::engine::stroke::GestureState;
use crate::engine::tool_state::{DrawingColor, ToolKey};
use crate::geom::{PixelRect, Rect};

/// Minimum on-screen distance between recorded points.
const MIN_POINT_DISTANCE: f32 = 10.0;

/// Margin around a marker stroke covering stamps that lean out of the path.
const MARKER_MARGIN: f32 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerStyle {
	Marker,
	Chartlet,
	Rainbow,
}

impl MarkerStyle {
	fn key(self) -> ToolKey {
		match self {
			MarkerStyle::Marker => ToolKey::Marker,
			MarkerStyle::Chartlet => ToolKey::Chartlet,
			MarkerStyle::Rainbow => ToolKey::Rainbow,
		}
	}

	fn size_factor(self) -> f32 {
		match self {
			MarkerStyle::Chartlet => 0.3,
			MarkerStyle::Marker | MarkerStyle::Rainbow => 0.2,
		}
	}
}

/// A stroke stamped by the GPU brush as the gesture arrives. Finishing it reads the stamps
/// back and composites them over the canvas.
#[derive(Debug)]
pub struct MarkerTool {
	style: MarkerStyle,
	color: DrawingColor,
	render_width: f32,
	points: Vec<Vec2>,
}

impl MarkerTool {
	pub fn new(style: MarkerStyle, color: DrawingColor, canvas_size: (u32, u32), fraction: f32) -> Self {
		let min_dimension = canvas_size.0.min(canvas_size.1) as f32;
		Self {
			style,
			color,
			render_width: (min_dimension * fraction * style.size_factor()).max(5.0),
			points: Vec::new(),
		}
	}

	/// Stamp size handed to the brush.
	pub fn render_width(&self) -> f32 {
		self.render_width
	}

	pub fn points(&self) -> &[Vec2] {
		&self.points
	}

	fn record(&mut self, point: Vec2, state: GestureState, zoom_scale: f32) {
		if state == GestureState::Began {
			self.points.clear();
		}
		let far_enough = self
			.points
			.last()
			.map_or(true, |last| last.distance(point) >= MIN_POINT_DISTANCE / zoom_scale);
		if far_enough {
			self.points.push(point);
		}
	}
}

impl DrawingElement for MarkerTool {
	fn key(&self) -> ToolKey {
		self.style.key()
	}

	fn update_path(&mut self, point: Vec2, state: GestureState, context: &mut ToolContext<'_>) {
		self.record(point, state, context.zoom_scale);
		if let Some(renderer) = context.renderer.as_deref_mut() {
			renderer.update(point, self.color, state, self.render_width);
		}
	}

	fn is_valid(&self) -> bool {
		self.points.len() > 6
	}

	fn bounds(&self) -> Rect {
		let margin = match self.style {
			MarkerStyle::Chartlet => self.render_width * 0.5,
			MarkerStyle::Marker | MarkerStyle::Rainbow => MARKER_MARGIN,
		};
		Rect::containing(self.points.iter().copied()).outset(margin)
	}

	fn draw(
		&mut self,
		target: &mut RasterImage,
		clip: PixelRect,
		context: &mut ToolContext<'_>,
	) -> Result<(), ToolError> {
		let renderer = context.renderer(self.key())?;
		let stroke = renderer.snapshot_and_clear()?;
		target.composite_over(&stroke, clip);
		Ok(())
	}

	fn cancel(&mut self, context: &mut ToolContext<'_>) {
		if let Some(renderer) = context.renderer.as_deref_mut() {
			renderer.cancel();
		}
		self.points.clear();
	}

	fn replay(&mut self, points: &[Vec2], context: &mut ToolContext<'_>) {
		self.points.clear();
		for (index, &point) in points.iter().enumerate() {
			let state = if index == 0 {
				GestureState::Began
			} else {
				GestureState::Changed
			};
			self.record(point, state, context.zoom_scale);
		}
		if let Some(renderer) = context.renderer.as_deref_mut() {
			renderer.setup(points, self.color, self.render_width);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::engine::renderer::StrokeRenderer;
	use crate::engine::tool_state::{BrushState, ToolState};
	use crate::test::GpuTestContext;
	use crate::util::image::PngCodec;
	use approx::assert_relative_eq;

	fn line(count: usize, spacing: f32) -> Vec<Vec2> {
		(0..count).map(|i| Vec2::new(20.0 + spacing * i as f32, 40.0)).collect()
	}

	#[test]
	fn render_width_has_a_floor() {
		let small = MarkerTool::new(MarkerStyle::Marker, DrawingColor::BLACK, (100, 400), 0.1);
		assert_relative_eq!(small.render_width(), 5.0);
		let large = MarkerTool::new(MarkerStyle::Marker, DrawingColor::BLACK, (1000, 400), 0.5);
		assert_relative_eq!(large.render_width(), 40.0);
		let chartlet = MarkerTool::new(MarkerStyle::Chartlet, DrawingColor::BLACK, (1000, 400), 0.5);
		assert_relative_eq!(chartlet.render_width(), 60.0);
	}

	#[test]
	fn close_points_are_dropped_by_zoom() {
		let mut marker = MarkerTool::new(MarkerStyle::Marker, DrawingColor::BLACK, (400, 400), 0.5);
		let mut context = ToolContext::cpu(1.0);
		marker.replay(&line(10, 4.0), &mut context);
		assert_eq!(marker.points().len(), 4);
		assert!(!marker.is_valid());

		let mut zoomed = ToolContext::cpu(4.0);
		marker.replay(&line(10, 4.0), &mut zoomed);
		assert_eq!(marker.points().len(), 10);
		assert!(marker.is_valid());
	}

	#[test]
	fn bounds_margin_depends_on_style() {
		let mut context = ToolContext::cpu(1.0);
		let mut marker = MarkerTool::new(MarkerStyle::Rainbow, DrawingColor::BLACK, (400, 400), 0.5);
		marker.replay(&line(8, 12.0), &mut context);
		assert_relative_eq!(marker.bounds().min().x, 20.0 - 80.0, epsilon = 1e-4);

		let mut chartlet = MarkerTool::new(MarkerStyle::Chartlet, DrawingColor::BLACK, (400, 400), 0.5);
		chartlet.replay(&line(8, 12.0), &mut context);
		assert_relative_eq!(chartlet.bounds().min().x, 20.0 - 30.0, epsilon = 1e-4);
	}

	#[test]
	fn drawing_without_renderer_fails() {
		let mut marker = MarkerTool::new(MarkerStyle::Marker, DrawingColor::BLACK, (400, 400), 0.5);
		let mut context = ToolContext::cpu(1.0);
		marker.replay(&line(8, 12.0), &mut context);
		let mut image = RasterImage::new(400, 400);
		let result = marker.draw(&mut image, PixelRect::full(400, 400), &mut context);
		assert!(matches!(result, Err(ToolError::GpuUnavailable(ToolKey::Marker))));
		assert!(image.is_transparent());
	}

	#[test]
	fn stroke_lands_inside_the_clip() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let mut renderer = StrokeRenderer::new(context.into_shared(), 200, 100, Arc::new(PngCodec));
		let brush = BrushState::builder().color(DrawingColor::BLACK).size(0.5).build();
		renderer.activate(&ToolState::Marker(brush));

		let mut marker = MarkerTool::new(MarkerStyle::Marker, DrawingColor::BLACK, (200, 100), 0.5);
		let mut context = ToolContext::new(Some(&mut renderer), 1.0);
		marker.replay(&line(8, 12.0), &mut context);
		assert!(marker.is_valid());

		let clip = marker.pixel_bounds(200, 100).expect("inside canvas");
		let mut image = RasterImage::new(200, 100);
		marker.draw(&mut image, clip, &mut context)?;
		assert!(image.pixel(60, 40)[3] > 0);
		Ok(())
	}
}
