//! Drawing elements: one in-progress stroke of a tool, from gesture begin until it is
//! rasterized into the canvas or discarded.

mod dash;
pub use dash::*;

mod fill;
pub use fill::*;

mod marker;
pub use marker::*;

mod pen;
pub use pen::*;

use std::sync::Arc;

use glam::Vec2;
use thiserror::Error;

use super::raster::RasterImage;
use super::renderer::StrokeRenderer;
use super::stroke::GestureState;
use super::tool_state::{ToolKey, ToolState};
use crate::geom::{PixelRect, Rect};
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum ToolError {
	#[error("{0} strokes need a GPU renderer")]
	GpuUnavailable(ToolKey),

	#[error(transparent)]
	Render(#[from] RenderError),
}

static_assertions::assert_impl_all!(ToolError: std::error::Error, Send, Sync);

/// What an element may use while it is updated or drawn.
pub struct ToolContext<'a> {
	pub renderer: Option<&'a mut StrokeRenderer>,
	pub zoom_scale: f32,
}

impl<'a> ToolContext<'a> {
	pub fn new(renderer: Option<&'a mut StrokeRenderer>, zoom_scale: f32) -> Self {
		Self {
			renderer,
			zoom_scale,
		}
	}

	/// A context without GPU access.
	pub fn cpu(zoom_scale: f32) -> Self {
		Self::new(None, zoom_scale)
	}

	fn renderer(&mut self, key: ToolKey) -> Result<&mut StrokeRenderer, ToolError> {
		self.renderer.as_deref_mut().ok_or(ToolError::GpuUnavailable(key))
	}
}

/// Inputs for an arrowhead, computed off the UI thread.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrowheadRequest {
	pub points: Vec<Vec2>,
	pub width: f32,
}

/// The two barbs of an arrowhead, drawn from `tip`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrowhead {
	pub tip: Vec2,
	pub left: Vec2,
	pub right: Vec2,
}

pub trait DrawingElement {
	fn key(&self) -> ToolKey;

	fn update_path(&mut self, point: Vec2, state: GestureState, context: &mut ToolContext<'_>);

	/// Whether the element has enough input to be committed.
	fn is_valid(&self) -> bool;

	/// Canvas area the finished element may touch, before clamping.
	fn bounds(&self) -> Rect;

	/// Rasterizes the element into `target`, touching only pixels inside `clip`.
	fn draw(
		&mut self,
		target: &mut RasterImage,
		clip: PixelRect,
		context: &mut ToolContext<'_>,
	) -> Result<(), ToolError>;

	/// Discards any partial output.
	fn cancel(&mut self, _context: &mut ToolContext<'_>) {}

	fn has_arrow(&self) -> bool {
		false
	}

	/// Moves an arrow from drawing to awaiting its head, returning what the head is computed
	/// from. `None` when there is no head to wait for.
	fn request_arrowhead(&mut self) -> Option<ArrowheadRequest> {
		None
	}

	/// Completes an arrow. `None` finalizes it without a head.
	fn apply_arrowhead(&mut self, _arrowhead: Option<Arrowhead>) {}

	/// Bounds clamped to a `width` x `height` canvas and rounded outward to whole pixels.
	fn pixel_bounds(&self, width: u32, height: u32) -> Option<PixelRect> {
		self.bounds().to_pixel_rect(width, height)
	}

	/// Feeds a complete recorded stroke.
	fn replay(&mut self, points: &[Vec2], context: &mut ToolContext<'_>) {
		let Some((&first, rest)) = points.split_first() else {
			return;
		};
		self.update_path(first, GestureState::Began, context);
		let Some((&last, middle)) = rest.split_last() else {
			self.update_path(first, GestureState::Ended, context);
			return;
		};
		for &point in middle {
			self.update_path(point, GestureState::Changed, context);
		}
		self.update_path(last, GestureState::Changed, context);
		self.update_path(last, GestureState::Ended, context);
	}
}

/// Pixel width range of vector strokes on a canvas whose longest side is `max_dimension`.
pub fn line_width_range(max_dimension: f32) -> (f32, f32) {
	((max_dimension * 0.001).max(1.0), (max_dimension * 0.04).max(10.0))
}

/// Pixel width of a vector stroke for the `fraction` of the width range.
pub fn line_width(canvas_size: (u32, u32), fraction: f32) -> f32 {
	let (min, max) = line_width_range(canvas_size.0.max(canvas_size.1) as f32);
	min + (max - min) * fraction
}

/// Creates the element a gesture with `state` draws. `blurred` is the precomputed source of
/// the blur pen.
pub fn make_element(
	state: &ToolState,
	canvas_size: (u32, u32),
	zoom_scale: f32,
	blurred: Option<Arc<RasterImage>>,
) -> Box<dyn DrawingElement> {
	let fraction = state.size() / zoom_scale;
	match state {
		ToolState::Pen(brush) => Box::new(PenTool::new(PenStyle::Plain(brush.color), canvas_size, fraction)),
		ToolState::Arrow(brush) => Box::new(PenTool::new(PenStyle::Arrow(brush.color), canvas_size, fraction)),
		ToolState::Neon(brush) => Box::new(PenTool::new(PenStyle::Neon(brush.color), canvas_size, fraction)),
		ToolState::Eraser(_) => Box::new(PenTool::new(PenStyle::Eraser, canvas_size, fraction)),
		ToolState::Blur(_) => Box::new(PenTool::new(PenStyle::Blur(blurred), canvas_size, fraction)),
		ToolState::Dash(brush) => Box::new(DashTool::new(brush.color, brush.dash_size, canvas_size, fraction)),
		ToolState::Marker(brush) => Box::new(MarkerTool::new(MarkerStyle::Marker, brush.color, canvas_size, fraction)),
		ToolState::Chartlet(brush) => Box::new(MarkerTool::new(MarkerStyle::Chartlet, brush.color, canvas_size, fraction)),
		ToolState::Rainbow(brush) => Box::new(MarkerTool::new(MarkerStyle::Rainbow, brush.color, canvas_size, fraction)),
	}
}

/// Vector path through `points` with quadratic curves between midpoints, matching the
/// smoothing used for stamped strokes.
pub(crate) fn smoothed_path(points: &[Vec2]) -> Option<tiny_skia::Path> {
	let (&first, rest) = points.split_first()?;
	let mut builder = tiny_skia::PathBuilder::new();
	builder.move_to(first.x, first.y);
	match rest {
		[] => builder.line_to(first.x, first.y),
		[only] => builder.line_to(only.x, only.y),
		_ => {
			for pair in points.windows(2).skip(1) {
				let mid = (pair[0] + pair[1]) * 0.5;
				builder.quad_to(pair[0].x, pair[0].y, mid.x, mid.y);
			}
			if let Some(last) = points.last() {
				builder.line_to(last.x, last.y);
			}
		}
	}
	builder.finish()
}
