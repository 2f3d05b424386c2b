use std::sync::Arc;

use glam::Vec2;

use super::{DrawingElement, ToolContext, ToolError};
use crate::engine::raster::RasterImage;
use crate::engine::stroke::GestureState;
use crate::engine::tool_state::{DrawingColor, ToolKey};
use crate::geom::{PixelRect, Rect};

#[derive(Clone, Debug)]
pub enum FillSource {
	Color(DrawingColor),
	/// The precomputed blurred canvas, stretched back to full size.
	Blurred(Arc<RasterImage>),
}

/// Replaces the whole canvas at once. Valid as soon as it exists.
#[derive(Debug)]
pub struct FillTool {
	source: FillSource,
	canvas_size: (u32, u32),
}

impl FillTool {
	pub fn new(source: FillSource, canvas_size: (u32, u32)) -> Self {
		Self { source, canvas_size }
	}
}

impl DrawingElement for FillTool {
	fn key(&self) -> ToolKey {
		match self.source {
			FillSource::Color(_) => ToolKey::Pen,
			FillSource::Blurred(_) => ToolKey::Blur,
		}
	}

	fn update_path(&mut self, _point: Vec2, _state: GestureState, _context: &mut ToolContext<'_>) {}

	fn is_valid(&self) -> bool {
		true
	}

	fn bounds(&self) -> Rect {
		Rect::from_size(self.canvas_size.0 as f32, self.canvas_size.1 as f32)
	}

	fn draw(
		&mut self,
		target: &mut RasterImage,
		clip: PixelRect,
		_context: &mut ToolContext<'_>,
	) -> Result<(), ToolError> {
		let patch = match &self.source {
			FillSource::Color(color) => {
				RasterImage::filled(clip.width, clip.height, color.to_premultiplied_rgba8())
			}
			FillSource::Blurred(blurred) => blurred.scaled(target.width(), target.height()).crop(clip),
		};
		target.paste(&patch, clip.x, clip.y);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn color_fill_replaces_everything() -> anyhow::Result<()> {
		let mut fill = FillTool::new(FillSource::Color(DrawingColor::from_rgb(0xff0000)), (8, 4));
		assert!(fill.is_valid());
		let clip = fill.pixel_bounds(8, 4).expect("whole canvas");
		assert_eq!(clip, PixelRect::full(8, 4));

		let mut image = RasterImage::filled(8, 4, [0, 0, 0, 255]);
		fill.draw(&mut image, clip, &mut ToolContext::cpu(1.0))?;
		assert_eq!(image, RasterImage::filled(8, 4, [255, 0, 0, 255]));
		Ok(())
	}

	#[test]
	fn blurred_fill_is_stretched_to_the_canvas() -> anyhow::Result<()> {
		let blurred = Arc::new(RasterImage::filled(4, 2, [10, 20, 30, 255]));
		let mut fill = FillTool::new(FillSource::Blurred(blurred), (16, 8));
		assert_eq!(fill.key(), ToolKey::Blur);
		let mut image = RasterImage::new(16, 8);
		fill.draw(&mut image, PixelRect::full(16, 8), &mut ToolContext::cpu(1.0))?;
		assert_eq!(image.pixel(0, 0), [10, 20, 30, 255]);
		assert_eq!(image.pixel(15, 7), [10, 20, 30, 255]);
		Ok(())
	}
}
