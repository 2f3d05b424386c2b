use std::rc::Rc;
use std::sync::Arc;

use glam::Vec2;

use super::brush::{Brush, PrinterBrush, RainbowBrush, Rotation, StampBrush};
use super::chartlet::ChartletBrush;
use super::raster::RasterImage;
use super::stroke::GestureState;
use super::tool_state::{DrawingColor, ToolState};
use crate::render::{Drawable, RenderError, Resources, TextureRegistry};
use crate::util::image::ImageCodec;
use crate::GpuContext;

/// GPU side of a canvas: the offscreen drawable, the brush textures and the brush of the
/// active tool.
pub struct StrokeRenderer {
	context: Rc<GpuContext>,
	resources: Resources,
	textures: TextureRegistry,
	drawable: Drawable,
	brush: Option<Box<dyn Brush>>,
	codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for StrokeRenderer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StrokeRenderer")
			.field("drawable", &self.drawable)
			.field("textures", &self.textures)
			.field("has_brush", &self.brush.is_some())
			.finish()
	}
}

impl StrokeRenderer {
	pub fn new(context: Rc<GpuContext>, width: u32, height: u32, codec: Arc<dyn ImageCodec>) -> Self {
		let resources = Resources::new(context.device());
		let textures = TextureRegistry::new(context.clone(), &resources);
		let drawable = Drawable::new(context.clone(), &resources, width, height);
		Self {
			context,
			resources,
			textures,
			drawable,
			brush: None,
			codec,
		}
	}

	pub fn textures(&self) -> &TextureRegistry {
		&self.textures
	}

	pub fn has_brush(&self) -> bool {
		self.brush.is_some()
	}

	/// Builds the brush for `tool`. Tools drawn on the CPU leave no brush behind.
	#[tracing::instrument(skip_all, fields(tool = %tool.key()))]
	pub fn activate(&mut self, tool: &ToolState) {
		let device = self.context.device();
		let brush: Option<Box<dyn Brush>> = match tool {
			ToolState::Marker(state) => {
				let texture = self
					.textures
					.load_images(&self.resources, self.codec.as_ref(), &state.images)
					.swap_remove(0);
				let rotation = match state.dash_size {
					Some(_) => Rotation::Ahead,
					None => Rotation::Fixed(-0.55),
				};
				Some(Box::new(StampBrush::new(
					device,
					&self.resources,
					texture,
					state.dash_size,
					rotation,
				)))
			}
			ToolState::Chartlet(state) => {
				let mut textures =
					self.textures
						.load_images(&self.resources, self.codec.as_ref(), &state.images);
				if textures.len() == 1 {
					Some(Box::new(PrinterBrush::new(
						device,
						&self.resources,
						textures.swap_remove(0),
						state.offset,
					)))
				} else {
					Some(Box::new(ChartletBrush::new(
						device,
						&self.resources,
						textures,
						state.render_style,
						state.offset,
					)))
				}
			}
			ToolState::Rainbow(state) => {
				let texture = self
					.textures
					.load_images(&self.resources, self.codec.as_ref(), &state.images)
					.swap_remove(0);
				Some(Box::new(RainbowBrush::new(device, &self.resources, texture)))
			}
			_ => None,
		};
		tracing::debug!(has_brush = brush.is_some(), "brush activated");
		self.brush = brush;
		self.textures.prune();
	}

	/// Feeds one gesture event to the active brush.
	pub fn update(&mut self, position: Vec2, color: DrawingColor, state: GestureState, size: f32) {
		if let Some(brush) = &mut self.brush {
			brush.updated(&mut self.drawable, position, color, state, size);
		}
	}

	/// Renders a complete recorded stroke, waiting for the GPU.
	pub fn setup(&mut self, points: &[Vec2], color: DrawingColor, size: f32) {
		if let Some(brush) = &mut self.brush {
			brush.setup(&mut self.drawable, points, color, size);
		}
	}

	/// Reads back everything drawn since the last clear, then clears.
	pub fn snapshot_and_clear(&mut self) -> Result<RasterImage, RenderError> {
		let image = self.drawable.snapshot();
		self.drawable.clear();
		image
	}

	pub fn clear(&mut self) {
		self.drawable.clear();
	}

	/// Drops the stroke in progress and everything it drew.
	pub fn cancel(&mut self) {
		if let Some(brush) = &mut self.brush {
			brush.input().reset();
		}
		self.drawable.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::tool_state::{BrushState, EncodedImage};
	use crate::test::GpuTestContext;
	use crate::util::image::PngCodec;

	fn renderer(context: Rc<GpuContext>) -> StrokeRenderer {
		StrokeRenderer::new(context, 64, 64, Arc::new(PngCodec))
	}

	#[test]
	fn cpu_tools_have_no_brush() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let mut renderer = renderer(context.into_shared());
		let pen = BrushState::builder().color(DrawingColor::BLACK).size(0.2).build();
		renderer.activate(&ToolState::Pen(pen.clone()));
		assert!(!renderer.has_brush());
		renderer.activate(&ToolState::Marker(pen));
		assert!(renderer.has_brush());
		Ok(())
	}

	#[test]
	fn marker_stroke_is_snapshotted_and_cleared() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let mut renderer = renderer(context.into_shared());
		let marker = BrushState::builder().color(DrawingColor::BLACK).size(0.2).build();
		renderer.activate(&ToolState::Marker(marker));
		let points: Vec<_> = (0..8).map(|i| Vec2::new(8.0 + 6.0 * i as f32, 20.0)).collect();
		renderer.setup(&points, DrawingColor::BLACK, 10.0);
		let stroke = renderer.snapshot_and_clear()?;
		assert!(!stroke.is_transparent());
		assert!(renderer.snapshot_and_clear()?.is_transparent());
		Ok(())
	}

	#[test]
	fn chartlet_with_several_images() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let mut renderer = renderer(context.into_shared());
		let image = |rgb| -> anyhow::Result<Option<EncodedImage>> {
			let png = PngCodec.encode(&RasterImage::filled(8, 8, rgb))?;
			Ok(Some(EncodedImage::new(png)))
		};
		let chartlet = BrushState::builder()
			.color(DrawingColor::BLACK)
			.size(0.3)
			.images(vec![image([255, 0, 0, 255])?, image([0, 0, 255, 255])?])
			.build();
		renderer.activate(&ToolState::Chartlet(chartlet));
		assert!(renderer.has_brush());
		// Two uploads plus the built-in texture.
		assert_eq!(renderer.textures().len(), 3);
		let points: Vec<_> = (0..8).map(|i| Vec2::new(8.0, 8.0 + 6.0 * i as f32)).collect();
		renderer.setup(&points, DrawingColor::BLACK, 12.0);
		assert!(!renderer.snapshot_and_clear()?.is_transparent());
		Ok(())
	}

	#[test]
	fn reactivating_a_brush_reuses_its_textures() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let mut renderer = renderer(context.into_shared());
		let image = |rgb| -> anyhow::Result<Option<EncodedImage>> {
			let png = PngCodec.encode(&RasterImage::filled(8, 8, rgb))?;
			Ok(Some(EncodedImage::new(png)))
		};
		let mut chartlet = BrushState::builder()
			.color(DrawingColor::BLACK)
			.size(0.3)
			.images(vec![image([255, 0, 0, 255])?, image([0, 255, 0, 255])?])
			.build();
		for step in 0..50 {
			chartlet = chartlet.with_updated_size(0.2 + 0.01 * step as f32);
			renderer.activate(&ToolState::Chartlet(chartlet.clone()));
		}
		assert_eq!(renderer.textures().len(), 3);

		renderer.activate(&ToolState::Pen(chartlet));
		assert_eq!(renderer.textures().len(), 1);
		Ok(())
	}
}
