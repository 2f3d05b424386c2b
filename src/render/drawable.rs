use std::rc::Rc;

use glam::{vec3, Mat4};

use super::{read_texture, texture, BindingBuffer, RenderError, Resources, DRAWABLE_FORMAT};
use crate::engine::raster::RasterImage;
use crate::GpuContext;

#[derive(encase::ShaderType)]
pub struct CanvasUniform {
	/// Maps canvas pixels (origin top-left, y down) to clip space.
	pub to_clip: Mat4,
}

impl CanvasUniform {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			to_clip: Mat4::from_translation(vec3(-1.0, 1.0, 0.0))
				* Mat4::from_scale(vec3(2.0 / width as f32, -2.0 / height as f32, 1.0)),
		}
	}
}

/// The offscreen surface brushes stamp into before a stroke is copied to the CPU canvas.
///
/// Passes are recorded into a lazily created command encoder, and nothing reaches the GPU
/// until [`Drawable::commit`].
pub struct Drawable {
	context: Rc<GpuContext>,
	texture: wgpu::Texture,
	view: wgpu::TextureView,
	_uniform: BindingBuffer<CanvasUniform>,
	canvas_bind_group: wgpu::BindGroup,
	encoder: Option<wgpu::CommandEncoder>,
}

impl std::fmt::Debug for Drawable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Drawable")
			.field("width", &self.width())
			.field("height", &self.height())
			.field("pending", &self.encoder.is_some())
			.finish()
	}
}

impl Drawable {
	pub fn new(context: Rc<GpuContext>, resources: &Resources, width: u32, height: u32) -> Self {
		let device = context.device();
		let texture = texture()
			.label("drawable")
			.width(width)
			.height(height)
			.format(DRAWABLE_FORMAT)
			.usage(
				wgpu::TextureUsages::RENDER_ATTACHMENT
					| wgpu::TextureUsages::COPY_SRC
					| wgpu::TextureUsages::TEXTURE_BINDING,
			)
			.create(device);
		let view = texture.create_view(&Default::default());
		let uniform = BindingBuffer::init(&CanvasUniform::new(width, height))
			.label("drawable")
			.create(device);
		let canvas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
			label: Some("drawable"),
			layout: &resources.canvas_layout,
			entries: &[wgpu::BindGroupEntry {
				binding: 0,
				resource: uniform.as_entire_binding(),
			}],
		});
		let mut drawable = Self {
			context,
			texture,
			view,
			_uniform: uniform,
			canvas_bind_group,
			encoder: None,
		};
		drawable.clear();
		drawable
	}

	pub fn width(&self) -> u32 {
		self.texture.width()
	}

	pub fn height(&self) -> u32 {
		self.texture.height()
	}

	pub fn context(&self) -> &Rc<GpuContext> {
		&self.context
	}

	/// Records one render pass that keeps the existing contents. Group 0 is already bound to
	/// the canvas transform.
	pub fn draw_pass(&mut self, record: impl FnOnce(&mut wgpu::RenderPass<'_>)) {
		self.pass(wgpu::LoadOp::Load, record);
	}

	fn pass(&mut self, load: wgpu::LoadOp<wgpu::Color>, record: impl FnOnce(&mut wgpu::RenderPass<'_>)) {
		let device = self.context.device();
		let encoder = self.encoder.get_or_insert_with(|| {
			device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
				label: Some("drawable"),
			})
		});
		let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
			label: Some("drawable"),
			color_attachments: &[Some(wgpu::RenderPassColorAttachment {
				view: &self.view,
				resolve_target: None,
				ops: wgpu::Operations {
					load,
					store: wgpu::StoreOp::Store,
				},
			})],
			..Default::default()
		});
		pass.set_bind_group(0, &self.canvas_bind_group, &[]);
		record(&mut pass);
	}

	/// Submits recorded passes. With `wait`, blocks until the GPU has executed them.
	pub fn commit(&mut self, wait: bool) {
		if let Some(encoder) = self.encoder.take() {
			self.context.queue().submit([encoder.finish()]);
		}
		if wait {
			self.context.barrier();
		}
	}

	/// Erases the surface to transparent.
	pub fn clear(&mut self) {
		self.pass(wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT), |_| {});
		self.commit(false);
	}

	/// Copies the surface to a CPU image, waiting for pending work first.
	pub fn snapshot(&mut self) -> Result<RasterImage, RenderError> {
		self.commit(true);
		let mut data = read_texture(&self.context, &self.texture)?;
		// Blending can leave color slightly above coverage.
		for pixel in data.chunks_exact_mut(4) {
			let alpha = pixel[3];
			for channel in &mut pixel[..3] {
				*channel = (*channel).min(alpha);
			}
		}
		Ok(RasterImage::from_premultiplied(self.width(), self.height(), data)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::GpuTestContext;
	use approx::assert_relative_eq;

	#[test]
	fn to_clip_maps_corners() {
		let uniform = CanvasUniform::new(200, 100);
		let top_left = uniform.to_clip.project_point3(vec3(0.0, 0.0, 0.0));
		let bottom_right = uniform.to_clip.project_point3(vec3(200.0, 100.0, 0.0));
		assert_relative_eq!(top_left.x, -1.0);
		assert_relative_eq!(top_left.y, 1.0);
		assert_relative_eq!(bottom_right.x, 1.0);
		assert_relative_eq!(bottom_right.y, -1.0);
	}

	#[test]
	fn new_drawable_is_transparent() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let context = context.into_shared();
		let resources = Resources::new(context.device());
		let mut drawable = Drawable::new(context, &resources, 16, 8);
		let image = drawable.snapshot()?;
		assert_eq!((image.width(), image.height()), (16, 8));
		assert!(image.is_transparent());
		Ok(())
	}
}
