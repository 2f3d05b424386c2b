use std::ops::Deref;
use std::rc::Rc;

use crate::render::RenderError;
use crate::*;

/// A GPU for tests. Machines without an adapter skip GPU tests instead of failing them.
pub struct GpuTestContext {
	context: GpuContext,
}

impl Deref for GpuTestContext {
	type Target = GpuContext;
	fn deref(&self) -> &GpuContext {
		&self.context
	}
}

impl GpuTestContext {
	pub fn try_new() -> Option<Self> {
		match pollster::block_on(GpuContext::new()) {
			Ok(context) => Some(Self { context }),
			Err(error) => {
				tracing::warn!(%error, "no GPU available, skipping");
				None
			}
		}
	}

	pub fn into_shared(self) -> Rc<GpuContext> {
		Rc::new(self.context)
	}

	/// A texture that can be rendered to and read back.
	pub fn create_target_texture(&self, width: u32, height: u32) -> wgpu::Texture {
		render::texture()
			.width(width)
			.height(height)
			.label("test_target")
			.usage(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC)
			.create(self.device())
	}

	pub fn read_texture(&self, texture: &wgpu::Texture) -> Result<Vec<u8>, RenderError> {
		render::read_texture(&self.context, texture)
	}
}
