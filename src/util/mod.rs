mod result_ext;
pub use result_ext::*;

mod promise;
pub use promise::*;

mod worker;
pub use worker::*;

pub mod image;

pub trait QueueExt {
	/// Uploads tightly packed RGBA8 rows into the whole of a 2D `texture`.
	fn write_rgba8(&self, texture: &wgpu::Texture, pixel_data: &[u8]);
}

impl QueueExt for wgpu::Queue {
	fn write_rgba8(&self, texture: &wgpu::Texture, pixel_data: &[u8]) {
		let size = texture.size();
		debug_assert_eq!(pixel_data.len(), (4 * size.width * size.height) as usize);
		self.write_texture(
			wgpu::ImageCopyTexture {
				mip_level: 0,
				origin: wgpu::Origin3d::ZERO,
				texture,
				aspect: wgpu::TextureAspect::All,
			},
			pixel_data,
			wgpu::ImageDataLayout {
				offset: 0,
				bytes_per_row: Some(4 * size.width),
				rows_per_image: None,
			},
			wgpu::Extent3d {
				depth_or_array_layers: 1,
				..size
			},
		)
	}
}
