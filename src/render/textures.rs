use std::collections::HashMap;
use std::rc::Rc;

use super::{texture, Resources};
use crate::engine::raster::RasterImage;
use crate::engine::tool_state::EncodedImage;
use crate::util::image::ImageCodec;
use crate::util::{QueueExt, ResultExt};
use crate::GpuContext;

#[derive(Clone, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub struct TextureId(String);

impl TextureId {
	fn fresh() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}
}

/// A brush texture with its bind group for group 1 of the brush shaders.
#[derive(Debug)]
pub struct Texture {
	id: TextureId,
	texture: wgpu::Texture,
	bind_group: wgpu::BindGroup,
}

impl Texture {
	pub fn id(&self) -> &TextureId {
		&self.id
	}

	pub fn width(&self) -> u32 {
		self.texture.width()
	}

	pub fn height(&self) -> u32 {
		self.texture.height()
	}

	/// Height over width.
	pub fn aspect(&self) -> f32 {
		self.height() as f32 / self.width() as f32
	}

	pub fn bind_group(&self) -> &wgpu::BindGroup {
		&self.bind_group
	}
}

const DEFAULT_TEXTURE_SIZE: u32 = 64;

fn uniform_samples(size: u32) -> impl Iterator<Item = f32> {
	let scale = 1.0 / (size as f32 - 1.0);
	(0..size).map(move |i| scale * i as f32)
}

fn centered_uniform_samples(size: u32) -> impl Iterator<Item = f32> {
	uniform_samples(size).map(|x| 2.0 * x - 1.0)
}

/// Coverage of one row of the built-in soft round dot.
fn soft_dot_row(y: f32, width: u32) -> impl Iterator<Item = f32> {
	centered_uniform_samples(width).map(move |x| {
		let falloff = (1.0 - (x * x + y * y)).max(0.0);
		falloff * falloff * (3.0 - 2.0 * falloff)
	})
}

fn soft_dot_image(size: u32) -> RasterImage {
	let mut image = RasterImage::new(size, size);
	for (row, y) in centered_uniform_samples(size).enumerate() {
		for (column, coverage) in soft_dot_row(y, size).enumerate() {
			let alpha = (coverage * 255.0).round() as u8;
			image.set_pixel(column as u32, row as u32, [alpha, alpha, alpha, alpha]);
		}
	}
	image
}

/// Owns every brush texture of a canvas. Brushes hold shared handles to entries, and the
/// registry always carries the built-in soft round texture. Each distinct encoded image is
/// uploaded once.
pub struct TextureRegistry {
	context: Rc<GpuContext>,
	textures: HashMap<TextureId, Rc<Texture>>,
	sources: HashMap<EncodedImage, TextureId>,
	default_texture: Rc<Texture>,
}

impl std::fmt::Debug for TextureRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TextureRegistry")
			.field("len", &self.textures.len())
			.finish_non_exhaustive()
	}
}

impl TextureRegistry {
	pub fn new(context: Rc<GpuContext>, resources: &Resources) -> Self {
		let default_texture = Rc::new(upload(
			&context,
			resources,
			&soft_dot_image(DEFAULT_TEXTURE_SIZE),
		));
		let textures = HashMap::from([(default_texture.id.clone(), default_texture.clone())]);
		Self {
			context,
			textures,
			sources: HashMap::new(),
			default_texture,
		}
	}

	pub fn default_texture(&self) -> Rc<Texture> {
		self.default_texture.clone()
	}

	pub fn make_texture(&mut self, resources: &Resources, image: &RasterImage) -> TextureId {
		let texture = Rc::new(upload(&self.context, resources, image));
		let id = texture.id.clone();
		tracing::debug!(%id, width = image.width(), height = image.height(), "texture registered");
		self.textures.insert(id.clone(), texture);
		id
	}

	pub fn find(&self, id: &TextureId) -> Option<Rc<Texture>> {
		self.textures.get(id).cloned()
	}

	pub fn len(&self) -> usize {
		self.textures.len()
	}

	pub fn is_empty(&self) -> bool {
		self.textures.is_empty()
	}

	/// Decodes and registers brush images, reusing the texture of any image seen before.
	/// Missing or undecodable entries are skipped, and an empty result falls back to the
	/// built-in texture.
	pub fn load_images(
		&mut self,
		resources: &Resources,
		codec: &dyn ImageCodec,
		images: &[Option<EncodedImage>],
	) -> Vec<Rc<Texture>> {
		let textures: Vec<_> = images
			.iter()
			.flatten()
			.filter_map(|image| self.load_image(resources, codec, image))
			.collect();
		if textures.is_empty() {
			if !images.is_empty() {
				tracing::warn!(count = images.len(), "no usable brush image, using default texture");
			}
			return vec![self.default_texture()];
		}
		textures
	}

	fn load_image(
		&mut self,
		resources: &Resources,
		codec: &dyn ImageCodec,
		image: &EncodedImage,
	) -> Option<Rc<Texture>> {
		if let Some(texture) = self.sources.get(image).and_then(|id| self.find(id)) {
			return Some(texture);
		}
		let decoded = codec.decode(image.bytes()).ok_or_log_with("decode brush image")?;
		let id = self.make_texture(resources, &decoded);
		self.sources.insert(image.clone(), id.clone());
		self.find(&id)
	}

	/// Drops textures no brush holds anymore. The built-in texture is kept.
	pub fn prune(&mut self) {
		let before = self.textures.len();
		let default_id = self.default_texture.id.clone();
		self.textures
			.retain(|id, texture| *id == default_id || Rc::strong_count(texture) > 1);
		let textures = &self.textures;
		self.sources.retain(|_, id| textures.contains_key(id));
		let pruned = before - self.textures.len();
		if pruned > 0 {
			tracing::debug!(pruned, "textures released");
		}
	}
}

fn upload(context: &GpuContext, resources: &Resources, image: &RasterImage) -> Texture {
	let device = context.device();
	let texture = texture()
		.label("brush")
		.width(image.width())
		.height(image.height())
		.create(device);
	// Brush shaders expect straight alpha.
	context.queue().write_rgba8(&texture, &image.to_straight());
	let view = texture.create_view(&Default::default());
	let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
		label: Some("brush"),
		layout: &resources.texture_layout,
		entries: &[
			wgpu::BindGroupEntry {
				binding: 0,
				resource: wgpu::BindingResource::TextureView(&view),
			},
			wgpu::BindGroupEntry {
				binding: 1,
				resource: wgpu::BindingResource::Sampler(&resources.sampler),
			},
		],
	});
	Texture {
		id: TextureId::fresh(),
		texture,
		bind_group,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::GpuTestContext;
	use crate::util::image::PngCodec;

	#[test]
	fn soft_dot_is_opaque_in_the_middle_and_clear_at_the_corner() {
		let image = soft_dot_image(DEFAULT_TEXTURE_SIZE);
		let middle = DEFAULT_TEXTURE_SIZE / 2;
		assert!(image.pixel(middle, middle)[3] > 240);
		assert_eq!(image.pixel(0, 0)[3], 0);
	}

	#[test]
	fn undecodable_images_fall_back_to_default() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let context = context.into_shared();
		let resources = Resources::new(context.device());
		let mut registry = TextureRegistry::new(context, &resources);
		let textures = registry.load_images(
			&resources,
			&PngCodec,
			&[None, Some(EncodedImage::new(vec![1u8, 2, 3]))],
		);
		assert_eq!(textures.len(), 1);
		assert_eq!(textures[0].id(), registry.default_texture().id());
		Ok(())
	}

	#[test]
	fn repeated_images_share_one_texture() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let context = context.into_shared();
		let resources = Resources::new(context.device());
		let mut registry = TextureRegistry::new(context, &resources);
		let images = [
			Some(EncodedImage::new(PngCodec.encode(&RasterImage::filled(4, 4, [255, 0, 0, 255]))?)),
			Some(EncodedImage::new(PngCodec.encode(&RasterImage::filled(4, 4, [0, 0, 255, 255]))?)),
		];
		let first = registry.load_images(&resources, &PngCodec, &images);
		for _ in 0..10 {
			let again = registry.load_images(&resources, &PngCodec, &images);
			assert_eq!(again[0].id(), first[0].id());
		}
		assert_eq!(registry.len(), 3);

		drop(first);
		registry.prune();
		assert_eq!(registry.len(), 1);
		assert!(registry.find(registry.default_texture().id()).is_some());
		Ok(())
	}

	#[test]
	fn decoded_images_are_registered() -> anyhow::Result<()> {
		let Some(context) = GpuTestContext::try_new() else {
			return Ok(());
		};
		let context = context.into_shared();
		let resources = Resources::new(context.device());
		let mut registry = TextureRegistry::new(context, &resources);
		let png = PngCodec.encode(&RasterImage::filled(4, 2, [255, 0, 0, 255]))?;
		let textures = registry.load_images(&resources, &PngCodec, &[Some(EncodedImage::new(png))]);
		assert_eq!(textures.len(), 1);
		assert_eq!(textures[0].aspect(), 0.5);
		assert!(registry.find(textures[0].id()).is_some());
		assert_eq!(registry.len(), 2);
		Ok(())
	}
}
