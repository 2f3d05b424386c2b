mod resources;
pub use resources::*;

mod drawable;
pub use drawable::*;

mod textures;
pub use textures::*;

use std::{borrow::Borrow, num::NonZero, ops::Deref};

use bon::{bon, builder};
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::GpuContext;

#[derive(Debug, Error)]
pub enum RenderError {
	#[error("failed to map readback buffer: {0}")]
	Map(#[from] wgpu::BufferAsyncError),

	#[error("readback buffer was never mapped")]
	MapCallbackDropped,

	#[error("unsupported readback format {0:?}")]
	UnsupportedFormat(wgpu::TextureFormat),

	#[error(transparent)]
	Raster(#[from] crate::engine::raster::RasterError),
}

static_assertions::assert_impl_all!(RenderError: std::error::Error, Send, Sync);

#[derive(Debug)]
pub struct Shader {
	pub module: wgpu::ShaderModule,
	pub layout: wgpu::PipelineLayout,
}

#[builder(finish_fn = create)]
pub fn render_pipeline<'a>(
	#[builder(finish_fn)] device: &wgpu::Device,
	label: Option<&str>,
	layout: Option<&wgpu::PipelineLayout>,
	vertex: wgpu::VertexState<'a>,
	fragment: Option<wgpu::FragmentState<'a>>,
	depth_stencil: Option<wgpu::DepthStencilState>,
	#[builder(default)] multisample: wgpu::MultisampleState,
	multiview: Option<NonZero<u32>>,
	cache: Option<&wgpu::PipelineCache>,
) -> wgpu::RenderPipeline {
	device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
		label,
		layout,
		vertex,
		fragment,
		primitive: wgpu::PrimitiveState {
			topology: wgpu::PrimitiveTopology::TriangleStrip,
			strip_index_format: None,
			front_face: wgpu::FrontFace::Ccw,
			cull_mode: None,
			polygon_mode: wgpu::PolygonMode::Fill,
			unclipped_depth: false,
			conservative: false,
		},
		depth_stencil,
		multisample,
		multiview,
		cache,
	})
}

#[builder(finish_fn = create)]
pub fn texture(
	#[builder(finish_fn)] device: &wgpu::Device,
	label: Option<&str>,
	width: u32,
	height: u32,
	#[builder(default = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST)]
	usage: wgpu::TextureUsages,
	#[builder(default = wgpu::TextureFormat::Rgba8Unorm)] format: wgpu::TextureFormat,
	with_data: Option<(&wgpu::Queue, &[u8])>,
) -> wgpu::Texture {
	let descriptor = wgpu::TextureDescriptor {
		label,
		size: wgpu::Extent3d {
			width,
			height,
			depth_or_array_layers: 1,
		},
		mip_level_count: 1,
		sample_count: 1,
		dimension: wgpu::TextureDimension::D2,
		format,
		usage,
		view_formats: &[],
	};
	if let Some((queue, data)) = with_data {
		device.create_texture_with_data(queue, &descriptor, Default::default(), data)
	} else {
		device.create_texture(&descriptor)
	}
}

/// Thin wrapper around a `wgpu::Buffer` that stores a type `T` in a format suitable for binding
/// to a uniform.
pub struct BindingBuffer<T: ?Sized> {
	buffer: wgpu::Buffer,
	_t: std::marker::PhantomData<T>,
}

impl<T: ?Sized> Deref for BindingBuffer<T> {
	type Target = wgpu::Buffer;
	fn deref(&self) -> &Self::Target {
		&self.buffer
	}
}

impl<T: ?Sized> BindingBuffer<T> {
	fn from_buffer(buffer: wgpu::Buffer) -> Self {
		Self {
			buffer,
			_t: Default::default(),
		}
	}

	fn default_usages() -> wgpu::BufferUsages {
		wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM
	}
}

#[bon]
impl<T: ?Sized + encase::ShaderType + encase::internal::WriteInto> BindingBuffer<T> {
	fn value_to_data(value: &T) -> impl Borrow<[u8]> {
		let mut data = encase::UniformBuffer::new(Vec::<u8>::new());
		data
			.write(value)
			.expect("growing a Vec-backed uniform buffer cannot fail");
		data.into_inner()
	}

	/// Builds a buffer with the given initial `value`.
	#[builder(finish_fn = "create")]
	pub fn init<'a>(
		#[builder(start_fn)] value: &T,
		#[builder(finish_fn)] device: &'a wgpu::Device,
		label: Option<&str>,
		usage: Option<wgpu::BufferUsages>,
	) -> Self {
		let usage = usage.unwrap_or(Self::default_usages());
		let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
			label,
			contents: Self::value_to_data(value).borrow(),
			usage,
		});
		Self::from_buffer(buffer)
	}
}

/// Copies a 2D RGBA8 texture back to tightly packed rows, blocking until the GPU is done.
pub fn read_texture(context: &GpuContext, texture: &wgpu::Texture) -> Result<Vec<u8>, RenderError> {
	let format = texture.format();
	if format.remove_srgb_suffix() != wgpu::TextureFormat::Rgba8Unorm {
		return Err(RenderError::UnsupportedFormat(format));
	}
	let bytes_per_row = 4 * texture.width();
	let row_stride = wgpu::util::align_to(bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

	let device = context.device();
	let buffer = device.create_buffer(&wgpu::BufferDescriptor {
		label: Some("read_texture"),
		size: (row_stride * texture.height()) as wgpu::BufferAddress,
		usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
		mapped_at_creation: false,
	});
	let mut encoder = device.create_command_encoder(&Default::default());
	encoder.copy_texture_to_buffer(
		wgpu::ImageCopyTexture {
			texture,
			mip_level: 0,
			origin: wgpu::Origin3d::ZERO,
			aspect: wgpu::TextureAspect::All,
		},
		wgpu::ImageCopyBuffer {
			buffer: &buffer,
			layout: wgpu::ImageDataLayout {
				offset: 0,
				bytes_per_row: Some(row_stride),
				rows_per_image: Some(texture.height()),
			},
		},
		texture.size(),
	);
	context.queue().submit([encoder.finish()]);

	let slice = buffer.slice(..);
	let (sender, receiver) = std::sync::mpsc::channel();
	slice.map_async(wgpu::MapMode::Read, move |result| {
		let _ = sender.send(result);
	});
	context.barrier();
	receiver
		.recv()
		.map_err(|_| RenderError::MapCallbackDropped)??;

	let data = slice
		.get_mapped_range()
		.chunks_exact(row_stride as usize)
		.flat_map(|row| &row[..bytes_per_row as usize])
		.copied()
		.collect();
	buffer.unmap();
	Ok(data)
}
