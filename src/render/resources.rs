use super::{render_pipeline, Shader};

/// Format of the offscreen drawable. Brush output is premultiplied, matching the CPU images.
pub const DRAWABLE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Blend modes a brush pipeline can be built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushBlend {
	/// Color is blended over, coverage accumulates additively.
	Accumulate,
	/// Straight alpha-over: source-alpha and one-minus-source-alpha.
	AlphaOver,
}

impl BrushBlend {
	pub fn state(self) -> wgpu::BlendState {
		match self {
			BrushBlend::Accumulate => wgpu::BlendState {
				color: wgpu::BlendComponent {
					src_factor: wgpu::BlendFactor::SrcAlpha,
					dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
					operation: wgpu::BlendOperation::Add,
				},
				alpha: wgpu::BlendComponent {
					src_factor: wgpu::BlendFactor::One,
					dst_factor: wgpu::BlendFactor::One,
					operation: wgpu::BlendOperation::Add,
				},
			},
			BrushBlend::AlphaOver => wgpu::BlendState::ALPHA_BLENDING,
		}
	}
}

/// Fragment programs of the stamp shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StampFragment {
	/// Supplied color, texture alpha as coverage.
	Tinted,
	/// Texture color as-is.
	Image,
	/// Palette color, texture alpha as coverage.
	Rainbow,
}

impl StampFragment {
	fn entry_point(self) -> &'static str {
		match self {
			StampFragment::Tinted => "fs_tinted",
			StampFragment::Image => "fs_image",
			StampFragment::Rainbow => "fs_rainbow",
		}
	}
}

/// Resources that only need to be loaded once for a given device.
#[derive(Debug)]
pub struct Resources {
	pub canvas_layout: wgpu::BindGroupLayout,
	pub texture_layout: wgpu::BindGroupLayout,
	pub sampler: wgpu::Sampler,
	pub stamp_shader: Shader,
	pub quad_shader: Shader,
}

impl Resources {
	pub fn new(device: &wgpu::Device) -> Self {
		let canvas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
			label: Some("canvas"),
			entries: &[wgpu::BindGroupLayoutEntry {
				binding: 0,
				visibility: wgpu::ShaderStages::VERTEX,
				ty: wgpu::BindingType::Buffer {
					ty: wgpu::BufferBindingType::Uniform,
					has_dynamic_offset: false,
					min_binding_size: None,
				},
				count: None,
			}],
		});
		let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
			label: Some("brush_texture"),
			entries: &[
				wgpu::BindGroupLayoutEntry {
					binding: 0,
					visibility: wgpu::ShaderStages::FRAGMENT,
					ty: wgpu::BindingType::Texture {
						sample_type: wgpu::TextureSampleType::Float { filterable: true },
						view_dimension: wgpu::TextureViewDimension::D2,
						multisampled: false,
					},
					count: None,
				},
				wgpu::BindGroupLayoutEntry {
					binding: 1,
					visibility: wgpu::ShaderStages::FRAGMENT,
					ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
					count: None,
				},
			],
		});
		let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
			label: Some("brush_texture"),
			address_mode_u: wgpu::AddressMode::ClampToEdge,
			address_mode_v: wgpu::AddressMode::ClampToEdge,
			address_mode_w: wgpu::AddressMode::ClampToEdge,
			mag_filter: wgpu::FilterMode::Linear,
			min_filter: wgpu::FilterMode::Linear,
			mipmap_filter: wgpu::FilterMode::Nearest,
			..Default::default()
		});

		let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
			label: Some("brush"),
			bind_group_layouts: &[&canvas_layout, &texture_layout],
			push_constant_ranges: &[],
		});
		let stamp_shader = Shader {
			module: device.create_shader_module(wgpu::include_wgsl!("../shaders/stamp.wgsl")),
			layout,
		};
		let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
			label: Some("chartlet"),
			bind_group_layouts: &[&canvas_layout, &texture_layout],
			push_constant_ranges: &[],
		});
		let quad_shader = Shader {
			module: device.create_shader_module(wgpu::include_wgsl!("../shaders/quad.wgsl")),
			layout,
		};

		Self {
			canvas_layout,
			texture_layout,
			sampler,
			stamp_shader,
			quad_shader,
		}
	}

	/// Pipeline drawing one instanced quad per stamp.
	pub fn stamp_pipeline(
		&self,
		device: &wgpu::Device,
		instance_layout: wgpu::VertexBufferLayout<'_>,
		fragment: StampFragment,
		blend: BrushBlend,
	) -> wgpu::RenderPipeline {
		render_pipeline()
			.label("stamp")
			.layout(&self.stamp_shader.layout)
			.vertex(wgpu::VertexState {
				module: &self.stamp_shader.module,
				entry_point: "vs_stamp",
				compilation_options: Default::default(),
				buffers: &[instance_layout],
			})
			.fragment(wgpu::FragmentState {
				module: &self.stamp_shader.module,
				entry_point: fragment.entry_point(),
				compilation_options: Default::default(),
				targets: &[Some(wgpu::ColorTargetState {
					format: DRAWABLE_FORMAT,
					blend: Some(blend.state()),
					write_mask: wgpu::ColorWrites::ALL,
				})],
			})
			.create(device)
	}

	/// Pipeline drawing explicit four-vertex quads.
	pub fn quad_pipeline(
		&self,
		device: &wgpu::Device,
		vertex_layout: wgpu::VertexBufferLayout<'_>,
	) -> wgpu::RenderPipeline {
		render_pipeline()
			.label("chartlet")
			.layout(&self.quad_shader.layout)
			.vertex(wgpu::VertexState {
				module: &self.quad_shader.module,
				entry_point: "vs_quad",
				compilation_options: Default::default(),
				buffers: &[vertex_layout],
			})
			.fragment(wgpu::FragmentState {
				module: &self.quad_shader.module,
				entry_point: "fs_quad",
				compilation_options: Default::default(),
				targets: &[Some(wgpu::ColorTargetState {
					format: DRAWABLE_FORMAT,
					blend: Some(BrushBlend::AlphaOver.state()),
					write_mask: wgpu::ColorWrites::ALL,
				})],
			})
			.create(device)
	}
}
