use std::rc::Rc;

use glam::Vec2;
use wgpu::util::DeviceExt;

use super::brush::{stamps_along, Brush, Rotation};
use super::segmenter::Line;
use super::stroke::StrokeInput;
use super::tool_state::{DrawingColor, RenderStyle};
use crate::render::{Drawable, Resources, Texture};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
	pub position: [f32; 2],
	pub tex_coord: [f32; 2],
}

impl QuadVertex {
	const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
		wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

	pub fn layout() -> wgpu::VertexBufferLayout<'static> {
		wgpu::VertexBufferLayout {
			array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
			step_mode: wgpu::VertexStepMode::Vertex,
			attributes: &Self::ATTRIBUTES,
		}
	}
}

/// Triangle-strip corners of a `size` wide quad centred on `center`, turned by `angle`.
/// `aspect` is height over width of the texture drawn on it.
pub fn chartlet_quad(center: Vec2, size: f32, aspect: f32, angle: f32) -> [QuadVertex; 4] {
	let half = Vec2::new(size, size * aspect) * 0.5;
	let rotation = Vec2::from_angle(angle);
	[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(u, v)| {
		let corner = Vec2::new(u * 2.0 - 1.0, v * 2.0 - 1.0) * half;
		QuadVertex {
			position: (center + rotation.rotate(corner)).to_array(),
			tex_coord: [u, v],
		}
	})
}

/// Picks the texture index for each successive stamp.
#[derive(Clone, Debug)]
pub struct TextureCycle {
	len: usize,
	style: RenderStyle,
	next: usize,
}

impl TextureCycle {
	pub fn new(len: usize, style: RenderStyle) -> Self {
		assert!(len > 0, "a chartlet brush needs at least one texture");
		// Sequential cycles start from the second texture.
		Self {
			len,
			style,
			next: 1 % len,
		}
	}
}

impl Iterator for TextureCycle {
	type Item = usize;

	fn next(&mut self) -> Option<usize> {
		let index = match self.style {
			RenderStyle::Sequential => {
				let index = self.next;
				self.next = (self.next + 1) % self.len;
				index
			}
			RenderStyle::Random => fastrand::usize(..self.len),
		};
		Some(index)
	}
}

/// Stamps a rotating set of images, each as its own quad.
#[derive(Debug)]
pub struct ChartletBrush {
	input: StrokeInput,
	pipeline: wgpu::RenderPipeline,
	textures: Vec<Rc<Texture>>,
	cycle: TextureCycle,
	size: f32,
	offset: f32,
}

impl ChartletBrush {
	/// Panics when `textures` is empty.
	pub fn new(
		device: &wgpu::Device,
		resources: &Resources,
		textures: Vec<Rc<Texture>>,
		style: RenderStyle,
		offset: f32,
	) -> Self {
		let cycle = TextureCycle::new(textures.len(), style);
		Self {
			input: StrokeInput::new(),
			pipeline: resources.quad_pipeline(device, QuadVertex::layout()),
			textures,
			cycle,
			size: 1.0,
			offset,
		}
	}
}

impl Brush for ChartletBrush {
	fn point_size(&self) -> f32 {
		self.size
	}

	fn point_step(&self) -> f32 {
		self.size * (1.0 + self.offset)
	}

	fn set_point_size(&mut self, size: f32) {
		self.size = size;
	}

	fn input(&mut self) -> &mut StrokeInput {
		&mut self.input
	}

	fn render(&mut self, target: &mut Drawable, lines: &[Line], _color: DrawingColor) {
		let stamps = stamps_along(lines, DrawingColor::WHITE, Rotation::Fixed(-0.55));
		if stamps.is_empty() {
			return;
		}
		let quads: Vec<_> = stamps
			.iter()
			.zip(&mut self.cycle)
			.map(|(stamp, index)| {
				let texture = &self.textures[index];
				(
					index,
					chartlet_quad(stamp.center(), stamp.size, texture.aspect(), stamp.angle),
				)
			})
			.collect();
		let vertices: Vec<QuadVertex> = quads.iter().flat_map(|(_, quad)| *quad).collect();
		let buffer = target
			.context()
			.device()
			.create_buffer_init(&wgpu::util::BufferInitDescriptor {
				label: Some("chartlet"),
				contents: bytemuck::cast_slice(&vertices),
				usage: wgpu::BufferUsages::VERTEX,
			});
		target.draw_pass(|pass| {
			pass.set_pipeline(&self.pipeline);
			pass.set_vertex_buffer(0, buffer.slice(..));
			for (quad, (index, _)) in quads.iter().enumerate() {
				pass.set_bind_group(1, self.textures[*index].bind_group(), &[]);
				let first = quad as u32 * 4;
				pass.draw(first..first + 4, 0..1);
			}
		});
	}
}
