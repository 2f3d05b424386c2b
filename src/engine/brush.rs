//! GPU stamping brushes.
//!
//! Every brush turns stroke [`Line`]s into textured stamps drawn into the shared [`Drawable`].
//! The per-stroke input handling is identical for all of them and lives in the default
//! methods of [`Brush`]; variants only pick spacing, rotation, texture and blending.

use std::f32::consts::PI;
use std::rc::Rc;

use glam::Vec2;
use wgpu::util::DeviceExt;

use super::segmenter::Line;
use super::stroke::{GestureState, StrokeInput};
use super::tool_state::DrawingColor;
use crate::render::{BrushBlend, Drawable, Resources, StampFragment, Texture};

/// How each stamp is turned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rotation {
	/// Always the same angle, in radians.
	Fixed(f32),
	/// Uniformly random in `[-π, π]` per stamp.
	Random,
	/// Along the direction of travel.
	Ahead,
}

impl Rotation {
	fn angle(self, line: &Line) -> f32 {
		match self {
			Rotation::Fixed(angle) => angle,
			Rotation::Random => fastrand::f32() * 2.0 * PI - PI,
			Rotation::Ahead => line.angle(),
		}
	}
}

/// Per-instance input of the stamp shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Stamp {
	pub position: [f32; 2],
	pub color: [f32; 4],
	pub size: f32,
	pub angle: f32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<Stamp>(), 32);

impl Stamp {
	const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
		wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4, 2 => Float32, 3 => Float32];

	pub fn layout() -> wgpu::VertexBufferLayout<'static> {
		wgpu::VertexBufferLayout {
			array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
			step_mode: wgpu::VertexStepMode::Instance,
			attributes: &Self::ATTRIBUTES,
		}
	}

	pub fn center(&self) -> Vec2 {
		Vec2::from(self.position)
	}
}

/// Opacity of a single stamp so that overlapping stamps build up to roughly `alpha`.
pub fn stamp_alpha(alpha: f32, point_size: f32, point_step: f32) -> f32 {
	let overlapping = (point_size / point_step).max(1.0);
	(alpha / overlapping * 5.5).min(1.0)
}

/// Evenly spaced stamps along each line. A line shorter than one step still gets one stamp at
/// its start.
pub fn stamps_along(lines: &[Line], color: DrawingColor, rotation: Rotation) -> Vec<Stamp> {
	let mut stamps = Vec::new();
	for line in lines {
		let step = line.point_step.max(1.0);
		// Only whole stamps are drawn, spaced by the unrounded count.
		let count = (line.length() / step).max(1.0);
		let alpha = stamp_alpha(color.alpha, line.point_size, line.point_step);
		let color = color.with_alpha(alpha).to_array();
		let delta = line.end - line.start;
		stamps.extend((0..count as usize).map(|i| {
			let position = line.start + delta * (i as f32 / count);
			Stamp {
				position: position.to_array(),
				color,
				size: line.point_size,
				angle: rotation.angle(line),
			}
		}));
	}
	stamps
}

/// A pipeline plus texture drawing instanced [`Stamp`]s.
#[derive(Debug)]
struct Stamper {
	pipeline: wgpu::RenderPipeline,
	texture: Rc<Texture>,
}

impl Stamper {
	fn new(
		device: &wgpu::Device,
		resources: &Resources,
		texture: Rc<Texture>,
		fragment: StampFragment,
		blend: BrushBlend,
	) -> Self {
		let pipeline = resources.stamp_pipeline(device, Stamp::layout(), fragment, blend);
		Self { pipeline, texture }
	}

	fn draw(&self, target: &mut Drawable, stamps: &[Stamp]) {
		if stamps.is_empty() {
			return;
		}
		let buffer = target
			.context()
			.device()
			.create_buffer_init(&wgpu::util::BufferInitDescriptor {
				label: Some("stamps"),
				contents: bytemuck::cast_slice(stamps),
				usage: wgpu::BufferUsages::VERTEX,
			});
		target.draw_pass(|pass| {
			pass.set_pipeline(&self.pipeline);
			pass.set_bind_group(1, self.texture.bind_group(), &[]);
			pass.set_vertex_buffer(0, buffer.slice(..));
			pass.draw(0..4, 0..stamps.len() as u32);
		});
	}
}

/// A stroke renderer targeting the [`Drawable`].
pub trait Brush {
	/// Stamp size for the current stroke.
	fn point_size(&self) -> f32;

	/// Distance between stamps for the current stroke.
	fn point_step(&self) -> f32;

	fn set_point_size(&mut self, size: f32);

	fn input(&mut self) -> &mut StrokeInput;

	/// Records stamps for `lines` without committing.
	fn render(&mut self, target: &mut Drawable, lines: &[Line], color: DrawingColor);

	/// Feeds one gesture event and presents whatever it produced.
	fn updated(
		&mut self,
		target: &mut Drawable,
		position: Vec2,
		color: DrawingColor,
		state: GestureState,
		size: f32,
	) {
		self.set_point_size(size);
		let (point_size, point_step) = (self.point_size(), self.point_step());
		let lines = self.input().update(position, state, point_size, point_step);
		if !lines.is_empty() {
			self.render(target, &lines, color);
			target.commit(false);
		}
	}

	/// Renders a whole recorded stroke and waits for the GPU to finish it.
	fn setup(&mut self, target: &mut Drawable, points: &[Vec2], color: DrawingColor, size: f32) {
		self.set_point_size(size);
		let (point_size, point_step) = (self.point_size(), self.point_step());
		let lines = self.input().replay(points, point_size, point_step);
		self.render(target, &lines, color);
		target.commit(true);
	}
}

/// Tinted single-texture stamps. Coverage accumulates additively, so overlapping stamps
/// saturate instead of darkening.
#[derive(Debug)]
pub struct StampBrush {
	input: StrokeInput,
	stamper: Stamper,
	size: f32,
	dash: Option<f32>,
	rotation: Rotation,
}

impl StampBrush {
	pub fn new(
		device: &wgpu::Device,
		resources: &Resources,
		texture: Rc<Texture>,
		dash: Option<f32>,
		rotation: Rotation,
	) -> Self {
		Self {
			input: StrokeInput::new(),
			stamper: Stamper::new(
				device,
				resources,
				texture,
				StampFragment::Tinted,
				BrushBlend::Accumulate,
			),
			size: 1.0,
			dash,
			rotation,
		}
	}

	pub fn rotation(&self) -> Rotation {
		self.rotation
	}
}

impl Brush for StampBrush {
	fn point_size(&self) -> f32 {
		self.size
	}

	fn point_step(&self) -> f32 {
		match (self.dash, self.rotation) {
			(Some(dash), _) => self.size * (1.0 + dash),
			(None, Rotation::Random) => self.size * 0.1,
			(None, _) => (self.size * 0.1).min(1.0),
		}
	}

	fn set_point_size(&mut self, size: f32) {
		self.size = size;
	}

	fn input(&mut self) -> &mut StrokeInput {
		&mut self.input
	}

	fn render(&mut self, target: &mut Drawable, lines: &[Line], color: DrawingColor) {
		let stamps = stamps_along(lines, color, self.rotation);
		self.stamper.draw(target, &stamps);
	}
}

/// Stamps an image as-is, blended straight alpha-over.
#[derive(Debug)]
pub struct PrinterBrush {
	input: StrokeInput,
	stamper: Stamper,
	size: f32,
	offset: f32,
}

impl PrinterBrush {
	pub fn new(device: &wgpu::Device, resources: &Resources, texture: Rc<Texture>, offset: f32) -> Self {
		Self {
			input: StrokeInput::new(),
			stamper: Stamper::new(
				device,
				resources,
				texture,
				StampFragment::Image,
				BrushBlend::AlphaOver,
			),
			size: 1.0,
			offset,
		}
	}
}

impl Brush for PrinterBrush {
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
		self.stamper.draw(target, &stamps);
	}
}

/// Dense stamps colored by a palette over canvas position.
#[derive(Debug)]
pub struct RainbowBrush {
	input: StrokeInput,
	stamper: Stamper,
	size: f32,
}

impl RainbowBrush {
	pub fn new(device: &wgpu::Device, resources: &Resources, texture: Rc<Texture>) -> Self {
		Self {
			input: StrokeInput::new(),
			stamper: Stamper::new(
				device,
				resources,
				texture,
				StampFragment::Rainbow,
				BrushBlend::Accumulate,
			),
			size: 1.0,
		}
	}
}

impl Brush for RainbowBrush {
	fn point_size(&self) -> f32 {
		self.size
	}

	fn point_step(&self) -> f32 {
		self.size * 0.02
	}

	fn set_point_size(&mut self, size: f32) {
		self.size = size;
	}

	fn input(&mut self) -> &mut StrokeInput {
		&mut self.input
	}

	fn render(&mut self, target: &mut Drawable, lines: &[Line], _color: DrawingColor) {
		let stamps = stamps_along(lines, DrawingColor::WHITE, Rotation::Fixed(0.0));
		self.stamper.draw(target, &stamps);
	}
}
