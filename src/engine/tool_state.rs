//! Configured tool parameters.
//!
//! Tool states compare by identity: every constructor and every `with_updated_*` call mints a
//! new [`StateId`], so two independently built states are never equal even when every
//! parameter matches. Cloning keeps the id.

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("invalid color {input:?}: {reason}")]
pub struct ColorError {
	input: String,
	reason: String,
}

/// Straight-alpha RGBA in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawingColor {
	pub red: f32,
	pub green: f32,
	pub blue: f32,
	pub alpha: f32,
}

impl DrawingColor {
	pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
	pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

	pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
		Self {
			red,
			green,
			blue,
			alpha,
		}
	}

	/// Opaque color from a `0xRRGGBB` literal.
	pub fn from_rgb(rgb: u32) -> Self {
		let channel = |shift: u32| ((rgb >> shift) & 0xff) as f32 / 255.0;
		Self::new(channel(16), channel(8), channel(0), 1.0)
	}

	pub fn with_alpha(self, alpha: f32) -> Self {
		Self { alpha, ..self }
	}

	pub fn mix(self, other: Self, t: f32) -> Self {
		let lerp = |a: f32, b: f32| a + (b - a) * t;
		Self::new(
			lerp(self.red, other.red),
			lerp(self.green, other.green),
			lerp(self.blue, other.blue),
			lerp(self.alpha, other.alpha),
		)
	}

	pub fn to_array(self) -> [f32; 4] {
		[self.red, self.green, self.blue, self.alpha]
	}

	pub fn to_premultiplied_rgba8(self) -> [u8; 4] {
		let alpha = self.alpha.clamp(0.0, 1.0);
		let channel = |value: f32| (value.clamp(0.0, 1.0) * alpha * 255.0).round() as u8;
		[
			channel(self.red),
			channel(self.green),
			channel(self.blue),
			(alpha * 255.0).round() as u8,
		]
	}

	pub fn to_tiny_skia(self) -> tiny_skia::Color {
		tiny_skia::Color::from_rgba(
			self.red.clamp(0.0, 1.0),
			self.green.clamp(0.0, 1.0),
			self.blue.clamp(0.0, 1.0),
			self.alpha.clamp(0.0, 1.0),
		)
		.unwrap_or(tiny_skia::Color::BLACK)
	}
}

impl std::str::FromStr for DrawingColor {
	type Err = ColorError;

	/// Accepts any CSS color, e.g. `#ff453a` or `rgba(0, 0, 0, 0.5)`.
	fn from_str(input: &str) -> Result<Self, Self::Err> {
		let color = csscolorparser::parse(input).map_err(|error| ColorError {
			input: input.to_owned(),
			reason: error.to_string(),
		})?;
		let [r, g, b, a] = color.to_rgba8();
		Ok(Self::new(
			r as f32 / 255.0,
			g as f32 / 255.0,
			b as f32 / 255.0,
			a as f32 / 255.0,
		))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{_0}")]
pub struct StateId(uuid::Uuid);

impl StateId {
	pub fn fresh() -> Self {
		Self(uuid::Uuid::new_v4())
	}
}

/// Encoded bytes of a brush image. Decoding happens when the brush is activated.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedImage(Arc<[u8]>);

impl EncodedImage {
	pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
		Self(bytes.into())
	}

	pub fn bytes(&self) -> &[u8] {
		&self.0
	}
}

impl std::fmt::Debug for EncodedImage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "EncodedImage({} bytes)", self.0.len())
	}
}

/// How a chartlet brush picks the next texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderStyle {
	#[default]
	Sequential,
	Random,
}

#[derive(Clone, Debug)]
pub struct BrushState {
	id: StateId,
	pub color: DrawingColor,
	/// Fraction of the canvas-relative maximum width, usually `0..=1`.
	pub size: f32,
	pub images: Vec<Option<EncodedImage>>,
	/// Gap between dashes relative to the dash length. Markers draw dashed only when set.
	pub dash_size: Option<f32>,
	pub render_style: RenderStyle,
	/// Spacing between chartlet stamps, in `(-1, 1)`.
	pub offset: f32,
}

#[bon::bon]
impl BrushState {
	#[builder]
	pub fn new(
		color: DrawingColor,
		size: f32,
		#[builder(default)] images: Vec<Option<EncodedImage>>,
		dash_size: Option<f32>,
		#[builder(default)] render_style: RenderStyle,
		#[builder(default)] offset: f32,
	) -> Self {
		Self {
			id: StateId::fresh(),
			color,
			size,
			images,
			dash_size,
			render_style,
			offset,
		}
	}
}

impl BrushState {
	pub fn id(&self) -> StateId {
		self.id
	}

	fn rebuilt(&self) -> Self {
		Self {
			id: StateId::fresh(),
			..self.clone()
		}
	}

	pub fn with_updated_color(&self, color: DrawingColor) -> Self {
		Self {
			color,
			..self.rebuilt()
		}
	}

	pub fn with_updated_size(&self, size: f32) -> Self {
		Self {
			size,
			..self.rebuilt()
		}
	}

	pub fn with_updated_images(&self, images: Vec<Option<EncodedImage>>) -> Self {
		Self {
			images,
			..self.rebuilt()
		}
	}

	pub fn with_updated_dash_size(&self, dash_size: Option<f32>) -> Self {
		Self {
			dash_size,
			..self.rebuilt()
		}
	}

	pub fn with_updated_render_style(&self, render_style: RenderStyle) -> Self {
		Self {
			render_style,
			..self.rebuilt()
		}
	}

	pub fn with_updated_offset(&self, offset: f32) -> Self {
		Self {
			offset,
			..self.rebuilt()
		}
	}
}

#[derive(Clone, Debug)]
pub struct EraserState {
	id: StateId,
	pub size: f32,
}

impl EraserState {
	pub fn new(size: f32) -> Self {
		Self {
			id: StateId::fresh(),
			size,
		}
	}

	pub fn id(&self) -> StateId {
		self.id
	}

	pub fn with_updated_size(&self, size: f32) -> Self {
		Self::new(size)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[repr(u8)]
pub enum ToolKey {
	Pen = 0,
	Arrow = 1,
	Marker = 2,
	Chartlet = 3,
	Rainbow = 4,
	Neon = 5,
	Blur = 6,
	Eraser = 7,
	Dash = 8,
}

impl ToolKey {
	pub const ALL: [ToolKey; 9] = [
		ToolKey::Pen,
		ToolKey::Arrow,
		ToolKey::Marker,
		ToolKey::Chartlet,
		ToolKey::Rainbow,
		ToolKey::Neon,
		ToolKey::Blur,
		ToolKey::Eraser,
		ToolKey::Dash,
	];

	/// Tools whose strokes are stamped on the GPU.
	pub fn is_gpu_backed(self) -> bool {
		matches!(self, ToolKey::Marker | ToolKey::Chartlet | ToolKey::Rainbow)
	}
}

impl TryFrom<u8> for ToolKey {
	type Error = u8;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		ToolKey::ALL.get(value as usize).copied().ok_or(value)
	}
}

#[derive(Clone, Debug)]
pub enum ToolState {
	Pen(BrushState),
	Arrow(BrushState),
	Marker(BrushState),
	Chartlet(BrushState),
	Rainbow(BrushState),
	Neon(BrushState),
	Blur(EraserState),
	Eraser(EraserState),
	Dash(BrushState),
}

impl PartialEq for ToolState {
	fn eq(&self, other: &Self) -> bool {
		self.key() == other.key() && self.id() == other.id()
	}
}

impl Eq for ToolState {}

impl ToolState {
	pub fn key(&self) -> ToolKey {
		match self {
			ToolState::Pen(_) => ToolKey::Pen,
			ToolState::Arrow(_) => ToolKey::Arrow,
			ToolState::Marker(_) => ToolKey::Marker,
			ToolState::Chartlet(_) => ToolKey::Chartlet,
			ToolState::Rainbow(_) => ToolKey::Rainbow,
			ToolState::Neon(_) => ToolKey::Neon,
			ToolState::Blur(_) => ToolKey::Blur,
			ToolState::Eraser(_) => ToolKey::Eraser,
			ToolState::Dash(_) => ToolKey::Dash,
		}
	}

	pub fn id(&self) -> StateId {
		match self {
			ToolState::Pen(state)
			| ToolState::Arrow(state)
			| ToolState::Marker(state)
			| ToolState::Chartlet(state)
			| ToolState::Rainbow(state)
			| ToolState::Neon(state)
			| ToolState::Dash(state) => state.id(),
			ToolState::Blur(state) | ToolState::Eraser(state) => state.id(),
		}
	}

	pub fn brush(&self) -> Option<&BrushState> {
		match self {
			ToolState::Pen(state)
			| ToolState::Arrow(state)
			| ToolState::Marker(state)
			| ToolState::Chartlet(state)
			| ToolState::Rainbow(state)
			| ToolState::Neon(state)
			| ToolState::Dash(state) => Some(state),
			ToolState::Blur(_) | ToolState::Eraser(_) => None,
		}
	}

	fn map_brush(&self, update: impl FnOnce(&BrushState) -> BrushState) -> Self {
		match self {
			ToolState::Pen(state) => ToolState::Pen(update(state)),
			ToolState::Arrow(state) => ToolState::Arrow(update(state)),
			ToolState::Marker(state) => ToolState::Marker(update(state)),
			ToolState::Chartlet(state) => ToolState::Chartlet(update(state)),
			ToolState::Rainbow(state) => ToolState::Rainbow(update(state)),
			ToolState::Neon(state) => ToolState::Neon(update(state)),
			ToolState::Dash(state) => ToolState::Dash(update(state)),
			ToolState::Blur(_) | ToolState::Eraser(_) => self.clone(),
		}
	}

	pub fn can_change_color(&self) -> bool {
		matches!(
			self.key(),
			ToolKey::Pen | ToolKey::Arrow | ToolKey::Marker | ToolKey::Neon | ToolKey::Dash
		)
	}

	pub fn color(&self) -> Option<DrawingColor> {
		self
			.can_change_color()
			.then(|| self.brush().map(|state| state.color))
			.flatten()
	}

	pub fn size(&self) -> f32 {
		match self {
			ToolState::Blur(state) | ToolState::Eraser(state) => state.size,
			_ => self.brush().map(|state| state.size).unwrap_or_default(),
		}
	}

	pub fn images(&self) -> &[Option<EncodedImage>] {
		match self {
			ToolState::Marker(state) | ToolState::Chartlet(state) | ToolState::Rainbow(state) => {
				&state.images
			}
			_ => &[],
		}
	}

	pub fn dash_size(&self) -> Option<f32> {
		match self {
			ToolState::Marker(state) | ToolState::Dash(state) => state.dash_size,
			_ => None,
		}
	}

	pub fn with_updated_color(&self, color: DrawingColor) -> Self {
		self.map_brush(|state| state.with_updated_color(color))
	}

	pub fn with_updated_size(&self, size: f32) -> Self {
		match self {
			ToolState::Blur(state) => ToolState::Blur(state.with_updated_size(size)),
			ToolState::Eraser(state) => ToolState::Eraser(state.with_updated_size(size)),
			_ => self.map_brush(|state| state.with_updated_size(size)),
		}
	}

	pub fn with_updated_images(&self, images: Vec<Option<EncodedImage>>) -> Self {
		match self {
			ToolState::Marker(_) | ToolState::Chartlet(_) | ToolState::Rainbow(_) => {
				self.map_brush(|state| state.with_updated_images(images))
			}
			_ => self.clone(),
		}
	}

	pub fn with_updated_dash_size(&self, dash_size: Option<f32>) -> Self {
		match self {
			ToolState::Marker(_) | ToolState::Dash(_) => {
				self.map_brush(|state| state.with_updated_dash_size(dash_size))
			}
			_ => self.clone(),
		}
	}

	pub fn with_updated_render_style(&self, render_style: RenderStyle) -> Self {
		match self {
			ToolState::Chartlet(_) => self.map_brush(|state| state.with_updated_render_style(render_style)),
			_ => self.clone(),
		}
	}

	pub fn with_updated_offset(&self, offset: f32) -> Self {
		match self {
			ToolState::Chartlet(_) => self.map_brush(|state| state.with_updated_offset(offset)),
			_ => self.clone(),
		}
	}
}

/// The palette of configured tools plus the selection.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawingState {
	pub selected_index: usize,
	pub tools: Vec<ToolState>,
}

impl Default for DrawingState {
	fn default() -> Self {
		Self::initial()
	}
}

impl DrawingState {
	pub fn initial() -> Self {
		let brush = |rgb, size| BrushState::builder().color(DrawingColor::from_rgb(rgb)).size(size).build();
		Self {
			selected_index: 0,
			tools: vec![
				ToolState::Pen(brush(0xff453a, 0.23)),
				ToolState::Arrow(brush(0xff8a00, 0.23)),
				ToolState::Marker(brush(0xffd60a, 0.2)),
				ToolState::Chartlet(brush(0xffd60a, 0.3)),
				ToolState::Neon(brush(0x34c759, 0.4)),
				ToolState::Rainbow(brush(0xffd60a, 0.2)),
				ToolState::Blur(EraserState::new(0.5)),
				ToolState::Eraser(EraserState::new(0.5)),
			],
		}
	}

	pub fn current(&self) -> Option<&ToolState> {
		self.tools.get(self.selected_index)
	}

	pub fn with_selected_index(&self, selected_index: usize) -> Self {
		Self {
			selected_index,
			tools: self.tools.clone(),
		}
	}

	pub fn with_appended(&self, tool: ToolState) -> Self {
		let mut tools = self.tools.clone();
		tools.push(tool);
		Self {
			selected_index: self.selected_index,
			tools,
		}
	}

	fn with_current(&self, update: impl FnOnce(&ToolState) -> ToolState) -> Self {
		let mut tools = self.tools.clone();
		if let Some(tool) = tools.get_mut(self.selected_index) {
			*tool = update(tool);
		}
		Self {
			selected_index: self.selected_index,
			tools,
		}
	}

	pub fn with_updated_color(&self, color: DrawingColor) -> Self {
		self.with_current(|tool| tool.with_updated_color(color))
	}

	pub fn with_updated_size(&self, size: f32) -> Self {
		self.with_current(|tool| tool.with_updated_size(size))
	}

	/// The palette without tools that need a still image underneath.
	pub fn for_video(&self) -> Self {
		Self {
			selected_index: 0,
			tools: self
				.tools
				.iter()
				.filter(|tool| tool.key() != ToolKey::Blur)
				.cloned()
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pen() -> BrushState {
		BrushState::builder().color(DrawingColor::BLACK).size(0.25).build()
	}

	#[test]
	fn independently_built_states_are_unequal() {
		let a = ToolState::Pen(pen());
		let b = ToolState::Pen(pen());
		assert_ne!(a, b);
		assert_eq!(a, a.clone());
	}

	#[test]
	fn same_id_different_tag_is_unequal() {
		let state = pen();
		assert_ne!(ToolState::Pen(state.clone()), ToolState::Arrow(state));
	}

	#[test]
	fn updates_mint_fresh_ids() {
		let original = ToolState::Pen(pen());
		let updated = original.with_updated_color(DrawingColor::BLACK);
		assert_ne!(original, updated);
		assert_eq!(updated.color(), Some(DrawingColor::BLACK));

		// Updates a variant ignores leave the state untouched.
		let eraser = ToolState::Eraser(EraserState::new(0.5));
		assert_eq!(eraser.with_updated_color(DrawingColor::WHITE), eraser);
		assert_ne!(eraser.with_updated_size(0.5), eraser);
	}

	#[test]
	fn accessors_follow_variant() {
		let marker = ToolState::Marker(pen().with_updated_dash_size(Some(0.5)));
		assert_eq!(marker.dash_size(), Some(0.5));
		assert!(marker.can_change_color());
		let rainbow = ToolState::Rainbow(pen());
		assert_eq!(rainbow.color(), None);
		assert!(rainbow.key().is_gpu_backed());
		assert_eq!(ToolKey::try_from(8), Ok(ToolKey::Dash));
		assert_eq!(ToolKey::try_from(9), Err(9));
	}

	#[test]
	fn colors_parse_from_css() -> anyhow::Result<()> {
		let color: DrawingColor = "#ff453a".parse()?;
		assert_eq!(color, DrawingColor::from_rgb(0xff453a));
		assert!("not a color".parse::<DrawingColor>().is_err());
		assert_eq!(DrawingColor::BLACK.with_alpha(0.5).to_premultiplied_rgba8(), [0, 0, 0, 128]);
		Ok(())
	}

	#[test]
	fn initial_palette() {
		let state = DrawingState::initial();
		assert_eq!(state.current().map(ToolState::key), Some(ToolKey::Pen));
		let video = state.for_video();
		assert!(video.tools.iter().all(|tool| tool.key() != ToolKey::Blur));
		let resized = state.with_updated_size(0.9);
		assert_eq!(resized.current().map(ToolState::size), Some(0.9));
		assert_ne!(resized, state);
	}
}
