//! CPU-side pixel buffers.
//!
//! Every [`RasterImage`] stores premultiplied RGBA8 rows without padding, which is also the
//! layout `tiny-skia` draws into, so vector tools can rasterize directly into canvas memory.

use crate::geom::PixelRect;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
	#[error("pixel buffer of {actual} bytes does not match {width}x{height}")]
	SizeMismatch { width: u32, height: u32, actual: usize },

	#[error("image dimensions must be non-zero")]
	Empty,
}

static_assertions::assert_impl_all!(RasterError: std::error::Error, Send, Sync);

#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
	width: u32,
	height: u32,
	data: Vec<u8>,
}

impl std::fmt::Debug for RasterImage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RasterImage")
			.field("width", &self.width)
			.field("height", &self.height)
			.finish_non_exhaustive()
	}
}

impl RasterImage {
	/// A fully transparent image.
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width,
			height,
			data: vec![0; width as usize * height as usize * 4],
		}
	}

	pub fn filled(width: u32, height: u32, premultiplied: [u8; 4]) -> Self {
		let mut image = Self::new(width, height);
		image.fill(premultiplied);
		image
	}

	pub fn from_premultiplied(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
		if width == 0 || height == 0 {
			return Err(RasterError::Empty);
		}
		if data.len() != width as usize * height as usize * 4 {
			return Err(RasterError::SizeMismatch {
				width,
				height,
				actual: data.len(),
			});
		}
		Ok(Self {
			width,
			height,
			data,
		})
	}

	/// Builds an image from straight (non-premultiplied) RGBA8 data, as produced by decoders.
	pub fn from_straight(width: u32, height: u32, mut data: Vec<u8>) -> Result<Self, RasterError> {
		for pixel in data.chunks_exact_mut(4) {
			let alpha = pixel[3] as u32;
			for channel in &mut pixel[..3] {
				*channel = mul_div_255(*channel as u32, alpha);
			}
		}
		Self::from_premultiplied(width, height, data)
	}

	/// Straight-alpha RGBA8 copy of the pixels, as expected by encoders.
	pub fn to_straight(&self) -> Vec<u8> {
		let mut data = self.data.clone();
		for pixel in data.chunks_exact_mut(4) {
			let alpha = pixel[3] as u32;
			if alpha == 0 {
				continue;
			}
			for channel in &mut pixel[..3] {
				*channel = ((*channel as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
			}
		}
		data
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn bounds(&self) -> PixelRect {
		PixelRect::full(self.width, self.height)
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
		let offset = self.offset(x, y);
		[
			self.data[offset],
			self.data[offset + 1],
			self.data[offset + 2],
			self.data[offset + 3],
		]
	}

	pub fn set_pixel(&mut self, x: u32, y: u32, premultiplied: [u8; 4]) {
		let offset = self.offset(x, y);
		self.data[offset..offset + 4].copy_from_slice(&premultiplied);
	}

	fn offset(&self, x: u32, y: u32) -> usize {
		(y as usize * self.width as usize + x as usize) * 4
	}

	fn row_range(&self, y: u32, x: u32, width: u32) -> std::ops::Range<usize> {
		let start = self.offset(x, y);
		start..start + width as usize * 4
	}

	pub fn is_transparent(&self) -> bool {
		self.data.chunks_exact(4).all(|pixel| pixel[3] == 0)
	}

	pub fn fill(&mut self, premultiplied: [u8; 4]) {
		for pixel in self.data.chunks_exact_mut(4) {
			pixel.copy_from_slice(&premultiplied);
		}
	}

	pub fn clear(&mut self) {
		self.data.fill(0);
	}

	/// Copies the pixels inside `rect` into a new image. `rect` must lie inside the image.
	pub fn crop(&self, rect: PixelRect) -> RasterImage {
		debug_assert!(self.bounds().contains_rect(&rect));
		let mut result = RasterImage::new(rect.width, rect.height);
		for row in 0..rect.height {
			let source = self.row_range(rect.y + row, rect.x, rect.width);
			let destination = result.row_range(row, 0, rect.width);
			result.data[destination].copy_from_slice(&self.data[source]);
		}
		result
	}

	/// Replaces the pixels at (`x`, `y`) with `source`, ignoring alpha. Parts of `source` outside
	/// this image are skipped.
	pub fn paste(&mut self, source: &RasterImage, x: u32, y: u32) {
		let width = source.width.min(self.width.saturating_sub(x));
		let height = source.height.min(self.height.saturating_sub(y));
		for row in 0..height {
			let from = source.row_range(row, 0, width);
			let to = self.row_range(y + row, x, width);
			self.data[to].copy_from_slice(&source.data[from]);
		}
	}

	/// Mask intersection: every overlapping destination pixel takes alpha
	/// `min(dst.a, src.a)` and has its color channels scaled by that alpha.
	pub fn blt(&mut self, source: &RasterImage, x: u32, y: u32) {
		let width = source.width.min(self.width.saturating_sub(x));
		let height = source.height.min(self.height.saturating_sub(y));
		for row in 0..height {
			let from = source.row_range(row, 0, width);
			let to = self.row_range(y + row, x, width);
			for (dst, src) in self.data[to]
				.chunks_exact_mut(4)
				.zip(source.data[from].chunks_exact(4))
			{
				let alpha = dst[3].min(src[3]) as u32;
				for channel in &mut dst[..3] {
					*channel = (*channel as u32 * alpha / 255) as u8;
				}
				dst[3] = alpha as u8;
			}
		}
	}

	/// Source-over composite of `source` (same size as `self`), restricted to `clip`.
	pub fn composite_over(&mut self, source: &RasterImage, clip: PixelRect) {
		debug_assert_eq!((self.width, self.height), (source.width, source.height));
		let patch = source.crop(clip);
		self.composite_patch(&patch, clip.x, clip.y);
	}

	/// Source-over composite of a smaller `patch` placed at (`x`, `y`).
	pub fn composite_patch(&mut self, patch: &RasterImage, x: u32, y: u32) {
		let Some(patch) = patch.pixmap_ref() else {
			return;
		};
		if let Some(mut target) = self.pixmap_mut() {
			target.draw_pixmap(
				x as i32,
				y as i32,
				patch,
				&tiny_skia::PixmapPaint::default(),
				tiny_skia::Transform::identity(),
				None,
			);
		}
	}

	/// Bilinear resample to `width` x `height`.
	pub fn scaled(&self, width: u32, height: u32) -> RasterImage {
		let mut result = RasterImage::new(width, height);
		if (width, height) == (self.width, self.height) {
			result.data.copy_from_slice(&self.data);
			return result;
		}
		let (Some(source), Some(mut target)) = (self.pixmap_ref(), result.pixmap_mut()) else {
			return result;
		};
		let transform = tiny_skia::Transform::from_scale(
			width as f32 / self.width as f32,
			height as f32 / self.height as f32,
		);
		target.draw_pixmap(
			0,
			0,
			source,
			&tiny_skia::PixmapPaint {
				blend_mode: tiny_skia::BlendMode::Source,
				quality: tiny_skia::FilterQuality::Bilinear,
				..Default::default()
			},
			transform,
			None,
		);
		result
	}

	/// Largest size with the same aspect ratio fitting in `max_dimension` squared.
	pub fn fitted_size(&self, max_dimension: u32) -> (u32, u32) {
		let largest = self.width.max(self.height);
		if largest <= max_dimension {
			return (self.width, self.height);
		}
		let scale = max_dimension as f64 / largest as f64;
		(
			((self.width as f64 * scale).round() as u32).max(1),
			((self.height as f64 * scale).round() as u32).max(1),
		)
	}

	/// Separable box blur of the given `radius` over every channel.
	pub fn box_blur(&mut self, radius: u32) {
		if radius == 0 {
			return;
		}
		let (width, height) = (self.width as usize, self.height as usize);
		let mut scratch = vec![0u8; self.data.len()];
		blur_lines(&self.data, &mut scratch, height, width, 4 * width, 4, radius as usize);
		blur_lines(&scratch, &mut self.data, width, height, 4, 4 * width, radius as usize);
	}

	pub(crate) fn pixmap_ref(&self) -> Option<tiny_skia::PixmapRef<'_>> {
		tiny_skia::PixmapRef::from_bytes(&self.data, self.width, self.height)
	}

	pub(crate) fn pixmap_mut(&mut self) -> Option<tiny_skia::PixmapMut<'_>> {
		tiny_skia::PixmapMut::from_bytes(&mut self.data, self.width, self.height)
	}
}

fn mul_div_255(value: u32, alpha: u32) -> u8 {
	((value * alpha + 127) / 255) as u8
}

/// Blurs `lines` runs of `length` pixels. `line_stride` and `pixel_stride` are in bytes.
fn blur_lines(
	source: &[u8],
	target: &mut [u8],
	lines: usize,
	length: usize,
	line_stride: usize,
	pixel_stride: usize,
	radius: usize,
) {
	let window = (2 * radius + 1) as u32;
	let clamp = |i: isize| i.clamp(0, length as isize - 1) as usize;
	for line in 0..lines {
		let base = line * line_stride;
		let at = |i: usize, c: usize| source[base + i * pixel_stride + c] as u32;
		for channel in 0..4 {
			let mut sum: u32 = (-(radius as isize)..=radius as isize)
				.map(|i| at(clamp(i), channel))
				.sum();
			for i in 0..length {
				target[base + i * pixel_stride + channel] = ((sum + window / 2) / window) as u8;
				let outgoing = clamp(i as isize - radius as isize);
				let incoming = clamp(i as isize + radius as isize + 1);
				sum = sum + at(incoming, channel) - at(outgoing, channel);
			}
		}
	}
}
