use thiserror::Error;
use zune_core::bit_depth::BitDepth;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_image::codecs::ImageFormat;

use crate::engine::raster::{RasterError, RasterImage};

#[derive(Debug, Error)]
pub enum CodecError {
	#[error("image codec error: {0}")]
	Image(String),

	#[error(transparent)]
	Raster(#[from] RasterError),
}

static_assertions::assert_impl_all!(CodecError: std::error::Error, Send, Sync);

impl From<zune_image::errors::ImageErrors> for CodecError {
	fn from(value: zune_image::errors::ImageErrors) -> Self {
		CodecError::Image(format!("{:?}", value))
	}
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Byte-array boundary between the canvas and whatever image format the host persists.
pub trait ImageCodec: Send + Sync {
	fn encode(&self, image: &RasterImage) -> Result<Vec<u8>>;
	fn decode(&self, bytes: &[u8]) -> Result<RasterImage>;
}

/// Lossless PNG through `zune-image`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
	fn encode(&self, image: &RasterImage) -> Result<Vec<u8>> {
		let encoded = zune_image::image::Image::from_raster(image).write_to_vec(ImageFormat::PNG)?;
		Ok(encoded)
	}

	fn decode(&self, bytes: &[u8]) -> Result<RasterImage> {
		let mut image = zune_image::image::Image::read(bytes, DecoderOptions::default())?;
		let (width, height) = image.dimensions();
		let data = image.convert_to_rgba8()?;
		Ok(RasterImage::from_straight(width as u32, height as u32, data)?)
	}
}

pub trait ImageExt: Sized {
	fn from_raster(image: &RasterImage) -> Self;
	fn convert_to_rgba8(&mut self) -> Result<Vec<u8>>;
}

impl ImageExt for zune_image::image::Image {
	fn from_raster(image: &RasterImage) -> Self {
		Self::from_u8(
			&image.to_straight(),
			image.width() as usize,
			image.height() as usize,
			ColorSpace::RGBA,
		)
	}

	fn convert_to_rgba8(&mut self) -> Result<Vec<u8>> {
		self.convert_color(ColorSpace::RGBA)?;
		self.convert_depth(BitDepth::Eight)?;
		let channels = self.frames_ref()[0].channels_ref(self.colorspace(), false);
		let len: usize = channels.iter().map(|c| c.len()).sum();
		let mut data = vec![0u8; len];
		let len = zune_image::utils::swizzle_channels(channels, &mut data)?;
		data.truncate(len);
		Ok(data)
	}
}
