use super::raster::RasterImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurSettings {
	/// Longest side of the blurred image.
	pub max_dimension: u32,
	pub radius: u32,
	pub passes: u32,
}

/// Downscaled, blurred composite of the photo (if any) and the drawing over white, used as
/// the source of the blur pen. Runs off the UI thread on snapshot copies.
#[tracing::instrument(skip_all, fields(width = drawing.width(), height = drawing.height()))]
pub fn precompute(base: Option<&RasterImage>, drawing: &RasterImage, settings: BlurSettings) -> RasterImage {
	let (width, height) = drawing.fitted_size(settings.max_dimension);
	let mut composite = RasterImage::filled(width, height, [255, 255, 255, 255]);
	if let Some(base) = base {
		composite.composite_patch(&base.scaled(width, height), 0, 0);
	}
	composite.composite_patch(&drawing.scaled(width, height), 0, 0);
	for _ in 0..settings.passes {
		composite.box_blur(settings.radius);
	}
	tracing::debug!(width, height, "blur precomputed");
	composite
}
