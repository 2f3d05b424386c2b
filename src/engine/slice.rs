//! Two-tier storage for history slices.
//!
//! A freshly created [`Slice`] keeps its pixels in memory. A background writer encodes it to a
//! temporary file once the eviction delay has passed and then drops the in-memory copy;
//! [`Slice::load`] transparently reads it back. Dropping the slice deletes the file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

use tempfile::TempPath;
use thiserror::Error;

use super::raster::RasterImage;
use crate::geom::PixelRect;
use crate::util::image::{CodecError, ImageCodec};
use crate::util::Worker;

#[derive(Debug, Error)]
pub enum SliceError {
	#[error("failed to read slice: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to decode slice: {0}")]
	Codec(#[from] CodecError),

	#[error("slice {rect} has neither pixels in memory nor a file on disk")]
	Missing { rect: PixelRect },

	#[error("slice {rect} decoded to {width}x{height}")]
	SizeMismatch { rect: PixelRect, width: u32, height: u32 },
}

static_assertions::assert_impl_all!(SliceError: std::error::Error, Send, Sync);

struct SliceData {
	hot: Mutex<Option<Arc<RasterImage>>>,
	file: Mutex<Option<TempPath>>,
	codec: Arc<dyn ImageCodec>,
}

/// A cropped image, the canvas rect it was cropped from, and the content rect of the canvas
/// at the point in history it restores.
pub struct Slice {
	data: Arc<SliceData>,
	rect: PixelRect,
	content_rect: Option<PixelRect>,
}

impl std::fmt::Debug for Slice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Slice")
			.field("rect", &self.rect)
			.field("content_rect", &self.content_rect)
			.field("resident", &self.is_resident())
			.finish()
	}
}

impl Slice {
	pub fn rect(&self) -> PixelRect {
		self.rect
	}

	pub fn content_rect(&self) -> Option<PixelRect> {
		self.content_rect
	}

	/// Whether the pixels are still held in memory.
	pub fn is_resident(&self) -> bool {
		self.data.hot.lock().unwrap().is_some()
	}

	/// Location of the on-disk copy, once written.
	pub fn path(&self) -> Option<PathBuf> {
		self.data
			.file
			.lock()
			.unwrap()
			.as_ref()
			.map(|path| path.to_path_buf())
	}

	pub fn load(&self) -> Result<Arc<RasterImage>, SliceError> {
		if let Some(image) = self.data.hot.lock().unwrap().clone() {
			return Ok(image);
		}
		let path = self.path().ok_or(SliceError::Missing { rect: self.rect })?;
		let bytes = std::fs::read(&path)?;
		let image = self.data.codec.decode(&bytes)?;
		if (image.width(), image.height()) != (self.rect.width, self.rect.height) {
			return Err(SliceError::SizeMismatch {
				rect: self.rect,
				width: image.width(),
				height: image.height(),
			});
		}
		tracing::trace!(rect = %self.rect, "slice reloaded from disk");
		Ok(Arc::new(image))
	}
}

/// Creates slices and evicts them to disk in the background.
pub struct SliceStore {
	directory: Option<PathBuf>,
	delay: Duration,
	codec: Arc<dyn ImageCodec>,
	shutdown: Arc<(Mutex<bool>, Condvar)>,
	writer: Worker,
}

impl std::fmt::Debug for SliceStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SliceStore")
			.field("directory", &self.directory)
			.field("delay", &self.delay)
			.finish_non_exhaustive()
	}
}

impl SliceStore {
	/// Files go to `directory`, or the system temporary directory when `None`.
	pub fn new(
		directory: Option<PathBuf>,
		delay: Duration,
		codec: Arc<dyn ImageCodec>,
	) -> std::io::Result<Self> {
		Ok(Self {
			directory,
			delay,
			codec,
			shutdown: Arc::new((Mutex::new(false), Condvar::new())),
			writer: Worker::spawn("slice-writer")?,
		})
	}

	pub fn slice(&self, image: RasterImage, rect: PixelRect, content_rect: Option<PixelRect>) -> Slice {
		let data = Arc::new(SliceData {
			hot: Mutex::new(Some(Arc::new(image))),
			file: Mutex::new(None),
			codec: self.codec.clone(),
		});
		let weak = Arc::downgrade(&data);
		let deadline = Instant::now() + self.delay;
		let directory = self.directory.clone();
		let shutdown = self.shutdown.clone();
		self.writer.submit(move || {
			if wait_until(&shutdown, deadline) {
				evict(&weak, directory.as_deref());
			}
		});
		Slice {
			data,
			rect,
			content_rect,
		}
	}

	/// Blocks until every slice created so far has been written out or dropped.
	pub fn flush(&self) {
		self.writer.flush();
	}
}

impl Drop for SliceStore {
	fn drop(&mut self) {
		let (stopped, wake) = &*self.shutdown;
		*stopped.lock().unwrap() = true;
		wake.notify_all();
	}
}

/// Sleeps until `deadline`. Returns `false` if the store shut down first.
fn wait_until(shutdown: &(Mutex<bool>, Condvar), deadline: Instant) -> bool {
	let (stopped, wake) = shutdown;
	let timeout = deadline.saturating_duration_since(Instant::now());
	let guard = stopped.lock().unwrap();
	let (guard, _) = wake
		.wait_timeout_while(guard, timeout, |stopped| !*stopped)
		.unwrap();
	!*guard
}

fn evict(data: &Weak<SliceData>, directory: Option<&Path>) {
	// Slices dropped before their deadline need no file.
	let Some(data) = data.upgrade() else {
		return;
	};
	let Some(image) = data.hot.lock().unwrap().clone() else {
		return;
	};
	match write(data.codec.as_ref(), &image, directory) {
		Ok(path) => {
			tracing::trace!(path = %path.display(), "slice evicted");
			*data.file.lock().unwrap() = Some(path);
			*data.hot.lock().unwrap() = None;
		}
		Err(error) => tracing::warn!(%error, "slice kept in memory"),
	}
}

#[derive(Debug, Error)]
enum WriteError {
	#[error("failed to write slice: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to encode slice: {0}")]
	Codec(#[from] CodecError),
}

fn write(codec: &dyn ImageCodec, image: &RasterImage, directory: Option<&Path>) -> Result<TempPath, WriteError> {
	let bytes = codec.encode(image)?;
	let mut builder = tempfile::Builder::new();
	builder.prefix("drawing_").suffix(".slice");
	let mut file = match directory {
		Some(directory) => builder.tempfile_in(directory)?,
		None => builder.tempfile()?,
	};
	file.write_all(&bytes)?;
	file.flush()?;
	Ok(file.into_temp_path())
}
