//! Undo and redo as region diffs.
//!
//! Each commit records only what the committed rect looked like before, so the cost of a
//! history step follows the stroke's bounding box rather than the canvas size.

use super::raster::RasterImage;
use super::slice::{Slice, SliceStore};
use crate::geom::PixelRect;

#[derive(Debug)]
pub enum DrawingOperation {
	/// First stroke on an empty canvas: undoing it clears everything.
	ClearAll(PixelRect),
	/// The pixels a stroke overwrote.
	Slice(Slice),
}

pub struct History {
	undo: Vec<DrawingOperation>,
	redo: Vec<Slice>,
	content_rect: Option<PixelRect>,
	has_opaque_seed: bool,
	slices: SliceStore,
}

impl std::fmt::Debug for History {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("History")
			.field("undo", &self.undo.len())
			.field("redo", &self.redo.len())
			.field("content_rect", &self.content_rect)
			.field("has_opaque_seed", &self.has_opaque_seed)
			.finish()
	}
}

impl History {
	pub fn new(slices: SliceStore) -> Self {
		Self {
			undo: Vec::new(),
			redo: Vec::new(),
			content_rect: None,
			has_opaque_seed: false,
			slices,
		}
	}

	pub fn can_undo(&self) -> bool {
		!self.undo.is_empty()
	}

	pub fn can_redo(&self) -> bool {
		!self.redo.is_empty()
	}

	/// Whether there is anything to erase or clear.
	pub fn can_clear(&self) -> bool {
		self.can_undo() || self.has_opaque_seed
	}

	pub fn has_opaque_seed(&self) -> bool {
		self.has_opaque_seed
	}

	/// Union of every committed rect still in effect.
	pub fn content_rect(&self) -> Option<PixelRect> {
		self.content_rect
	}

	pub fn slices(&self) -> &SliceStore {
		&self.slices
	}

	fn needs_slice(&self) -> bool {
		!self.undo.is_empty() || self.has_opaque_seed
	}

	fn undo_operation(&self, image: &RasterImage, rect: PixelRect) -> DrawingOperation {
		if self.needs_slice() {
			DrawingOperation::Slice(self.slices.slice(image.crop(rect), rect, self.content_rect))
		} else {
			DrawingOperation::ClearAll(rect)
		}
	}

	/// Runs `draw` against `image`, recording how to revert `bounds`. Nothing is recorded when
	/// `draw` fails. `draw` must not touch pixels outside `bounds`.
	pub fn commit<E>(
		&mut self,
		image: &mut RasterImage,
		bounds: PixelRect,
		draw: impl FnOnce(&mut RasterImage) -> Result<(), E>,
	) -> Result<(), E> {
		let operation = self.undo_operation(image, bounds);
		draw(image)?;
		self.undo.push(operation);
		self.content_rect = Some(match self.content_rect {
			Some(content_rect) => content_rect.union(bounds),
			None => bounds,
		});
		self.redo.clear();
		tracing::debug!(%bounds, undo = self.undo.len(), "committed");
		Ok(())
	}

	/// Reverts the last commit. Returns whether the image changed.
	pub fn undo(&mut self, image: &mut RasterImage) -> bool {
		let Some(operation) = self.undo.pop() else {
			return false;
		};
		match operation {
			DrawingOperation::ClearAll(rect) => {
				let redo = self.slices.slice(image.crop(rect), rect, self.content_rect);
				self.redo.push(redo);
				image.clear();
				self.content_rect = None;
			}
			DrawingOperation::Slice(slice) => {
				let saved = match slice.load() {
					Ok(saved) => saved,
					Err(error) => {
						tracing::error!(%error, rect = %slice.rect(), "undo step dropped");
						return false;
					}
				};
				let rect = slice.rect();
				let redo = self.slices.slice(image.crop(rect), rect, self.content_rect);
				self.redo.push(redo);
				image.paste(&saved, rect.x, rect.y);
				self.content_rect = slice.content_rect();
			}
		}
		true
	}

	/// Reapplies the last undone commit. Returns whether the image changed.
	pub fn redo(&mut self, image: &mut RasterImage) -> bool {
		let Some(slice) = self.redo.pop() else {
			return false;
		};
		let saved = match slice.load() {
			Ok(saved) => saved,
			Err(error) => {
				tracing::error!(%error, rect = %slice.rect(), "redo step dropped");
				return false;
			}
		};
		let rect = slice.rect();
		let operation = self.undo_operation(image, rect);
		self.undo.push(operation);
		image.paste(&saved, rect.x, rect.y);
		self.content_rect = slice.content_rect();
		true
	}

	/// Empties the image and forgets all history.
	pub fn clear(&mut self, image: &mut RasterImage) {
		image.clear();
		self.undo.clear();
		self.redo.clear();
		self.content_rect = None;
		self.has_opaque_seed = false;
	}

	/// Starts over from an image that was loaded rather than drawn.
	pub fn seed(&mut self) {
		self.undo.clear();
		self.redo.clear();
		self.content_rect = None;
		self.has_opaque_seed = true;
	}
}
