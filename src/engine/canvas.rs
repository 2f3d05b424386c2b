//! The drawing surface a host embeds: gesture handling, tool switching, history and
//! persistence over one persistent raster image.
//!
//! Everything here runs on the thread that owns the canvas. Work that may take a while (blur
//! precompute, arrowhead geometry, slice eviction) runs on background workers and hands
//! results back as owned values, collected by [`DrawingCanvas::poll`].

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use thiserror::Error;

use super::blur;
use super::history::History;
use super::raster::RasterImage;
use super::renderer::StrokeRenderer;
use super::slice::SliceStore;
use super::stroke::{GestureState, InputPoint};
use super::tool_state::{DrawingColor, ToolKey, ToolState};
use super::tools::{
	arrowhead, make_element, Arrowhead, ArrowheadRequest, DrawingElement, FillSource, FillTool,
	ToolContext, ToolError,
};
use crate::config::CanvasConfig;
use crate::geom::PixelRect;
use crate::util::image::{CodecError, ImageCodec, PngCodec};
use crate::util::{Completion, Promise, Worker};
use crate::{GpuContext, GpuContextError};

/// Zoom scales within this distance of 1 count as not zoomed in.
const ZOOM_EPSILON: f32 = 0.01;

#[derive(Debug, Error)]
pub enum DrawingError {
	#[error(transparent)]
	GpuInit(#[from] GpuContextError),

	#[error("{0} needs a canvas created with a GPU")]
	GpuUnavailable(ToolKey),

	#[error(transparent)]
	Tool(#[from] ToolError),

	#[error(transparent)]
	Codec(#[from] CodecError),

	#[error("drawing is {width}x{height} but the canvas is {expected_width}x{expected_height}")]
	SizeMismatch {
		width: u32,
		height: u32,
		expected_width: u32,
		expected_height: u32,
	},

	#[error("the blurred canvas has not been computed yet")]
	BlurNotReady,

	#[error("failed to start background work: {0}")]
	Io(#[from] std::io::Error),
}

static_assertions::assert_impl_all!(DrawingError: std::error::Error, Send, Sync);

/// What the host needs to enable or disable its controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
	pub can_undo: bool,
	pub can_redo: bool,
	pub can_clear: bool,
	pub can_zoom_out: bool,
	pub is_drawing: bool,
}

/// The drawn content cropped to the region that has been drawn on.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawResult {
	pub image: RasterImage,
	pub rect: PixelRect,
}

/// What [`DrawingCanvas::handle`] did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
	/// No stroke was started or none is in progress.
	Ignored,
	/// A `Changed` event arrived too soon after the previous one.
	Throttled,
	Drawing,
	Committed,
	/// The stroke ended but its arrowhead is still being computed.
	AwaitingArrowhead,
	/// The stroke ended without enough input to keep.
	Discarded,
}

#[derive(Debug)]
enum ArrowOutcome {
	Computed(Option<Arrowhead>),
	Cancelled,
}

struct PendingArrow {
	element: Box<dyn DrawingElement>,
	request: ArrowheadRequest,
	promise: Promise<ArrowOutcome>,
	completion: Completion<ArrowOutcome>,
}

pub struct DrawingCanvas {
	config: CanvasConfig,
	image: RasterImage,
	base_image: Option<Arc<RasterImage>>,
	history: History,
	renderer: Option<StrokeRenderer>,
	codec: Arc<dyn ImageCodec>,
	worker: Worker,
	epoch: Instant,

	tool: Option<ToolState>,
	zoom_scale: f32,
	element: Option<Box<dyn DrawingElement>>,
	last_event: Option<Duration>,
	pending_arrow: Option<PendingArrow>,

	blurred: Option<Arc<RasterImage>>,
	pending_blur: Option<Promise<RasterImage>>,

	begin_gate: Option<Box<dyn Fn(Vec2) -> bool>>,
	observer: Option<Box<dyn FnMut(NavigationState)>>,
}

impl std::fmt::Debug for DrawingCanvas {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DrawingCanvas")
			.field("size", &self.config.size())
			.field("tool", &self.tool.as_ref().map(ToolState::key))
			.field("zoom_scale", &self.zoom_scale)
			.field("history", &self.history)
			.field("gpu", &self.renderer.is_some())
			.finish_non_exhaustive()
	}
}

impl DrawingCanvas {
	/// A canvas without a GPU. Marker, chartlet and rainbow cannot be activated on it.
	pub fn new(config: CanvasConfig) -> Result<Self, DrawingError> {
		Self::create(config, None)
	}

	pub fn with_gpu(config: CanvasConfig, context: Rc<GpuContext>) -> Result<Self, DrawingError> {
		Self::create(config, Some(context))
	}

	/// Requests a GPU of its own before creating the canvas.
	pub async fn with_default_gpu(config: CanvasConfig) -> Result<Self, DrawingError> {
		let context = GpuContext::new().await?;
		Self::with_gpu(config, Rc::new(context))
	}

	#[tracing::instrument(skip_all, fields(width = config.width, height = config.height))]
	fn create(config: CanvasConfig, context: Option<Rc<GpuContext>>) -> Result<Self, DrawingError> {
		let codec: Arc<dyn ImageCodec> = Arc::new(PngCodec);
		let slices = SliceStore::new(
			config.slice_directory.clone(),
			config.slice_eviction_delay,
			codec.clone(),
		)?;
		let renderer = match context {
			Some(context) => {
				context.check_canvas_size(config.width, config.height)?;
				tracing::debug!(adapter = %context.adapter_info().name, "drawing brushes on the GPU");
				Some(StrokeRenderer::new(context, config.width, config.height, codec.clone()))
			}
			None => None,
		};
		tracing::info!(gpu = renderer.is_some(), "canvas created");
		Ok(Self {
			image: RasterImage::new(config.width, config.height),
			base_image: None,
			history: History::new(slices),
			renderer,
			codec,
			worker: Worker::spawn("canvas-worker")?,
			epoch: Instant::now(),
			tool: None,
			zoom_scale: 1.0,
			element: None,
			last_event: None,
			pending_arrow: None,
			blurred: None,
			pending_blur: None,
			begin_gate: None,
			observer: None,
			config,
		})
	}

	pub fn size(&self) -> (u32, u32) {
		self.config.size()
	}

	/// The full persistent image.
	pub fn image(&self) -> &RasterImage {
		&self.image
	}

	pub fn tool_state(&self) -> Option<&ToolState> {
		self.tool.as_ref()
	}

	pub fn zoom_scale(&self) -> f32 {
		self.zoom_scale
	}

	pub fn can_undo(&self) -> bool {
		self.history.can_undo()
	}

	pub fn can_redo(&self) -> bool {
		self.history.can_redo()
	}

	pub fn can_clear(&self) -> bool {
		self.history.can_clear()
	}

	pub fn is_drawing(&self) -> bool {
		self.element.is_some() || self.pending_arrow.is_some()
	}

	/// Whether the blur tool has its source image.
	pub fn is_blur_ready(&self) -> bool {
		self.blurred.is_some()
	}

	pub fn navigation_state(&self) -> NavigationState {
		NavigationState {
			can_undo: self.can_undo(),
			can_redo: self.can_redo(),
			can_clear: self.can_clear(),
			can_zoom_out: self.zoom_scale > 1.0 + ZOOM_EPSILON,
			is_drawing: self.is_drawing(),
		}
	}

	/// `observer` is called after every change to the navigation state inputs.
	pub fn set_navigation_observer(&mut self, observer: impl FnMut(NavigationState) + 'static) {
		self.observer = Some(Box::new(observer));
	}

	/// An extra host check consulted before a gesture may begin at a point.
	pub fn set_begin_gate(&mut self, gate: impl Fn(Vec2) -> bool + 'static) {
		self.begin_gate = Some(Box::new(gate));
	}

	fn notify(&mut self) {
		let state = self.navigation_state();
		if let Some(observer) = &mut self.observer {
			observer(state);
		}
	}

	/// Whether a gesture starting at `position` would be accepted.
	pub fn should_begin(&self, position: Vec2) -> bool {
		self.pending_arrow.is_none() && self.can_begin(position)
	}

	fn can_begin(&self, position: Vec2) -> bool {
		if let Some(gate) = &self.begin_gate {
			if !gate(position) {
				return false;
			}
		}
		match self.tool.as_ref().map(ToolState::key) {
			None => false,
			Some(ToolKey::Eraser) => self.history.can_clear(),
			Some(ToolKey::Blur) => self.blurred.is_some(),
			Some(_) => true,
		}
	}

	fn timestamp(&self, point: &InputPoint) -> Duration {
		point.timestamp.unwrap_or_else(|| self.epoch.elapsed())
	}

	/// Feeds one gesture event.
	pub fn handle(&mut self, point: InputPoint, state: GestureState) -> Result<GestureOutcome, DrawingError> {
		let timestamp = self.timestamp(&point);
		match state {
			GestureState::Began => self.begin(point.position, timestamp),
			GestureState::Changed => {
				if self.element.is_none() {
					return Ok(GestureOutcome::Ignored);
				}
				if let Some(last) = self.last_event {
					if timestamp.saturating_sub(last) < self.config.changed_interval {
						tracing::trace!(?timestamp, "changed event throttled");
						return Ok(GestureOutcome::Throttled);
					}
				}
				self.last_event = Some(timestamp);
				let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
				if let Some(element) = &mut self.element {
					element.update_path(point.position, state, &mut context);
				}
				Ok(GestureOutcome::Drawing)
			}
			GestureState::Ended | GestureState::Cancelled => {
				let Some(mut element) = self.element.take() else {
					return Ok(GestureOutcome::Ignored);
				};
				self.last_event = None;
				let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
				element.update_path(point.position, state, &mut context);
				let outcome = self.finish(element, false);
				self.notify();
				outcome
			}
		}
	}

	fn begin(&mut self, position: Vec2, timestamp: Duration) -> Result<GestureOutcome, DrawingError> {
		// A stroke still open or awaiting its arrowhead is committed before the next one.
		if let Some(element) = self.element.take() {
			self.finish(element, true)?;
		}
		self.settle_arrow()?;
		if !self.can_begin(position) {
			return Ok(GestureOutcome::Ignored);
		}
		let Some(tool) = &self.tool else {
			return Ok(GestureOutcome::Ignored);
		};
		let mut element = make_element(tool, self.size(), self.zoom_scale, self.blurred.clone());
		let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
		element.update_path(position, GestureState::Began, &mut context);
		tracing::debug!(tool = %element.key(), "stroke began");
		self.element = Some(element);
		self.last_event = Some(timestamp);
		self.notify();
		Ok(GestureOutcome::Drawing)
	}

	/// Commits or discards a stroke whose input is complete. Arrows hand their head to the
	/// worker unless `synchronous`.
	fn finish(
		&mut self,
		mut element: Box<dyn DrawingElement>,
		synchronous: bool,
	) -> Result<GestureOutcome, DrawingError> {
		if !element.is_valid() {
			let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
			element.cancel(&mut context);
			tracing::debug!(tool = %element.key(), "stroke discarded");
			return Ok(GestureOutcome::Discarded);
		}
		if let Some(request) = element.request_arrowhead() {
			if synchronous {
				element.apply_arrowhead(arrowhead(&request));
			} else {
				self.await_arrowhead(element, request);
				return Ok(GestureOutcome::AwaitingArrowhead);
			}
		}
		self.commit(element)?;
		Ok(GestureOutcome::Committed)
	}

	fn await_arrowhead(&mut self, element: Box<dyn DrawingElement>, request: ArrowheadRequest) {
		let (promise, completion) = Completion::new();
		{
			let request = request.clone();
			let completion = completion.clone();
			self.worker.submit(move || {
				completion.complete(ArrowOutcome::Computed(arrowhead(&request)));
			});
		}
		self.pending_arrow = Some(PendingArrow {
			element,
			request,
			promise,
			completion,
		});
	}

	/// Commits a pending arrow now, computing its head here if the worker has not.
	fn settle_arrow(&mut self) -> Result<(), DrawingError> {
		let Some(mut pending) = self.pending_arrow.take() else {
			return Ok(());
		};
		let head = match pending.promise.try_take() {
			Some(ArrowOutcome::Computed(head)) => head,
			Some(ArrowOutcome::Cancelled) => return Ok(()),
			None => {
				pending.completion.complete(ArrowOutcome::Cancelled);
				arrowhead(&pending.request)
			}
		};
		pending.element.apply_arrowhead(head);
		self.commit(pending.element)
	}

	fn cancel_arrow(&mut self) {
		if let Some(pending) = self.pending_arrow.take() {
			pending.completion.complete(ArrowOutcome::Cancelled);
			tracing::debug!("pending arrow cancelled");
		}
	}

	/// Drops the stroke in progress and any arrow awaiting its head.
	fn cancel_stroke(&mut self) {
		if let Some(mut element) = self.element.take() {
			let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
			element.cancel(&mut context);
		}
		self.last_event = None;
		self.cancel_arrow();
	}

	fn commit(&mut self, mut element: Box<dyn DrawingElement>) -> Result<(), DrawingError> {
		let (width, height) = self.size();
		let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
		let Some(bounds) = element.pixel_bounds(width, height) else {
			element.cancel(&mut context);
			return Ok(());
		};
		self.history
			.commit(&mut self.image, bounds, |image| element.draw(image, bounds, &mut context))?;
		tracing::debug!(tool = %element.key(), %bounds, "stroke committed");
		self.notify();
		Ok(())
	}

	/// Collects finished background work: the blurred canvas and arrowheads.
	pub fn poll(&mut self) -> Result<(), DrawingError> {
		if let Some(promise) = &mut self.pending_blur {
			if let Some(blurred) = promise.try_take() {
				self.blurred = Some(Arc::new(blurred));
				self.pending_blur = None;
			}
		}
		let outcome = match &mut self.pending_arrow {
			Some(pending) => pending.promise.try_take(),
			None => None,
		};
		let Some(outcome) = outcome else {
			return Ok(());
		};
		if let Some(mut pending) = self.pending_arrow.take() {
			match outcome {
				ArrowOutcome::Computed(head) => {
					pending.element.apply_arrowhead(head);
					self.commit(pending.element)?;
				}
				ArrowOutcome::Cancelled => self.notify(),
			}
		}
		Ok(())
	}

	/// Blocks until queued background work is done, then collects it.
	pub fn wait_for_background(&mut self) -> Result<(), DrawingError> {
		self.worker.flush();
		self.poll()
	}

	/// Recomputes the blur source if the blur tool is active. The previous source stays in use
	/// until the new one arrives.
	fn schedule_blur(&mut self) {
		if self.tool.as_ref().map(ToolState::key) != Some(ToolKey::Blur) {
			return;
		}
		let (promise, resolve) = Promise::new();
		let drawing = self.image.clone();
		let base = self.base_image.clone();
		let settings = self.config.blur_settings();
		self.worker.submit(move || resolve(blur::precompute(base.as_deref(), &drawing, settings)));
		self.pending_blur = Some(promise);
	}

	/// Switches tools. The stroke in progress and any pending arrow are dropped.
	#[tracing::instrument(skip_all, fields(tool = %state.key()))]
	pub fn set_tool_state(&mut self, state: ToolState) -> Result<(), DrawingError> {
		if self.tool.as_ref() == Some(&state) {
			return Ok(());
		}
		if state.key().is_gpu_backed() && self.renderer.is_none() {
			return Err(DrawingError::GpuUnavailable(state.key()));
		}
		self.cancel_stroke();
		if let Some(renderer) = &mut self.renderer {
			renderer.activate(&state);
		}
		self.tool = Some(state);
		self.blurred = None;
		self.pending_blur = None;
		self.schedule_blur();
		self.notify();
		Ok(())
	}

	/// Changing the zoom drops the stroke in progress.
	pub fn set_zoom_scale(&mut self, zoom_scale: f32) {
		if zoom_scale == self.zoom_scale {
			return;
		}
		self.cancel_stroke();
		self.zoom_scale = zoom_scale;
		self.notify();
	}

	#[tracing::instrument(skip_all)]
	pub fn undo(&mut self) -> Result<bool, DrawingError> {
		self.cancel_stroke_keeping_arrow()?;
		let changed = self.history.undo(&mut self.image);
		if changed {
			self.schedule_blur();
		}
		self.notify();
		Ok(changed)
	}

	#[tracing::instrument(skip_all)]
	pub fn redo(&mut self) -> Result<bool, DrawingError> {
		self.cancel_stroke_keeping_arrow()?;
		let changed = self.history.redo(&mut self.image);
		if changed {
			self.schedule_blur();
		}
		self.notify();
		Ok(changed)
	}

	/// Open strokes are dropped, but a finished arrow is committed so that it can be undone.
	fn cancel_stroke_keeping_arrow(&mut self) -> Result<(), DrawingError> {
		if let Some(mut element) = self.element.take() {
			let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
			element.cancel(&mut context);
		}
		self.settle_arrow()
	}

	/// Erases everything and forgets the history.
	#[tracing::instrument(skip_all)]
	pub fn clear(&mut self) {
		self.cancel_stroke();
		self.history.clear(&mut self.image);
		self.schedule_blur();
		self.notify();
	}

	/// Covers the canvas with `color` as one undoable step.
	pub fn fill(&mut self, color: DrawingColor) -> Result<(), DrawingError> {
		self.cancel_stroke_keeping_arrow()?;
		self.commit(Box::new(FillTool::new(FillSource::Color(color), self.size())))
	}

	/// Covers the canvas with the blurred canvas as one undoable step.
	pub fn fill_blurred(&mut self) -> Result<(), DrawingError> {
		let blurred = self.blurred.clone().ok_or(DrawingError::BlurNotReady)?;
		self.cancel_stroke_keeping_arrow()?;
		self.commit(Box::new(FillTool::new(FillSource::Blurred(blurred), self.size())))
	}

	/// Draws a recorded stroke with `state` in one go, as when restoring saved strokes. The
	/// canvas switches to `state`.
	#[tracing::instrument(skip_all, fields(tool = %state.key(), points = points.len()))]
	pub fn draw_stroke(&mut self, state: ToolState, points: &[Vec2]) -> Result<GestureOutcome, DrawingError> {
		self.set_tool_state(state)?;
		self.cancel_stroke_keeping_arrow()?;
		let Some(tool) = &self.tool else {
			return Ok(GestureOutcome::Ignored);
		};
		let mut element = make_element(tool, self.size(), self.zoom_scale, self.blurred.clone());
		let mut context = ToolContext::new(self.renderer.as_mut(), self.zoom_scale);
		element.replay(points, &mut context);
		self.finish(element, true)
	}

	/// The drawn region cropped out of the canvas. A canvas seeded from a saved drawing
	/// returns all of it.
	pub fn result(&self) -> Option<DrawResult> {
		let full = self.image.bounds();
		let rect = match self.history.content_rect() {
			_ if self.history.has_opaque_seed() => full,
			Some(rect) => rect,
			None => return None,
		};
		Some(DrawResult {
			image: self.image.crop(rect),
			rect,
		})
	}

	/// The whole canvas, encoded. `None` when there is nothing on it.
	pub fn drawing_data(&self) -> Result<Option<Vec<u8>>, DrawingError> {
		if !self.history.can_clear() {
			return Ok(None);
		}
		Ok(Some(self.codec.encode(&self.image)?))
	}

	/// Replaces the canvas with a previously saved drawing and starts a fresh history.
	#[tracing::instrument(skip_all, fields(len = bytes.len()))]
	pub fn setup_with_drawing(&mut self, bytes: &[u8]) -> Result<(), DrawingError> {
		let image = self.codec.decode(bytes)?;
		let (expected_width, expected_height) = self.size();
		if (image.width(), image.height()) != (expected_width, expected_height) {
			return Err(DrawingError::SizeMismatch {
				width: image.width(),
				height: image.height(),
				expected_width,
				expected_height,
			});
		}
		self.cancel_stroke();
		self.image = image;
		self.history.seed();
		self.schedule_blur();
		self.notify();
		Ok(())
	}

	/// The photo under the drawing. Only the blur tool sees it.
	pub fn set_base_image(&mut self, image: RasterImage) {
		self.base_image = Some(Arc::new(image));
		self.schedule_blur();
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;
	use crate::engine::tool_state::{BrushState, EraserState};

	fn canvas(width: u32, height: u32) -> anyhow::Result<DrawingCanvas> {
		Ok(DrawingCanvas::new(CanvasConfig::builder().width(width).height(height).build())?)
	}

	fn pen(color: DrawingColor) -> ToolState {
		ToolState::Pen(BrushState::builder().color(color).size(0.25).build())
	}

	fn at(x: f32, y: f32, millis: u64) -> InputPoint {
		InputPoint::new(x, y).at(Duration::from_millis(millis))
	}

	/// A vertical gesture with events 20ms apart.
	fn gesture(canvas: &mut DrawingCanvas, x: f32) -> anyhow::Result<GestureOutcome> {
		canvas.handle(at(x, 10.0, 0), GestureState::Began)?;
		for i in 1..10 {
			canvas.handle(at(x, 10.0 + 10.0 * i as f32, 20 * i), GestureState::Changed)?;
		}
		Ok(canvas.handle(at(x, 100.0, 200), GestureState::Ended)?)
	}

	#[test]
	fn nothing_happens_without_a_tool() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		assert!(!canvas.should_begin(Vec2::ZERO));
		assert_eq!(canvas.handle(at(1.0, 1.0, 0), GestureState::Began)?, GestureOutcome::Ignored);
		assert_eq!(canvas.handle(at(1.0, 1.0, 0), GestureState::Ended)?, GestureOutcome::Ignored);
		Ok(())
	}

	#[test]
	fn pen_stroke_commits() -> anyhow::Result<()> {
		let mut canvas = canvas(256, 256)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		assert_eq!(gesture(&mut canvas, 10.0)?, GestureOutcome::Committed);
		assert!(canvas.can_undo());
		assert!(!canvas.is_drawing());
		let result = canvas.result().expect("drawn");
		assert_eq!(result.rect.x, 0);
		assert!(result.rect.bottom() > 100);
		assert!(canvas.image().pixel(10, 50)[3] > 0);
		Ok(())
	}

	#[test]
	fn changed_events_are_throttled() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		canvas.handle(at(1.0, 1.0, 0), GestureState::Began)?;
		assert_eq!(canvas.handle(at(2.0, 1.0, 5), GestureState::Changed)?, GestureOutcome::Throttled);
		assert_eq!(canvas.handle(at(3.0, 1.0, 15), GestureState::Changed)?, GestureOutcome::Throttled);
		assert_eq!(canvas.handle(at(4.0, 1.0, 16), GestureState::Changed)?, GestureOutcome::Drawing);
		assert_eq!(canvas.handle(at(5.0, 1.0, 20), GestureState::Changed)?, GestureOutcome::Throttled);
		Ok(())
	}

	#[test]
	fn single_point_stroke_is_discarded() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		canvas.handle(at(5.0, 5.0, 0), GestureState::Began)?;
		assert_eq!(canvas.handle(at(5.0, 5.0, 1), GestureState::Cancelled)?, GestureOutcome::Discarded);
		assert!(!canvas.can_undo());
		assert!(canvas.image().is_transparent());
		Ok(())
	}

	#[test]
	fn new_gesture_commits_the_open_one() -> anyhow::Result<()> {
		let mut canvas = canvas(128, 128)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		canvas.handle(at(10.0, 10.0, 0), GestureState::Began)?;
		canvas.handle(at(10.0, 60.0, 20), GestureState::Changed)?;
		assert!(canvas.is_drawing());
		canvas.handle(at(80.0, 10.0, 40), GestureState::Began)?;
		assert!(canvas.can_undo());
		assert!(canvas.image().pixel(10, 30)[3] > 0);
		Ok(())
	}

	#[test]
	fn zoom_change_cancels_the_stroke() -> anyhow::Result<()> {
		let mut canvas = canvas(128, 128)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		canvas.handle(at(10.0, 10.0, 0), GestureState::Began)?;
		canvas.handle(at(10.0, 60.0, 20), GestureState::Changed)?;
		canvas.set_zoom_scale(2.0);
		assert!(!canvas.is_drawing());
		assert!(canvas.navigation_state().can_zoom_out);
		assert_eq!(canvas.handle(at(10.0, 90.0, 40), GestureState::Ended)?, GestureOutcome::Ignored);
		assert!(canvas.image().is_transparent());
		Ok(())
	}

	#[test]
	fn arrow_commits_once_its_head_arrives() -> anyhow::Result<()> {
		let mut canvas = canvas(256, 256)?;
		let arrow = ToolState::Arrow(BrushState::builder().color(DrawingColor::BLACK).size(0.25).build());
		canvas.set_tool_state(arrow)?;
		assert_eq!(gesture(&mut canvas, 50.0)?, GestureOutcome::AwaitingArrowhead);
		assert!(canvas.is_drawing());
		assert!(!canvas.should_begin(Vec2::new(10.0, 10.0)));
		canvas.wait_for_background()?;
		assert!(!canvas.is_drawing());
		assert!(canvas.can_undo());
		assert!(canvas.should_begin(Vec2::new(10.0, 10.0)));
		Ok(())
	}

	#[test]
	fn tool_switch_cancels_a_pending_arrow() -> anyhow::Result<()> {
		let mut canvas = canvas(256, 256)?;
		let arrow = ToolState::Arrow(BrushState::builder().color(DrawingColor::BLACK).size(0.25).build());
		canvas.set_tool_state(arrow)?;
		gesture(&mut canvas, 50.0)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		canvas.wait_for_background()?;
		assert!(!canvas.can_undo());
		assert!(canvas.image().is_transparent());
		Ok(())
	}

	#[test]
	fn eraser_needs_something_to_erase() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		canvas.set_tool_state(ToolState::Eraser(EraserState::new(0.5)))?;
		assert!(!canvas.should_begin(Vec2::new(5.0, 5.0)));
		canvas.fill(DrawingColor::WHITE)?;
		assert!(canvas.should_begin(Vec2::new(5.0, 5.0)));
		Ok(())
	}

	#[test]
	fn blur_waits_for_its_source() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		assert!(matches!(canvas.fill_blurred(), Err(DrawingError::BlurNotReady)));
		canvas.set_tool_state(ToolState::Blur(EraserState::new(0.5)))?;
		canvas.wait_for_background()?;
		assert!(canvas.is_blur_ready());
		assert!(canvas.should_begin(Vec2::new(5.0, 5.0)));
		canvas.fill_blurred()?;
		assert_eq!(canvas.image().pixel(30, 30), [255, 255, 255, 255]);
		Ok(())
	}

	#[test]
	fn blur_source_survives_strokes_and_undo() -> anyhow::Result<()> {
		let mut canvas = canvas(128, 128)?;
		canvas.fill(DrawingColor::BLACK)?;
		canvas.set_tool_state(ToolState::Blur(EraserState::new(0.5)))?;
		canvas.wait_for_background()?;
		assert!(canvas.should_begin(Vec2::new(10.0, 10.0)));

		assert_eq!(gesture(&mut canvas, 20.0)?, GestureOutcome::Committed);
		assert!(canvas.is_blur_ready());
		assert!(canvas.should_begin(Vec2::new(60.0, 10.0)));
		assert_eq!(gesture(&mut canvas, 60.0)?, GestureOutcome::Committed);

		assert!(canvas.undo()?);
		assert!(canvas.is_blur_ready());
		assert!(canvas.should_begin(Vec2::new(60.0, 10.0)));
		canvas.clear();
		assert!(canvas.is_blur_ready());

		// Only a tool change drops the cached source.
		canvas.set_tool_state(ToolState::Blur(EraserState::new(0.3)))?;
		assert!(!canvas.is_blur_ready());
		canvas.wait_for_background()?;
		assert!(canvas.is_blur_ready());
		Ok(())
	}

	#[test]
	fn gpu_tools_need_a_gpu() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		let marker = ToolState::Marker(BrushState::builder().color(DrawingColor::BLACK).size(0.2).build());
		assert!(matches!(
			canvas.set_tool_state(marker),
			Err(DrawingError::GpuUnavailable(ToolKey::Marker))
		));
		assert!(canvas.tool_state().is_none());
		Ok(())
	}

	#[test]
	fn begin_gate_is_consulted() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		canvas.set_begin_gate(|position| position.x < 32.0);
		assert!(canvas.should_begin(Vec2::new(10.0, 10.0)));
		assert!(!canvas.should_begin(Vec2::new(40.0, 10.0)));
		assert_eq!(canvas.handle(at(40.0, 10.0, 0), GestureState::Began)?, GestureOutcome::Ignored);
		Ok(())
	}

	#[test]
	fn observer_sees_every_change() -> anyhow::Result<()> {
		let mut canvas = canvas(128, 128)?;
		let seen = Rc::new(RefCell::new(Vec::new()));
		{
			let seen = seen.clone();
			canvas.set_navigation_observer(move |state| seen.borrow_mut().push(state));
		}
		canvas.set_tool_state(pen(DrawingColor::BLACK))?;
		gesture(&mut canvas, 20.0)?;
		canvas.undo()?;
		let seen = seen.borrow();
		assert!(seen.iter().any(|state| state.is_drawing));
		assert!(seen.iter().any(|state| state.can_undo));
		assert_eq!(
			seen.last(),
			Some(&NavigationState {
				can_redo: true,
				..Default::default()
			})
		);
		Ok(())
	}

	#[test]
	fn saved_drawing_round_trip() -> anyhow::Result<()> {
		let mut drawing = canvas(64, 32)?;
		assert_eq!(drawing.drawing_data()?, None);
		assert_eq!(drawing.result(), None);
		drawing.fill(DrawingColor::from_rgb(0x3366ff))?;
		let bytes = drawing.drawing_data()?.expect("drawn");

		let mut restored = canvas(64, 32)?;
		restored.setup_with_drawing(&bytes)?;
		assert_eq!(restored.image(), drawing.image());
		assert!(restored.can_clear());
		assert!(!restored.can_undo());
		assert_eq!(restored.result().map(|result| result.rect), Some(PixelRect::full(64, 32)));

		let mut smaller = canvas(32, 32)?;
		assert!(matches!(
			smaller.setup_with_drawing(&bytes),
			Err(DrawingError::SizeMismatch { width: 64, .. })
		));
		Ok(())
	}

	#[test]
	fn clear_forgets_everything() -> anyhow::Result<()> {
		let mut canvas = canvas(64, 64)?;
		canvas.fill(DrawingColor::BLACK)?;
		canvas.clear();
		assert!(canvas.image().is_transparent());
		assert_eq!(canvas.navigation_state(), NavigationState::default());
		Ok(())
	}
}
