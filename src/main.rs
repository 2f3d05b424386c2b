//! Headless demo: draws a few strokes with every CPU tool (and the GPU tools when an adapter is
//! available), exercises undo and redo, and writes the canvas as a PNG.

use std::time::Duration;

use glam::Vec2;
use sketchpad::*;

#[derive(thiserror::Error, Debug)]
#[error("no global tracing subscriber set")]
struct NoTracingSubscriber;

fn configure_tracing() -> anyhow::Result<()> {
	let result = Err(NoTracingSubscriber);

	let result = result.or_else(|_| {
		let max_level = if cfg!(debug_assertions) {
			tracing::Level::TRACE
		} else {
			tracing::Level::INFO
		};
		tracing::subscriber::set_global_default(
			tracing_subscriber::FmtSubscriber::builder()
				.with_max_level(max_level)
				.finish(),
		)
	});

	Ok(result?)
}

fn configure_logging() -> anyhow::Result<()> {
	configure_tracing()?;

	// zune-image logs through `log`.
	#[cfg(feature = "log")]
	tracing_log::LogTracer::init()?;
	Ok(())
}

/// Feeds `points` as one gesture, 20ms apart.
fn gesture(canvas: &mut DrawingCanvas, points: &[Vec2]) -> anyhow::Result<GestureOutcome> {
	let Some((&first, rest)) = points.split_first() else {
		return Ok(GestureOutcome::Ignored);
	};
	let at = |position: Vec2, index: usize| InputPoint {
		position,
		timestamp: Some(Duration::from_millis(20 * index as u64)),
	};
	canvas.handle(at(first, 0), GestureState::Began)?;
	for (index, &point) in rest.iter().enumerate() {
		canvas.handle(at(point, index + 1), GestureState::Changed)?;
	}
	let last = points.len() - 1;
	Ok(canvas.handle(at(points[last], last + 1), GestureState::Ended)?)
}

fn wave(y: f32, amplitude: f32) -> Vec<Vec2> {
	(0..40)
		.map(|i| {
			let x = 20.0 + i as f32 * 12.0;
			Vec2::new(x, y + (x * 0.03).sin() * amplitude)
		})
		.collect()
}

fn main() -> anyhow::Result<()> {
	if let Err(error) = configure_logging() {
		// We can technically continue without logging.
		tracing::error!(error = error.to_string());
	}

	let output = std::env::args().nth(1).unwrap_or_else(|| "sketchpad.png".to_owned());
	let config = CanvasConfig::builder().width(512).height(384).build();
	let mut canvas = match futures::executor::block_on(DrawingCanvas::with_default_gpu(config.clone())) {
		Ok(canvas) => canvas,
		Err(error) => {
			tracing::warn!(%error, "continuing without a GPU");
			DrawingCanvas::new(config)?
		}
	};
	canvas.set_navigation_observer(|state| tracing::debug!(?state, "navigation"));

	let palette = DrawingState::initial();
	let mut y = 40.0;
	for tool in palette.tools {
		let key = tool.key();
		if let Err(error) = canvas.set_tool_state(tool) {
			tracing::warn!(%error, tool = %key, "skipped");
			continue;
		}
		// The blur tool needs its source before a gesture may begin.
		canvas.wait_for_background()?;
		let outcome = gesture(&mut canvas, &wave(y, 14.0))?;
		canvas.wait_for_background()?;
		tracing::info!(tool = %key, ?outcome, "stroke");
		y += 40.0;
	}

	canvas.undo()?;
	canvas.redo()?;
	tracing::info!(state = ?canvas.navigation_state(), "done drawing");

	if let Some(result) = canvas.result() {
		tracing::info!(rect = %result.rect, "content");
	}
	match canvas.drawing_data()? {
		Some(bytes) => {
			std::fs::write(&output, bytes)?;
			tracing::info!(output, "written");
		}
		None => tracing::warn!("nothing was drawn"),
	}
	Ok(())
}
