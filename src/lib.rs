//! A freehand drawing engine: smoothed, stamped and vector strokes composited into a raster
//! canvas with region-diff undo.

pub mod util;

pub mod config;
pub mod engine;
pub mod geom;
pub mod render;

mod wgpu_context;
pub use wgpu_context::*;

#[cfg(test)]
pub mod test;

pub use config::CanvasConfig;
pub use engine::stroke::{GestureState, InputPoint};
pub use engine::tool_state::{BrushState, DrawingColor, DrawingState, EraserState, ToolKey, ToolState};
pub use engine::{DrawResult, DrawingCanvas, DrawingError, GestureOutcome, NavigationState};
