pub mod raster;

pub mod smoother;
pub mod segmenter;
pub mod stroke;

pub mod tool_state;

pub mod brush;
pub mod chartlet;
pub mod renderer;

pub mod blur;
pub mod slice;
pub mod history;

pub mod tools;

mod canvas;
pub use canvas::*;
