//! Rendering
//!
//! The simulation is drawn as a list of [`DrawCommand`]s; on the web the
//! Canvas2D backend replays that list against the page theme.

#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod command;
pub mod shapes;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasRenderer;
pub use command::{DrawCommand, Paint};
pub use shapes::render_frame;
