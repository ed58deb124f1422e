//! Interactive canvas for resource layouts.

mod component;
mod render;
mod scene;
mod state;
mod types;

pub use component::ResourceCanvas;
pub use types::{CanvasEvent, ViewCommand};
