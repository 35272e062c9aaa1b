//! Scribble Render Library
//!
//! CPU raster implementation of the core drawing surface, with PNG
//! snapshots of the canvas.

mod raster;
mod snapshot;

pub use raster::RasterSurface;
pub use snapshot::{RenderError, RenderResult, SnapshotCapture, encode_png};
