//! Scribble Client
//!
//! Headless client that joins a room, replays every drawing onto a raster
//! canvas and saves each finished turn as a PNG.

mod app;

pub use app::{App, AppError, AppResult, FRAME_INTERVAL, Flow, run};
