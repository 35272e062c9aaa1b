//! Pointer input delivered to the drawing engine.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Unified mouse/pen/touch event, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up,
    /// Pointer left the canvas. Ends the stroke like `Up`.
    Leave,
}

impl PointerEvent {
    pub fn down(x: f64, y: f64) -> Self {
        PointerEvent::Down {
            position: Point::new(x, y),
        }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    /// Whether this event ends a stroke.
    pub fn is_release(&self) -> bool {
        matches!(self, PointerEvent::Up | PointerEvent::Leave)
    }
}
