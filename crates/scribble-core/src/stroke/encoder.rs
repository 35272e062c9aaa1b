//! Tool state and point buffers to the compact wire record.

use crate::protocol::{DrawingPoint, StrokeBatch, ToolTag};
use serde::{Deserialize, Serialize};

/// Current drawing tool settings of the local drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub tool: ToolTag,
    /// Hex stroke color.
    pub color: String,
    /// Stroke width in pixels.
    pub width: f64,
}

impl Brush {
    pub fn pen(color: impl Into<String>, width: f64) -> Self {
        Self {
            tool: ToolTag::Pen,
            color: color.into(),
            width,
        }
    }

    pub fn eraser(width: f64) -> Self {
        Self {
            tool: ToolTag::Eraser,
            color: String::new(),
            width,
        }
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self::pen("#000000", 4.0)
    }
}

/// Flatten `points` into a stroke batch.
pub fn encode_batch(brush: &Brush, points: &[DrawingPoint], stroke_start: bool) -> StrokeBatch {
    let mut coords = Vec::with_capacity(points.len() * 2);
    for point in points {
        coords.push(point.x);
        coords.push(point.y);
    }
    StrokeBatch {
        tool: brush.tool,
        color: brush.color.clone(),
        width: brush.width,
        coords,
        stroke_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_flattens_points() {
        let brush = Brush::pen("#ff0000", 6.0);
        let points = [DrawingPoint::new(1, 2), DrawingPoint::new(3, 4)];
        let batch = encode_batch(&brush, &points, true);
        assert_eq!(batch.coords, vec![1, 2, 3, 4]);
        assert_eq!(batch.color, "#ff0000");
        assert_eq!(batch.width, 6.0);
        assert_eq!(batch.tool, ToolTag::Pen);
        assert!(batch.stroke_start);
    }

    #[test]
    fn test_encode_eraser() {
        let batch = encode_batch(&Brush::eraser(20.0), &[DrawingPoint::new(0, 0)], false);
        assert_eq!(batch.tool, ToolTag::Eraser);
        assert!(!batch.stroke_start);
        assert_eq!(batch.point_count(), 1);
    }
}
