//! Drawing surface abstraction.
//!
//! The canvas controller is the only writer. Implementations can rasterize
//! into pixels (see the render crate) or just record what was drawn.

use kurbo::{BezPath, Cap, Join, PathEl, Point};
use peniko::Color;

/// Default canvas background, also used as the eraser color.
pub fn default_background() -> Color {
    Color::from_rgba8(255, 255, 255, 255)
}

/// Stroke paint state.
#[derive(Debug, Clone, Copy)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    pub cap: Cap,
    pub join: Join,
}

impl StrokeStyle {
    /// Round caps and joins, which keep a batched stroke visually continuous.
    pub fn round(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            cap: Cap::Round,
            join: Join::Round,
        }
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self::round(Color::from_rgba8(0, 0, 0, 255), 2.0)
    }
}

/// Trait for anything the drawing engine paints onto.
pub trait Surface {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Wipe every pixel to `background`.
    fn clear(&mut self, background: Color);

    /// Stroke `path` with `style`.
    ///
    /// A sub-path that is only a move paints nothing. A zero-length segment
    /// paints a dot the size of the stroke width.
    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle);
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(input: &str) -> Option<Color> {
    let hex = input.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255))
        }
        6 => Some(Color::from_rgba8(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        )),
        8 => Some(Color::from_rgba8(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

/// One recorded `stroke_path` call.
#[derive(Debug, Clone)]
pub struct RecordedStroke {
    pub path: BezPath,
    pub style: StrokeStyle,
}

/// A surface that keeps every call instead of rasterizing.
#[derive(Debug, Clone)]
pub struct PathRecorder {
    width: u32,
    height: u32,
    strokes: Vec<RecordedStroke>,
    clear_count: usize,
    background: Option<Color>,
}

impl PathRecorder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
            clear_count: 0,
            background: None,
        }
    }

    /// Strokes painted since the last clear.
    pub fn strokes(&self) -> &[RecordedStroke] {
        &self.strokes
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Every straight segment painted since the last clear, in order.
    pub fn segments(&self) -> Vec<(Point, Point)> {
        let mut segments = Vec::new();
        for stroke in &self.strokes {
            let mut current = None;
            for el in stroke.path.elements() {
                match *el {
                    PathEl::MoveTo(p) => current = Some(p),
                    PathEl::LineTo(p) => {
                        if let Some(from) = current {
                            segments.push((from, p));
                        }
                        current = Some(p);
                    }
                    _ => {}
                }
            }
        }
        segments
    }
}

impl Surface for PathRecorder {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, background: Color) {
        self.strokes.clear();
        self.clear_count += 1;
        self.background = Some(background);
    }

    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle) {
        self.strokes.push(RecordedStroke {
            path: path.clone(),
            style: *style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        let c = parse_hex_color("#ff8000").unwrap().to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (255, 128, 0, 255));

        let c = parse_hex_color("#0f0").unwrap().to_rgba8();
        assert_eq!((c.r, c.g, c.b), (0, 255, 0));

        let c = parse_hex_color("#00000080").unwrap().to_rgba8();
        assert_eq!(c.a, 128);

        assert!(parse_hex_color("red").is_none());
        assert!(parse_hex_color("#12345").is_none());
        assert!(parse_hex_color("#gggggg").is_none());
    }

    #[test]
    fn test_recorder_segments() {
        let mut recorder = PathRecorder::new(10, 10);
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((1.0, 1.0));
        path.line_to((2.0, 0.0));
        recorder.stroke_path(&path, &StrokeStyle::default());

        assert_eq!(
            recorder.segments(),
            vec![
                (Point::new(0.0, 0.0), Point::new(1.0, 1.0)),
                (Point::new(1.0, 1.0), Point::new(2.0, 0.0)),
            ]
        );

        recorder.clear(default_background());
        assert!(recorder.segments().is_empty());
        assert_eq!(recorder.clear_count(), 1);
    }
}
