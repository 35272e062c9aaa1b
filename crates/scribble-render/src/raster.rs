//! CPU raster surface.

use kurbo::{BezPath, PathEl, Point, Vec2};
use peniko::Color;
use scribble_core::surface::{StrokeStyle, Surface};

use crate::snapshot::{RenderResult, encode_png};

/// An RGBA8 pixel buffer that strokes polylines with round caps and joins.
///
/// Every segment is painted as a capsule, so consecutive segments meet in a
/// round join and open ends get round caps without extra geometry.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let mut surface = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        };
        surface.clear(background);
        surface
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 rows, top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        encode_png(&self.pixels, self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Split a path into polylines. Curves are approximated by their end points.
    fn polylines(path: &BezPath) -> Vec<Vec<Point>> {
        let mut lines: Vec<Vec<Point>> = Vec::new();
        let mut start = None;
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    lines.push(vec![p]);
                    start = Some(p);
                }
                PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
                    match lines.last_mut() {
                        Some(line) => line.push(p),
                        None => lines.push(vec![p]),
                    }
                }
                PathEl::ClosePath => {
                    if let (Some(line), Some(s)) = (lines.last_mut(), start) {
                        line.push(s);
                    }
                }
            }
        }
        lines
    }

    /// Coverage mask of a stroke over the whole surface.
    fn stroke_mask(&self, lines: &[Vec<Point>], radius: f64) -> Vec<bool> {
        let mut mask = vec![false; self.width as usize * self.height as usize];
        for line in lines {
            for pair in line.windows(2) {
                self.cover_segment(&mut mask, pair[0], pair[1], radius);
            }
        }
        mask
    }

    fn cover_segment(&self, mask: &mut [bool], a: Point, b: Point, radius: f64) {
        let min_x = (a.x.min(b.x) - radius).floor().max(0.0);
        let min_y = (a.y.min(b.y) - radius).floor().max(0.0);
        let max_x = (a.x.max(b.x) + radius).ceil().min(self.width as f64 - 1.0);
        let max_y = (a.y.max(b.y) + radius).ceil().min(self.height as f64 - 1.0);
        if max_x < min_x || max_y < min_y {
            return;
        }

        let ab = b - a;
        let len_sq = ab.hypot2();
        let r_sq = radius * radius;
        for y in min_y as u32..=max_y as u32 {
            for x in min_x as u32..=max_x as u32 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let t = if len_sq > 0.0 {
                    ((center - a).dot(ab) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let nearest = a + Vec2::new(ab.x * t, ab.y * t);
                if (center - nearest).hypot2() <= r_sq {
                    mask[y as usize * self.width as usize + x as usize] = true;
                }
            }
        }
    }

    /// Source-over blend of `color` into every covered pixel.
    fn composite(&mut self, mask: &[bool], color: Color) {
        let c = color.to_rgba8();
        let alpha = c.a as u32;
        for (i, covered) in mask.iter().enumerate() {
            if !covered {
                continue;
            }
            let px = &mut self.pixels[i * 4..i * 4 + 4];
            if alpha == 255 {
                px.copy_from_slice(&[c.r, c.g, c.b, 255]);
                continue;
            }
            let inv = 255 - alpha;
            px[0] = ((c.r as u32 * alpha + px[0] as u32 * inv) / 255) as u8;
            px[1] = ((c.g as u32 * alpha + px[1] as u32 * inv) / 255) as u8;
            px[2] = ((c.b as u32 * alpha + px[2] as u32 * inv) / 255) as u8;
            px[3] = (alpha + px[3] as u32 * inv / 255).min(255) as u8;
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, background: Color) {
        let c = background.to_rgba8();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[c.r, c.g, c.b, c.a]);
        }
    }

    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let radius = (style.width / 2.0).max(0.5);
        let lines = Self::polylines(path);
        let mask = self.stroke_mask(&lines, radius);
        self.composite(&mask, style.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_core::canvas::CanvasController;
    use scribble_core::protocol::{StrokeBatch, ToolTag};

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    fn white() -> Color {
        Color::from_rgba8(255, 255, 255, 255)
    }

    fn line(from: (f64, f64), to: (f64, f64)) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(from);
        path.line_to(to);
        path
    }

    #[test]
    fn test_new_surface_is_background() {
        let surface = RasterSurface::new(4, 3, Color::from_rgba8(10, 20, 30, 255));
        assert_eq!(surface.pixels().len(), 4 * 3 * 4);
        assert_eq!(surface.pixel(3, 2), Some([10, 20, 30, 255]));
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn test_stroke_with_round_caps() {
        let mut surface = RasterSurface::new(64, 32, white());
        let style = StrokeStyle::round(Color::from_rgba8(255, 0, 0, 255), 4.0);
        surface.stroke_path(&line((10.0, 10.0), (30.0, 10.0)), &style);

        assert_eq!(surface.pixel(20, 10), Some(RED));
        assert_eq!(surface.pixel(20, 9), Some(RED));
        // Cap extends past the end point by the radius.
        assert_eq!(surface.pixel(31, 10), Some(RED));
        assert_eq!(surface.pixel(33, 10), Some(WHITE));
        assert_eq!(surface.pixel(20, 20), Some(WHITE));
    }

    #[test]
    fn test_bare_move_paints_nothing() {
        let mut surface = RasterSurface::new(16, 16, white());
        let mut path = BezPath::new();
        path.move_to((8.0, 8.0));
        surface.stroke_path(&path, &StrokeStyle::round(Color::from_rgba8(0, 0, 0, 255), 4.0));
        assert_eq!(surface.pixel(8, 8), Some(WHITE));
    }

    #[test]
    fn test_single_point_batch_paints_a_dot() {
        let surface = RasterSurface::new(16, 16, white());
        let mut canvas = CanvasController::new(surface, white());
        let tap = StrokeBatch {
            tool: ToolTag::Pen,
            color: "#000000".to_string(),
            width: 4.0,
            coords: vec![8, 8],
            stroke_start: true,
        };
        canvas.apply_remote(&tap);
        assert_eq!(canvas.surface().pixel(8, 8), Some([0, 0, 0, 255]));
        assert_eq!(canvas.surface().pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_translucent_stroke_blends_once() {
        let mut surface = RasterSurface::new(16, 16, white());
        let mut path = BezPath::new();
        path.move_to((2.0, 8.0));
        path.line_to((8.0, 8.0));
        path.line_to((14.0, 8.0));
        let style = StrokeStyle::round(Color::from_rgba8(0, 0, 0, 128), 4.0);
        surface.stroke_path(&path, &style);
        // The join pixel is covered by both segments but blended once.
        assert_eq!(surface.pixel(8, 8), surface.pixel(4, 8));
        let px = surface.pixel(8, 8).unwrap();
        assert!(px[0] > 100 && px[0] < 140);
    }

    #[test]
    fn test_out_of_bounds_stroke_is_clipped() {
        let mut surface = RasterSurface::new(8, 8, white());
        let style = StrokeStyle::round(Color::from_rgba8(0, 0, 0, 255), 2.0);
        surface.stroke_path(&line((-20.0, -20.0), (-10.0, -10.0)), &style);
        surface.stroke_path(&line((4.0, 4.0), (100.0, 4.0)), &style);
        assert_eq!(surface.pixel(7, 4), Some([0, 0, 0, 255]));
        assert_eq!(surface.pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn test_eraser_through_canvas_controller() {
        let surface = RasterSurface::new(40, 20, white());
        let mut canvas = CanvasController::new(surface, white());
        let pen = StrokeBatch {
            tool: ToolTag::Pen,
            color: "#ff0000".to_string(),
            width: 4.0,
            coords: vec![5, 10, 35, 10],
            stroke_start: true,
        };
        let eraser = StrokeBatch {
            tool: ToolTag::Eraser,
            color: String::new(),
            width: 6.0,
            coords: vec![20, 10, 20, 10],
            stroke_start: true,
        };
        canvas.apply_remote(&pen);
        assert_eq!(canvas.surface().pixel(20, 10), Some(RED));
        canvas.apply_remote(&eraser);
        assert_eq!(canvas.surface().pixel(20, 10), Some(WHITE));
        assert_eq!(canvas.surface().pixel(10, 10), Some(RED));

        canvas.clear();
        assert_eq!(canvas.surface().pixel(10, 10), Some(WHITE));
    }
}
