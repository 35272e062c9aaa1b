//! Rendering stroke batches, live or historical, with cross-batch stitching.

use crate::protocol::{DrawingPoint, StrokeBatch, ToolTag};
use crate::surface::{StrokeStyle, Surface, parse_hex_color};
use kurbo::BezPath;
use peniko::Color;

/// What happened to a batch handed to the replayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Drawn,
    /// Fewer than two coordinates.
    Rejected,
    /// Identical to the batch drawn just before it.
    Duplicate,
}

/// Derived state carried from one batch to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinuityState {
    /// Final point of the most recently drawn batch.
    pub last_point: Option<DrawingPoint>,
    /// The most recently drawn batch, compared structurally for dedup.
    pub last_batch: Option<StrokeBatch>,
}

impl ContinuityState {
    pub fn reset(&mut self) {
        self.last_point = None;
        self.last_batch = None;
    }
}

/// Draws stroke batches onto a surface, stitching continuation batches to
/// the retained last point.
///
/// Correctness depends on batches of one stroke arriving in order. The wire
/// format has no sequence numbers to detect reordering.
#[derive(Debug, Clone)]
pub struct StrokeReplayer {
    state: ContinuityState,
    background: Color,
}

impl StrokeReplayer {
    /// `background` is the eraser color.
    pub fn new(background: Color) -> Self {
        Self {
            state: ContinuityState::default(),
            background,
        }
    }

    pub fn state(&self) -> &ContinuityState {
        &self.state
    }

    pub fn last_point(&self) -> Option<DrawingPoint> {
        self.state.last_point
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    /// Forget the last point and dedup memory.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Draw one live batch.
    pub fn replay<S: Surface>(&mut self, surface: &mut S, batch: &StrokeBatch) -> ReplayOutcome {
        draw_batch(surface, &mut self.state, batch, self.background)
    }

    /// Draw an ordered list of historical batches, then continue live
    /// stitching from where the history ended. Returns the number drawn.
    pub fn replay_history<S: Surface>(&mut self, surface: &mut S, batches: &[StrokeBatch]) -> usize {
        let mut local = ContinuityState::default();
        let drawn = batches
            .iter()
            .filter(|batch| {
                draw_batch(surface, &mut local, batch, self.background) == ReplayOutcome::Drawn
            })
            .count();

        if local.last_point.is_some() {
            self.state.last_point = local.last_point;
        }
        if local.last_batch.is_some() {
            self.state.last_batch = local.last_batch;
        }
        drawn
    }
}

fn draw_batch<S: Surface>(
    surface: &mut S,
    state: &mut ContinuityState,
    batch: &StrokeBatch,
    background: Color,
) -> ReplayOutcome {
    if batch.coords.len() < 2 {
        log::debug!("Dropping degenerate stroke batch ({} coords)", batch.coords.len());
        return ReplayOutcome::Rejected;
    }
    if state.last_batch.as_ref() == Some(batch) {
        log::debug!("Dropping duplicate stroke batch");
        return ReplayOutcome::Duplicate;
    }

    let color = match batch.tool {
        ToolTag::Pen => parse_hex_color(&batch.color).unwrap_or_else(|| {
            log::debug!("Unparseable stroke color {:?}, using black", batch.color);
            Color::from_rgba8(0, 0, 0, 255)
        }),
        ToolTag::Eraser => background,
    };
    let style = StrokeStyle::round(color, batch.width);

    let mut path = BezPath::new();
    let mut points = batch.points();
    match (batch.stroke_start, state.last_point) {
        (false, Some(last)) => {
            path.move_to(last.to_point());
            for point in points {
                path.line_to(point.to_point());
            }
        }
        _ => {
            if let Some(first) = points.next() {
                path.move_to(first.to_point());
                // A lone point becomes a zero-length segment, which paints a dot.
                if batch.point_count() == 1 {
                    path.line_to(first.to_point());
                }
            }
            for point in points {
                path.line_to(point.to_point());
            }
        }
    }
    surface.stroke_path(&path, &style);

    state.last_point = batch.last_point();
    state.last_batch = Some(batch.clone());
    ReplayOutcome::Drawn
}
