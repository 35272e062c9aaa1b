//! Stroke capture, encoding and replay.
//!
//! Local pointer samples flow through [`PointBuffer`] and [`encode_batch`]
//! into [`StrokeBatch`]es; remote batches are drawn by [`StrokeReplayer`].

mod buffer;
mod encoder;
mod replay;

pub use buffer::{
    DEFAULT_BATCH_SIZE, DEFAULT_THROTTLE_INTERVAL, Flush, PointBuffer, ThrottleSettings,
};
pub use encoder::{Brush, encode_batch};
pub use replay::{ContinuityState, ReplayOutcome, StrokeReplayer};

use crate::input::PointerEvent;
use crate::protocol::{DrawingPoint, StrokeBatch};
use crate::timer::Instant;

/// Turns the local drawer's pointer events into outbound stroke batches.
#[derive(Debug, Clone, Default)]
pub struct StrokeCapture {
    buffer: PointBuffer,
    brush: Brush,
}

impl StrokeCapture {
    pub fn new(settings: ThrottleSettings, brush: Brush) -> Self {
        Self {
            buffer: PointBuffer::new(settings),
            brush,
        }
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Change tool settings. Takes effect from the next flush.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn is_drawing(&self) -> bool {
        self.buffer.is_active()
    }

    /// Feed one pointer event; returns a batch when the buffer flushes.
    pub fn handle(&mut self, event: PointerEvent, now: Instant) -> Option<StrokeBatch> {
        let flush = match event {
            PointerEvent::Down { position } => self
                .buffer
                .on_pointer_down(DrawingPoint::from_position(position), now),
            PointerEvent::Move { position } => self
                .buffer
                .on_pointer_move(DrawingPoint::from_position(position), now),
            PointerEvent::Up | PointerEvent::Leave => self.buffer.on_pointer_up(now),
        }?;
        Some(encode_batch(&self.brush, &flush.points, flush.stroke_start))
    }

    /// Abandon the stroke in progress.
    pub fn cancel(&mut self) {
        self.buffer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Duration;

    #[test]
    fn test_scenario_down_then_rapid_moves() {
        let t0 = Instant::now();
        let mut capture = StrokeCapture::default();
        assert_eq!(capture.buffer.settings(), ThrottleSettings::default());

        let first = capture.handle(PointerEvent::down(10.0, 10.0), t0).unwrap();
        assert!(first.stroke_start);
        assert_eq!(first.coords, vec![10, 10]);

        let rapid = t0 + Duration::from_millis(1);
        assert!(capture.handle(PointerEvent::moved(11.0, 10.0), rapid).is_none());
        assert!(capture.handle(PointerEvent::moved(12.0, 11.0), rapid).is_none());
        assert!(capture.handle(PointerEvent::moved(13.0, 12.0), rapid).is_none());
        let second = capture.handle(PointerEvent::moved(14.0, 13.0), rapid).unwrap();
        assert!(!second.stroke_start);
        assert_eq!(second.coords, vec![11, 10, 12, 11, 13, 12, 14, 13]);

        assert!(capture.handle(PointerEvent::Up, rapid).is_none());
    }

    #[test]
    fn test_positions_are_rounded() {
        let t0 = Instant::now();
        let mut capture = StrokeCapture::default();
        let batch = capture.handle(PointerEvent::down(10.4, 9.6), t0).unwrap();
        assert_eq!(batch.coords, vec![10, 10]);
    }

    #[test]
    fn test_emitted_batches_are_well_formed() {
        let t0 = Instant::now();
        let mut capture = StrokeCapture::default();
        let mut batches = Vec::new();
        batches.extend(capture.handle(PointerEvent::down(0.0, 0.0), t0));
        for i in 1..40 {
            let now = t0 + Duration::from_millis(i);
            batches.extend(capture.handle(PointerEvent::moved(i as f64, 0.0), now));
        }
        batches.extend(capture.handle(PointerEvent::Leave, t0 + Duration::from_secs(1)));

        assert!(batches.iter().all(|b| b.is_well_formed()));
        assert!(batches[0].stroke_start);
        assert!(batches[1..].iter().all(|b| !b.stroke_start));
        let total: usize = batches.iter().map(|b| b.point_count()).sum();
        assert_eq!(total, 40);
    }

    #[test]
    fn test_brush_change_applies_to_next_flush() {
        let t0 = Instant::now();
        let mut capture = StrokeCapture::default();
        capture.handle(PointerEvent::down(0.0, 0.0), t0);
        capture.set_brush(Brush::eraser(12.0));
        let batch = capture.handle(PointerEvent::moved(1.0, 1.0), t0 + Duration::from_millis(10)).unwrap();
        assert_eq!(batch.width, 12.0);
    }
}
