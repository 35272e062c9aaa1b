//! Local pointer sample buffering and flush throttling.

use crate::protocol::DrawingPoint;
use crate::timer::{Duration, Instant};

/// Default minimum time between time-triggered flushes.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(8);

/// Default number of buffered points that forces a flush.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// When a pointer-move should flush the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleSettings {
    /// Flush once this much time has passed since the last flush.
    pub interval: Duration,
    /// Flush once a batch would span this many points. A continuation batch
    /// counts the previous batch's last point, which receivers stitch from.
    pub batch_size: usize,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_THROTTLE_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Points taken out of the buffer by one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flush {
    pub points: Vec<DrawingPoint>,
    /// Only the first flush of a stroke starts a new sub-path.
    pub stroke_start: bool,
}

/// Accumulates pointer samples of the stroke in progress.
///
/// Already flushed points are forgotten. Receivers stitch consecutive
/// flushes together from their own retained last point.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    settings: ThrottleSettings,
    points: Vec<DrawingPoint>,
    is_new_stroke: bool,
    last_flush: Option<Instant>,
    pointer_down: bool,
}

impl PointBuffer {
    pub fn new(settings: ThrottleSettings) -> Self {
        let settings = ThrottleSettings {
            batch_size: settings.batch_size.max(1),
            ..settings
        };
        Self {
            settings,
            points: Vec::with_capacity(settings.batch_size),
            is_new_stroke: false,
            last_flush: None,
            pointer_down: false,
        }
    }

    pub fn settings(&self) -> ThrottleSettings {
        self.settings
    }

    /// Whether a stroke is in progress.
    pub fn is_active(&self) -> bool {
        self.pointer_down
    }

    /// Number of points waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.points.len()
    }

    /// Start a new stroke and flush its first point right away.
    pub fn on_pointer_down(&mut self, point: DrawingPoint, now: Instant) -> Option<Flush> {
        self.points.clear();
        self.points.push(point);
        self.is_new_stroke = true;
        self.pointer_down = true;
        self.last_flush = Some(now);
        self.flush(now)
    }

    /// Buffer a sample; flush on whichever of the time or size trigger comes first.
    pub fn on_pointer_move(&mut self, point: DrawingPoint, now: Instant) -> Option<Flush> {
        if !self.pointer_down {
            return None;
        }
        self.points.push(point);

        let elapsed = self
            .last_flush
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::MAX);
        if elapsed >= self.settings.interval || self.span() >= self.settings.batch_size {
            self.flush(now)
        } else {
            None
        }
    }

    /// End the stroke, flushing whatever is left regardless of thresholds.
    pub fn on_pointer_up(&mut self, now: Instant) -> Option<Flush> {
        if !self.pointer_down {
            return None;
        }
        let flush = self.flush(now);
        self.is_new_stroke = false;
        self.pointer_down = false;
        flush
    }

    /// Drop the stroke in progress without emitting anything.
    pub fn cancel(&mut self) {
        self.points.clear();
        self.is_new_stroke = false;
        self.pointer_down = false;
        self.last_flush = None;
    }

    /// Points the next batch will draw through, including the stitch anchor.
    fn span(&self) -> usize {
        self.points.len() + usize::from(!self.is_new_stroke)
    }

    fn flush(&mut self, now: Instant) -> Option<Flush> {
        if self.points.is_empty() {
            return None;
        }
        let points = std::mem::replace(
            &mut self.points,
            Vec::with_capacity(self.settings.batch_size),
        );
        let stroke_start = self.is_new_stroke;
        self.is_new_stroke = false;
        self.last_flush = Some(now);
        Some(Flush {
            points,
            stroke_start,
        })
    }
}

impl Default for PointBuffer {
    fn default() -> Self {
        Self::new(ThrottleSettings::default())
    }
}
