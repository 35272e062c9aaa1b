//! PNG encoding and periodic canvas snapshots.

use crate::raster::RasterSurface;
use scribble_core::timer::{Duration, Instant, Interval};
use thiserror::Error;

/// Render errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Pixel buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Encode RGBA8 pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    if rgba_data.len() != expected {
        return Err(RenderError::BufferSize {
            expected,
            actual: rgba_data.len(),
        });
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Encode(format!("header: {}", e)))?;
        writer
            .write_image_data(rgba_data)
            .map_err(|e| RenderError::Encode(format!("data: {}", e)))?;
    }
    Ok(png_data)
}

/// Keeps a recent PNG of the canvas while a turn is being drawn, so the
/// turn's result survives a disconnect or a late clear.
#[derive(Debug, Clone)]
pub struct SnapshotCapture {
    ticker: Interval,
    latest: Option<Vec<u8>>,
}

impl SnapshotCapture {
    pub fn new(interval: Duration) -> Self {
        Self {
            ticker: Interval::new(interval),
            latest: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ticker.is_running()
    }

    /// Begin capturing for a new drawing phase. Drops the previous backup.
    pub fn start(&mut self, now: Instant) {
        self.latest = None;
        self.ticker.start(now);
    }

    /// Take one last snapshot and stop the timer.
    pub fn finish(&mut self, surface: &RasterSurface) -> RenderResult<()> {
        if self.ticker.is_running() {
            self.ticker.cancel();
            self.capture_now(surface)?;
        }
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.ticker.cancel();
    }

    /// Capture if the interval has elapsed. Returns whether it did.
    pub fn poll(&mut self, surface: &RasterSurface, now: Instant) -> RenderResult<bool> {
        if !self.ticker.poll(now) {
            return Ok(false);
        }
        self.capture_now(surface)?;
        Ok(true)
    }

    pub fn capture_now(&mut self, surface: &RasterSurface) -> RenderResult<()> {
        let png = surface.to_png()?;
        log::debug!("Captured canvas snapshot ({} bytes)", png.len());
        self.latest = Some(png);
        Ok(())
    }

    pub fn latest(&self) -> Option<&[u8]> {
        self.latest.as_deref()
    }

    pub fn take_latest(&mut self) -> Option<Vec<u8>> {
        self.latest.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::Color;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn surface() -> RasterSurface {
        RasterSurface::new(8, 8, Color::from_rgba8(255, 255, 255, 255))
    }

    #[test]
    fn test_encode_png() {
        let png = surface().to_png().unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let result = encode_png(&[0; 10], 2, 2);
        assert!(matches!(
            result,
            Err(RenderError::BufferSize { expected: 16, actual: 10 })
        ));
    }

    #[test]
    fn test_snapshot_interval() {
        let t0 = Instant::now();
        let surface = surface();
        let mut capture = SnapshotCapture::new(Duration::from_secs(1));
        assert!(!capture.poll(&surface, t0).unwrap());

        capture.start(t0);
        assert!(capture.is_active());
        assert!(!capture.poll(&surface, t0 + Duration::from_millis(500)).unwrap());
        assert!(capture.latest().is_none());
        assert!(capture.poll(&surface, t0 + Duration::from_secs(1)).unwrap());
        assert!(capture.latest().is_some());
    }

    #[test]
    fn test_finish_takes_final_snapshot() {
        let t0 = Instant::now();
        let surface = surface();
        let mut capture = SnapshotCapture::new(Duration::from_secs(1));
        capture.start(t0);
        capture.finish(&surface).unwrap();
        assert!(!capture.is_active());
        assert!(capture.take_latest().is_some());
        assert!(capture.latest().is_none());

        // Finishing twice does nothing.
        capture.finish(&surface).unwrap();
        assert!(capture.latest().is_none());
    }
}
