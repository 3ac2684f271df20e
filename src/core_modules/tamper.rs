// THEORY:
// The `tamper` module watches for the camera itself being attacked, using
// nothing but first-order pixel statistics. It is deliberately independent of
// the object detector: covering the lens defeats every downstream model, so
// this check must not rely on any of them.
//
// The detector is intentionally cheap. Each processed frame is judged on its
// own mean intensity and standard deviation against two fixed thresholds; the
// stored baseline exists only as a cold-start gate (the first frame ever seen
// must not raise an alarm), not as a structural-similarity comparison.

use image::GrayImage;

/// Grayscale summary statistics for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Mean intensity over all pixels, `0.0..=255.0`.
    pub mean: f64,
    /// Standard deviation of intensity.
    pub std_dev: f64,
}

impl FrameStats {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Computes statistics from an 8-bit grayscale image.
    pub fn from_luma(image: &GrayImage) -> Self {
        Self::from_luma_buffer(image.as_raw())
    }

    /// Computes statistics from a raw row-major luma buffer.
    pub fn from_luma_buffer(luma: &[u8]) -> Self {
        let count = luma.len() as f64;
        if count < 1.0 {
            return Self::new(0.0, 0.0);
        }
        let sum: f64 = luma.iter().map(|&p| p as f64).sum();
        let mean = sum / count;
        let variance = luma
            .iter()
            .map(|&p| (p as f64 - mean).powi(2))
            .sum::<f64>()
            / count;
        Self::new(mean, variance.sqrt())
    }
}

/// The verdict for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TamperCheck {
    /// No baseline existed yet; this frame became the baseline. Not an alarm.
    Initializing,
    /// Frame statistics look like a live scene.
    Clear,
    /// Mean intensity below the darkness threshold: lens blocked or blinded.
    Occluded,
    /// Near-uniform frame: lens covered or pointed at a blank surface.
    Covered,
}

impl TamperCheck {
    pub fn is_tampered(&self) -> bool {
        matches!(self, TamperCheck::Occluded | TamperCheck::Covered)
    }

    /// Human-readable reason for the alarm, if this verdict is one.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            TamperCheck::Occluded => Some("camera occluded"),
            TamperCheck::Covered => Some("camera covered"),
            _ => None,
        }
    }
}

/// Stateful per-camera tamper detector. Owns the previous frame's statistics
/// as its baseline; the baseline is overwritten on every processed frame.
pub struct TamperDetector {
    baseline: Option<FrameStats>,
    /// Mean intensity below this is treated as absolute darkness.
    dark_mean_threshold: f64,
    /// Standard deviation below this is treated as a uniform (covered) frame.
    uniform_std_threshold: f64,
}

impl TamperDetector {
    pub fn new(dark_mean_threshold: f64, uniform_std_threshold: f64) -> Self {
        Self {
            baseline: None,
            dark_mean_threshold,
            uniform_std_threshold,
        }
    }

    /// Judges one processed frame. The two thresholds are independent and
    /// there is no temporal smoothing.
    pub fn check(&mut self, stats: FrameStats) -> TamperCheck {
        if self.baseline.is_none() {
            self.baseline = Some(stats);
            return TamperCheck::Initializing;
        }
        self.baseline = Some(stats);

        if stats.mean < self.dark_mean_threshold {
            TamperCheck::Occluded
        } else if stats.std_dev < self.uniform_std_threshold {
            TamperCheck::Covered
        } else {
            TamperCheck::Clear
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> TamperDetector {
        TamperDetector::new(30.0, 10.0)
    }

    #[test]
    fn first_frame_never_alarms_even_when_dark() {
        let mut d = detector();
        let check = d.check(FrameStats::new(2.0, 0.5));
        assert_eq!(check, TamperCheck::Initializing);
        assert!(!check.is_tampered());
        assert!(d.has_baseline());
    }

    #[test]
    fn dark_frame_after_baseline_is_occluded() {
        let mut d = detector();
        d.check(FrameStats::new(120.0, 40.0));
        let check = d.check(FrameStats::new(10.0, 40.0));
        assert_eq!(check, TamperCheck::Occluded);
        assert_eq!(check.reason(), Some("camera occluded"));
    }

    #[test]
    fn uniform_frame_after_baseline_is_covered() {
        let mut d = detector();
        d.check(FrameStats::new(120.0, 40.0));
        let check = d.check(FrameStats::new(120.0, 3.0));
        assert_eq!(check, TamperCheck::Covered);
        assert_eq!(check.reason(), Some("camera covered"));
    }

    #[test]
    fn darkness_takes_precedence_over_uniformity() {
        let mut d = detector();
        d.check(FrameStats::new(120.0, 40.0));
        // A pitch-black frame is both dark and uniform; report occlusion.
        assert_eq!(d.check(FrameStats::new(5.0, 1.0)), TamperCheck::Occluded);
    }

    #[test]
    fn live_scene_is_clear() {
        let mut d = detector();
        d.check(FrameStats::new(120.0, 40.0));
        assert_eq!(d.check(FrameStats::new(110.0, 35.0)), TamperCheck::Clear);
    }

    #[test]
    fn stats_from_uniform_buffer() {
        let stats = FrameStats::from_luma_buffer(&[128u8; 64]);
        assert_eq!(stats.mean, 128.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn stats_from_gray_image() {
        let image = GrayImage::from_raw(4, 4, vec![50u8; 16]).unwrap();
        let stats = FrameStats::from_luma(&image);
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn stats_from_mixed_buffer() {
        let stats = FrameStats::from_luma_buffer(&[0u8, 255u8]);
        assert!((stats.mean - 127.5).abs() < 1e-9);
        assert!((stats.std_dev - 127.5).abs() < 1e-9);
    }
}
