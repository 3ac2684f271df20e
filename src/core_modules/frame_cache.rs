// THEORY:
// The `frame_cache` module amortizes the expensive part of the pipeline
// (detector invocation plus scoring) across consecutive frames. Only every
// Kth frame is analyzed in full; the frames in between replay the last
// computed result and detection batch unchanged, so downstream consumers see
// smooth video with a stepped score.
//
// The very first frame is always processed regardless of K, so the loop never
// starts from an empty cache.

use crate::core_modules::detection::Detection;
use crate::core_modules::scoring::ScoreResult;

/// The last fully-analyzed frame's outputs, replayed on skipped frames.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub result: ScoreResult,
    pub detections: Vec<Detection>,
}

/// Replays the last scoring result on frames that are not re-processed.
pub struct FrameSkipCache {
    /// Every Kth frame gets full analysis. Clamped to at least 1.
    interval: u64,
    last: Option<CachedAnalysis>,
}

impl FrameSkipCache {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            last: None,
        }
    }

    /// Whether this 1-based frame index requires full analysis.
    pub fn should_process(&self, frame_index: u64) -> bool {
        frame_index <= 1 || self.last.is_none() || frame_index % self.interval == 0
    }

    pub fn store(&mut self, result: ScoreResult, detections: Vec<Detection>) {
        self.last = Some(CachedAnalysis { result, detections });
    }

    pub fn replay(&self) -> Option<&CachedAnalysis> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::scoring::ThreatLevel;

    fn result(score: i32) -> ScoreResult {
        ScoreResult {
            threat_score: score,
            level: ThreatLevel::Normal,
            reasons: vec![format!("score {score}")],
        }
    }

    #[test]
    fn first_frame_is_always_processed() {
        let cache = FrameSkipCache::new(5);
        assert!(cache.should_process(1));
    }

    #[test]
    fn only_multiples_of_interval_are_processed_once_warm() {
        let mut cache = FrameSkipCache::new(5);
        cache.store(result(10), Vec::new());
        for index in 2..=20u64 {
            assert_eq!(cache.should_process(index), index % 5 == 0, "frame {index}");
        }
    }

    #[test]
    fn empty_cache_forces_processing_at_any_index() {
        let cache = FrameSkipCache::new(5);
        assert!(cache.should_process(3));
    }

    #[test]
    fn replay_returns_stored_result_bit_identical() {
        let mut cache = FrameSkipCache::new(5);
        let stored = result(42);
        cache.store(stored.clone(), Vec::new());
        let cached = cache.replay().unwrap();
        assert_eq!(cached.result, stored);
    }

    #[test]
    fn interval_of_zero_behaves_as_every_frame() {
        let mut cache = FrameSkipCache::new(0);
        cache.store(result(1), Vec::new());
        assert!(cache.should_process(2));
        assert!(cache.should_process(3));
    }
}
