// THEORY:
// The `pipeline` module is the final, top-level API for the monitoring
// engine. It wires the tamper detector, scoring engine, frame-skip cache,
// decision machine, actuation bridge, and state bus into a single
// `SecurityMonitor` with one mutation entry point.
//
// One frame is fully processed (or cache-replayed) and one actuation step
// taken before the next frame is considered; there are no overlapping
// in-flight frames. Manual silence/trigger requests go through the same
// `&mut self` surface, so the driver serializes them against the frame loop
// behind a single lock. Observers only ever read snapshots from the bus.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core_modules::actuator::{ActuationBridge, Actuator};
use crate::core_modules::decision::{CommandRequest, DecisionEngine, EngineSnapshot};
use crate::core_modules::detection::{
    BoundingBox, Detection, DetectionAdapter, FaceProbeResult, FrameInput,
};
use crate::core_modules::frame_cache::FrameSkipCache;
use crate::core_modules::scoring::{FaceProbe, ScoreResult, ScoringEngine};
use crate::core_modules::tamper::{FrameStats, TamperDetector};

// Re-export key data structures for the public API.
pub use crate::core_modules::decision::LockStatus;
pub use crate::core_modules::scoring::{ThreatCategory, ThreatLevel};

/// Configuration for the monitor. Every numeric threshold the scoring and
/// decision rules use lives here, so recalibrating a camera is a data change,
/// not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Persons from the primary detector count only above this confidence.
    /// Stricter than the generic 0.40 detection floor.
    pub person_confidence: f32,
    /// Confidence floor for the helmet sub-model.
    pub helmet_confidence: f32,
    /// Confidence floor for the fallback head-region face classifier.
    pub face_probe_confidence: f32,
    /// Score added per overlapping person pair.
    pub proximity_pair_penalty: i32,
    /// Pair overlap (px^2) above which close-range conflict is flagged.
    /// Resolution-dependent; calibrated for 1080p-class cameras.
    pub conflict_area_px: f32,
    /// Score at or above which the decision tier is WARN.
    pub warn_threshold: i32,
    /// Score at or above which the decision tier is LOCK.
    pub lock_threshold: i32,
    /// Score must fall below this before an automatic unlock.
    pub all_clear_threshold: i32,
    /// Mean intensity below this reads as camera occlusion.
    pub dark_mean_threshold: f64,
    /// Intensity std-dev below this reads as a covered lens.
    pub uniform_std_threshold: f64,
    /// Full analysis runs on every Kth frame; others replay the cache.
    pub frame_skip_interval: u64,
    /// How long a manual silence suppresses automatic siren re-arming.
    pub snooze_duration: Duration,
    /// Minimum gap between hardware status polls.
    pub status_poll_interval: Duration,
    /// Fixed cadence for pushing snapshots to broadcast subscribers.
    pub publish_period: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            person_confidence: 0.60,
            helmet_confidence: 0.40,
            face_probe_confidence: 0.40,
            proximity_pair_penalty: 15,
            conflict_area_px: 40_000.0,
            warn_threshold: 40,
            lock_threshold: 70,
            all_clear_threshold: 50,
            dark_mean_threshold: 30.0,
            uniform_std_threshold: 10.0,
            frame_skip_interval: 5,
            snooze_duration: Duration::from_secs(30),
            status_poll_interval: Duration::from_secs(2),
            publish_period: Duration::from_millis(250),
        }
    }
}

/// Routes head-region probes back through the detection adapter.
struct AdapterFaceProbe<'a> {
    adapter: &'a mut dyn DetectionAdapter,
    frame: &'a FrameInput,
}

impl FaceProbe for AdapterFaceProbe<'_> {
    fn probe(&mut self, region: &BoundingBox) -> Option<FaceProbeResult> {
        self.adapter.probe_face(self.frame, region)
    }
}

/// The main, top-level struct for the monitoring engine.
pub struct SecurityMonitor {
    config: MonitorConfig,
    adapter: Box<dyn DetectionAdapter>,
    tamper: TamperDetector,
    scoring: ScoringEngine,
    cache: FrameSkipCache,
    decision: DecisionEngine,
    bridge: ActuationBridge,
    bus: crate::publisher::StateBus,
}

impl SecurityMonitor {
    /// Builds a monitor. Passing `None` for the actuator runs the bridge in
    /// simulation mode; the rest of the pipeline is unaffected.
    pub fn new(
        config: MonitorConfig,
        adapter: Box<dyn DetectionAdapter>,
        actuator: Option<Box<dyn Actuator>>,
    ) -> Self {
        let tamper = TamperDetector::new(config.dark_mean_threshold, config.uniform_std_threshold);
        let cache = FrameSkipCache::new(config.frame_skip_interval);
        let decision = DecisionEngine::new(config.snooze_duration, config.all_clear_threshold);
        let bridge = ActuationBridge::new(actuator, config.status_poll_interval);
        Self {
            config,
            adapter,
            tamper,
            scoring: ScoringEngine::new(),
            cache,
            decision,
            bridge,
            bus: crate::publisher::StateBus::new(16),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// The snapshot fan-out hub for observers.
    pub fn bus(&self) -> &crate::publisher::StateBus {
        &self.bus
    }

    /// The detection batch from the last fully-analyzed frame. Skipped
    /// frames replay this unchanged, so annotation consumers can keep
    /// drawing boxes at frame rate.
    pub fn last_detections(&self) -> &[Detection] {
        self.cache
            .replay()
            .map(|cached| cached.detections.as_slice())
            .unwrap_or(&[])
    }

    /// Runs one full decision cycle for a captured frame and returns the
    /// resulting snapshot. The caller must not overlap invocations; when no
    /// frame is available it simply does not call this, so the frame count
    /// never advances on capture failure.
    pub fn process_frame(&mut self, frame: &FrameInput) -> EngineSnapshot {
        self.process_frame_at(frame, Instant::now())
    }

    pub(crate) fn process_frame_at(&mut self, frame: &FrameInput, now: Instant) -> EngineSnapshot {
        let frame_index = self.decision.frame_count() + 1;

        let result: ScoreResult = if self.cache.should_process(frame_index) {
            self.analyze(frame)
        } else {
            match self.cache.replay() {
                Some(cached) => cached.result.clone(),
                // Unreachable in practice: should_process() demands a warm
                // cache before it ever answers false.
                None => self.analyze(frame),
            }
        };

        // Read-back first, decision second, so an automatic LOCK in this
        // step always wins over a stale status line.
        let status = self.bridge.poll_status(now);
        self.decision.apply_status(status);

        let commands = self.decision.step(result, now);
        self.issue(&commands);
        self.decision.set_hardware_connected(self.bridge.is_connected());

        let snapshot = self.decision.snapshot_at(now);
        self.bus.publish(snapshot.clone());
        snapshot
    }

    /// Full analysis path: frame statistics, tamper check, detector
    /// invocation, scoring. Stores the outputs for cache replay.
    fn analyze(&mut self, frame: &FrameInput) -> ScoreResult {
        let stats = FrameStats::from_luma_buffer(&frame.luma);
        let tamper_check = self.tamper.check(stats);

        let detections: Vec<Detection> = match self.adapter.detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                // Adapter failure is never fatal; score an empty set. Note
                // this makes total detector failure indistinguishable from
                // "all clear" for the duration of the outage.
                warn!(error = %err, "detection adapter failed, scoring empty set");
                Vec::new()
            }
        };

        let mut probe = AdapterFaceProbe {
            adapter: self.adapter.as_mut(),
            frame,
        };
        let result = self.scoring.score(
            &detections,
            &tamper_check,
            frame.hour_of_day,
            &mut probe,
            None,
            &self.config,
        );

        self.cache.store(result.clone(), detections);
        result
    }

    fn issue(&mut self, commands: &[CommandRequest]) {
        for request in commands {
            if request.forced {
                self.bridge.apply_forced(request.command);
            } else {
                self.bridge.apply(request.command);
            }
        }
    }

    /// Manual silence request: 30-second snooze (configurable). The silence
    /// command is sent unconditionally, even if hardware looks disconnected.
    pub fn silence_siren(&mut self) {
        self.silence_siren_at(Instant::now());
    }

    pub(crate) fn silence_siren_at(&mut self, now: Instant) {
        let request = self.decision.silence(now);
        self.bridge.apply_forced(request.command);
        self.bus.publish(self.decision.snapshot_at(now));
    }

    /// Manual siren-on request: clears any snooze and forces the siren.
    pub fn trigger_siren(&mut self) {
        self.trigger_siren_at(Instant::now());
    }

    pub(crate) fn trigger_siren_at(&mut self, now: Instant) {
        let request = self.decision.trigger();
        self.bridge.apply_forced(request.command);
        self.bus.publish(self.decision.snapshot_at(now));
    }
}
