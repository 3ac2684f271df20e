// THEORY:
// The `scoring` module is the heart of the threat assessment layer. It turns
// one frame's worth of weak, heterogeneous signals (labeled detections, the
// tamper verdict, the local hour) into a single bounded threat score and an
// ordered list of human-readable reasons.
//
// Key architectural principles:
// 1.  **Weighted categories, pure sum**: each triggered rule emits an
//     `ActiveThreat` carrying a fixed category weight. The score is the
//     clamped sum of those weights, so several moderate signals can reach
//     LOCK territory even without one dominant signal. Clamping happens once,
//     after summation, never per rule.
// 2.  **Per-source confidence thresholds**: a "person" from the primary
//     detector is only trusted above 0.60 confidence, stricter than the
//     generic 0.40 detection floor, to suppress ghost detections that would
//     otherwise inflate the crowd rules.
// 3.  **Display order is fixed**: reasons appear as weapons, face
//     concealment, helmet, crowd, objects, time/behavior, tamper. The sum is
//     commutative, so this ordering is purely presentational.
// 4.  **Stateless**: the engine holds no history. Identical inputs produce
//     identical results; all temporal behavior lives in the frame-skip cache
//     and the decision machine.

use crate::core_modules::detection::{
    BoundingBox, Detection, DetectionCategory, DetectionSource, FaceProbeResult,
};
use crate::core_modules::tamper::TamperCheck;
use crate::core_modules::tracker::ObjectTrack;
use crate::pipeline::MonitorConfig;
use serde::{Deserialize, Serialize};

/// Labels the primary detector reports for hand weapons.
const WEAPON_LABELS: [&str; 2] = ["knife", "scissors"];
/// Labels treated as suspicious unattended objects.
const SUSPICIOUS_OBJECT_LABELS: [&str; 2] = ["backpack", "suitcase"];
/// Label the mask sub-model reports for a covered face.
const MASK_LABEL: &str = "mask";
/// Labels the mask sub-model reports for a visible face.
const FACE_VISIBLE_LABELS: [&str; 2] = ["no-mask", "face"];
/// Label the helmet sub-model reports for a worn helmet.
const HELMET_LABEL: &str = "with-helmet";

/// Late-night window: 23:00 up to (but excluding) 05:00.
fn is_late_night(hour: u8) -> bool {
    hour >= 23 || hour < 5
}

/// Coarse threat buckets, each with a fixed score weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatCategory {
    Weapon,
    Violence,
    Tamper,
    Helmet,
    FaceMask,
    Crowd,
    Behavior,
    Object,
    Time,
    /// Identity-verification discount; the only negative contribution.
    Safety,
}

impl ThreatCategory {
    /// The static weight table, loaded into the binary once and immutable
    /// process-wide.
    pub fn weight(&self) -> i32 {
        match self {
            ThreatCategory::Weapon => 100,
            ThreatCategory::Violence => 90,
            ThreatCategory::Tamper => 80,
            ThreatCategory::Helmet => 70,
            ThreatCategory::FaceMask => 60,
            ThreatCategory::Crowd => 40,
            ThreatCategory::Behavior => 30,
            ThreatCategory::Object => 25,
            ThreatCategory::Time => 20,
            ThreatCategory::Safety => -10,
        }
    }
}

/// One category instance triggered during a scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveThreat {
    pub category: ThreatCategory,
    pub reason: String,
    pub weight: i32,
}

impl ActiveThreat {
    fn new(category: ThreatCategory, reason: impl Into<String>) -> Self {
        Self {
            category,
            reason: reason.into(),
            weight: category.weight(),
        }
    }

    fn with_weight(category: ThreatCategory, reason: impl Into<String>, weight: i32) -> Self {
        Self {
            category,
            reason: reason.into(),
            weight,
        }
    }
}

/// The decision tier derived from the clamped score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatLevel {
    Normal,
    Warn,
    Lock,
}

/// The primary output of a scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Clamped to `[0, 100]` after summation.
    pub threat_score: i32,
    pub level: ThreatLevel,
    /// Human-readable reasons in display order.
    pub reasons: Vec<String>,
}

impl ScoreResult {
    /// The all-quiet result used before any frame has been scored.
    pub fn idle() -> Self {
        Self {
            threat_score: 0,
            level: ThreatLevel::Normal,
            reasons: Vec::new(),
        }
    }
}

/// Seam for the fallback face classifier. The dedicated face detector
/// frequently misses small or angled faces that the person detector still
/// finds, so the scoring engine can probe each person's head region through
/// this interface.
pub trait FaceProbe {
    /// Classifies a head-region crop; `None` means no confident reading.
    fn probe(&mut self, region: &BoundingBox) -> Option<FaceProbeResult>;
}

/// A probe that never produces a reading, for drivers without a face model.
pub struct NoFaceProbe;

impl FaceProbe for NoFaceProbe {
    fn probe(&mut self, _region: &BoundingBox) -> Option<FaceProbeResult> {
        None
    }
}

/// What the face-concealment rules concluded about the people in frame.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FaceVisibility {
    /// No person, or no reading either way.
    Unknown,
    Confirmed,
    Concealed,
}

/// Stateless rule evaluator mapping one frame's signals to a `ScoreResult`.
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores one processed frame. `tracks` is the extension point for the
    /// not-yet-built temporal tracker; it is accepted but not weighed.
    pub fn score(
        &self,
        detections: &[Detection],
        tamper: &TamperCheck,
        hour_of_day: u8,
        probe: &mut dyn FaceProbe,
        _tracks: Option<&[ObjectTrack]>,
        config: &MonitorConfig,
    ) -> ScoreResult {
        let mut threats: Vec<ActiveThreat> = Vec::new();

        // Trusted persons: primary detector only, above the stricter floor.
        let person_boxes: Vec<BoundingBox> = detections
            .iter()
            .filter(|d| {
                d.category == DetectionCategory::Person
                    && d.source == DetectionSource::PrimaryDetector
                    && d.confidence > config.person_confidence
            })
            .map(|d| d.bbox)
            .collect();
        let person_count = person_boxes.len();

        self.evaluate_weapons(detections, &mut threats);
        let face = self.evaluate_face_concealment(detections, &person_boxes, probe, config, &mut threats);
        self.evaluate_helmet(detections, config, &mut threats);
        self.evaluate_crowd(&person_boxes, config, &mut threats);
        self.evaluate_objects(detections, &mut threats);
        self.evaluate_time_of_day(hour_of_day, person_count, face, &mut threats);

        if tamper.is_tampered() {
            let reason = tamper.reason().unwrap_or("camera tampering");
            threats.push(ActiveThreat::new(ThreatCategory::Tamper, reason));
        }

        let raw: i32 = threats.iter().map(|t| t.weight).sum();
        let threat_score = raw.clamp(0, 100);
        let level = self.level_for(threat_score, config);
        let reasons = threats.into_iter().map(|t| t.reason).collect();

        ScoreResult {
            threat_score,
            level,
            reasons,
        }
    }

    fn level_for(&self, score: i32, config: &MonitorConfig) -> ThreatLevel {
        if score >= config.lock_threshold {
            ThreatLevel::Lock
        } else if score >= config.warn_threshold {
            ThreatLevel::Warn
        } else {
            ThreatLevel::Normal
        }
    }

    /// Weapons count once no matter how many are in frame; the reason lists
    /// every distinct label found. The dedicated gun sub-model is trusted for
    /// any label it reports.
    fn evaluate_weapons(&self, detections: &[Detection], threats: &mut Vec<ActiveThreat>) {
        let mut labels: Vec<&str> = Vec::new();
        for d in detections {
            let is_weapon = match d.source {
                DetectionSource::PrimaryDetector => {
                    WEAPON_LABELS.contains(&d.label.as_str())
                }
                DetectionSource::GunModel => true,
                _ => false,
            };
            if is_weapon && !labels.contains(&d.label.as_str()) {
                labels.push(&d.label);
            }
        }
        if !labels.is_empty() {
            threats.push(ActiveThreat::new(
                ThreatCategory::Weapon,
                format!("weapon detected: {}", labels.join(", ")),
            ));
        }
    }

    fn evaluate_face_concealment(
        &self,
        detections: &[Detection],
        person_boxes: &[BoundingBox],
        probe: &mut dyn FaceProbe,
        config: &MonitorConfig,
        threats: &mut Vec<ActiveThreat>,
    ) -> FaceVisibility {
        let mask_seen = detections
            .iter()
            .any(|d| d.source == DetectionSource::MaskModel && d.label == MASK_LABEL);
        if mask_seen {
            threats.push(ActiveThreat::new(
                ThreatCategory::FaceMask,
                "face concealment: mask detected",
            ));
            return FaceVisibility::Concealed;
        }

        let face_seen = detections.iter().any(|d| {
            d.source == DetectionSource::MaskModel
                && FACE_VISIBLE_LABELS.contains(&d.label.as_str())
        });
        if face_seen {
            return FaceVisibility::Confirmed;
        }

        // The mask sub-model saw nothing at all. Probe each person's head
        // region until one reading is confident either way.
        for person in person_boxes {
            let region = person.head_region();
            if let Some(reading) = probe.probe(&region) {
                if reading.confidence > config.face_probe_confidence {
                    if reading.masked {
                        threats.push(ActiveThreat::new(
                            ThreatCategory::FaceMask,
                            "face concealment: mask detected",
                        ));
                        return FaceVisibility::Concealed;
                    }
                    return FaceVisibility::Confirmed;
                }
            }
        }
        FaceVisibility::Unknown
    }

    /// A worn helmet is a face-concealment proxy in this domain, weighted
    /// independently of the mask category.
    fn evaluate_helmet(
        &self,
        detections: &[Detection],
        config: &MonitorConfig,
        threats: &mut Vec<ActiveThreat>,
    ) {
        let helmeted = detections.iter().any(|d| {
            d.source == DetectionSource::HelmetModel
                && d.label == HELMET_LABEL
                && d.confidence > config.helmet_confidence
        });
        if helmeted {
            threats.push(ActiveThreat::new(
                ThreatCategory::Helmet,
                "helmet concealing face",
            ));
        }
    }

    /// Crowding plus the O(n^2) pairwise proximity heuristic. Per-pair
    /// penalties accumulate uncapped before the final clamp; a pair whose
    /// overlap exceeds the (resolution-dependent) conflict area is flagged as
    /// close-range violence.
    fn evaluate_crowd(
        &self,
        person_boxes: &[BoundingBox],
        config: &MonitorConfig,
        threats: &mut Vec<ActiveThreat>,
    ) {
        if person_boxes.len() > 1 {
            threats.push(ActiveThreat::new(
                ThreatCategory::Crowd,
                format!("crowding: {} people in view", person_boxes.len()),
            ));
        }

        let mut overlapping_pairs = 0u32;
        let mut conflict = false;
        for i in 0..person_boxes.len() {
            for j in (i + 1)..person_boxes.len() {
                let area = person_boxes[i].intersection_area(&person_boxes[j]);
                if area > 0.0 {
                    overlapping_pairs += 1;
                }
                if area > config.conflict_area_px {
                    conflict = true;
                }
            }
        }

        if overlapping_pairs > 0 {
            threats.push(ActiveThreat::with_weight(
                ThreatCategory::Crowd,
                format!("close proximity: {overlapping_pairs} overlapping person pairs"),
                config.proximity_pair_penalty * overlapping_pairs as i32,
            ));
        }
        if conflict {
            threats.push(ActiveThreat::new(
                ThreatCategory::Violence,
                "close-range conflict between people",
            ));
        }
    }

    fn evaluate_objects(&self, detections: &[Detection], threats: &mut Vec<ActiveThreat>) {
        let suspicious = detections
            .iter()
            .find(|d| SUSPICIOUS_OBJECT_LABELS.contains(&d.label.as_str()));
        if let Some(d) = suspicious {
            threats.push(ActiveThreat::new(
                ThreatCategory::Object,
                format!("unattended object: {}", d.label),
            ));
        }
    }

    fn evaluate_time_of_day(
        &self,
        hour: u8,
        person_count: usize,
        face: FaceVisibility,
        threats: &mut Vec<ActiveThreat>,
    ) {
        if !is_late_night(hour) {
            return;
        }
        threats.push(ActiveThreat::new(ThreatCategory::Time, "late-night access"));

        if person_count > 0 {
            match face {
                FaceVisibility::Confirmed => threats.push(ActiveThreat::new(
                    ThreatCategory::Safety,
                    "identity verified on camera",
                )),
                _ => threats.push(ActiveThreat::new(
                    ThreatCategory::Behavior,
                    "suspicious late activity",
                )),
            }
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}
