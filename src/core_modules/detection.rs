// THEORY:
// The `detection` module defines the normalized vocabulary spoken between the
// external detection models and the scoring engine. The models themselves are
// collaborators outside this crate (YOLO-class detectors plus several small
// specialist sub-models); what crosses the boundary is a flat list of
// `Detection`s, each tagged with the `source` model that produced it so the
// scoring rules can apply per-source confidence thresholds.
//
// Key architectural principles:
// 1.  **Source tagging**: A "person" from the primary detector and a "mask"
//     from the mask sub-model carry different evidential weight. The enum tag
//     makes that distinction explicit instead of encoding it in label strings.
// 2.  **Immutable snapshots**: A `Detection` is produced fresh each processed
//     frame, never mutated, and discarded after scoring (the frame-skip cache
//     keeps only the last batch for replay).
// 3.  **Coordinate-space geometry**: `BoundingBox` carries the pairwise
//     intersection math used by the crowd/proximity heuristic, keeping the
//     O(n^2) geometry in one place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which external model produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionSource {
    /// The general-purpose object detector (persons, weapons, bags).
    PrimaryDetector,
    /// The helmet classification sub-model.
    HelmetModel,
    /// The mask / face-visibility sub-model.
    MaskModel,
    /// The dedicated firearm sub-model.
    GunModel,
    /// The cap/headwear sub-model.
    CapModel,
}

/// Coarse classification of what a detection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionCategory {
    Person,
    Weapon,
    Face,
    Headwear,
    Object,
}

/// An axis-aligned box in pixel coordinates, `(x1, y1)` top-left inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Area of the overlap between two boxes, in square pixels. Zero when the
    /// boxes are disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h = self.y2.min(other.y2) - self.y1.max(other.y1);
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    }

    /// The top quarter of the box, used as the head-region crop when probing
    /// a person detection for face visibility.
    pub fn head_region(&self) -> BoundingBox {
        BoundingBox {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y1 + (self.y2 - self.y1) * 0.25,
        }
    }
}

/// One labeled, localized object found by an external model in a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub category: DetectionCategory,
    pub label: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub source: DetectionSource,
}

impl Detection {
    pub fn new(
        category: DetectionCategory,
        label: impl Into<String>,
        confidence: f32,
        bbox: BoundingBox,
        source: DetectionSource,
    ) -> Self {
        Self {
            category,
            label: label.into(),
            confidence,
            bbox,
            source,
        }
    }
}

/// Outcome of probing a head region with the fallback face classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceProbeResult {
    /// True when the classifier saw a covered/masked face.
    pub masked: bool,
    pub confidence: f32,
}

/// Errors surfaced by a detection adapter. Adapter failure is never fatal to
/// the decision loop; the pipeline degrades to an empty detection set.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("model inference failed: {0}")]
    Inference(String),
    #[error("frame has unsupported dimensions {width}x{height}")]
    BadFrame { width: u32, height: u32 },
}

/// A raw frame handed to the pipeline by the capture layer (out of scope for
/// this crate), together with the local hour used by the time-of-day rules.
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// 8-bit grayscale pixel data, row-major.
    pub luma: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Local hour of day, `0..=23`.
    pub hour_of_day: u8,
}

/// The external detection collaborator: one or more models invoked per frame,
/// normalized into a flat detection list.
pub trait DetectionAdapter: Send {
    /// Runs the detection models over a frame. May block; the pipeline treats
    /// any error as "no detections this frame".
    fn detect(&mut self, frame: &FrameInput) -> Result<Vec<Detection>, DetectError>;

    /// Classifies a head-region crop for face visibility. `None` means the
    /// classifier could not produce a reading for the region. Default
    /// implementation reports no reading, for adapters without a face model.
    fn probe_face(&mut self, _frame: &FrameInput, _region: &BoundingBox) -> Option<FaceProbeResult> {
        None
    }
}
