// THEORY:
// The `tracker` module is the extension point for temporal object tracking:
// re-identifying the same person across frames and measuring how long they
// have loitered in view. The scoring engine already accepts an optional track
// signal so that a future tracker can feed it without an API change.
//
// INCOMPLETE: nothing in the pipeline produces `ObjectTrack`s yet, and the
// scoring engine does not weigh them. The original system declared the same
// scaffolding without ever populating it, and the intended loiter policy was
// never written down, so this crate keeps the seam but does not guess the
// behavior.

use crate::core_modules::detection::{BoundingBox, DetectionCategory};

/// A single object's identity carried across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTrack {
    /// Unique, persistent ID for this object.
    pub id: u64,
    pub category: DetectionCategory,
    /// Where the object was last seen.
    pub last_bbox: BoundingBox,
    /// Consecutive processed frames this object has been tracked for.
    pub age_frames: u32,
}

impl ObjectTrack {
    pub fn new(id: u64, category: DetectionCategory, bbox: BoundingBox) -> Self {
        Self {
            id,
            category,
            last_bbox: bbox,
            age_frames: 1,
        }
    }
}
