// THEORY:
// This file is the main entry point for the `argus_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API that will be exposed to external consumers (a capture/transport
// host wiring real cameras and hardware into the engine).
//
// The primary goal is to export the `SecurityMonitor` and its associated data
// structures (`MonitorConfig`, `EngineSnapshot`, the adapter and actuator
// traits) as the clean, high-level interface for the whole threat assessment
// engine. The internal rule modules (`core_modules`) stay encapsulated behind
// it.

pub mod core_modules;
pub mod pipeline;
pub mod publisher;

pub use core_modules::actuator::{Actuator, ActuatorCommand, ActuatorError, HardwareStatus};
pub use core_modules::decision::{EngineSnapshot, LockStatus};
pub use core_modules::detection::{
    BoundingBox, DetectError, Detection, DetectionAdapter, DetectionCategory, DetectionSource,
    FaceProbeResult, FrameInput,
};
pub use core_modules::scoring::{ScoreResult, ThreatCategory, ThreatLevel};
pub use core_modules::tamper::{FrameStats, TamperCheck};
pub use core_modules::tracker::ObjectTrack;
pub use pipeline::{MonitorConfig, SecurityMonitor};
pub use publisher::StateBus;
