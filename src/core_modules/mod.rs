pub mod actuator;
pub mod decision;
pub mod detection;
pub mod frame_cache;
pub mod scoring;
pub mod tamper;
pub mod tracker;
