// Demo runner for the `argus_vision` engine: a scripted detection adapter
// plays out a quiet scene, a weapon sighting, and a covered lens, while the
// bridge runs in simulation mode and a subscriber logs the broadcast
// snapshots. A real deployment would wire camera capture, the detection
// models, and the serial actuator in place of the synthetic pieces.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::info;

use argus_vision::{
    BoundingBox, DetectError, Detection, DetectionAdapter, DetectionCategory, DetectionSource,
    FrameInput, MonitorConfig, SecurityMonitor,
};

/// Replays a fixed storyline of detection batches, one per processed frame.
struct ScriptedAdapter {
    processed: usize,
}

impl DetectionAdapter for ScriptedAdapter {
    fn detect(&mut self, _frame: &FrameInput) -> Result<Vec<Detection>, DetectError> {
        self.processed += 1;
        // Frames 3 and 4 of the script show a knife, the rest are quiet.
        let detections = if (3..=4).contains(&self.processed) {
            vec![Detection::new(
                DetectionCategory::Weapon,
                "knife",
                0.92,
                BoundingBox::new(310.0, 180.0, 420.0, 300.0),
                DetectionSource::PrimaryDetector,
            )]
        } else {
            Vec::new()
        };
        Ok(detections)
    }
}

fn synthetic_frame(step: usize) -> FrameInput {
    // Late in the run the lens is "covered": a flat gray frame.
    let luma = if step >= 30 {
        vec![128u8; 320 * 240]
    } else {
        (0..320 * 240)
            .map(|i| if i % 3 == 0 { 70 } else { 190 })
            .collect()
    };
    FrameInput {
        luma,
        width: 320,
        height: 240,
        hour_of_day: 14,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argus_vision=info".into()),
        )
        .init();

    info!("argus_vision demo starting (simulation mode, synthetic frames)");

    let config = MonitorConfig::default();
    let publish_period = config.publish_period;
    let monitor = SecurityMonitor::new(config, Box::new(ScriptedAdapter { processed: 0 }), None);

    let bus = monitor.bus().clone();
    let cadence = bus.start_cadence(publish_period);
    let mut updates = bus.subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(snapshot) = updates.recv().await {
            info!(
                frame = snapshot.frame_count,
                score = snapshot.threat_score,
                level = ?snapshot.level,
                lock = ?snapshot.lock_status,
                siren = snapshot.siren_active,
                reasons = ?snapshot.reasons,
                "status"
            );
        }
    });

    let monitor = Arc::new(Mutex::new(monitor));
    for step in 0..40usize {
        let frame = synthetic_frame(step);
        monitor.lock().await.process_frame(&frame);

        // An operator silences the siren shortly after the weapon lock.
        if step == 20 {
            monitor.lock().await.silence_siren();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let last = monitor.lock().await.bus().latest();
    info!(
        score = last.threat_score,
        level = ?last.level,
        lock = ?last.lock_status,
        "demo complete"
    );
    // The wire form a dashboard subscriber would consume.
    println!("{}", serde_json::to_string_pretty(&last)?);

    cadence.abort();
    observer.abort();
    Ok(())
}
