// THEORY:
// The `publisher` module decouples observers from the decision loop. The loop
// publishes a full `EngineSnapshot` after every frame; observers never touch
// engine state directly.
//
// Two channels with different delivery semantics:
// 1.  A `watch` channel holds the latest snapshot. Replacement is atomic, so
//     a reader can never observe the decision from frame N paired with the
//     reasons from frame N-1.
// 2.  A `broadcast` channel fans the snapshot out to any number of
//     subscribers on a fixed cadence, independent of frame processing, the
//     way a dashboard expects a steady status stream. Slow subscribers lag
//     and drop; they never back-pressure the decision loop.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::core_modules::decision::{EngineSnapshot, LockStatus};
use crate::core_modules::scoring::ThreatLevel;

/// Fan-out hub for engine state snapshots.
#[derive(Clone)]
pub struct StateBus {
    snapshot_tx: watch::Sender<EngineSnapshot>,
    updates_tx: broadcast::Sender<EngineSnapshot>,
}

impl StateBus {
    pub fn new(capacity: usize) -> Self {
        let initial = EngineSnapshot {
            frame_count: 0,
            threat_score: 0,
            level: ThreatLevel::Normal,
            reasons: Vec::new(),
            lock_status: LockStatus::Unlocked,
            siren_active: false,
            hardware_connected: false,
            snoozed: false,
        };
        let (snapshot_tx, _) = watch::channel(initial);
        let (updates_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            snapshot_tx,
            updates_tx,
        }
    }

    /// Atomically replaces the latest snapshot.
    pub fn publish(&self, snapshot: EngineSnapshot) {
        self.snapshot_tx.send_replace(snapshot);
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> EngineSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// A receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// A receiver fed by the cadence task.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineSnapshot> {
        self.updates_tx.subscribe()
    }

    /// Spawns the task that re-broadcasts the latest snapshot on a fixed
    /// period, regardless of how often frames are processed.
    pub fn start_cadence(&self, period: Duration) -> JoinHandle<()> {
        let rx = self.snapshot_tx.subscribe();
        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let snapshot = rx.borrow().clone();
                // Send fails only when no subscriber is listening; keep going.
                let _ = tx.send(snapshot);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(frame: u64, score: i32) -> EngineSnapshot {
        EngineSnapshot {
            frame_count: frame,
            threat_score: score,
            level: ThreatLevel::Normal,
            reasons: vec![format!("frame {frame}")],
            lock_status: LockStatus::Unlocked,
            siren_active: false,
            hardware_connected: false,
            snoozed: false,
        }
    }

    #[test]
    fn latest_reflects_last_publish() {
        let bus = StateBus::new(8);
        bus.publish(snapshot(1, 10));
        bus.publish(snapshot(2, 20));
        let latest = bus.latest();
        assert_eq!(latest.frame_count, 2);
        assert_eq!(latest.threat_score, 20);
        assert_eq!(latest.reasons, vec!["frame 2"]);
    }

    #[tokio::test]
    async fn cadence_task_feeds_subscribers() {
        let bus = StateBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(snapshot(5, 42));
        let handle = bus.start_cadence(Duration::from_millis(10));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.frame_count, 5);
        assert_eq!(received.threat_score, 42);
        handle.abort();
    }

    #[tokio::test]
    async fn watch_receiver_sees_atomic_updates() {
        let bus = StateBus::new(8);
        let mut rx = bus.watch();
        bus.publish(snapshot(3, 30));
        rx.changed().await.unwrap();
        let seen = rx.borrow().clone();
        assert_eq!(seen.frame_count, 3);
        assert_eq!(seen.threat_score, 30);
    }
}
