// THEORY:
// The `decision` module owns the engine's only long-lived mutable state and
// the transition rules that actuate hardware from it. The threat level itself
// is derived fresh each frame by the scoring engine; what lives here is
// everything that must persist across frames: the lock state, the siren
// state, the snooze window, and the frame counter.
//
// Key architectural principles:
// 1.  **Single owner, snapshot readers**: `EngineState` is never exposed for
//     direct mutation. The per-frame step and the manual control surface are
//     the only writers, and observers receive `EngineSnapshot` copies, so a
//     reader can never see a half-updated state.
// 2.  **Siren-follows-lock policy**: a LOCK decision activates the siren
//     implicitly through the hardware's own lock behavior. This is the single
//     most safety-relevant rule in the system, so it is named and handled
//     explicitly here rather than left as a side effect. The snooze window
//     overrides it with an explicit silence command, and the siren's
//     off-to-on edge always gets its own SIREN_ON: the bridge suppresses a
//     sustained lock command as a duplicate, so the lock's implicit siren
//     cannot be relied on once a silence has reached the hardware.
// 3.  **All-clear hysteresis**: unlocking requires the score to fall below a
//     separate all-clear threshold (default 50), above the WARN threshold
//     (40), so a score oscillating in between cannot thrash the physical
//     lock.
// 4.  **Advisory read-back**: hardware status is applied before the frame's
//     transitions, so an automatic LOCK in the same step always wins over a
//     stale status line.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_modules::actuator::{ActuatorCommand, HardwareStatus};
use crate::core_modules::scoring::{ScoreResult, ThreatLevel};

/// Lock state as tracked (optimistically) by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStatus {
    Locked,
    Unlocked,
}

/// A command the bridge should issue, with its delivery mode. Forced requests
/// come from the manual control surface and bypass duplicate suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: ActuatorCommand,
    pub forced: bool,
}

impl CommandRequest {
    fn auto(command: ActuatorCommand) -> Self {
        Self {
            command,
            forced: false,
        }
    }

    fn manual(command: ActuatorCommand) -> Self {
        Self {
            command,
            forced: true,
        }
    }
}

/// Process-lifetime engine state. Owned exclusively by `DecisionEngine`.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub frame_count: u64,
    pub last_result: ScoreResult,
    /// Manual silence window; `None` means never snoozed or expired.
    pub snooze_until: Option<Instant>,
    pub lock_status: LockStatus,
    pub siren_active: bool,
    pub hardware_connected: bool,
}

/// Read-only copy of the engine state, pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub frame_count: u64,
    pub threat_score: i32,
    pub level: ThreatLevel,
    pub reasons: Vec<String>,
    pub lock_status: LockStatus,
    pub siren_active: bool,
    pub hardware_connected: bool,
    pub snoozed: bool,
}

/// The lock/siren actuation state machine with snooze semantics.
pub struct DecisionEngine {
    state: EngineState,
    snooze_duration: Duration,
    /// Score must fall below this before an automatic unlock. Deliberately
    /// above the WARN threshold; see module THEORY.
    all_clear_threshold: i32,
    /// True when the current step set `lock_status` from a LOCK decision.
    lock_forced_this_step: bool,
}

impl DecisionEngine {
    pub fn new(snooze_duration: Duration, all_clear_threshold: i32) -> Self {
        Self {
            state: EngineState {
                frame_count: 0,
                last_result: ScoreResult::idle(),
                snooze_until: None,
                lock_status: LockStatus::Unlocked,
                siren_active: false,
                hardware_connected: false,
            },
            snooze_duration,
            all_clear_threshold,
            lock_forced_this_step: false,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.state.frame_count
    }

    pub fn is_snoozed(&self, now: Instant) -> bool {
        matches!(self.state.snooze_until, Some(until) if now < until)
    }

    /// Applies a best-effort hardware read-back. Advisory: it never overrides
    /// a lock state set by a LOCK decision within the same step, which is
    /// guaranteed by calling this before `step`.
    pub fn apply_status(&mut self, status: Option<HardwareStatus>) {
        if let Some(status) = status {
            self.state.hardware_connected = true;
            if !self.lock_forced_this_step {
                self.state.lock_status = match status {
                    HardwareStatus::Locked => LockStatus::Locked,
                    HardwareStatus::Unlocked => LockStatus::Unlocked,
                };
            }
        }
    }

    pub fn set_hardware_connected(&mut self, connected: bool) {
        self.state.hardware_connected = connected;
    }

    /// Advances the machine by one frame (processed or cache-replayed) and
    /// returns the hardware commands this transition requires.
    pub fn step(&mut self, result: ScoreResult, now: Instant) -> Vec<CommandRequest> {
        self.state.frame_count += 1;
        self.lock_forced_this_step = false;
        if matches!(self.state.snooze_until, Some(until) if now >= until) {
            self.state.snooze_until = None;
        }
        let snoozed = self.is_snoozed(now);
        let mut commands = Vec::new();

        match result.level {
            ThreatLevel::Lock => {
                self.state.lock_status = LockStatus::Locked;
                self.lock_forced_this_step = true;
                commands.push(CommandRequest::auto(ActuatorCommand::Lock));
                if snoozed {
                    // Snooze overrides the lock's implicit siren.
                    self.state.siren_active = false;
                    commands.push(CommandRequest::auto(ActuatorCommand::SirenOff));
                } else {
                    if !self.state.siren_active {
                        // Off-to-on edge. A sustained lock command is deduped
                        // by the bridge, so the siren needs its own command
                        // here; otherwise a silenced siren would never re-arm
                        // at the hardware while the lock decision repeats.
                        commands.push(CommandRequest::auto(ActuatorCommand::SirenOn));
                    }
                    self.state.siren_active = true;
                }
            }
            ThreatLevel::Warn => {
                if snoozed {
                    self.state.siren_active = false;
                } else {
                    self.state.siren_active = true;
                    commands.push(CommandRequest::auto(ActuatorCommand::SirenOn));
                }
            }
            ThreatLevel::Normal => {
                if result.threat_score < self.all_clear_threshold {
                    if self.state.lock_status == LockStatus::Locked {
                        info!(score = result.threat_score, "all clear, unlocking");
                    }
                    self.state.lock_status = LockStatus::Unlocked;
                    self.state.siren_active = false;
                    commands.push(CommandRequest::auto(ActuatorCommand::Unlock));
                }
            }
        }

        self.state.last_result = result;
        commands
    }

    /// Manual silence request: suppresses the siren for the snooze window.
    /// The silence command is attempted unconditionally, even when hardware
    /// is reported disconnected.
    pub fn silence(&mut self, now: Instant) -> CommandRequest {
        self.state.siren_active = false;
        self.state.snooze_until = Some(now + self.snooze_duration);
        info!(snooze_secs = self.snooze_duration.as_secs(), "siren silenced manually");
        CommandRequest::manual(ActuatorCommand::SirenOff)
    }

    /// Manual siren-on request: clears any snooze and forces the siren.
    pub fn trigger(&mut self) -> CommandRequest {
        self.state.siren_active = true;
        self.state.snooze_until = None;
        info!("siren triggered manually");
        CommandRequest::manual(ActuatorCommand::SirenOn)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot with the `snoozed` flag evaluated against `now`, so an
    /// out-of-band reader never sees an already-expired snooze as active.
    pub fn snapshot_at(&self, now: Instant) -> EngineSnapshot {
        EngineSnapshot {
            frame_count: self.state.frame_count,
            threat_score: self.state.last_result.threat_score,
            level: self.state.last_result.level,
            reasons: self.state.last_result.reasons.clone(),
            lock_status: self.state.lock_status,
            siren_active: self.state.siren_active,
            hardware_connected: self.state.hardware_connected,
            snoozed: self.is_snoozed(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNOOZE: Duration = Duration::from_secs(30);

    fn engine() -> DecisionEngine {
        DecisionEngine::new(SNOOZE, 50)
    }

    fn result(score: i32, level: ThreatLevel) -> ScoreResult {
        ScoreResult {
            threat_score: score,
            level,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn initial_state_is_normal_unlocked() {
        let e = engine();
        let snap = e.snapshot();
        assert_eq!(snap.lock_status, LockStatus::Unlocked);
        assert!(!snap.siren_active);
        assert!(!snap.snoozed);
        assert_eq!(snap.frame_count, 0);
    }

    #[test]
    fn lock_decision_locks_and_arms_siren() {
        let mut e = engine();
        let now = Instant::now();
        let commands = e.step(result(100, ThreatLevel::Lock), now);
        assert_eq!(
            commands,
            vec![
                CommandRequest {
                    command: ActuatorCommand::Lock,
                    forced: false
                },
                CommandRequest {
                    command: ActuatorCommand::SirenOn,
                    forced: false
                },
            ]
        );
        let snap = e.snapshot();
        assert_eq!(snap.lock_status, LockStatus::Locked);
        assert!(snap.siren_active);
    }

    #[test]
    fn silence_during_lock_keeps_door_locked_but_siren_off() {
        let mut e = engine();
        let now = Instant::now();
        e.step(result(100, ThreatLevel::Lock), now);

        let silence = e.silence(now);
        assert_eq!(silence.command, ActuatorCommand::SirenOff);
        assert!(silence.forced);

        // Next LOCK frame inside the snooze window.
        let commands = e.step(result(100, ThreatLevel::Lock), now + Duration::from_secs(5));
        assert!(commands.iter().any(|c| c.command == ActuatorCommand::SirenOff));
        let snap = e.snapshot();
        assert_eq!(snap.lock_status, LockStatus::Locked);
        assert!(!snap.siren_active);
    }

    #[test]
    fn snooze_expires_and_siren_rearms() {
        let mut e = engine();
        let now = Instant::now();
        e.silence(now);
        assert!(e.is_snoozed(now + Duration::from_secs(29)));
        assert!(!e.is_snoozed(now + SNOOZE));

        // The re-arm must surface as an explicit command, not just in-memory
        // state: the bridge dedups the repeated lock command.
        let commands = e.step(result(100, ThreatLevel::Lock), now + Duration::from_secs(31));
        assert!(commands.iter().any(|c| c.command == ActuatorCommand::SirenOn));
        assert!(e.snapshot().siren_active);
    }

    #[test]
    fn snoozed_flag_expires_without_a_step() {
        let mut e = engine();
        let now = Instant::now();
        e.silence(now);
        assert!(e.snapshot_at(now + Duration::from_secs(5)).snoozed);
        assert!(!e.snapshot_at(now + SNOOZE).snoozed);
    }

    #[test]
    fn manual_trigger_clears_snooze() {
        let mut e = engine();
        let now = Instant::now();
        e.silence(now);
        let request = e.trigger();
        assert_eq!(request.command, ActuatorCommand::SirenOn);
        assert!(request.forced);
        assert!(!e.is_snoozed(now + Duration::from_secs(2)));
        assert!(e.snapshot().siren_active);
    }

    #[test]
    fn warn_sounds_warning_siren_unless_snoozed() {
        let mut e = engine();
        let now = Instant::now();
        let commands = e.step(result(45, ThreatLevel::Warn), now);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, ActuatorCommand::SirenOn);
        assert!(e.snapshot().siren_active);

        e.silence(now);
        let commands = e.step(result(45, ThreatLevel::Warn), now + Duration::from_secs(1));
        assert!(commands.is_empty());
        assert!(!e.snapshot().siren_active);
    }

    #[test]
    fn score_below_all_clear_unlocks_after_lock() {
        let mut e = engine();
        let now = Instant::now();
        e.step(result(100, ThreatLevel::Lock), now);
        let commands = e.step(result(30, ThreatLevel::Normal), now + Duration::from_secs(1));
        assert!(commands.iter().any(|c| c.command == ActuatorCommand::Unlock));
        let snap = e.snapshot();
        assert_eq!(snap.lock_status, LockStatus::Unlocked);
        assert!(!snap.siren_active);
    }

    #[test]
    fn warn_band_score_does_not_unlock() {
        // Hysteresis: a WARN-tier score after a lock keeps the door locked.
        let mut e = engine();
        let now = Instant::now();
        e.step(result(100, ThreatLevel::Lock), now);
        e.step(result(45, ThreatLevel::Warn), now + Duration::from_secs(1));
        assert_eq!(e.snapshot().lock_status, LockStatus::Locked);
    }

    #[test]
    fn readback_updates_state_between_steps() {
        let mut e = engine();
        e.apply_status(Some(HardwareStatus::Locked));
        let snap = e.snapshot();
        assert_eq!(snap.lock_status, LockStatus::Locked);
        assert!(snap.hardware_connected);
    }

    #[test]
    fn readback_never_overrides_same_step_lock() {
        let mut e = engine();
        let now = Instant::now();
        e.step(result(100, ThreatLevel::Lock), now);
        // A stale "unlocked" line arrives after the LOCK decision this step.
        e.apply_status(Some(HardwareStatus::Unlocked));
        assert_eq!(e.snapshot().lock_status, LockStatus::Locked);
    }

    #[test]
    fn frame_count_advances_every_step() {
        let mut e = engine();
        let now = Instant::now();
        e.step(result(0, ThreatLevel::Normal), now);
        e.step(result(0, ThreatLevel::Normal), now);
        assert_eq!(e.frame_count(), 2);
    }
}
