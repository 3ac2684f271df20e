// THEORY:
// The `actuator` module is the bridge between decision transitions and the
// physical lock/siren hardware. The transport itself (a serial link to a
// microcontroller) is an external collaborator; what this module owns is the
// delivery contract: every command is at-most-once, fire-and-forget, with no
// queue and no retry. A failed send is logged and the in-memory state keeps
// the *intended* value, because a stalled security loop is worse than a
// momentarily out-of-sync lock.
//
// Two protections against thrashing a physical lock:
// 1.  **Per-channel dedup**: a sustained LOCK decision re-issues the same
//     command every frame; the bridge suppresses consecutive duplicates on
//     each channel (lock vs. siren). Manual requests bypass the dedup.
// 2.  **Throttled status polling**: hardware read-back is best-effort and
//     rate-limited, and only ever updates state advisorily.
//
// With no actuator attached the bridge runs in simulation mode: commands are
// accepted as logged no-ops so the rest of the pipeline runs unaffected. That
// degraded mode is explicit, queryable state, never a silent swallow.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Discrete, idempotent hardware instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    Lock,
    Unlock,
    SirenOn,
    SirenOff,
}

impl ActuatorCommand {
    /// The wire keyword for the serial protocol.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ActuatorCommand::Lock => "LOCK",
            ActuatorCommand::Unlock => "UNLOCK",
            ActuatorCommand::SirenOn => "SIREN_ON",
            ActuatorCommand::SirenOff => "SIREN_OFF",
        }
    }

    fn is_lock_channel(&self) -> bool {
        matches!(self, ActuatorCommand::Lock | ActuatorCommand::Unlock)
    }
}

/// Lock state as reported by the hardware itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareStatus {
    Locked,
    Unlocked,
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator transport error: {0}")]
    Transport(String),
    #[error("actuator not connected")]
    Disconnected,
}

/// The hardware transport, consumed as an external collaborator. `send` may
/// block briefly; it must never be assumed reliable.
pub trait Actuator: Send {
    fn send(&mut self, command: ActuatorCommand) -> Result<(), ActuatorError>;

    /// Independent best-effort status read. `None` when nothing is pending.
    fn read_status(&mut self) -> Option<HardwareStatus> {
        None
    }
}

/// Translates decision transitions into hardware commands.
pub struct ActuationBridge {
    actuator: Option<Box<dyn Actuator>>,
    connected: bool,
    last_lock_command: Option<ActuatorCommand>,
    last_siren_command: Option<ActuatorCommand>,
    last_status_poll: Option<Instant>,
    status_poll_interval: Duration,
}

impl ActuationBridge {
    /// `None` for the actuator selects simulation mode.
    pub fn new(actuator: Option<Box<dyn Actuator>>, status_poll_interval: Duration) -> Self {
        let connected = actuator.is_some();
        if !connected {
            info!("no actuator attached, running in simulation mode");
        }
        Self {
            actuator,
            connected,
            last_lock_command: None,
            last_siren_command: None,
            last_status_poll: None,
            status_poll_interval,
        }
    }

    /// True when no hardware is attached and commands are logged no-ops.
    pub fn is_simulated(&self) -> bool {
        self.actuator.is_none()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Issues a command unless it duplicates the previous command on the same
    /// channel. At-most-once; a failure is logged, never retried.
    pub fn apply(&mut self, command: ActuatorCommand) {
        let last = if command.is_lock_channel() {
            self.last_lock_command
        } else {
            self.last_siren_command
        };
        if last == Some(command) {
            debug!(command = command.wire_name(), "suppressed duplicate command");
            return;
        }
        self.dispatch(command);
    }

    /// Issues a command unconditionally, bypassing the dedup. Used for the
    /// manual control surface, which must always reach the hardware.
    pub fn apply_forced(&mut self, command: ActuatorCommand) {
        self.dispatch(command);
    }

    fn dispatch(&mut self, command: ActuatorCommand) {
        if command.is_lock_channel() {
            self.last_lock_command = Some(command);
        } else {
            self.last_siren_command = Some(command);
        }

        match self.actuator.as_mut() {
            Some(actuator) => match actuator.send(command) {
                Ok(()) => {
                    debug!(command = command.wire_name(), "command sent");
                    self.connected = true;
                }
                Err(err) => {
                    // Optimistic: in-memory state already reflects intent.
                    warn!(command = command.wire_name(), error = %err, "command failed");
                    self.connected = false;
                }
            },
            None => {
                info!(command = command.wire_name(), "simulated command");
            }
        }
    }

    /// Polls the hardware for its own view of the lock state, at most once
    /// per poll interval. Advisory only; callers decide what to do with it.
    pub fn poll_status(&mut self, now: Instant) -> Option<HardwareStatus> {
        let due = match self.last_status_poll {
            Some(at) => now.duration_since(at) >= self.status_poll_interval,
            None => true,
        };
        if !due {
            return None;
        }
        self.last_status_poll = Some(now);

        let status = self.actuator.as_mut()?.read_status();
        if let Some(status) = status {
            debug!(?status, "hardware status read");
            self.connected = true;
        }
        status
    }
}
