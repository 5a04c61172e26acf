//! Interfaces to the simulation host.
//!
//! The controller never touches host globals. It reads telemetry through a
//! [`TelemetryProvider`] and submits text commands through a [`CommandSink`],
//! both injected at construction time.

use thiserror::Error;

use crate::telemetry::TelemetrySnapshot;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("host rejected command '{command}': {reason}")]
    Rejected { command: String, reason: String },

    #[error("host command channel closed")]
    Closed,
}

/// Read-only view of the host's per-aircraft state.
pub trait TelemetryProvider: Send {
    /// Telemetry as it stands right now. No isolation across calls.
    fn snapshot(&self) -> TelemetrySnapshot;
}

/// The host's single-line command channel.
pub trait CommandSink: Send {
    fn submit(&mut self, command: &str) -> Result<(), DispatchError>;
}

impl<T: TelemetryProvider + ?Sized> TelemetryProvider for Box<T> {
    fn snapshot(&self) -> TelemetrySnapshot {
        (**self).snapshot()
    }
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn submit(&mut self, command: &str) -> Result<(), DispatchError> {
        (**self).submit(command)
    }
}

/// In-memory host: serves a fixed snapshot and records submitted commands.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    pub telemetry: TelemetrySnapshot,
    pub commands: Vec<String>,
    /// Commands starting with any of these verbs are rejected.
    pub rejected_verbs: Vec<String>,
}

impl MemoryHost {
    pub fn new(telemetry: TelemetrySnapshot) -> Self {
        Self {
            telemetry,
            ..Self::default()
        }
    }
}

impl TelemetryProvider for MemoryHost {
    fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.clone()
    }
}

impl CommandSink for MemoryHost {
    fn submit(&mut self, command: &str) -> Result<(), DispatchError> {
        let verb = command.split_whitespace().next().unwrap_or_default();
        if self.rejected_verbs.iter().any(|v| v == verb) {
            return Err(DispatchError::Rejected {
                command: command.to_string(),
                reason: format!("unknown command {}", verb),
            });
        }
        self.commands.push(command.to_string());
        Ok(())
    }
}
