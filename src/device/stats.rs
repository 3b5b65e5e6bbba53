//! Network statistics derived from a session's event log.

use super::{
    event::{EventKind, EventLog},
    state::DeviceState,
};
use std::time::Duration;
use tokio::time::Instant;

/// Counters and durations summarising a session.
///
/// Derived from the event log on demand, so it can never drift from it.
///
/// 会话的计数和时长汇总。按需从事件日志推导，因此不会与日志不一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkStats {
    pub activation_count: usize,
    pub deactivation_count: usize,
    pub transmission_count: usize,
    pub error_count: usize,
    /// Activations plus deactivations.
    pub signaling_events: usize,
    pub last_activation: Option<Instant>,
    /// Total time spent in `CONNECTED`, including the current connection.
    pub active_duration: Duration,
}

impl NetworkStats {
    pub fn from_log(log: &EventLog, state: DeviceState, now: Instant) -> Self {
        let mut stats = Self::default();
        let mut connected_at: Option<Instant> = None;

        for event in log {
            match event.kind() {
                EventKind::Activation => {
                    stats.activation_count += 1;
                    stats.last_activation = Some(event.timestamp());
                    connected_at = Some(event.timestamp());
                }
                EventKind::Deactivation => {
                    stats.deactivation_count += 1;
                    if let Some(start) = connected_at.take() {
                        stats.active_duration += event.timestamp().saturating_duration_since(start);
                    }
                }
                EventKind::Transmission => stats.transmission_count += 1,
                EventKind::Error => stats.error_count += 1,
                EventKind::Registration | EventKind::Power => {}
            }
        }

        if state == DeviceState::Connected {
            if let Some(start) = connected_at {
                stats.active_duration += now.saturating_duration_since(start);
            }
        }
        stats.signaling_events = stats.activation_count + stats.deactivation_count;
        stats
    }
}
