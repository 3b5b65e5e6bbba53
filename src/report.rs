//! A printable summary of a device session.
//! 设备会话的可打印摘要。

use crate::device::{ConnectionEvent, DeviceState, NetworkStats};
use std::fmt;

/// Snapshot of a session's final state, statistics and event trail, as a
/// reporting layer would present it.
///
/// 会话最终状态、统计信息和事件轨迹的快照，供报告层展示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub device_id: String,
    pub final_state: DeviceState,
    pub stats: NetworkStats,
    pub events: Vec<ConnectionEvent>,
}

impl SessionReport {
    pub fn new(
        device_id: impl Into<String>,
        final_state: DeviceState,
        stats: NetworkStats,
        events: &[ConnectionEvent],
    ) -> Self {
        Self {
            device_id: device_id.into(),
            final_state,
            stats,
            events: events.to_vec(),
        }
    }

    /// Whether the session finished without any failed attempt.
    pub fn is_clean(&self) -> bool {
        self.stats.error_count == 0
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "device {} ended {}", self.device_id, self.final_state)?;
        writeln!(
            f,
            "  activations={} deactivations={} transmissions={} errors={} active={:?}",
            self.stats.activation_count,
            self.stats.deactivation_count,
            self.stats.transmission_count,
            self.stats.error_count,
            self.stats.active_duration,
        )?;
        let Some(first) = self.events.first() else {
            return Ok(());
        };
        for event in &self.events {
            let offset = event.timestamp().saturating_duration_since(first.timestamp());
            writeln!(f, "  +{:>8.3}s {}", offset.as_secs_f64(), event)?;
        }
        Ok(())
    }
}
