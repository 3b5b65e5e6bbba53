//! Connection events and the append-only log that holds them.
//!
//! 连接事件及保存它们的只追加日志。

use std::{fmt, time::Duration};
use tokio::time::Instant;

/// Kind of a recorded event.
/// 已记录事件的类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Activation,
    Deactivation,
    Transmission,
    Registration,
    Power,
    Error,
}

impl EventKind {
    /// Activation and deactivation are control-plane signaling; the rest are not.
    ///
    /// 激活和去激活属于控制面信令，其余不是。
    pub const fn is_signaling(self) -> bool {
        matches!(self, Self::Activation | Self::Deactivation)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Deactivation => "deactivation",
            Self::Transmission => "transmission",
            Self::Registration => "registration",
            Self::Power => "power",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable record of a state-affecting operation.
///
/// Two events are equal when all three fields are equal, so tests can compare
/// log contents directly.
///
/// 状态相关操作的不可变记录。三个字段都相等时两个事件相等，测试可以直接比较日志内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    timestamp: Instant,
    kind: EventKind,
    reason: String,
}

impl ConnectionEvent {
    pub fn new(timestamp: Instant, kind: EventKind, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            reason: reason.into(),
        }
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// `(kind, reason)` pair, handy for asserting on log contents without timestamps.
    pub fn summary(&self) -> (EventKind, &str) {
        (self.kind, &self.reason)
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.reason)
    }
}

/// Ordered, append-only sequence of events owned by a session.
///
/// Only the session can append; nothing can remove or modify an entry.
///
/// 会话拥有的有序只追加事件序列。只有会话可以追加，任何条目都不能删除或修改。
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ConnectionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: ConnectionEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[ConnectionEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&ConnectionEvent> {
        self.events.last()
    }

    /// Most recent event of the given kind.
    pub fn last_of(&self, kind: EventKind) -> Option<&ConnectionEvent> {
        self.events.iter().rev().find(|e| e.kind == kind)
    }

    /// Events with `timestamp >= since`, in log order.
    ///
    /// 返回 `timestamp >= since` 的事件，保持日志顺序。
    pub fn since(&self, since: Instant) -> Vec<ConnectionEvent> {
        self.events
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect()
    }

    /// Number of `kind` events within the trailing `window` ending at `now`.
    ///
    /// 统计截至 `now` 的最近 `window` 时间窗口内 `kind` 类型事件的数量。
    pub fn count_in_window(&self, kind: EventKind, window: Duration, now: Instant) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == kind && in_window(e.timestamp, window, now))
            .count()
    }

    /// Number of signaling events (activation and deactivation) in the trailing window.
    pub fn signaling_in_window(&self, window: Duration, now: Instant) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind.is_signaling() && in_window(e.timestamp, window, now))
            .count()
    }

    /// `(kind, reason)` pairs for the whole log.
    pub fn summaries(&self) -> Vec<(EventKind, &str)> {
        self.events.iter().map(ConnectionEvent::summary).collect()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a ConnectionEvent;
    type IntoIter = std::slice::Iter<'a, ConnectionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

fn in_window(timestamp: Instant, window: Duration, now: Instant) -> bool {
    now.saturating_duration_since(timestamp) <= window
}

/// Callback invoked with every event appended to a session's log.
/// 每当事件追加到会话日志时调用的回调。
pub type EventListener = Box<dyn Fn(&ConnectionEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    fn log_at(base: Instant, entries: &[(u64, EventKind)]) -> EventLog {
        let mut log = EventLog::new();
        for (secs, kind) in entries {
            log.push(ConnectionEvent::new(
                base + Duration::from_secs(*secs),
                *kind,
                "test",
            ));
        }
        log
    }

    #[tokio::test(start_paused = true)]
    async fn test_since_is_inclusive_and_ordered() {
        let base = Instant::now();
        let log = log_at(
            base,
            &[
                (0, EventKind::Power),
                (5, EventKind::Registration),
                (10, EventKind::Activation),
            ],
        );

        let events = log.since(base + Duration::from_secs(5));
        let kinds: Vec<_> = events.iter().map(ConnectionEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::Registration, EventKind::Activation]);
        assert_eq!(log.since(base + Duration::from_secs(11)).len(), 0);
        assert_eq!(log.since(base).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_in_window() {
        let base = Instant::now();
        let log = log_at(
            base,
            &[
                (0, EventKind::Activation),
                (60, EventKind::Deactivation),
                (120, EventKind::Activation),
                (130, EventKind::Transmission),
            ],
        );
        let now = base + Duration::from_secs(130);

        assert_eq!(log.count_in_window(EventKind::Activation, Duration::from_secs(10), now), 1);
        assert_eq!(log.count_in_window(EventKind::Activation, Duration::from_secs(130), now), 2);
        assert_eq!(log.signaling_in_window(Duration::from_secs(70), now), 2);
        assert_eq!(log.signaling_in_window(Duration::from_secs(3600), now), 3);
    }

    #[test]
    fn test_event_equality_is_structural() {
        let at = Instant::now();
        let a = ConnectionEvent::new(at, EventKind::Power, "power_on");
        let b = ConnectionEvent::new(at, EventKind::Power, String::from("power_on"));
        assert_eq!(a, b);
        assert_ne!(a, ConnectionEvent::new(at, EventKind::Power, "power_off"));
        assert_eq!(a.to_string(), "power/power_on");
    }

    #[test]
    fn test_last_of() {
        let at = Instant::now();
        let mut log = EventLog::new();
        log.push(ConnectionEvent::new(at, EventKind::Activation, "first"));
        log.push(ConnectionEvent::new(at, EventKind::Transmission, "data"));
        log.push(ConnectionEvent::new(at, EventKind::Activation, "second"));

        assert_eq!(log.last_of(EventKind::Activation).map(ConnectionEvent::reason), Some("second"));
        assert!(log.last_of(EventKind::Deactivation).is_none());
        assert_eq!(log.summaries()[1], (EventKind::Transmission, "data"));
    }
}
