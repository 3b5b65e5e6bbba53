//! 设备状态转换逻辑模块
//! Device State Transition Logic Module
//!
//! 该模块负责执行状态转换、记录对应的连接事件并通知事件监听器。
//!
//! This module executes state transitions, records the matching connection
//! event and notifies registered event listeners.

use super::validation::StateValidator;
use crate::{
    device::{
        event::{ConnectionEvent, EventKind, EventListener, EventLog},
        state::{DeviceState, Operation},
    },
    error::{Error, Result},
};
use tokio::time::Instant;
use tracing::{trace, warn};

/// 状态转换执行器，负责执行状态转换和事件记录
/// State transition executor responsible for executing transitions and recording events
pub struct TransitionExecutor {
    /// 设备ID，用于日志记录
    /// Device ID for logging
    device_id: String,
    /// 事件监听器列表
    /// List of event listeners
    event_listeners: Vec<EventListener>,
}

impl std::fmt::Debug for TransitionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionExecutor")
            .field("device_id", &self.device_id)
            .field("event_listeners_count", &self.event_listeners.len())
            .finish()
    }
}

impl TransitionExecutor {
    /// 创建新的状态转换执行器
    /// Create a new state transition executor
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            event_listeners: Vec::new(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// 执行状态转换并记录事件
    /// Execute a state transition and record its event
    ///
    /// The log is only touched when the transition is legal, so a rejected
    /// transition leaves both state and log unchanged.
    pub fn execute_transition(
        &self,
        log: &mut EventLog,
        operation: Operation,
        current: DeviceState,
        next: DeviceState,
        kind: EventKind,
        reason: &str,
    ) -> Result<DeviceState> {
        if !StateValidator::is_valid_transition(current, next) {
            warn!(
                device_id = %self.device_id,
                %operation,
                current_state = %current,
                attempted_state = %next,
                "Invalid state transition attempted"
            );
            return Err(Error::InvalidState {
                operation,
                state: current,
            });
        }

        self.record(log, kind, reason);

        trace!(
            device_id = %self.device_id,
            from = current.name(),
            to = next.name(),
            "State transition executed"
        );

        Ok(next)
    }

    /// 记录一个不改变状态的事件（发送、重试错误）
    /// Record an event that does not change state (transmission, retry errors)
    pub fn record(&self, log: &mut EventLog, kind: EventKind, reason: &str) -> Instant {
        let now = Instant::now();
        let event = ConnectionEvent::new(now, kind, reason);
        self.trigger_event(&event);
        log.push(event);
        now
    }

    /// 注册事件监听器
    /// Register event listener
    pub fn register_event_listener(&mut self, listener: EventListener) {
        self.event_listeners.push(listener);
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear_event_listeners(&mut self) {
        self.event_listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.event_listeners.len()
    }

    fn trigger_event(&self, event: &ConnectionEvent) {
        for listener in &self.event_listeners {
            listener(event);
        }
    }
}
