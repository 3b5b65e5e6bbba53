//! 设备会话 - 统一管理设备的完整连接生命周期
//! Device Session - Unified management of a device's connection lifecycle
//!
//! `DeviceSession` 是聚合根：它拥有设备状态、事件日志、重试配置和注入的网络连接器，
//! 并通过验证层和转换层执行所有生命周期操作。
//!
//! `DeviceSession` is the aggregate root: it owns the device state, the event
//! log, the retry configuration and the injected network connector, and runs
//! every lifecycle operation through the validation and transition layers.

use super::{
    event::{ConnectionEvent, EventKind, EventListener, EventLog},
    lifecycle::{Precondition, StateValidator, TransitionExecutor},
    state::{DeviceState, Operation},
    stats::NetworkStats,
};
use crate::{
    config::{RetryPolicy, SessionConfig},
    error::{Error, Result},
    network::Connector,
    report::SessionReport,
};
use bytes::Bytes;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

/// Reason recorded for a failed activation attempt.
pub const ACTIVATION_RETRY: &str = "activation_retry";
/// Reason recorded for a failed transmit attempt.
pub const TRANSMISSION_RETRY: &str = "transmission_retry";
/// Default reason for transmissions and the activations they trigger.
pub const DATA_TRANSMISSION: &str = "data_transmission";
/// Reason recorded for the deactivation performed by `shutdown`.
pub const DEVICE_SHUTDOWN: &str = "device_shutdown";
/// Reason recorded by `deactivate_if_idle`.
pub const IDLE_TIMEOUT: &str = "idle_timeout";

const POWER_ON: &str = "power_on";
const POWER_OFF: &str = "power_off";
const NETWORK_REGISTRATION: &str = "network_registration";

/// What a successful transmission returns.
///
/// 成功发送后返回的回执。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionReceipt {
    pub payload_len: usize,
    pub timestamp: Instant,
}

/// One try through the connector.
#[derive(Debug, Clone, Copy)]
enum Attempt<'a> {
    Connect,
    Transmit(&'a [u8]),
}

impl Attempt<'_> {
    fn operation(self) -> Operation {
        match self {
            Self::Connect => Operation::ActivateConnection,
            Self::Transmit(_) => Operation::Transmit,
        }
    }

    fn retry_reason(self) -> &'static str {
        match self {
            Self::Connect => ACTIVATION_RETRY,
            Self::Transmit(_) => TRANSMISSION_RETRY,
        }
    }

    fn exhausted(self, attempts: u32) -> Error {
        match self {
            Self::Connect => Error::ActivationFailed { attempts },
            Self::Transmit(_) => Error::TransmitRejected { attempts },
        }
    }
}

/// A simulated device and its connection lifecycle.
///
/// The session is driven through `&mut self`, so one caller at a time is
/// enforced by the borrow checker. Share it across tasks behind a mutex
/// (see [`DeviceFleet`](crate::fleet::DeviceFleet)).
///
/// 一个模拟设备及其连接生命周期。会话通过 `&mut self` 驱动，借用检查器保证同一时间只有
/// 一个调用者。需要跨任务共享时请使用互斥锁。
pub struct DeviceSession<C> {
    state: DeviceState,
    event_log: EventLog,
    config: SessionConfig,
    last_transmission: Option<Instant>,
    connector: C,
    transitions: TransitionExecutor,
}

impl<C> std::fmt::Debug for DeviceSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("event_log_len", &self.event_log.len())
            .field("config", &self.config)
            .field("last_transmission", &self.last_transmission)
            .field("transitions", &self.transitions)
            .finish()
    }
}

impl<C: Connector> DeviceSession<C> {
    /// 创建新的设备会话，初始状态为 `OFF`
    /// Create a new device session in state `OFF`
    pub fn new(device_id: impl Into<String>, config: SessionConfig, connector: C) -> Self {
        let transitions = TransitionExecutor::new(device_id);
        debug!(
            device_id = transitions.device_id(),
            max_retries = config.retry.max_retries,
            retry_interval_ms = config.retry.retry_interval.as_millis() as u64,
            "Device session created"
        );
        Self {
            state: DeviceState::Off,
            event_log: EventLog::new(),
            config,
            last_transmission: None,
            connector,
            transitions,
        }
    }

    pub fn device_id(&self) -> &str {
        self.transitions.device_id()
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry
    }

    /// Time of the last successful transmission, if any.
    pub fn last_transmission(&self) -> Option<Instant> {
        self.last_transmission
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    pub fn is_connected(&self) -> bool {
        StateValidator::can_send_data(self.state)
    }

    /// 给设备通电
    /// Power the device on
    ///
    /// No-op when already `POWERED_ON`. From `REGISTERED` or `CONNECTED` the
    /// outcome depends on [`PowerOnPolicy`](crate::config::PowerOnPolicy).
    pub fn power_on(&mut self) -> Result<()> {
        match StateValidator::check_power_on(self.state, self.config.power_on_policy)? {
            Precondition::AlreadyDone => {
                debug!(device_id = self.device_id(), state = %self.state, "Device already powered");
                Ok(())
            }
            Precondition::Proceed => {
                info!(device_id = self.device_id(), "Powering on device");
                self.transition(
                    Operation::PowerOn,
                    DeviceState::PoweredOn,
                    EventKind::Power,
                    POWER_ON,
                )
            }
        }
    }

    /// 将设备注册到网络
    /// Register the device with the network
    pub fn register(&mut self) -> Result<()> {
        if let Err(e) = StateValidator::check_register(self.state) {
            warn!(device_id = self.device_id(), state = %self.state, "Cannot register: {}", e);
            return Err(e);
        }
        info!(device_id = self.device_id(), "Registering device to network");
        self.transition(
            Operation::Register,
            DeviceState::Registered,
            EventKind::Registration,
            NETWORK_REGISTRATION,
        )
    }

    /// 激活数据连接，失败时按重试策略重试
    /// Activate the data connection, retrying per the retry policy
    ///
    /// Idempotent when already connected. On exhaustion the state stays
    /// `REGISTERED` and [`Error::ActivationFailed`] is returned.
    pub async fn activate_connection(&mut self, reason: &str) -> Result<()> {
        let mut retries_left = self.config.retry.max_retries;
        self.activate(reason, None, &mut retries_left).await
    }

    /// Like [`activate_connection`](Self::activate_connection), but gives up
    /// with [`Error::DeadlineExceeded`] rather than wait past `deadline`.
    pub async fn activate_connection_until(&mut self, reason: &str, deadline: Instant) -> Result<()> {
        let mut retries_left = self.config.retry.max_retries;
        self.activate(reason, Some(deadline), &mut retries_left).await
    }

    /// 去激活数据连接；未连接时为空操作
    /// Deactivate the data connection; a no-op when not connected
    pub fn deactivate_connection(&mut self, reason: &str) -> Result<()> {
        match StateValidator::check_deactivate(self.state) {
            Precondition::AlreadyDone => {
                debug!(device_id = self.device_id(), state = %self.state, "Connection is already inactive");
                Ok(())
            }
            Precondition::Proceed => {
                info!(device_id = self.device_id(), reason, "Deactivating network connection");
                self.transition(
                    Operation::DeactivateConnection,
                    DeviceState::Registered,
                    EventKind::Deactivation,
                    reason,
                )
            }
        }
    }

    /// 发送数据，必要时先隐式激活连接
    /// Transmit a payload, activating the connection first if needed
    ///
    /// The implicit activation and the transmit attempts share one retry
    /// budget, so the call sleeps at most `max_retries × retry_interval`.
    pub async fn transmit(&mut self, payload: impl Into<Bytes>) -> Result<TransmissionReceipt> {
        self.transmit_inner(payload.into(), DATA_TRANSMISSION, None)
            .await
    }

    /// [`transmit`](Self::transmit) with an explicit reason. The reason is
    /// recorded on the transmission event and on any implicit activation.
    pub async fn transmit_with_reason(
        &mut self,
        payload: impl Into<Bytes>,
        reason: &str,
    ) -> Result<TransmissionReceipt> {
        self.transmit_inner(payload.into(), reason, None).await
    }

    /// [`transmit_with_reason`](Self::transmit_with_reason) bounded by a deadline.
    pub async fn transmit_until(
        &mut self,
        payload: impl Into<Bytes>,
        reason: &str,
        deadline: Instant,
    ) -> Result<TransmissionReceipt> {
        self.transmit_inner(payload.into(), reason, Some(deadline))
            .await
    }

    /// 关闭设备：若已连接则先去激活，然后断电
    /// Shut the device down: deactivate if connected, then power off
    pub fn shutdown(&mut self) -> Result<()> {
        if self.is_connected() {
            self.deactivate_connection(DEVICE_SHUTDOWN)?;
        }
        info!(device_id = self.device_id(), "Shutting down device");
        self.transition(
            Operation::Shutdown,
            DeviceState::Off,
            EventKind::Power,
            POWER_OFF,
        )
    }

    /// Tears the connection down with reason `"idle_timeout"` when nothing has
    /// been activated or transmitted for `idle_timeout`. Returns whether it did.
    ///
    /// 若在 `idle_timeout` 内没有激活或发送，则以 `"idle_timeout"` 断开连接，返回是否断开。
    pub fn deactivate_if_idle(&mut self) -> Result<bool> {
        if !self.is_connected() {
            return Ok(false);
        }
        let last_activity = self
            .event_log
            .last_of(EventKind::Activation)
            .map(ConnectionEvent::timestamp)
            .max(self.last_transmission);
        let Some(last_activity) = last_activity else {
            return Ok(false);
        };
        if last_activity.elapsed() < self.config.idle_timeout {
            return Ok(false);
        }
        self.deactivate_connection(IDLE_TIMEOUT)?;
        Ok(true)
    }

    /// Events with `timestamp >= since`, in log order.
    pub fn events_since(&self, since: Instant) -> Vec<ConnectionEvent> {
        self.event_log.since(since)
    }

    /// Number of `kind` events in the trailing `window` ending now.
    pub fn count_events_of_type(&self, kind: EventKind, window: Duration) -> usize {
        self.event_log.count_in_window(kind, window, Instant::now())
    }

    /// Activation plus deactivation events in the trailing `window`.
    pub fn signaling_events_in(&self, window: Duration) -> usize {
        self.event_log.signaling_in_window(window, Instant::now())
    }

    /// Whether signaling churn in the trailing `window` exceeds `threshold`.
    ///
    /// 最近 `window` 内的信令次数是否超过 `threshold`（信令风暴检测）。
    pub fn is_signaling_storm(&self, window: Duration, threshold: usize) -> bool {
        let count = self.signaling_events_in(window);
        if count > threshold {
            warn!(
                device_id = self.device_id(),
                count, threshold, "Signaling storm detected"
            );
            true
        } else {
            false
        }
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats::from_log(&self.event_log, self.state, Instant::now())
    }

    pub fn report(&self) -> SessionReport {
        SessionReport::new(
            self.device_id(),
            self.state,
            self.stats(),
            self.event_log.as_slice(),
        )
    }

    /// 注册事件监听器，每个追加到日志的事件都会同步通知
    /// Register an event listener, notified synchronously of every appended event
    pub fn register_event_listener(&mut self, listener: EventListener) {
        self.transitions.register_event_listener(listener);
    }

    /// 移除所有事件监听器
    /// Remove all event listeners
    pub fn clear_event_listeners(&mut self) {
        self.transitions.clear_event_listeners();
    }

    fn transition(
        &mut self,
        operation: Operation,
        next: DeviceState,
        kind: EventKind,
        reason: &str,
    ) -> Result<()> {
        debug!(
            device_id = self.device_id(),
            current_state = %self.state,
            target_state = %next,
            "Attempting state transition"
        );
        self.state = self.transitions.execute_transition(
            &mut self.event_log,
            operation,
            self.state,
            next,
            kind,
            reason,
        )?;
        Ok(())
    }

    async fn activate(
        &mut self,
        reason: &str,
        deadline: Option<Instant>,
        retries_left: &mut u32,
    ) -> Result<()> {
        if let Err(e) = StateValidator::check_activate(self.state) {
            warn!(device_id = self.device_id(), state = %self.state, "Cannot activate connection: {}", e);
            return Err(e);
        }
        if self.is_connected() {
            debug!(device_id = self.device_id(), "Connection is already active");
            return Ok(());
        }

        info!(device_id = self.device_id(), reason, "Activating network connection");
        let attempts = self.retry(Attempt::Connect, deadline, retries_left).await?;
        self.transition(
            Operation::ActivateConnection,
            DeviceState::Connected,
            EventKind::Activation,
            reason,
        )?;
        info!(device_id = self.device_id(), attempts, "Network connection active");
        Ok(())
    }

    async fn transmit_inner(
        &mut self,
        payload: Bytes,
        reason: &str,
        deadline: Option<Instant>,
    ) -> Result<TransmissionReceipt> {
        let mut retries_left = self.config.retry.max_retries;
        if !self.is_connected() {
            info!(device_id = self.device_id(), "Connection not active, activating for transmission");
            self.activate(reason, deadline, &mut retries_left)
                .await
                .map_err(Error::transmission)?;
        }

        self.retry(Attempt::Transmit(&payload[..]), deadline, &mut retries_left)
            .await
            .map_err(Error::transmission)?;

        let timestamp = self
            .transitions
            .record(&mut self.event_log, EventKind::Transmission, reason);
        self.last_transmission = Some(timestamp);
        debug!(
            device_id = self.device_id(),
            payload_len = payload.len(),
            reason,
            "Data transmitted"
        );

        Ok(TransmissionReceipt {
            payload_len: payload.len(),
            timestamp,
        })
    }

    /// Runs `attempt` until it succeeds or `retries_left` runs out, drawing one
    /// retry per failed attempt. Each failed attempt appends an `error` event.
    /// Returns the number of attempts used.
    async fn retry(
        &mut self,
        attempt: Attempt<'_>,
        deadline: Option<Instant>,
        retries_left: &mut u32,
    ) -> Result<u32> {
        let interval = self.config.retry.retry_interval;
        let operation = attempt.operation();
        let mut attempts = 0;

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::DeadlineExceeded { operation, attempts });
            }

            attempts += 1;
            if self.attempt_once(attempt, deadline).await {
                return Ok(attempts);
            }

            warn!(
                device_id = self.device_id(),
                %operation,
                attempt = attempts,
                retries_left = *retries_left,
                "Attempt failed"
            );
            self.transitions
                .record(&mut self.event_log, EventKind::Error, attempt.retry_reason());

            if *retries_left == 0 {
                return Err(attempt.exhausted(attempts));
            }
            let wakes_past_deadline = |d: Instant| {
                Instant::now()
                    .checked_add(interval)
                    .is_none_or(|wake| wake > d)
            };
            if deadline.is_some_and(wakes_past_deadline) {
                return Err(Error::DeadlineExceeded { operation, attempts });
            }
            *retries_left -= 1;
            if !interval.is_zero() {
                sleep(interval).await;
            }
        }
    }

    /// A single connector call, bounded by the per-attempt budget and the
    /// deadline. Running out of time counts as failure. An `attempt_timeout`
    /// too large to add to the clock leaves only the deadline.
    async fn attempt_once(&mut self, attempt: Attempt<'_>, deadline: Option<Instant>) -> bool {
        let budget_end = Instant::now().checked_add(self.config.attempt_timeout);
        let until = match (deadline, budget_end) {
            (Some(d), Some(b)) => Some(d.min(b)),
            (d, b) => d.or(b),
        };

        let connector = &mut self.connector;
        let call = async move {
            match attempt {
                Attempt::Connect => connector.attempt_connect().await,
                Attempt::Transmit(payload) => connector.attempt_transmit(payload).await,
            }
        };
        let Some(until) = until else {
            return call.await;
        };
        timeout_at(until, call).await.unwrap_or_else(|_| {
            warn!(
                device_id = self.transitions.device_id(),
                operation = %attempt.operation(),
                "Attempt timed out"
            );
            false
        })
    }
}
