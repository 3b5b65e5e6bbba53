//! 定义了设备会话和模拟网络的可配置参数。
//! Defines configurable parameters for device sessions and the simulated network.

use std::time::Duration;

/// A structure containing all configurable parameters for a device session.
///
/// 包含设备会话所有可配置参数的结构体。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Retry parameters for connection activation and transmission.
    /// 连接激活和数据发送的重试参数。
    pub retry: RetryPolicy,

    /// The longest a single connect or transmit attempt may take before it is
    /// counted as failed. This is the per-attempt simulated latency budget.
    ///
    /// 单次连接或发送尝试在被视为失败前可占用的最长时间，即每次尝试的模拟延迟预算。
    pub attempt_timeout: Duration,

    /// How `power_on` behaves when the device is already past `POWERED_ON`.
    /// 设备已越过 `POWERED_ON` 状态时 `power_on` 的行为。
    pub power_on_policy: PowerOnPolicy,

    /// How long a connection may sit without activation or transmission before
    /// `deactivate_if_idle` tears it down.
    ///
    /// 连接在没有激活或发送的情况下可保持的最长时间，超过后 `deactivate_if_idle` 将其断开。
    pub idle_timeout: Duration,
}

/// Retry parameters. Immutable once a session is built.
///
/// 重试参数。会话创建后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one fails.
    /// 首次失败后的额外尝试次数。
    pub max_retries: u32,
    /// Pause between two consecutive attempts.
    /// 两次连续尝试之间的间隔。
    pub retry_interval: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given retry count and interval.
    pub const fn new(max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    /// Total number of attempts the policy allows, including the first.
    ///
    /// 策略允许的总尝试次数（包括第一次）。
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Upper bound on time spent sleeping between attempts.
    ///
    /// 尝试之间休眠时间的上限。
    pub fn max_backoff(&self) -> Duration {
        self.retry_interval.saturating_mul(self.max_retries)
    }
}

/// Behaviour of `power_on` when the device is registered or connected.
///
/// The source scenarios disagree on this, so it is chosen where the session
/// is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerOnPolicy {
    /// No-op from `POWERED_ON`, `InvalidState` from `REGISTERED` or `CONNECTED`.
    #[default]
    Strict,
    /// No-op from every state except `OFF`.
    Lenient,
}

/// Link characteristics used by the network emulator.
///
/// 网络模拟器使用的链路特性。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Radio access technology name, used for logging only.
    /// 无线接入技术名称，仅用于日志。
    pub technology: String,
    /// One-way latency added to every attempt.
    /// 每次尝试附加的单向延迟。
    pub latency: Duration,
    /// Throughput in kilobits per second. Zero disables the payload-size delay.
    /// 吞吐量（kbps）。为零时不计算载荷大小带来的延迟。
    pub throughput_kbps: u32,
}

impl NetworkProfile {
    /// LTE Cat-M1.
    pub fn lte_m() -> Self {
        Self {
            technology: "LTE-M".to_string(),
            latency: Duration::from_millis(100),
            throughput_kbps: 375,
        }
    }

    /// NB-IoT. High latency, low throughput.
    pub fn nb_iot() -> Self {
        Self {
            technology: "NB-IoT".to_string(),
            latency: Duration::from_millis(1600),
            throughput_kbps: 60,
        }
    }

    /// 2G GSM/GPRS fallback.
    pub fn gsm() -> Self {
        Self {
            technology: "GSM".to_string(),
            latency: Duration::from_millis(500),
            throughput_kbps: 80,
        }
    }

    /// Time needed to push `payload_len` bytes through the link, latency included.
    ///
    /// 通过该链路发送 `payload_len` 字节所需的时间（含延迟）。
    pub fn transfer_time(&self, payload_len: usize) -> Duration {
        if self.throughput_kbps == 0 {
            return self.latency;
        }
        let bits = payload_len as u64 * 8;
        let millis = bits / u64::from(self.throughput_kbps);
        self.latency + Duration::from_millis(millis)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(5),
            power_on_policy: PowerOnPolicy::default(),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_interval: Duration::from_secs(10),
        }
    }
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self::lte_m()
    }
}
