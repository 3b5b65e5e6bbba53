//! Traits for abstracting over the radio/network a device talks through.
use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::VecDeque;

/// The network capability a device session relies on.
///
/// This trait lets deterministic and randomized simulators be swapped in
/// without changing the lifecycle model.
///
/// 设备会话所依赖的网络能力。
///
/// 此trait允许替换确定性或随机的模拟器，而无需修改生命周期模型。
#[async_trait]
pub trait Connector: Send {
    /// Tries once to bring up a data connection. Returns whether it succeeded.
    /// 尝试建立一次数据连接，返回是否成功。
    async fn attempt_connect(&mut self) -> bool;

    /// Tries once to push `payload` over an active connection.
    /// 尝试通过已激活的连接发送一次 `payload`。
    async fn attempt_transmit(&mut self, _payload: &[u8]) -> bool {
        true
    }
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for Box<C> {
    async fn attempt_connect(&mut self) -> bool {
        (**self).attempt_connect().await
    }

    async fn attempt_transmit(&mut self, payload: &[u8]) -> bool {
        (**self).attempt_transmit(payload).await
    }
}

/// A network that accepts every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnect;

#[async_trait]
impl Connector for AlwaysConnect {
    async fn attempt_connect(&mut self) -> bool {
        true
    }
}

/// Plays back a fixed sequence of outcomes, then falls back to a constant.
///
/// 按顺序回放预设的结果，用完后返回固定值。
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    connects: VecDeque<bool>,
    transmits: VecDeque<bool>,
    fallback: bool,
    connect_attempts: u32,
    transmit_attempts: u32,
}

impl ScriptedConnector {
    /// Connect attempts follow `connects`; transmits always succeed.
    pub fn new(connects: impl IntoIterator<Item = bool>) -> Self {
        Self {
            connects: connects.into_iter().collect(),
            transmits: VecDeque::new(),
            fallback: true,
            connect_attempts: 0,
            transmit_attempts: 0,
        }
    }

    /// A network on which nothing ever succeeds.
    pub fn always_failing() -> Self {
        Self::new([]).with_fallback(false)
    }

    /// Transmit attempts follow `transmits` before using the fallback.
    pub fn with_transmits(mut self, transmits: impl IntoIterator<Item = bool>) -> Self {
        self.transmits = transmits.into_iter().collect();
        self
    }

    /// Outcome once a script runs out.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn transmit_attempts(&self) -> u32 {
        self.transmit_attempts
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn attempt_connect(&mut self) -> bool {
        self.connect_attempts += 1;
        self.connects.pop_front().unwrap_or(self.fallback)
    }

    async fn attempt_transmit(&mut self, _payload: &[u8]) -> bool {
        self.transmit_attempts += 1;
        self.transmits.pop_front().unwrap_or(self.fallback)
    }
}

/// Fails each attempt independently with a fixed probability.
///
/// Seed it for reproducible runs.
///
/// 每次尝试以固定概率独立失败。使用种子可获得可复现的结果。
#[derive(Debug, Clone)]
pub struct FlakyConnector {
    failure_rate: f64,
    rng: StdRng,
}

impl FlakyConnector {
    /// `failure_rate` is clamped to `0.0..=1.0`.
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: clamp_rate(failure_rate),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(failure_rate: f64, seed: u64) -> Self {
        Self {
            failure_rate: clamp_rate(failure_rate),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    fn roll(&mut self) -> bool {
        !self.rng.random_bool(self.failure_rate)
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) }
}

#[async_trait]
impl Connector for FlakyConnector {
    async fn attempt_connect(&mut self) -> bool {
        self.roll()
    }

    async fn attempt_transmit(&mut self, _payload: &[u8]) -> bool {
        self.roll()
    }
}
