//! A connector that adds link latency and outages on top of another connector.
//! 在另一个连接器之上叠加链路延迟和中断的连接器。

use super::connector::Connector;
use crate::config::NetworkProfile;
use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};

/// Handle for taking the emulated network down and up from outside the session.
///
/// 从会话外部控制模拟网络中断与恢复的句柄。
#[derive(Debug, Clone, Default)]
pub struct OutageSwitch {
    down: Arc<AtomicBool>,
}

impl OutageSwitch {
    pub fn begin(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn end(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }
}

/// Emulates a radio link with a given [`NetworkProfile`].
///
/// Every attempt first waits out the link's latency (plus payload transfer
/// time for transmissions) and then defers to the inner connector. During an
/// outage every attempt fails after the same delay.
///
/// 以给定 [`NetworkProfile`] 模拟无线链路。每次尝试先等待链路延迟（发送时还包括载荷
/// 传输时间），然后交给内部连接器决定。中断期间所有尝试在相同延迟后失败。
#[derive(Debug)]
pub struct NetworkEmulator<C> {
    profile: NetworkProfile,
    inner: C,
    outage: OutageSwitch,
}

impl<C: Connector> NetworkEmulator<C> {
    pub fn new(profile: NetworkProfile, inner: C) -> Self {
        info!(
            technology = %profile.technology,
            latency_ms = profile.latency.as_millis() as u64,
            throughput_kbps = profile.throughput_kbps,
            "Configuring emulated network"
        );
        Self {
            profile,
            inner,
            outage: OutageSwitch::default(),
        }
    }

    /// Switches the link to a different profile.
    pub fn configure(&mut self, profile: NetworkProfile) {
        info!(
            technology = %profile.technology,
            latency_ms = profile.latency.as_millis() as u64,
            throughput_kbps = profile.throughput_kbps,
            "Reconfiguring emulated network"
        );
        self.profile = profile;
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    /// A handle that can start and end outages while the session owns the emulator.
    pub fn outage_switch(&self) -> OutageSwitch {
        self.outage.clone()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Connector> Connector for NetworkEmulator<C> {
    async fn attempt_connect(&mut self) -> bool {
        tokio::time::sleep(self.profile.latency).await;
        if self.outage.is_down() {
            debug!(technology = %self.profile.technology, "Connect attempt during outage");
            return false;
        }
        self.inner.attempt_connect().await
    }

    async fn attempt_transmit(&mut self, payload: &[u8]) -> bool {
        tokio::time::sleep(self.profile.transfer_time(payload.len())).await;
        if self.outage.is_down() {
            debug!(technology = %self.profile.technology, "Transmit attempt during outage");
            return false;
        }
        self.inner.attempt_transmit(payload).await
    }
}
