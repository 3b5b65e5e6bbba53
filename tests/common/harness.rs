//! tests/common/harness.rs
#![allow(dead_code)]

use device_link::{
    config::{RetryPolicy, SessionConfig},
    device::DeviceSession,
    network::Connector,
};
use std::{sync::Once, time::Duration};
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "device_link=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

/// Session config with the given retry policy and a short per-attempt budget.
pub fn config(max_retries: u32, retry_interval: Duration) -> SessionConfig {
    SessionConfig {
        retry: RetryPolicy::new(max_retries, retry_interval),
        attempt_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

/// A session that has been powered on and registered.
pub fn registered<C: Connector>(device_id: &str, config: SessionConfig, connector: C) -> DeviceSession<C> {
    init_tracing();
    let mut session = DeviceSession::new(device_id, config, connector);
    session.power_on().expect("power on from OFF");
    session.register().expect("register after power on");
    session
}
