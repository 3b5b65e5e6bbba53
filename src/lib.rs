#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the device connection-lifecycle library.
//! 设备连接生命周期库的根。

pub mod config;
pub mod error;
pub mod device;
pub mod network;

pub mod fleet;
pub mod report;
pub mod scenario;
