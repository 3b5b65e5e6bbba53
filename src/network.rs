//! Network capability injected into device sessions, plus stock simulators.
//! 注入设备会话的网络能力以及内置模拟器。

pub mod connector;
pub mod emulator;

pub use connector::{AlwaysConnect, Connector, FlakyConnector, ScriptedConnector};
pub use emulator::{NetworkEmulator, OutageSwitch};
