//! The device lifecycle model.
//! 设备生命周期模型。

pub mod event;
pub mod lifecycle;
pub mod session;
pub mod state;
pub mod stats;

pub use event::{ConnectionEvent, EventKind, EventListener, EventLog};
pub use session::{DeviceSession, TransmissionReceipt};
pub use state::{DeviceState, Operation};
pub use stats::NetworkStats;
