//! Defines the device state machine and the operations that drive it.
//!
//! 定义设备状态机及驱动它的操作。

use std::fmt;

/// The lifecycle state of a device.
/// 设备的生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceState {
    /// The device is powered down. Initial state of every session.
    /// 设备已断电。每个会话的初始状态。
    #[default]
    Off,

    /// The device is powered but not attached to a network.
    /// 设备已通电但尚未附着到网络。
    PoweredOn,

    /// The device is registered with the network and has no active data connection.
    /// 设备已在网络注册，但没有活动的数据连接。
    Registered,

    /// A data connection is active and payloads can be transmitted.
    /// 数据连接已激活，可以发送载荷。
    Connected,
}

impl DeviceState {
    /// Canonical upper-case name, as used in logs and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::PoweredOn => "POWERED_ON",
            Self::Registered => "REGISTERED",
            Self::Connected => "CONNECTED",
        }
    }

    /// Whether the device has power, regardless of network attachment.
    pub const fn is_powered(self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The public operations of a device session. Carried in errors so a failure
/// says what was attempted.
///
/// 设备会话的公开操作。包含在错误中，以便说明尝试了什么操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PowerOn,
    Register,
    ActivateConnection,
    DeactivateConnection,
    Transmit,
    Shutdown,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PowerOn => "power on",
            Self::Register => "register",
            Self::ActivateConnection => "activate connection",
            Self::DeactivateConnection => "deactivate connection",
            Self::Transmit => "transmit",
            Self::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}
