//! 设备状态验证逻辑模块
//! Device State Validation Logic Module
//!
//! 该模块负责设备状态转换的合法性判断和操作前置条件检查。
//!
//! This module decides which state transitions are legal and checks the
//! preconditions of each session operation.

use crate::{
    config::PowerOnPolicy,
    device::state::{DeviceState, Operation},
    error::{Error, Result},
};

/// What an operation should do, given the current state.
/// 在当前状态下操作应执行的动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Perform the transition.
    Proceed,
    /// Already in the target state; succeed without a new event.
    AlreadyDone,
}

/// 状态验证器，负责所有状态相关的验证和检查逻辑
/// State validator responsible for all state-related validation and check logic
pub struct StateValidator;

impl StateValidator {
    /// 验证状态转换是否合法
    /// Validate if state transition is legal
    pub fn is_valid_transition(current: DeviceState, next: DeviceState) -> bool {
        use DeviceState::*;

        match (current, next) {
            // 从任何状态都可以断电
            // Power-off is allowed from any state
            (_, Off) => true,

            (Off, PoweredOn) => true,
            (PoweredOn, Registered) => true,

            // 激活与去激活
            // Activation and deactivation
            (Registered, Connected) => true,
            (Connected, Registered) => true,

            _ => false,
        }
    }

    /// 检查 `power_on` 的前置条件
    /// Check preconditions of `power_on`
    pub fn check_power_on(state: DeviceState, policy: PowerOnPolicy) -> Result<Precondition> {
        match (state, policy) {
            (DeviceState::Off, _) => Ok(Precondition::Proceed),
            (DeviceState::PoweredOn, _) => Ok(Precondition::AlreadyDone),
            (_, PowerOnPolicy::Lenient) => Ok(Precondition::AlreadyDone),
            (state, PowerOnPolicy::Strict) => Err(Error::InvalidState {
                operation: Operation::PowerOn,
                state,
            }),
        }
    }

    /// 检查 `register` 的前置条件
    /// Check preconditions of `register`
    pub fn check_register(state: DeviceState) -> Result<Precondition> {
        match state {
            DeviceState::PoweredOn => Ok(Precondition::Proceed),
            DeviceState::Off => Err(Error::NotPowered {
                operation: Operation::Register,
            }),
            state => Err(Error::InvalidState {
                operation: Operation::Register,
                state,
            }),
        }
    }

    /// 检查 `activate_connection` 的前置条件
    /// Check preconditions of `activate_connection`
    pub fn check_activate(state: DeviceState) -> Result<Precondition> {
        match state {
            DeviceState::Registered => Ok(Precondition::Proceed),
            DeviceState::Connected => Ok(Precondition::AlreadyDone),
            DeviceState::Off => Err(Error::NotPowered {
                operation: Operation::ActivateConnection,
            }),
            DeviceState::PoweredOn => Err(Error::InvalidState {
                operation: Operation::ActivateConnection,
                state,
            }),
        }
    }

    /// 检查 `deactivate_connection` 的前置条件；未连接时为空操作
    /// Check preconditions of `deactivate_connection`; a no-op when not connected
    pub fn check_deactivate(state: DeviceState) -> Precondition {
        if Self::can_send_data(state) {
            Precondition::Proceed
        } else {
            Precondition::AlreadyDone
        }
    }

    /// 检查是否可以发送数据
    /// Check if data can be sent
    pub fn can_send_data(state: DeviceState) -> bool {
        matches!(state, DeviceState::Connected)
    }

    /// 检查设备是否已附着到网络
    /// Check if the device is attached to the network
    pub fn is_attached(state: DeviceState) -> bool {
        matches!(state, DeviceState::Registered | DeviceState::Connected)
    }
}
