//! 设备生命周期管理模块
//! Device Lifecycle Management Module
//!
//! 该模块提供状态验证和状态转换两层，由 `DeviceSession` 组合使用。
//!
//! This module provides the validation and transition layers that
//! `DeviceSession` composes.

mod transitions;
mod validation;

pub use transitions::TransitionExecutor;
pub use validation::{Precondition, StateValidator};
