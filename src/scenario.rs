//! Scripted operation sequences and the reference transition table they are
//! checked against.
//!
//! 脚本化的操作序列，以及用于校验它们的参考状态转换表。

use crate::{
    config::PowerOnPolicy,
    device::{DeviceSession, DeviceState},
    error::Result,
    network::Connector,
};

/// One lifecycle operation in a scripted scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    PowerOn,
    Register,
    Activate(String),
    Deactivate(String),
    Transmit(Vec<u8>),
    Shutdown,
}

/// The lifecycle transition table written out by hand, independent of the
/// session's validator. Assumes a network on which every attempt succeeds.
///
/// 手写的生命周期状态转换表，独立于会话的验证器。假设网络上每次尝试都成功。
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionTable {
    pub power_on_policy: PowerOnPolicy,
}

impl TransitionTable {
    pub fn new(power_on_policy: PowerOnPolicy) -> Self {
        Self { power_on_policy }
    }

    /// State after `step`, or `None` when the step must be rejected.
    pub fn next(&self, state: DeviceState, step: &Step) -> Option<DeviceState> {
        use DeviceState::*;

        match (step, state) {
            (Step::PowerOn, Off) => Some(PoweredOn),
            (Step::PowerOn, PoweredOn) => Some(PoweredOn),
            (Step::PowerOn, s) => match self.power_on_policy {
                PowerOnPolicy::Lenient => Some(s),
                PowerOnPolicy::Strict => None,
            },

            (Step::Register, PoweredOn) => Some(Registered),
            (Step::Register, _) => None,

            (Step::Activate(_) | Step::Transmit(_), Registered | Connected) => Some(Connected),
            (Step::Activate(_) | Step::Transmit(_), _) => None,

            (Step::Deactivate(_), Connected) => Some(Registered),
            (Step::Deactivate(_), s) => Some(s),

            (Step::Shutdown, _) => Some(Off),
        }
    }

    /// Replays `steps` from `OFF` on paper. Rejected steps leave the state as is.
    pub fn replay<'a>(&self, steps: impl IntoIterator<Item = &'a Step>) -> DeviceState {
        steps
            .into_iter()
            .fold(DeviceState::Off, |state, step| self.next(state, step).unwrap_or(state))
    }
}

/// Drives `session` through `steps`, collecting each outcome. Failures do not
/// stop the run.
pub async fn run_steps<C: Connector>(
    session: &mut DeviceSession<C>,
    steps: &[Step],
) -> Vec<Result<()>> {
    let mut outcomes = Vec::with_capacity(steps.len());
    for step in steps {
        let outcome = match step {
            Step::PowerOn => session.power_on(),
            Step::Register => session.register(),
            Step::Activate(reason) => session.activate_connection(reason).await,
            Step::Deactivate(reason) => session.deactivate_connection(reason),
            Step::Transmit(payload) => session.transmit(payload.clone()).await.map(|_| ()),
            Step::Shutdown => session.shutdown(),
        };
        outcomes.push(outcome);
    }
    outcomes
}
