//! Tests for power, registration, activation and shutdown transitions.

use super::{kinds, registered_session, session_with};
use crate::{
    config::{PowerOnPolicy, SessionConfig},
    device::{DeviceSession, DeviceState, EventKind, Operation},
    error::Error,
    network::{AlwaysConnect, ScriptedConnector},
    scenario::{Step, TransitionTable, run_steps},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_example_scenario() {
    let mut session = session_with(ScriptedConnector::new([]), 2);

    session.power_on().unwrap();
    session.register().unwrap();
    session.transmit("ping").await.unwrap();

    assert_eq!(session.state(), DeviceState::Connected);
    let log: Vec<_> = session
        .event_log()
        .iter()
        .map(|e| (e.kind(), e.reason().to_string()))
        .collect();
    assert_eq!(
        log,
        vec![
            (EventKind::Power, "power_on".to_string()),
            (EventKind::Registration, "network_registration".to_string()),
            (EventKind::Activation, "data_transmission".to_string()),
            (EventKind::Transmission, "data_transmission".to_string()),
        ]
    );
    assert!(session.last_transmission().is_some());
}

#[test]
fn test_power_on_is_idempotent_from_powered_on() {
    let mut session = session_with(ScriptedConnector::new([]), 0);

    session.power_on().unwrap();
    session.power_on().unwrap();

    assert_eq!(session.state(), DeviceState::PoweredOn);
    assert_eq!(kinds(&session), vec![EventKind::Power]);
}

#[tokio::test]
async fn test_power_on_strict_rejects_attached_states() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);
    assert_eq!(
        session.power_on(),
        Err(Error::InvalidState {
            operation: Operation::PowerOn,
            state: DeviceState::Registered,
        })
    );

    session.activate_connection("test").await.unwrap();
    assert!(matches!(
        session.power_on(),
        Err(Error::InvalidState {
            state: DeviceState::Connected,
            ..
        })
    ));
    // Rejections never touch the log.
    assert_eq!(
        kinds(&session),
        vec![EventKind::Power, EventKind::Registration, EventKind::Activation]
    );
}

#[test]
fn test_power_on_lenient_is_noop_when_attached() {
    let config = SessionConfig {
        power_on_policy: PowerOnPolicy::Lenient,
        ..SessionConfig::default()
    };
    let mut session = DeviceSession::new("dut-lenient", config, AlwaysConnect);
    session.power_on().unwrap();
    session.register().unwrap();

    session.power_on().unwrap();

    assert_eq!(session.state(), DeviceState::Registered);
    assert_eq!(session.event_log().len(), 2);
}

#[test]
fn test_register_before_power_on() {
    let mut session = session_with(ScriptedConnector::new([]), 0);

    assert_eq!(
        session.register(),
        Err(Error::NotPowered {
            operation: Operation::Register
        })
    );
    assert_eq!(session.state(), DeviceState::Off);
    assert!(session.event_log().is_empty());
}

#[test]
fn test_register_twice_is_invalid() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);
    assert!(matches!(
        session.register(),
        Err(Error::InvalidState {
            operation: Operation::Register,
            state: DeviceState::Registered
        })
    ));
}

#[tokio::test]
async fn test_activate_before_register() {
    let mut session = session_with(ScriptedConnector::new([]), 0);
    assert!(matches!(
        session.activate_connection("x").await,
        Err(Error::NotPowered { .. })
    ));

    session.power_on().unwrap();
    assert!(matches!(
        session.activate_connection("x").await,
        Err(Error::InvalidState {
            state: DeviceState::PoweredOn,
            ..
        })
    ));
    // Precondition failures are not retried.
    assert_eq!(session.connector().connect_attempts(), 0);
}

#[tokio::test]
async fn test_activate_twice_is_idempotent() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);

    session.activate_connection("first").await.unwrap();
    session.activate_connection("second").await.unwrap();

    assert_eq!(session.state(), DeviceState::Connected);
    assert_eq!(session.stats().activation_count, 1);
    assert_eq!(session.connector().connect_attempts(), 1);
}

#[tokio::test]
async fn test_deactivate_twice_is_idempotent() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);
    session.activate_connection("up").await.unwrap();

    session.deactivate_connection("idle").unwrap();
    let len = session.event_log().len();
    session.deactivate_connection("idle").unwrap();

    assert_eq!(session.state(), DeviceState::Registered);
    assert_eq!(session.event_log().len(), len);
    assert_eq!(
        session.event_log().last().map(|e| e.summary()),
        Some((EventKind::Deactivation, "idle"))
    );
}

#[tokio::test]
async fn test_reactivation_after_deactivation() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);

    session.activate_connection("a").await.unwrap();
    session.deactivate_connection("d").unwrap();
    session.activate_connection("b").await.unwrap();

    assert_eq!(session.state(), DeviceState::Connected);
    assert_eq!(session.stats().signaling_events, 3);
}

#[tokio::test]
async fn test_shutdown_from_connected() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);
    session.activate_connection("up").await.unwrap();
    let before = session.event_log().len();

    session.shutdown().unwrap();

    assert_eq!(session.state(), DeviceState::Off);
    let tail: Vec<_> = session.event_log().as_slice()[before..]
        .iter()
        .map(|e| e.summary())
        .collect();
    assert_eq!(
        tail,
        vec![
            (EventKind::Deactivation, "device_shutdown"),
            (EventKind::Power, "power_off"),
        ]
    );
}

#[test]
fn test_shutdown_is_unconditional() {
    let mut session = session_with(ScriptedConnector::new([]), 0);

    session.shutdown().unwrap();

    assert_eq!(session.state(), DeviceState::Off);
    assert_eq!(
        session.event_log().summaries(),
        vec![(EventKind::Power, "power_off")]
    );
}

#[tokio::test]
async fn test_session_supports_new_cycle_after_shutdown() {
    let mut session = registered_session(ScriptedConnector::new([]), 0);
    session.transmit("one").await.unwrap();
    session.shutdown().unwrap();

    session.power_on().unwrap();
    session.register().unwrap();
    session.transmit("two").await.unwrap();

    assert_eq!(session.state(), DeviceState::Connected);
    assert_eq!(session.stats().transmission_count, 2);
}

#[tokio::test]
async fn test_listeners_see_every_event() {
    let mut session = session_with(ScriptedConnector::new([false, true]), 1);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    session.register_event_listener(Box::new(move |event| {
        seen_clone.lock().unwrap().push(event.clone());
    }));

    session.power_on().unwrap();
    session.register().unwrap();
    session.transmit("ping").await.unwrap();
    session.shutdown().unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), session.event_log().as_slice());

    session.clear_event_listeners();
    session.power_on().unwrap();
    assert_eq!(seen.lock().unwrap().len() + 1, session.event_log().len());
}

fn random_step(rng: &mut StdRng) -> Step {
    match rng.random_range(0..6) {
        0 => Step::PowerOn,
        1 => Step::Register,
        2 => Step::Activate("scripted".into()),
        3 => Step::Deactivate("scripted".into()),
        4 => Step::Transmit(vec![0xAB; 4]),
        _ => Step::Shutdown,
    }
}

/// Connected implies the last signaling event is an activation.
fn assert_connection_invariant<C: crate::network::Connector>(session: &DeviceSession<C>) {
    let last_signal = session
        .event_log()
        .iter()
        .rev()
        .find(|e| e.kind().is_signaling())
        .map(|e| e.kind());
    if session.state() == DeviceState::Connected {
        assert_eq!(last_signal, Some(EventKind::Activation));
    }
    assert_eq!(
        session.last_transmission().is_some(),
        session.event_log().last_of(EventKind::Transmission).is_some()
    );
}

#[tokio::test]
async fn test_state_matches_transition_table() {
    for (seed, policy) in [(1u64, PowerOnPolicy::Strict), (2, PowerOnPolicy::Lenient), (3, PowerOnPolicy::Strict)] {
        let mut rng = StdRng::seed_from_u64(seed);
        let config = SessionConfig {
            power_on_policy: policy,
            ..super::fast_config(0)
        };
        let table = TransitionTable::new(policy);
        let mut session = DeviceSession::new("dut-replay", config, AlwaysConnect);
        let mut expected = DeviceState::Off;

        for _ in 0..200 {
            let step = random_step(&mut rng);
            let outcome = run_steps(&mut session, std::slice::from_ref(&step)).await;
            let next = table.next(expected, &step);

            assert_eq!(outcome[0].is_ok(), next.is_some(), "step {step:?} from {expected}");
            expected = next.unwrap_or(expected);
            assert_eq!(session.state(), expected, "after {step:?}");
            assert_connection_invariant(&session);
        }
    }
}
