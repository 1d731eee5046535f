//! Tests for the motion controller
//!
//! Covers target resolution and clamping, the query-then-move sequence,
//! absolute moves that skip the query, failure handling and timeouts.

use super::fixtures::{DRIVER, MockSession, move_cmd, query_cmd};
use crate::error::TransportError;
use crate::motion::{MotionController, relative_target};
use crate::session::{CommandOutput, GuardedSession};
use crate::Error;
use proptest::prelude::*;
use rigctl_types::{Direction, Motor, clamp_angle};
use std::time::Duration;

fn controller() -> MotionController {
    MotionController::new(DRIVER)
}

#[tokio::test]
async fn test_left_past_upper_bound_clamps_to_180() {
    let session = MockSession::connected();
    session.respond_position(Motor::Horizontal, "170");

    let outcome = controller()
        .move_motor(&session, Motor::Horizontal, Direction::Left, 20.0)
        .await
        .unwrap();

    assert_eq!(outcome.previous, Some(170.0));
    assert_eq!(outcome.target, 180.0);
    assert_eq!(
        session.commands(),
        vec![query_cmd(Motor::Horizontal), move_cmd(Motor::Horizontal, "180")]
    );
}

#[tokio::test]
async fn test_right_past_lower_bound_clamps_to_0() {
    let session = MockSession::connected();
    session.respond_position(Motor::Horizontal, "5");

    let outcome = controller()
        .move_motor(&session, Motor::Horizontal, Direction::Right, 20.0)
        .await
        .unwrap();

    assert_eq!(outcome.target, 0.0);
    assert_eq!(
        session.commands().last().unwrap(),
        &move_cmd(Motor::Horizontal, "0")
    );
}

#[tokio::test]
async fn test_up_and_down_adjust_vertical() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "87.5");

    let up = controller()
        .move_motor(&session, Motor::Vertical, Direction::Up, 10.0)
        .await
        .unwrap();
    assert_eq!(up.target, 97.5);

    let down = controller()
        .move_motor(&session, Motor::Vertical, Direction::Down, 10.0)
        .await
        .unwrap();
    assert_eq!(down.target, 77.5);
}

#[tokio::test]
async fn test_home_moves_both_axes_without_query() {
    let session = MockSession::connected();

    let outcomes = controller().home(&session).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.target == 90.0 && o.previous.is_none()));
    assert_eq!(
        session.commands(),
        vec![
            move_cmd(Motor::Horizontal, "90"),
            move_cmd(Motor::Vertical, "90")
        ]
    );
}

#[tokio::test]
async fn test_home_uses_configured_angle() {
    let session = MockSession::connected();

    let outcome = controller()
        .with_home_angle(45.0)
        .move_motor(&session, Motor::Vertical, Direction::Home, 10.0)
        .await
        .unwrap();

    assert_eq!(outcome.target, 45.0);
    assert_eq!(session.commands(), vec![move_cmd(Motor::Vertical, "45")]);
}

#[tokio::test]
async fn test_home_stops_at_first_failure() {
    let session = MockSession::connected();
    session.respond(
        &move_cmd(Motor::Horizontal, "90"),
        CommandOutput::new(1, ""),
    );

    let err = controller().home(&session).await.unwrap_err();

    assert!(matches!(
        err,
        Error::MoveFailed {
            motor: Motor::Horizontal,
            ..
        }
    ));
    assert_eq!(session.commands().len(), 1);
}

#[tokio::test]
async fn test_custom_angle_is_clamped_without_query() {
    let session = MockSession::connected();

    let outcome = controller()
        .move_motor(&session, Motor::Vertical, Direction::Custom(250.0), 0.0)
        .await
        .unwrap();

    assert_eq!(outcome.target, 180.0);
    assert_eq!(session.commands(), vec![move_cmd(Motor::Vertical, "180")]);
}

#[tokio::test]
async fn test_custom_non_finite_angle_is_rejected() {
    let session = MockSession::connected();

    let err = controller()
        .move_motor(&session, Motor::Vertical, Direction::Custom(f64::NAN), 0.0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidAngle(_)));
    assert!(session.commands().is_empty());
}

#[tokio::test]
async fn test_non_finite_step_is_rejected() {
    let session = MockSession::connected();

    let err = controller()
        .move_motor(&session, Motor::Vertical, Direction::Up, f64::INFINITY)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidAngle(_)));
    assert!(session.commands().is_empty());
}

#[tokio::test]
async fn test_query_failure_issues_no_move() {
    let session = MockSession::connected();
    session.respond(&query_cmd(Motor::Horizontal), CommandOutput::new(1, ""));

    let err = controller()
        .move_motor(&session, Motor::Horizontal, Direction::Left, 10.0)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::QueryFailed {
            motor: Motor::Horizontal,
            ..
        }
    ));
    assert_eq!(session.commands(), vec![query_cmd(Motor::Horizontal)]);
}

#[tokio::test]
async fn test_non_numeric_position_is_query_failure() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "motor offline");

    let err = controller()
        .move_motor(&session, Motor::Vertical, Direction::Up, 10.0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QueryFailed { .. }));
    assert!(err.to_string().contains("motor offline"));
    assert_eq!(session.commands().len(), 1);
}

#[tokio::test]
async fn test_non_finite_position_is_query_failure() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "NaN");

    let err = controller()
        .query_position(&session, Motor::Vertical)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QueryFailed { .. }));
}

#[tokio::test]
async fn test_empty_position_is_query_failure() {
    let session = MockSession::connected();

    let err = controller()
        .query_position(&session, Motor::Horizontal)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QueryFailed { .. }));
}

#[tokio::test]
async fn test_move_failure_reports_target() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "100");
    session.respond(&move_cmd(Motor::Vertical, "110"), CommandOutput::new(2, ""));

    let err = controller()
        .move_motor(&session, Motor::Vertical, Direction::Up, 10.0)
        .await
        .unwrap_err();

    match err {
        Error::MoveFailed { motor, angle, reason } => {
            assert_eq!(motor, Motor::Vertical);
            assert_eq!(angle, 110.0);
            assert_eq!(reason, "exit status 2");
        }
        other => panic!("expected MoveFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnected_session_is_transport_error() {
    let session = MockSession::connected();
    session.set_connected(false);

    let err = controller()
        .move_motor(&session, Motor::Horizontal, Direction::Home, 0.0)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(TransportError::NotConnected)
    ));
    assert!(session.commands().is_empty());
}

#[tokio::test]
async fn test_initialize() {
    let session = MockSession::connected();
    controller().initialize(&session).await.unwrap();
    assert_eq!(session.commands(), vec![format!("{DRIVER} -i")]);

    session.respond(&format!("{DRIVER} -i"), CommandOutput::new(3, ""));
    let err = controller().initialize(&session).await.unwrap_err();
    assert!(matches!(err, Error::CommandFailed { status: 3, .. }));
}

#[tokio::test]
async fn test_driver_status() {
    let session = MockSession::connected();
    let status_cmd = format!("{DRIVER} -s");

    session.respond(&status_cmd, CommandOutput::new(0, "True\n"));
    session.respond(&status_cmd, CommandOutput::new(0, "off"));
    session.respond(&status_cmd, CommandOutput::new(0, "warming up"));

    assert!(controller().driver_status(&session).await.unwrap());
    assert!(!controller().driver_status(&session).await.unwrap());
    let err = controller().driver_status(&session).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedOutput { .. }));
}

#[tokio::test]
async fn test_nudge_maps_directions_to_axes() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "90");
    session.respond_position(Motor::Horizontal, "90");

    let up = controller()
        .nudge(&session, Direction::Up, 5.0)
        .await
        .unwrap();
    assert_eq!(up[0].motor, Motor::Vertical);

    let right = controller()
        .nudge(&session, Direction::Right, 5.0)
        .await
        .unwrap();
    assert_eq!(right[0].motor, Motor::Horizontal);
    assert_eq!(right[0].target, 85.0);
}

#[tokio::test]
async fn test_nudge_home_moves_both_axes() {
    let session = MockSession::connected();
    let outcomes = controller()
        .nudge(&session, Direction::Home, 5.0)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
}

#[tokio::test]
async fn test_nudge_custom_needs_motor() {
    let session = MockSession::connected();
    let err = controller()
        .nudge(&session, Direction::Custom(30.0), 0.0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));
    assert!(session.commands().is_empty());
}

#[tokio::test]
async fn test_negative_step_is_rejected_before_query() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "90");

    for direction in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
        let err = controller()
            .move_motor(&session, Motor::Vertical, direction, -10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAngle(_)), "{direction}: {err}");
    }
    assert!(session.commands().is_empty());
}

#[tokio::test]
async fn test_zero_step_moves_to_current_angle() {
    let session = MockSession::connected();
    session.respond_position(Motor::Vertical, "42");

    let outcome = controller()
        .move_motor(&session, Motor::Vertical, Direction::Up, 0.0)
        .await
        .unwrap();

    assert_eq!(outcome.target, 42.0);
}

#[tokio::test(start_paused = true)]
async fn test_query_timeout_is_query_failure() {
    let mock = MockSession::connected();
    mock.set_delay(Duration::from_secs(30));
    let session = GuardedSession::new(mock.clone(), Duration::from_secs(5));

    let err = controller()
        .move_motor(&session, Motor::Horizontal, Direction::Left, 10.0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QueryFailed { .. }));
    assert!(err.to_string().contains("timed out"));
    assert!(mock.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_move_timeout_is_move_failure() {
    let mock = MockSession::connected();
    mock.set_delay(Duration::from_secs(30));
    let session = GuardedSession::new(mock, Duration::from_secs(5));

    let err = controller()
        .move_motor(&session, Motor::Vertical, Direction::Home, 0.0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MoveFailed { .. }));
}

proptest! {
    #[test]
    fn prop_increasing_directions_add(current in 0.0f64..=180.0, degrees in 0.0f64..360.0) {
        for direction in [Direction::Up, Direction::Left] {
            prop_assert_eq!(
                relative_target(current, direction, degrees),
                Some(clamp_angle(current + degrees))
            );
        }
    }

    #[test]
    fn prop_decreasing_directions_subtract(current in 0.0f64..=180.0, degrees in 0.0f64..360.0) {
        for direction in [Direction::Down, Direction::Right] {
            prop_assert_eq!(
                relative_target(current, direction, degrees),
                Some(clamp_angle(current - degrees))
            );
        }
    }

    #[test]
    fn prop_relative_target_in_range(current in -1e6f64..1e6, degrees in -1e6f64..1e6) {
        let target = relative_target(current, Direction::Up, degrees).unwrap();
        prop_assert!((0.0..=180.0).contains(&target));
    }
}
