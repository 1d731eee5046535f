//! Camera motion control over a remote session.
//!
//! Every relative move re-queries the driver for the live angle instead of
//! caching it: the driver can be operated directly on the robot between calls.
//! Home and custom moves name an absolute target and skip the query. All
//! targets are clamped to the servo range before the move command is sent.

use crate::command::DriverCommand;
use crate::error::TransportError;
use crate::session::{CommandOutput, RemoteSession};
use crate::{Error, Result};
use rigctl_types::{DEFAULT_HOME_ANGLE, Direction, Motor, clamp_angle};
use tracing::{debug, info, warn};

/// Result of a completed move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub motor: Motor,
    pub direction: Direction,

    /// Angle reported by the driver before a relative move; `None` for absolute moves.
    pub previous: Option<f64>,

    /// Clamped angle sent with the move command.
    pub target: f64,
}

/// Clamped target of a relative move, `None` for Home and Custom.
#[must_use]
pub fn relative_target(current: f64, direction: Direction, degrees: f64) -> Option<f64> {
    direction
        .sign()
        .map(|sign| clamp_angle(current + sign * degrees))
}

/// Parse user-entered text into a finite angle.
///
/// # Errors
///
/// Returns `Error::InvalidAngle` for empty, non-numeric or non-finite input.
pub fn parse_angle(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAngle("no angle provided".to_string()));
    }
    match trimmed.parse::<f64>() {
        Ok(angle) if angle.is_finite() => Ok(angle),
        _ => Err(Error::InvalidAngle(format!("'{trimmed}' is not a number"))),
    }
}

/// Interpret the driver's boolean-like status text.
fn parse_status(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "ok" | "ready" => Some(true),
        "false" | "0" | "no" | "off" | "fail" | "error" => Some(false),
        _ => None,
    }
}

/// Issues driver commands for the camera motors.
#[derive(Debug, Clone)]
pub struct MotionController {
    driver_path: String,
    home_angle: f64,
}

impl MotionController {
    #[must_use]
    pub fn new(driver_path: impl Into<String>) -> Self {
        Self {
            driver_path: driver_path.into(),
            home_angle: DEFAULT_HOME_ANGLE,
        }
    }

    /// Override the home angle. Out-of-range values are clamped.
    #[must_use]
    pub fn with_home_angle(mut self, home_angle: f64) -> Self {
        self.home_angle = clamp_angle(home_angle);
        self
    }

    #[must_use]
    pub fn driver_path(&self) -> &str {
        &self.driver_path
    }

    #[must_use]
    pub fn home_angle(&self) -> f64 {
        self.home_angle
    }

    /// Render `command` against this controller's driver binary.
    #[must_use]
    pub fn command_line(&self, command: DriverCommand) -> String {
        command.render(&self.driver_path)
    }

    async fn run<S>(
        &self,
        session: &S,
        command: DriverCommand,
    ) -> std::result::Result<CommandOutput, TransportError>
    where
        S: RemoteSession + ?Sized,
    {
        if !session.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let line = self.command_line(command);
        debug!("Sending command: {line}");
        session.execute(&line).await
    }

    /// Send the driver initialization command.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandFailed` on a non-zero exit, or a transport error.
    pub async fn initialize<S>(&self, session: &S) -> Result<()>
    where
        S: RemoteSession + ?Sized,
    {
        let output = self.run(session, DriverCommand::Initialize).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: self.command_line(DriverCommand::Initialize),
                status: output.exit_status,
            });
        }
        info!("Motor driver initialized");
        Ok(())
    }

    /// Ask the driver whether it is ready.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandFailed` on a non-zero exit and
    /// `Error::UnexpectedOutput` when the reply is not boolean-like.
    pub async fn driver_status<S>(&self, session: &S) -> Result<bool>
    where
        S: RemoteSession + ?Sized,
    {
        let command = self.command_line(DriverCommand::Status);
        let output = self.run(session, DriverCommand::Status).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command,
                status: output.exit_status,
            });
        }
        parse_status(output.text()).ok_or_else(|| Error::UnexpectedOutput {
            command,
            output: output.text().to_string(),
        })
    }

    /// Read the live angle of `motor` from the driver.
    ///
    /// # Errors
    ///
    /// Returns `Error::QueryFailed` on a non-zero exit, a timeout, or output
    /// that is not a finite number. Other transport failures pass through.
    pub async fn query_position<S>(&self, session: &S, motor: Motor) -> Result<f64>
    where
        S: RemoteSession + ?Sized,
    {
        let query_failed = |reason: String| Error::QueryFailed { motor, reason };

        let output = match self.run(session, DriverCommand::QueryPosition { motor }).await {
            Ok(output) => output,
            Err(e @ TransportError::Timeout { .. }) => return Err(query_failed(e.to_string())),
            Err(e) => return Err(e.into()),
        };

        if !output.success() {
            warn!(
                "Position query for {motor} exited with status {}",
                output.exit_status
            );
            return Err(query_failed(format!("exit status {}", output.exit_status)));
        }

        match output.text().parse::<f64>() {
            Ok(angle) if angle.is_finite() => {
                debug!("{motor} is at {angle}");
                Ok(angle)
            }
            _ => Err(query_failed(format!(
                "non-numeric position '{}'",
                output.text()
            ))),
        }
    }

    /// Move `motor` according to `direction`.
    ///
    /// `degrees` is the step magnitude for Up/Down/Left/Right and ignored
    /// otherwise; the direction alone decides the sign.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAngle` for a negative or non-finite step, or a
    /// non-finite custom angle,
    /// `Error::QueryFailed` if the position query of a relative move fails (no
    /// move is sent), and `Error::MoveFailed` if the move command fails. After
    /// `MoveFailed` the physical position is indeterminate.
    pub async fn move_motor<S>(
        &self,
        session: &S,
        motor: Motor,
        direction: Direction,
        degrees: f64,
    ) -> Result<MoveOutcome>
    where
        S: RemoteSession + ?Sized,
    {
        if !session.is_connected() {
            return Err(TransportError::NotConnected.into());
        }

        let (previous, target) = match direction {
            Direction::Home => (None, self.home_angle),
            Direction::Custom(angle) => {
                if !angle.is_finite() {
                    return Err(Error::InvalidAngle(format!("custom angle {angle}")));
                }
                (None, clamp_angle(angle))
            }
            Direction::Up | Direction::Down | Direction::Left | Direction::Right => {
                if !degrees.is_finite() || degrees < 0.0 {
                    return Err(Error::InvalidAngle(format!("step of {degrees} degrees")));
                }
                let current = self.query_position(session, motor).await?;
                let target = relative_target(current, direction, degrees).unwrap_or(current);
                (Some(current), target)
            }
        };

        self.apply(session, motor, target).await?;
        info!("Moved {motor} {direction} to {target}");

        Ok(MoveOutcome {
            motor,
            direction,
            previous,
            target,
        })
    }

    /// Send both axes to the home angle, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first `move_motor` error.
    pub async fn home<S>(&self, session: &S) -> Result<Vec<MoveOutcome>>
    where
        S: RemoteSession + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(Motor::ALL.len());
        for motor in Motor::ALL {
            outcomes.push(self.move_motor(session, motor, Direction::Home, 0.0).await?);
        }
        Ok(outcomes)
    }

    /// Move the camera as a whole: Up/Down tilt, Left/Right pan, Home both.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOperation` for a custom angle, which needs an
    /// explicit motor, and otherwise the errors of `move_motor`.
    pub async fn nudge<S>(
        &self,
        session: &S,
        direction: Direction,
        degrees: f64,
    ) -> Result<Vec<MoveOutcome>>
    where
        S: RemoteSession + ?Sized,
    {
        match (direction, direction.camera_axis()) {
            (_, Some(motor)) => Ok(vec![
                self.move_motor(session, motor, direction, degrees).await?,
            ]),
            (Direction::Home, None) => self.home(session).await,
            (_, None) => Err(Error::InvalidOperation(format!(
                "{direction} needs an explicit motor"
            ))),
        }
    }

    async fn apply<S>(&self, session: &S, motor: Motor, angle: f64) -> Result<()>
    where
        S: RemoteSession + ?Sized,
    {
        let move_failed = |reason: String| Error::MoveFailed {
            motor,
            angle,
            reason,
        };

        let output = match self.run(session, DriverCommand::Move { motor, angle }).await {
            Ok(output) => output,
            Err(e @ TransportError::Timeout { .. }) => return Err(move_failed(e.to_string())),
            Err(e) => return Err(e.into()),
        };

        if output.success() {
            Ok(())
        } else {
            warn!(
                "Move of {motor} to {angle} exited with status {}",
                output.exit_status
            );
            Err(move_failed(format!("exit status {}", output.exit_status)))
        }
    }
}
