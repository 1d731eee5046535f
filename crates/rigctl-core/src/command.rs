//! Command line strings understood by the remote motor driver.
//!
//! The driver binary is invoked as:
//!
//! - `<driver> -i` initialize
//! - `<driver> -s` status query
//! - `<driver> --motor <id> -c` current position query
//! - `<driver> --motor <id> --angle <value>` absolute move
//!
//! The exact shape is a compatibility contract with the robot side.

use crate::{Error, Result};
use rigctl_types::Motor;
use std::fmt;

/// Operation selector for [`format_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    Initialize,
    Status,
    QueryPosition,
    Move,
}

impl DriverOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DriverOp::Initialize => "initialize",
            DriverOp::Status => "status",
            DriverOp::QueryPosition => "query-position",
            DriverOp::Move => "move",
        }
    }
}

impl std::str::FromStr for DriverOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initialize" | "init" => Ok(DriverOp::Initialize),
            "status" => Ok(DriverOp::Status),
            "query-position" | "position" => Ok(DriverOp::QueryPosition),
            "move" => Ok(DriverOp::Move),
            other => Err(Error::InvalidOperation(format!(
                "unknown driver operation '{other}'"
            ))),
        }
    }
}

/// A fully parameterized driver invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverCommand {
    Initialize,
    Status,
    QueryPosition { motor: Motor },
    Move { motor: Motor, angle: f64 },
}

impl DriverCommand {
    /// Assemble a command from an operation and its optional parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOperation` if a required parameter is missing or
    /// a parameter is given that the operation does not take.
    pub fn from_parts(op: DriverOp, motor: Option<Motor>, angle: Option<f64>) -> Result<Self> {
        match (op, motor, angle) {
            (DriverOp::Initialize, None, None) => Ok(DriverCommand::Initialize),
            (DriverOp::Status, None, None) => Ok(DriverCommand::Status),
            (DriverOp::QueryPosition, Some(motor), None) => {
                Ok(DriverCommand::QueryPosition { motor })
            }
            (DriverOp::Move, Some(motor), Some(angle)) => Ok(DriverCommand::Move { motor, angle }),
            (op, motor, angle) => Err(Error::InvalidOperation(format!(
                "{} does not accept motor={} angle={}",
                op.name(),
                motor.map_or_else(|| "none".to_string(), |m| m.to_string()),
                angle.map_or_else(|| "none".to_string(), |a| a.to_string()),
            ))),
        }
    }

    #[must_use]
    pub fn op(&self) -> DriverOp {
        match self {
            DriverCommand::Initialize => DriverOp::Initialize,
            DriverCommand::Status => DriverOp::Status,
            DriverCommand::QueryPosition { .. } => DriverOp::QueryPosition,
            DriverCommand::Move { .. } => DriverOp::Move,
        }
    }

    /// Render the command line for the driver at `driver_path`.
    #[must_use]
    pub fn render(&self, driver_path: &str) -> String {
        format!("{driver_path} {}", self.args())
    }

    fn args(&self) -> String {
        match self {
            DriverCommand::Initialize => "-i".to_string(),
            DriverCommand::Status => "-s".to_string(),
            DriverCommand::QueryPosition { motor } => {
                format!("--motor {} -c", motor.driver_id())
            }
            DriverCommand::Move { motor, angle } => {
                format!("--motor {} --angle {angle}", motor.driver_id())
            }
        }
    }
}

impl fmt::Display for DriverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args())
    }
}

/// Format a driver command line from loosely typed parts.
///
/// # Errors
///
/// Returns `Error::InvalidOperation` when the parameters do not fit the operation.
pub fn format_command(
    driver_path: &str,
    op: DriverOp,
    motor: Option<Motor>,
    angle: Option<f64>,
) -> Result<String> {
    Ok(DriverCommand::from_parts(op, motor, angle)?.render(driver_path))
}
