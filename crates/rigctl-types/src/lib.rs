//! Shared types for the rigctl camera rig components.
//!
//! This crate provides the value types used by rigctl-core and rigctl-cli:
//! motor axes, move directions, hardware devices and the physical angle range
//! of the pan/tilt servos. All types are serializable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest angle the servos accept, in degrees.
pub const MIN_ANGLE: f64 = 0.0;

/// Highest angle the servos accept, in degrees.
pub const MAX_ANGLE: f64 = 180.0;

/// Home position used for both axes unless configured otherwise.
pub const DEFAULT_HOME_ANGLE: f64 = 90.0;

/// Step applied by a relative move unless configured otherwise.
pub const DEFAULT_STEP_DEGREES: f64 = 10.0;

/// Clamp an angle into `[MIN_ANGLE, MAX_ANGLE]`.
///
/// `-0.0` is normalized to `0.0` so the rendered driver command never reads `-0`.
/// NaN passes through unchanged; callers reject non-finite input before clamping.
#[must_use]
pub fn clamp_angle(angle: f64) -> f64 {
    // adding +0.0 turns -0.0 into 0.0 and leaves every other value alone
    angle.clamp(MIN_ANGLE, MAX_ANGLE) + 0.0
}

/// A rotational axis of the camera rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Motor {
    /// Pan axis
    #[serde(rename = "CAM_HRZN_MTR", alias = "horizontal")]
    Horizontal,

    /// Tilt axis
    #[serde(rename = "CAM_VERT_MTR", alias = "vertical")]
    Vertical,
}

impl Motor {
    /// Both axes, horizontal first.
    pub const ALL: [Motor; 2] = [Motor::Horizontal, Motor::Vertical];

    /// Identifier understood by the remote motor driver.
    #[must_use]
    pub fn driver_id(self) -> &'static str {
        match self {
            Motor::Horizontal => "CAM_HRZN_MTR",
            Motor::Vertical => "CAM_VERT_MTR",
        }
    }

    /// Human-friendly axis name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Motor::Horizontal => "horizontal",
            Motor::Vertical => "vertical",
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_id())
    }
}

impl FromStr for Motor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cam_hrzn_mtr" | "horizontal" | "hrzn" | "pan" | "h" => Ok(Motor::Horizontal),
            "cam_vert_mtr" | "vertical" | "vert" | "tilt" | "v" => Ok(Motor::Vertical),
            other => Err(format!(
                "Unknown motor '{other}' (expected horizontal or vertical)"
            )),
        }
    }
}

/// Requested camera movement.
///
/// Up/Left increase the angle, Down/Right decrease it. Home and Custom name an
/// absolute target and skip the position query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Home,
    Custom(f64),
}

impl Direction {
    /// Sign of the delta for relative directions, `None` for absolute ones.
    #[must_use]
    pub fn sign(self) -> Option<f64> {
        match self {
            Direction::Up | Direction::Left => Some(1.0),
            Direction::Down | Direction::Right => Some(-1.0),
            Direction::Home | Direction::Custom(_) => None,
        }
    }

    /// Whether the direction names an absolute target.
    #[must_use]
    pub fn is_absolute(self) -> bool {
        self.sign().is_none()
    }

    /// Axis a camera-level direction moves: Up/Down tilt, Left/Right pan.
    #[must_use]
    pub fn camera_axis(self) -> Option<Motor> {
        match self {
            Direction::Up | Direction::Down => Some(Motor::Vertical),
            Direction::Left | Direction::Right => Some(Motor::Horizontal),
            Direction::Home | Direction::Custom(_) => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("UP"),
            Direction::Down => f.write_str("DOWN"),
            Direction::Left => f.write_str("LEFT"),
            Direction::Right => f.write_str("RIGHT"),
            Direction::Home => f.write_str("HOME"),
            Direction::Custom(angle) => write!(f, "CUSTOM({angle})"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "home" => Ok(Direction::Home),
            _ => match trimmed.parse::<f64>() {
                Ok(angle) if angle.is_finite() => Ok(Direction::Custom(angle)),
                _ => Err(format!(
                    "Unknown direction '{trimmed}' (expected up, down, left, right, home or an angle)"
                )),
            },
        }
    }
}

/// A device listed in the remote hardware registry document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDevice {
    pub name: String,

    /// `true` routes the device to its simulated backend, `false` to real hardware.
    pub simulation_mode: bool,
}

impl HardwareDevice {
    #[must_use]
    pub fn new(name: impl Into<String>, simulation_mode: bool) -> Self {
        Self {
            name: name.into(),
            simulation_mode,
        }
    }

    /// Short mode label for listings.
    #[must_use]
    pub fn mode_label(&self) -> &'static str {
        if self.simulation_mode { "sim" } else { "real" }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_angle_bounds() {
        assert_eq!(clamp_angle(190.0), 180.0);
        assert_eq!(clamp_angle(-15.0), 0.0);
        assert_eq!(clamp_angle(42.5), 42.5);
    }

    #[test]
    fn test_clamp_angle_normalizes_negative_zero() {
        let clamped = clamp_angle(-0.0);
        assert!(clamped.is_sign_positive());
        assert_eq!(clamped.to_string(), "0");
    }

    #[test]
    fn test_motor_driver_ids() {
        assert_eq!(Motor::Horizontal.driver_id(), "CAM_HRZN_MTR");
        assert_eq!(Motor::Vertical.driver_id(), "CAM_VERT_MTR");
        assert_eq!(Motor::Vertical.to_string(), "CAM_VERT_MTR");
    }

    #[test]
    fn test_motor_from_str_aliases() {
        assert_eq!("pan".parse::<Motor>().unwrap(), Motor::Horizontal);
        assert_eq!("CAM_HRZN_MTR".parse::<Motor>().unwrap(), Motor::Horizontal);
        assert_eq!("Tilt".parse::<Motor>().unwrap(), Motor::Vertical);
        assert!("wheel".parse::<Motor>().is_err());
    }

    #[test]
    fn test_motor_serde_uses_driver_id() {
        let json = serde_json::to_string(&Motor::Horizontal).unwrap();
        assert_eq!(json, "\"CAM_HRZN_MTR\"");
        let back: Motor = serde_json::from_str("\"vertical\"").unwrap();
        assert_eq!(back, Motor::Vertical);
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Up.sign(), Some(1.0));
        assert_eq!(Direction::Left.sign(), Some(1.0));
        assert_eq!(Direction::Down.sign(), Some(-1.0));
        assert_eq!(Direction::Right.sign(), Some(-1.0));
        assert!(Direction::Home.is_absolute());
        assert!(Direction::Custom(12.0).is_absolute());
    }

    #[test]
    fn test_direction_camera_axis() {
        assert_eq!(Direction::Up.camera_axis(), Some(Motor::Vertical));
        assert_eq!(Direction::Down.camera_axis(), Some(Motor::Vertical));
        assert_eq!(Direction::Left.camera_axis(), Some(Motor::Horizontal));
        assert_eq!(Direction::Right.camera_axis(), Some(Motor::Horizontal));
        assert_eq!(Direction::Home.camera_axis(), None);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("UP".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!(" home ".parse::<Direction>().unwrap(), Direction::Home);
        assert_eq!(
            "45.5".parse::<Direction>().unwrap(),
            Direction::Custom(45.5)
        );
        assert!("sideways".parse::<Direction>().is_err());
        assert!("NaN".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Right.to_string(), "RIGHT");
        assert_eq!(Direction::Custom(30.0).to_string(), "CUSTOM(30)");
    }

    #[test]
    fn test_hardware_device_mode_label() {
        assert_eq!(HardwareDevice::new("CAM", true).mode_label(), "sim");
        assert_eq!(HardwareDevice::new("CAM", false).mode_label(), "real");
    }
}

/// Property-based tests for the angle range helpers.
#[cfg(test)]
#[allow(clippy::float_cmp)]
mod proptest_angle_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_is_idempotent(x in -1e300f64..1e300f64) {
            let once = clamp_angle(x);
            prop_assert_eq!(clamp_angle(once), once);
        }

        #[test]
        fn clamp_stays_in_range(x in -1e12f64..1e12f64) {
            let clamped = clamp_angle(x);
            prop_assert!((MIN_ANGLE..=MAX_ANGLE).contains(&clamped));
        }

        #[test]
        fn clamp_is_identity_inside_range(x in MIN_ANGLE..=MAX_ANGLE) {
            prop_assert_eq!(clamp_angle(x), x + 0.0);
        }
    }
}
