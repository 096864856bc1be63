//! `rover-types` – plain data shared by every rover crate.
//!
//! Everything here is ordinary read/write state: the behavior-tree engine
//! never calls back into these types, leaves simply read sensor fields and
//! write the motion [`Command`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Motion
// ─────────────────────────────────────────────────────────────────────────────

/// Body-frame motion command for a differential-drive base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Forward speed in m/s.
    pub velocity: f64,
    /// Turn rate in rad/s, positive is counter-clockwise.
    pub angular_velocity: f64,
}

impl Command {
    pub fn new(velocity: f64, angular_velocity: f64) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }

    /// The all-zero command.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Drive along an arc of the given `curvature` (1/m) at `speed`.
    pub fn arc(speed: f64, curvature: f64) -> Self {
        Self::new(speed, speed * curvature)
    }

    /// Same path, driven backwards.
    pub fn reverse(self) -> Self {
        Self::new(-self.velocity, -self.angular_velocity)
    }
}

/// One wheel motor: the set-point written by control code and the state
/// reported back by the drive (real or simulated).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    /// Commanded wheel speed in rad/s.
    pub angular_vel_sp: f64,
    /// Measured wheel speed in rad/s.
    pub angular_vel: f64,
    pub max_angular_vel: f64,
    /// Accumulated wheel angle in radians.
    pub position: f64,
}

impl Default for Motor {
    fn default() -> Self {
        Self {
            angular_vel_sp: 0.0,
            angular_vel: 0.0,
            max_angular_vel: 700f64.to_radians(),
            position: 0.0,
        }
    }
}

/// Planar pose in the odometry frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading_rad: f64,
}

/// Selects one of the two drive wheels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelSide {
    Left,
    Right,
}

// ─────────────────────────────────────────────────────────────────────────────
// RobotState
// ─────────────────────────────────────────────────────────────────────────────

/// The robot-state value a behavior tree is ticked against.
///
/// Sensor fields are written by the hardware side (or the simulator) and
/// read by leaves; `command` is written by leaves and consumed by the drive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    /// Signed distance driven since odometry was last reset, in metres.
    pub travelled_distance: f64,
    /// Unwrapped heading since odometry was last reset, in radians.
    pub heading_rad: f64,
    pub has_left_bumper: bool,
    pub has_right_bumper: bool,
    pub left_bumper_hit: bool,
    pub right_bumper_hit: bool,
    pub line_sensor: bool,
    pub command: Command,
    pub left_wheel: Motor,
    pub right_wheel: Motor,
    pub pose: Pose,
    /// Body motion estimated by odometry on the last update.
    pub movement: Command,
}

impl RobotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A robot fitted with both front bumpers.
    pub fn with_bumpers() -> Self {
        Self {
            has_left_bumper: true,
            has_right_bumper: true,
            ..Self::default()
        }
    }

    pub fn wheel(&self, side: WheelSide) -> &Motor {
        match side {
            WheelSide::Left => &self.left_wheel,
            WheelSide::Right => &self.right_wheel,
        }
    }

    pub fn wheel_mut(&mut self, side: WheelSide) -> &mut Motor {
        match side {
            WheelSide::Left => &mut self.left_wheel,
            WheelSide::Right => &mut self.right_wheel,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Angle helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `1.0` for non-negative input, `-1.0` otherwise.
pub fn sign(value: f64) -> f64 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}

/// Wrap `angle` into `[-π, π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type for tree construction, tick-aborting leaf errors,
/// hardware faults and configuration problems.
///
/// A behavior reporting `Failure` is *not* an error; this type only carries
/// conditions that abort a tick or prevent a tree from being built.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoverError {
    #[error("{kind} requires at least one child")]
    EmptyComposite { kind: String },

    #[error("Invalid parameter for {node}: {details}")]
    InvalidParameter { node: String, details: String },

    #[error("{node} was updated before start()")]
    NotStarted { node: String },

    #[error("Leaf '{node}' failed: {details}")]
    Leaf { node: String, details: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl RoverError {
    /// Shorthand for a [`RoverError::Leaf`] raised by callback code.
    pub fn leaf(node: impl Into<String>, details: impl Into<String>) -> Self {
        RoverError::Leaf {
            node: node.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_arc_scales_turn_rate_by_speed() {
        let cmd = Command::arc(0.5, 2.0);
        assert!((cmd.velocity - 0.5).abs() < 1e-12);
        assert!((cmd.angular_velocity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn command_reverse_negates_both_components() {
        let cmd = Command::new(0.2, -0.4).reverse();
        assert_eq!(cmd, Command::new(-0.2, 0.4));
    }

    #[test]
    fn normalize_angle_wraps_into_half_open_range() {
        assert!((normalize_angle(3.0 * PI / 2.0) - (-PI / 2.0)).abs() < 1e-12);
        assert!((normalize_angle(-3.0 * PI / 2.0) - (PI / 2.0)).abs() < 1e-12);
        assert!((normalize_angle(PI) - (-PI)).abs() < 1e-12);
        assert!((normalize_angle(0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn sign_treats_zero_as_positive() {
        assert_eq!(sign(0.0), 1.0);
        assert_eq!(sign(-0.1), -1.0);
    }

    #[test]
    fn motor_default_speed_limit_is_700_degrees() {
        let motor = Motor::default();
        assert!((motor.max_angular_vel - 700f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn wheel_accessors_select_side() {
        let mut state = RobotState::with_bumpers();
        state.wheel_mut(WheelSide::Right).position = 1.5;
        assert_eq!(state.wheel(WheelSide::Right).position, 1.5);
        assert_eq!(state.wheel(WheelSide::Left).position, 0.0);
        assert!(state.has_left_bumper && state.has_right_bumper);
    }

    #[test]
    fn robot_state_json_roundtrip() {
        let mut state = RobotState::new();
        state.command = Command::new(0.14, 0.0);
        state.left_bumper_hit = true;
        let json = serde_json::to_string(&state).unwrap();
        let back: RobotState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
        // Motor limits are irrational radian values and must survive bit-exact.
        assert_eq!(
            back.left_wheel.max_angular_vel.to_bits(),
            700f64.to_radians().to_bits()
        );
    }

    #[test]
    fn rover_error_display() {
        let err = RoverError::EmptyComposite {
            kind: "Sequence".to_string(),
        };
        assert!(err.to_string().contains("Sequence"));

        let err = RoverError::leaf("is_clear", "sensor offline");
        assert!(err.to_string().contains("is_clear"));
        assert!(err.to_string().contains("sensor offline"));
    }
}
