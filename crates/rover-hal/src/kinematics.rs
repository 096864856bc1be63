//! Differential-drive kinematics.
//!
//! Converts between a body-frame [`Command`] (forward speed and turn rate)
//! and per-wheel angular velocities, and integrates a body motion into a
//! planar [`Pose`].
//!
//! # Example
//!
//! ```rust
//! use rover_hal::kinematics::DifferentialDrive;
//! use rover_types::Command;
//!
//! let drive = DifferentialDrive::new(0.2, 0.03, 0.03).unwrap();
//! let wheels = drive.wheel_command(Command::new(0.3, 0.0));
//! assert!((wheels.left_angular_vel - 10.0).abs() < 1e-9);
//! assert_eq!(wheels.left_angular_vel, wheels.right_angular_vel);
//! ```

use rover_types::{Command, Pose, RoverError, normalize_angle};

/// Per-wheel angular velocities in rad/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelCommand {
    pub left_angular_vel: f64,
    pub right_angular_vel: f64,
}

impl WheelCommand {
    pub fn new(left_angular_vel: f64, right_angular_vel: f64) -> Self {
        Self {
            left_angular_vel,
            right_angular_vel,
        }
    }

    /// The larger of the two wheel speeds, ignoring direction.
    pub fn peak(&self) -> f64 {
        self.left_angular_vel.abs().max(self.right_angular_vel.abs())
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(
            self.left_angular_vel * factor,
            self.right_angular_vel * factor,
        )
    }
}

/// Geometry of a two-wheeled base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    axle_width: f64,
    left_wheel_radius: f64,
    right_wheel_radius: f64,
}

impl DifferentialDrive {
    /// All lengths are in metres.
    ///
    /// # Errors
    ///
    /// [`RoverError::InvalidParameter`] unless every length is positive and
    /// finite.
    pub fn new(
        axle_width: f64,
        left_wheel_radius: f64,
        right_wheel_radius: f64,
    ) -> Result<Self, RoverError> {
        for (what, value) in [
            ("axle_width", axle_width),
            ("left_wheel_radius", left_wheel_radius),
            ("right_wheel_radius", right_wheel_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(RoverError::InvalidParameter {
                    node: "DifferentialDrive".to_string(),
                    details: format!("{what} must be positive, got {value}"),
                });
            }
        }
        Ok(Self {
            axle_width,
            left_wheel_radius,
            right_wheel_radius,
        })
    }

    pub fn axle_width(&self) -> f64 {
        self.axle_width
    }

    /// Inverse kinematics: wheel speeds that realise `cmd`.
    pub fn wheel_command(&self, cmd: Command) -> WheelCommand {
        let half_track = cmd.angular_velocity * self.axle_width / 2.0;
        WheelCommand::new(
            (cmd.velocity - half_track) / self.left_wheel_radius,
            (cmd.velocity + half_track) / self.right_wheel_radius,
        )
    }

    /// Forward kinematics: body motion produced by the given wheel speeds.
    pub fn command(&self, wheels: WheelCommand) -> Command {
        let left = wheels.left_angular_vel * self.left_wheel_radius;
        let right = wheels.right_angular_vel * self.right_wheel_radius;
        Command::new((left + right) / 2.0, (right - left) / self.axle_width)
    }
}

/// Advance `pose` by driving `cmd` for `dt` seconds along a constant-
/// curvature arc.  The resulting heading is wrapped into `[-π, π)`.
pub fn predict_pose(pose: Pose, cmd: Command, dt: f64) -> Pose {
    let turn = cmd.angular_velocity * dt;
    let (dx, dy) = if turn.abs() < 1e-9 {
        let dist = cmd.velocity * dt;
        (dist * pose.heading_rad.cos(), dist * pose.heading_rad.sin())
    } else {
        let radius = cmd.velocity / cmd.angular_velocity;
        let end = pose.heading_rad + turn;
        (
            radius * (end.sin() - pose.heading_rad.sin()),
            radius * (pose.heading_rad.cos() - end.cos()),
        )
    };
    Pose {
        x: pose.x + dx,
        y: pose.y + dy,
        heading_rad: normalize_angle(pose.heading_rad + turn),
    }
}
