//! `rover-hal` – drive-train side of the rover.
//!
//! - [`kinematics`] – [`DifferentialDrive`][kinematics::DifferentialDrive]:
//!   body command ↔ wheel speeds, and pose prediction.
//! - [`drive`] – behavior nodes that turn [`RobotState::command`] into wheel
//!   set-points and wheel motion back into odometry, plus
//!   [`drive_train`][drive::drive_train] which bundles them with simulated
//!   motors.
//! - [`sim`] – simulated wheel motors.
//!
//! [`RobotState::command`]: rover_types::RobotState::command

pub mod drive;
pub mod kinematics;
pub mod sim;

pub use drive::{compute_odometry, compute_wheel_commands, drive_train};
pub use kinematics::{DifferentialDrive, WheelCommand, predict_pose};
pub use sim::simulate_motor;
