//! Drive-train nodes: command → wheel set-points, wheel motion → odometry.
//!
//! These are ordinary never-ending behaviors ticked against the same
//! [`RobotState`] as the control tree.  [`drive_train`] bundles them with two
//! simulated motors so a [`TickLoop`][rover_runtime::TickLoop] can run a
//! mission end to end without hardware.

use std::time::Duration;

use rover_runtime::behavior_tree::{Behavior, BehaviorNode, SharedClock, State};
use rover_types::{Command, Pose, RobotState, RoverError, WheelSide};
use tracing::debug;

use crate::kinematics::{DifferentialDrive, WheelCommand, predict_pose};
use crate::sim::{DEFAULT_MOTOR_MAX_DT, simulate_motor};

pub const DEFAULT_ODOMETRY_MAX_DT: Duration = Duration::from_secs(2);

// ─────────────────────────────────────────────────────────────────────────────
// Wheel commands
// ─────────────────────────────────────────────────────────────────────────────

struct ComputeWheelCommands {
    model: DifferentialDrive,
}

impl Behavior<RobotState> for ComputeWheelCommands {
    fn start(&mut self, _robot: &mut RobotState) -> Result<(), RoverError> {
        Ok(())
    }

    fn update(&mut self, robot: &mut RobotState) -> Result<State, RoverError> {
        let wheels = self.model.wheel_command(robot.command);
        let limit = robot
            .left_wheel
            .max_angular_vel
            .min(robot.right_wheel.max_angular_vel);
        let peak = wheels.peak();
        let wheels = if peak > limit {
            debug!(peak, limit, "wheel command scaled down to motor limit");
            wheels.scaled(limit / peak)
        } else {
            wheels
        };
        robot.left_wheel.angular_vel_sp = wheels.left_angular_vel;
        robot.right_wheel.angular_vel_sp = wheels.right_angular_vel;
        Ok(State::Running)
    }
}

/// Never-ending node writing both wheel set-points from
/// [`RobotState::command`].
///
/// If either wheel would exceed the slower motor's `max_angular_vel`, both
/// are scaled by the same factor so the path curvature is preserved.
pub fn compute_wheel_commands(model: DifferentialDrive) -> BehaviorNode<RobotState> {
    BehaviorNode::custom(ComputeWheelCommands { model })
}

// ─────────────────────────────────────────────────────────────────────────────
// Odometry
// ─────────────────────────────────────────────────────────────────────────────

struct ComputeOdometry {
    model: DifferentialDrive,
    clock: SharedClock,
    max_dt: Duration,
    last_time: Option<Duration>,
    old_left_pos: f64,
    old_right_pos: f64,
}

impl Behavior<RobotState> for ComputeOdometry {
    fn start(&mut self, robot: &mut RobotState) -> Result<(), RoverError> {
        self.old_left_pos = robot.left_wheel.position;
        self.old_right_pos = robot.right_wheel.position;
        self.last_time = Some(self.clock.now());
        robot.travelled_distance = 0.0;
        robot.heading_rad = 0.0;
        robot.pose = Pose::default();
        robot.movement = Command::stop();
        Ok(())
    }

    fn update(&mut self, robot: &mut RobotState) -> Result<State, RoverError> {
        let last_time = self.last_time.ok_or_else(|| RoverError::NotStarted {
            node: "ComputeOdometry".to_string(),
        })?;
        let now = self.clock.now();
        let dt = now.saturating_sub(last_time).min(self.max_dt).as_secs_f64();
        if dt <= 0.0 {
            return Ok(State::Running);
        }
        self.last_time = Some(now);

        let wheels = WheelCommand::new(
            (robot.left_wheel.position - self.old_left_pos) / dt,
            (robot.right_wheel.position - self.old_right_pos) / dt,
        );
        self.old_left_pos = robot.left_wheel.position;
        self.old_right_pos = robot.right_wheel.position;

        let movement = self.model.command(wheels);
        robot.travelled_distance += movement.velocity * dt;
        robot.heading_rad += movement.angular_velocity * dt;
        robot.pose = predict_pose(robot.pose, movement, dt);
        robot.movement = movement;
        Ok(State::Running)
    }
}

/// Never-ending node estimating body motion from wheel positions.
///
/// `start()` zeroes travelled distance, heading, pose and movement.  Each
/// update differentiates the wheel positions over the elapsed time (clamped
/// to `max_dt`) and integrates the result.  `heading_rad` is left unwrapped;
/// `pose.heading_rad` is wrapped.
pub fn compute_odometry(
    model: DifferentialDrive,
    clock: SharedClock,
    max_dt: Duration,
) -> BehaviorNode<RobotState> {
    BehaviorNode::custom(ComputeOdometry {
        model,
        clock,
        max_dt,
        last_time: None,
        old_left_pos: 0.0,
        old_right_pos: 0.0,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated drive train
// ─────────────────────────────────────────────────────────────────────────────

/// Wheel commands, both simulated motors and odometry, in that order, as one
/// `ParallelAll` that runs forever.
pub fn drive_train(model: DifferentialDrive, clock: SharedClock) -> BehaviorNode<RobotState> {
    BehaviorNode::parallel_all(vec![
        compute_wheel_commands(model),
        simulate_motor(WheelSide::Left, clock.clone(), DEFAULT_MOTOR_MAX_DT),
        simulate_motor(WheelSide::Right, clock.clone(), DEFAULT_MOTOR_MAX_DT),
        compute_odometry(model, clock, DEFAULT_ODOMETRY_MAX_DT),
    ])
}
