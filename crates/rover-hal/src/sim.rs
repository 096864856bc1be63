//! Simulated wheel motors for running the stack without hardware.
//!
//! A simulated motor reaches its set-point instantly; position is integrated
//! with the trapezoidal rule so a speed change mid-step counts half.

use std::time::Duration;

use rover_runtime::behavior_tree::{Behavior, BehaviorNode, SharedClock, State};
use rover_types::{RobotState, RoverError, WheelSide};

/// Longest step a simulated motor integrates over.  Longer gaps (a paused
/// process, a debugger) are clamped to this.
pub const DEFAULT_MOTOR_MAX_DT: Duration = Duration::from_millis(200);

struct SimulateMotor {
    side: WheelSide,
    clock: SharedClock,
    max_dt: Duration,
    last_time: Option<Duration>,
}

impl Behavior<RobotState> for SimulateMotor {
    fn start(&mut self, robot: &mut RobotState) -> Result<(), RoverError> {
        let motor = robot.wheel_mut(self.side);
        motor.angular_vel = 0.0;
        motor.position = 0.0;
        self.last_time = Some(self.clock.now());
        Ok(())
    }

    fn update(&mut self, robot: &mut RobotState) -> Result<State, RoverError> {
        let last_time = self.last_time.ok_or_else(|| RoverError::NotStarted {
            node: "SimulateMotor".to_string(),
        })?;
        let now = self.clock.now();
        let dt = now.saturating_sub(last_time).min(self.max_dt).as_secs_f64();
        self.last_time = Some(now);

        let motor = robot.wheel_mut(self.side);
        if !motor.angular_vel_sp.is_finite() {
            return Err(RoverError::HardwareFault {
                component: format!("{:?} wheel", self.side).to_lowercase(),
                details: format!("set-point {} is not finite", motor.angular_vel_sp),
            });
        }
        motor.position += motor.angular_vel * 0.5 * dt;
        motor.angular_vel = motor.angular_vel_sp;
        motor.position += motor.angular_vel * 0.5 * dt;
        Ok(State::Running)
    }
}

/// Never-ending node that moves one simulated wheel toward its set-point.
///
/// `start()` zeroes the wheel's speed and position.
pub fn simulate_motor(
    side: WheelSide,
    clock: SharedClock,
    max_dt: Duration,
) -> BehaviorNode<RobotState> {
    BehaviorNode::custom(SimulateMotor {
        side,
        clock,
        max_dt,
        last_time: None,
    })
}
