//! Mission trees selectable from the command line.

use rover_runtime::TickLoop;
use rover_runtime::behavior_tree::SharedClock;
use rover_runtime::maneuvers::{
    self, DriveParams, FollowLineParams, Node, TurnParams, drive_forward, turn_on_spot,
};
use rover_types::{Command, RobotState, RoverError};
use tracing::warn;

use crate::config::{Config, Mission};

/// Build the behavior tree for `cfg.mission`.
pub fn build(cfg: &Config, clock: SharedClock) -> Result<Node, RoverError> {
    match cfg.mission {
        Mission::Square => square(cfg),
        Mission::Wiggle => maneuvers::wiggle(),
        Mission::Bumpers => maneuvers::feel_the_way_with_bumpers(cfg.drive_speed),
        Mission::Line => Ok(maneuvers::follow_line(clock, FollowLineParams::default())),
    }
}

/// Robot state a mission starts from.
pub fn initial_state(mission: Mission) -> RobotState {
    match mission {
        Mission::Bumpers => RobotState::with_bumpers(),
        _ => RobotState::new(),
    }
}

/// Command a stop and push it through the drive train once.
///
/// Runs however the mission ended, including an aborted tick, so the wheels
/// are left with a zero set-point.
pub fn bring_to_rest(driver: &mut TickLoop<RobotState>, robot: &mut RobotState) {
    robot.command = Command::stop();
    if let Err(e) = driver.step_sidecars(robot) {
        warn!(error = %e, "drive train did not settle after stop");
    }
}

fn square(cfg: &Config) -> Result<Node, RoverError> {
    let drive = DriveParams {
        speed: cfg.drive_speed,
        ..DriveParams::default()
    };
    let mut legs = Vec::with_capacity(9);
    for _ in 0..4 {
        legs.push(drive_forward(cfg.side_length, drive));
        legs.push(turn_on_spot(90f64.to_radians(), TurnParams::default()));
    }
    legs.push(maneuvers::stop());
    Node::sequence(legs)
}
