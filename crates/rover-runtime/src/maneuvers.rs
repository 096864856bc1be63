//! Robot maneuvers composed from the behavior-tree engine.
//!
//! Every function here returns a fresh [`Node`] ticked against a
//! [`RobotState`].  Leaves read the sensor fields and write
//! [`RobotState::command`]; the drive train (real or simulated) turns that
//! command into wheel motion.
//!
//! | Maneuver | Kind | Finishes when |
//! |---|---|---|
//! | [`drive_forward`] / [`reverse`] | proportional drive | travelled distance within `accuracy` |
//! | [`turn_on_spot`] | proportional turn | heading within `accuracy` |
//! | [`wait_for_rotation`] | watcher | heading passes the target |
//! | [`drive_to_a_wall`] | sequence | a bumper is hit |
//! | [`turn_away_from_wall`] | selector | backed off and turned away from the hit side |
//! | [`feel_the_way_with_bumpers`] | repeat-until-fail | the robot has no bumpers |
//! | [`follow_line_by_wiggling`] | repeat | never |
//! | [`follow_line`] | generator | the line turns more than `max_dir_change` |

use std::time::Duration;

use rover_types::{Command, RobotState, RoverError, normalize_angle, sign};

use crate::behavior_tree::{
    Behavior, BehaviorNode, Routine, SharedClock, State, Step, TreeSteps, as_generator,
};

/// A behavior tree node driving a [`RobotState`].
pub type Node = BehaviorNode<RobotState>;

// ─────────────────────────────────────────────────────────────────────────────
// Proportional motion
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for [`drive_forward`] and [`reverse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveParams {
    /// Base speed in m/s.
    pub speed: f64,
    /// Distance error in metres at which the drive counts as done.
    pub accuracy: f64,
    /// Beyond this remaining distance the speed is scaled up in proportion.
    pub slowdown_dist: f64,
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            speed: 0.14,
            accuracy: 0.01,
            slowdown_dist: 0.1,
        }
    }
}

/// Tuning for [`turn_on_spot`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnParams {
    /// Base turn rate in rad/s.
    pub angular_vel: f64,
    pub accuracy: f64,
    pub slowdown_dist: f64,
}

impl Default for TurnParams {
    fn default() -> Self {
        Self {
            angular_vel: 0.12,
            accuracy: 0.01,
            slowdown_dist: 0.1,
        }
    }
}

/// Proportional controller output: `None` once `error` is within `accuracy`.
fn proportional(error: f64, base: f64, accuracy: f64, slowdown_dist: f64) -> Option<f64> {
    if error.abs() < accuracy {
        return None;
    }
    let gain = (error / slowdown_dist).abs().max(1.0);
    Some(base.abs() * gain * sign(error))
}

struct DriveForward {
    target_distance: f64,
    params: DriveParams,
    start_distance: Option<f64>,
}

impl Behavior<RobotState> for DriveForward {
    fn start(&mut self, robot: &mut RobotState) -> Result<(), RoverError> {
        self.start_distance = Some(robot.travelled_distance);
        Ok(())
    }

    fn update(&mut self, robot: &mut RobotState) -> Result<State, RoverError> {
        let start = self.start_distance.ok_or_else(|| RoverError::NotStarted {
            node: "DriveForward".to_string(),
        })?;
        let error = self.target_distance - (robot.travelled_distance - start);
        let p = &self.params;
        match proportional(error, p.speed, p.accuracy, p.slowdown_dist) {
            Some(speed) => {
                robot.command = Command::new(speed, 0.0);
                Ok(State::Running)
            }
            None => {
                robot.command = Command::stop();
                Ok(State::Success)
            }
        }
    }
}

/// Drive `distance` metres straight ahead (negative drives backwards), then
/// stop.
pub fn drive_forward(distance: f64, params: DriveParams) -> Node {
    Node::custom(DriveForward {
        target_distance: distance,
        params,
        start_distance: None,
    })
}

/// Drive `distance` metres backwards, then stop.
pub fn reverse(distance: f64, params: DriveParams) -> Node {
    drive_forward(-distance, params)
}

struct TurnOnSpot {
    angle_change: f64,
    params: TurnParams,
    target_angle: Option<f64>,
}

impl Behavior<RobotState> for TurnOnSpot {
    fn start(&mut self, robot: &mut RobotState) -> Result<(), RoverError> {
        self.target_angle = Some(robot.heading_rad + self.angle_change);
        Ok(())
    }

    fn update(&mut self, robot: &mut RobotState) -> Result<State, RoverError> {
        let target = self.target_angle.ok_or_else(|| RoverError::NotStarted {
            node: "TurnOnSpot".to_string(),
        })?;
        let error = normalize_angle(target - robot.heading_rad);
        let p = &self.params;
        match proportional(error, p.angular_vel, p.accuracy, p.slowdown_dist) {
            Some(angular_vel) => {
                robot.command = Command::new(0.0, angular_vel);
                Ok(State::Running)
            }
            None => {
                robot.command = Command::stop();
                Ok(State::Success)
            }
        }
    }
}

/// Turn in place by `angle` radians (positive is counter-clockwise), then
/// stop.
pub fn turn_on_spot(angle: f64, params: TurnParams) -> Node {
    Node::custom(TurnOnSpot {
        angle_change: angle,
        params,
        target_angle: None,
    })
}

struct WaitForRotation {
    angle_diff: f64,
    target_angle: f64,
}

impl Behavior<RobotState> for WaitForRotation {
    fn start(&mut self, robot: &mut RobotState) -> Result<(), RoverError> {
        self.target_angle = robot.heading_rad + self.angle_diff;
        Ok(())
    }

    fn update(&mut self, robot: &mut RobotState) -> Result<State, RoverError> {
        let passed = (self.angle_diff > 0.0 && robot.heading_rad > self.target_angle)
            || (self.angle_diff < 0.0 && robot.heading_rad < self.target_angle);
        if self.angle_diff == 0.0 || passed {
            Ok(State::Success)
        } else {
            Ok(State::Running)
        }
    }
}

/// Wait until the heading has rotated past `angle_diff` from where it was at
/// `start()`.  Does not command any motion itself.
pub fn wait_for_rotation(angle_diff: f64) -> Node {
    Node::custom(WaitForRotation {
        angle_diff,
        target_angle: 0.0,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Command and sensor leaves
// ─────────────────────────────────────────────────────────────────────────────

pub fn drive_with_velocity(speed: f64) -> Node {
    Node::task("drive_with_velocity", move |robot: &mut RobotState| {
        robot.command = Command::new(speed, 0.0);
        Ok(true)
    })
}

pub fn stop() -> Node {
    Node::task("stop", |robot: &mut RobotState| {
        robot.command = Command::stop();
        Ok(true)
    })
}

pub fn reverse_current_command() -> Node {
    Node::task("reverse_current_command", |robot: &mut RobotState| {
        robot.command = robot.command.reverse();
        Ok(true)
    })
}

pub fn wait_until_sees_line() -> Node {
    Node::task("wait_until_sees_line", |robot: &mut RobotState| {
        Ok(robot.line_sensor)
    })
}

pub fn wait_until_sees_no_line() -> Node {
    Node::task("wait_until_sees_no_line", |robot: &mut RobotState| {
        Ok(!robot.line_sensor)
    })
}

pub fn wait_for_bumper_hit() -> Node {
    Node::task("wait_for_bumper_hit", |robot: &mut RobotState| {
        Ok(robot.left_bumper_hit || robot.right_bumper_hit)
    })
}

pub fn has_front_bumper() -> Node {
    Node::condition("has_front_bumper", |robot: &RobotState| {
        robot.has_left_bumper || robot.has_right_bumper
    })
}

pub fn if_left_bumper_hit() -> Node {
    Node::condition("if_left_bumper_hit", |robot: &RobotState| {
        robot.left_bumper_hit
    })
}

pub fn if_right_bumper_hit() -> Node {
    Node::condition("if_right_bumper_hit", |robot: &RobotState| {
        robot.right_bumper_hit
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Composite maneuvers
// ─────────────────────────────────────────────────────────────────────────────

/// Widening left/right sweep used to re-acquire a lost line.
pub fn wiggle() -> Result<Node, RoverError> {
    const SWEEP_DEG: [f64; 10] = [
        5.0, -10.0, 20.0, -35.0, 45.0, -60.0, 90.0, -120.0, 170.0, -220.0,
    ];
    Node::sequence(
        SWEEP_DEG
            .iter()
            .map(|deg| turn_on_spot(deg.to_radians(), TurnParams::default()))
            .collect(),
    )
}

/// Drive forward over the line until it is lost, wiggle until it is found
/// again, and repeat forever.
pub fn follow_line_by_wiggling() -> Result<Node, RoverError> {
    Ok(Node::repeat(Node::sequence(vec![
        drive_with_velocity(0.3),
        wait_until_sees_no_line(),
        Node::parallel_any(vec![wait_until_sees_line(), wiggle()?]),
    ])?))
}

/// Drive at `speed` until a bumper is hit, then stop.  Fails straight away
/// on a robot without front bumpers.
pub fn drive_to_a_wall(speed: f64) -> Result<Node, RoverError> {
    Node::sequence(vec![
        has_front_bumper(),
        drive_with_velocity(speed),
        wait_for_bumper_hit(),
        stop(),
    ])
}

/// Back off `reverse_distance` and turn `turn_angle` away from whichever
/// bumper is pressed.  Fails when neither is.
pub fn turn_away_from_wall(reverse_distance: f64, turn_angle: f64) -> Result<Node, RoverError> {
    Node::selector(vec![
        Node::sequence(vec![
            if_left_bumper_hit(),
            reverse(reverse_distance, DriveParams::default()),
            turn_on_spot(-turn_angle, TurnParams::default()),
        ])?,
        Node::sequence(vec![
            if_right_bumper_hit(),
            reverse(reverse_distance, DriveParams::default()),
            turn_on_spot(turn_angle, TurnParams::default()),
        ])?,
    ])
}

/// Bounce from wall to wall until something in the cycle fails.
pub fn feel_the_way_with_bumpers(speed: f64) -> Result<Node, RoverError> {
    Ok(Node::repeat_until_fail(Node::sequence(vec![
        drive_to_a_wall(speed)?,
        turn_away_from_wall(0.1, 20f64.to_radians())?,
    ])?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Edge-tracking line follower
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for [`follow_line`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowLineParams {
    /// Arc curvature in 1/m; the sign flips with the line sensor.
    pub curvature: f64,
    pub speed: f64,
    /// Minimum time to track before an end of line may be declared.
    pub min_duration: Duration,
    /// Heading change since the last sensor edge that counts as losing the
    /// line, in radians.
    pub max_dir_change: f64,
}

impl Default for FollowLineParams {
    fn default() -> Self {
        Self {
            curvature: 1.9,
            speed: 0.033,
            min_duration: Duration::from_millis(1500),
            max_dir_change: 15f64.to_radians(),
        }
    }
}

enum FollowPhase {
    Setup,
    Tracking {
        previous_on_line: bool,
        line_dir: f64,
        started_at: Duration,
    },
    ReturnToLine(TreeSteps<RobotState>),
}

struct FollowLine {
    clock: SharedClock,
    params: FollowLineParams,
    phase: FollowPhase,
}

impl Routine<RobotState> for FollowLine {
    fn resume(&mut self, robot: &mut RobotState) -> Result<Step, RoverError> {
        let now = self.clock.now();
        match &mut self.phase {
            FollowPhase::Setup => {
                self.phase = FollowPhase::Tracking {
                    previous_on_line: robot.line_sensor,
                    line_dir: robot.heading_rad,
                    started_at: now,
                };
                Ok(Step::Yield(State::Running))
            }
            FollowPhase::Tracking {
                previous_on_line,
                line_dir,
                started_at,
            } => {
                let p = &self.params;
                let on_course = (*line_dir - robot.heading_rad).abs() < p.max_dir_change;
                if on_course || now.saturating_sub(*started_at) < p.min_duration {
                    let on_line = robot.line_sensor;
                    let curvature = if on_line { p.curvature } else { -p.curvature };
                    robot.command = Command::arc(p.speed, curvature);
                    if on_line != *previous_on_line {
                        *previous_on_line = on_line;
                        *line_dir = robot.heading_rad;
                    }
                    return Ok(Step::Yield(State::Running));
                }

                // Back up along the last arc until facing the line again.
                let turn_back = *line_dir - robot.heading_rad;
                let mut steps = as_generator(Node::sequence(vec![
                    reverse_current_command(),
                    wait_for_rotation(turn_back),
                    stop(),
                ])?);
                let step = steps.resume(robot)?;
                self.phase = FollowPhase::ReturnToLine(steps);
                Ok(step)
            }
            FollowPhase::ReturnToLine(steps) => steps.resume(robot),
        }
    }
}

/// Follow one edge of a line with alternating arcs.
///
/// The robot curves toward the line while the sensor sees it and away from
/// it otherwise, recording its heading whenever the reading flips.  Once at
/// least `min_duration` has passed and the heading has drifted more than
/// `max_dir_change` from the last flip, the line is considered to have ended
/// or turned: the robot reverses its current arc back to that heading, stops,
/// and the node succeeds.
pub fn follow_line(clock: SharedClock, params: FollowLineParams) -> Node {
    Node::generator("follow_line", move || FollowLine {
        clock: clock.clone(),
        params,
        phase: FollowPhase::Setup,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminators
// ─────────────────────────────────────────────────────────────────────────────

/// Succeeds on its first update.
pub fn do_nothing() -> Node {
    Node::task("do_nothing", |_: &mut RobotState| Ok(true))
}

/// Fails on its first update.
pub fn always_fail() -> Node {
    Node::guard("always_fail", |_: &RobotState| false)
}

/// Runs forever.
pub fn wait_forever() -> Node {
    Node::task("wait_forever", |_: &mut RobotState| Ok(false))
}
