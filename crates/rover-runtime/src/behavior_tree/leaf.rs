//! Callback-backed leaves.
//!
//! | Leaf          | Callback result                | Node result                         | Callback errors |
//! |---------------|--------------------------------|-------------------------------------|-----------------|
//! | [`Task`]      | `Ok(true)` / `Ok(false)`       | `Success` / `Running`               | become `Failure` |
//! | [`Condition`] | `Some(true)` / `Some(false)` / `None` | `Success` / `Failure` / `Running` | propagate |
//! | [`Guard`]     | `true` / `false`               | `Running` / `Failure`               | propagate |
//!
//! None of these leaves keep progress state: `start()` is a no-op and every
//! `update()` calls the callback again.

use rover_types::RoverError;
use tracing::debug;

use super::{Behavior, State};

type TaskFn<C> = Box<dyn FnMut(&mut C) -> Result<bool, RoverError>>;
type ConditionFn<C> = Box<dyn Fn(&C) -> Result<Option<bool>, RoverError>>;
type GuardFn<C> = Box<dyn Fn(&C) -> Result<bool, RoverError>>;

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

/// Polls an action callback once per update.
///
/// Use for single-shot, idempotent polls such as "write the motion command"
/// or "has the bumper been hit yet".  An `Err` from the callback is recovered
/// here and reported as `Failure`; it never aborts the tick.
pub struct Task<C> {
    name: String,
    action: TaskFn<C>,
}

impl<C> Task<C> {
    pub fn new(
        name: impl Into<String>,
        action: impl FnMut(&mut C) -> Result<bool, RoverError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C> Behavior<C> for Task<C> {
    fn start(&mut self, _ctx: &mut C) -> Result<(), RoverError> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        match (self.action)(ctx) {
            Ok(true) => Ok(State::Success),
            Ok(false) => Ok(State::Running),
            Err(e) => {
                debug!(task = %self.name, error = %e, "task callback returned an error");
                Ok(State::Failure)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Condition
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a predicate on the context onto `Success` / `Failure`.
///
/// Predicates are expected to be pure.  Unlike [`Task`], an `Err` from a
/// fallible predicate is a logic error: it propagates out of `update()` and
/// aborts the tick.
pub struct Condition<C> {
    name: String,
    predicate: ConditionFn<C>,
}

impl<C> Condition<C> {
    pub fn new(name: impl Into<String>, predicate: impl Fn(&C) -> bool + 'static) -> Self {
        Self::fallible(name, move |ctx| Ok(Some(predicate(ctx))))
    }

    /// Full form: `None` reports `Running`, `Err` aborts the tick.
    pub fn fallible(
        name: impl Into<String>,
        predicate: impl Fn(&C) -> Result<Option<bool>, RoverError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C> Behavior<C> for Condition<C> {
    fn start(&mut self, _ctx: &mut C) -> Result<(), RoverError> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        Ok(match (self.predicate)(ctx)? {
            Some(true) => State::Success,
            Some(false) => State::Failure,
            None => State::Running,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Guard
// ─────────────────────────────────────────────────────────────────────────────

/// Reports `Running` while a precondition holds and `Failure` the moment it
/// stops holding.  Never succeeds.
///
/// Place it next to the guarded branches inside a `ParallelAll` so the whole
/// group is vetoed on the same tick the precondition breaks.
pub struct Guard<C> {
    name: String,
    predicate: GuardFn<C>,
}

impl<C> Guard<C> {
    pub fn new(name: impl Into<String>, predicate: impl Fn(&C) -> bool + 'static) -> Self {
        Self::fallible(name, move |ctx| Ok(predicate(ctx)))
    }

    pub fn fallible(
        name: impl Into<String>,
        predicate: impl Fn(&C) -> Result<bool, RoverError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C> Behavior<C> for Guard<C> {
    fn start(&mut self, _ctx: &mut C) -> Result<(), RoverError> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        if (self.predicate)(ctx)? {
            Ok(State::Running)
        } else {
            Ok(State::Failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::BehaviorNode;
    use super::super::testing::*;
    use super::*;

    struct Sensors {
        clear: bool,
        reading: Option<u8>,
        polls: u32,
    }

    fn sensors() -> Sensors {
        Sensors {
            clear: true,
            reading: None,
            polls: 0,
        }
    }

    #[test]
    fn task_maps_callback_results() {
        let mut ctx = sensors();
        let mut done = Task::new("done", |_: &mut Sensors| Ok(true));
        let mut pending = Task::new("pending", |s: &mut Sensors| {
            s.polls += 1;
            Ok(false)
        });
        let mut broken = Task::new("broken", |_: &mut Sensors| {
            Err(RoverError::leaf("broken", "motor controller offline"))
        });

        assert_eq!(done.update(&mut ctx).unwrap(), State::Success);
        assert_eq!(pending.update(&mut ctx).unwrap(), State::Running);
        assert_eq!(broken.update(&mut ctx).unwrap(), State::Failure);
        assert_eq!(ctx.polls, 1);
    }

    #[test]
    fn task_calls_callback_on_every_update() {
        let calls = counter();
        let seen = calls.clone();
        let mut task = Task::new("poll", move |_: &mut Sensors| {
            *seen.borrow_mut() += 1;
            Ok(true)
        });
        let mut ctx = sensors();
        task.start(&mut ctx).unwrap();
        task.update(&mut ctx).unwrap();
        task.update(&mut ctx).unwrap();
        assert_eq!(*calls.borrow(), 2);
        assert_eq!(task.name(), "poll");
    }

    #[test]
    fn condition_maps_predicate() {
        let mut ctx = sensors();
        let mut is_clear = Condition::new("is_clear", |s: &Sensors| s.clear);
        assert_eq!(is_clear.update(&mut ctx).unwrap(), State::Success);
        ctx.clear = false;
        assert_eq!(is_clear.update(&mut ctx).unwrap(), State::Failure);
    }

    #[test]
    fn fallible_condition_reports_running_while_undecided() {
        let mut ctx = sensors();
        let mut cond = Condition::fallible("reading_high", |s: &Sensors| {
            Ok(s.reading.map(|r| r > 100))
        });
        assert_eq!(cond.update(&mut ctx).unwrap(), State::Running);
        ctx.reading = Some(120);
        assert_eq!(cond.update(&mut ctx).unwrap(), State::Success);
        ctx.reading = Some(5);
        assert_eq!(cond.update(&mut ctx).unwrap(), State::Failure);
    }

    #[test]
    fn condition_error_propagates() {
        let mut ctx = sensors();
        let mut cond = Condition::fallible("calibrated", |_: &Sensors| {
            Err(RoverError::leaf("calibrated", "no calibration table"))
        });
        let err = cond.update(&mut ctx).unwrap_err();
        assert!(matches!(err, RoverError::Leaf { .. }));
    }

    #[test]
    fn condition_error_aborts_enclosing_composite() {
        let mut tree = BehaviorNode::sequence(vec![
            BehaviorNode::task("ok", |_: &mut Sensors| Ok(true)),
            BehaviorNode::Condition(Condition::fallible("broken", |_: &Sensors| {
                Err(RoverError::leaf("broken", "bad input"))
            })),
        ])
        .unwrap();
        let mut ctx = sensors();
        tree.start(&mut ctx).unwrap();
        assert_eq!(tree.update(&mut ctx).unwrap(), State::Running);
        assert!(tree.update(&mut ctx).is_err());
    }

    #[test]
    fn guard_never_succeeds() {
        let mut ctx = sensors();
        let mut guard = Guard::new("clear", |s: &Sensors| s.clear);
        assert_eq!(guard.update(&mut ctx).unwrap(), State::Running);
        assert_eq!(guard.update(&mut ctx).unwrap(), State::Running);
        ctx.clear = false;
        assert_eq!(guard.update(&mut ctx).unwrap(), State::Failure);
    }

    #[test]
    fn guard_error_propagates() {
        let mut ctx = sensors();
        let mut guard = Guard::fallible("link_alive", |_: &Sensors| {
            Err(RoverError::leaf("link_alive", "socket closed"))
        });
        assert!(guard.update(&mut ctx).is_err());
    }

    #[test]
    fn guard_vetoes_parallel_group() {
        let mut tree = BehaviorNode::parallel_all(vec![
            BehaviorNode::guard("clear", |s: &Sensors| s.clear),
            BehaviorNode::task("drive", |s: &mut Sensors| {
                s.polls += 1;
                Ok(false)
            }),
        ]);
        let mut ctx = sensors();
        tree.start(&mut ctx).unwrap();
        assert_eq!(tree.update(&mut ctx).unwrap(), State::Running);
        ctx.clear = false;
        assert_eq!(tree.update(&mut ctx).unwrap(), State::Failure);
        // The guard sits first, so the task is not polled on the veto tick.
        assert_eq!(ctx.polls, 1);
    }
}
