//! Generator tasks: algorithms that keep ordinary local state across ticks.
//!
//! A [`Routine`] is an owned, suspended computation.  Each call to
//! [`Routine::resume`] runs it up to its next suspension point and reports a
//! [`Step`].  [`GeneratorTask`] adapts a routine to the [`Behavior`]
//! contract: `start()` builds a fresh routine and primes it once, every
//! `update()` resumes it once.
//!
//! [`as_generator`] goes the other way and turns any tree into a step
//! sequence, so a routine can hand control to a sub-tree for its final phase.

use rover_types::RoverError;

use super::{Behavior, BehaviorNode, State};

/// What a routine produced on one resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Suspended; the state is the node's result for this tick.
    Yield(State),
    /// The computation ran to completion, which means `Success`.
    Complete,
}

/// An owned suspended computation, resumed once per tick.
///
/// Closures `FnMut(&mut C) -> Result<Step, RoverError>` are routines, which
/// is usually enough: captured `move` variables play the role of the
/// routine's locals.
pub trait Routine<C> {
    fn resume(&mut self, ctx: &mut C) -> Result<Step, RoverError>;
}

impl<C, F> Routine<C> for F
where
    F: FnMut(&mut C) -> Result<Step, RoverError>,
{
    fn resume(&mut self, ctx: &mut C) -> Result<Step, RoverError> {
        self(ctx)
    }
}

type RoutineFactory<C> = Box<dyn FnMut() -> Box<dyn Routine<C>>>;

// ─────────────────────────────────────────────────────────────────────────────
// GeneratorTask
// ─────────────────────────────────────────────────────────────────────────────

/// Drives a [`Routine`] as a behavior.
///
/// - `start()` builds a new routine from the factory and resumes it once,
///   discarding what it yields (this runs its setup code).
/// - `update()` resumes it once more.  `Yield(Running)` keeps the task
///   running; `Yield(Success)`, `Yield(Failure)` and `Complete` end it.
/// - The final result is sticky until the next `start()`.
///
/// Routine errors propagate out of `start()` / `update()` and abort the tick.
pub struct GeneratorTask<C> {
    name: String,
    factory: RoutineFactory<C>,
    routine: Option<Box<dyn Routine<C>>>,
    outcome: Option<State>,
}

impl<C> GeneratorTask<C> {
    pub fn new<R>(name: impl Into<String>, mut factory: impl FnMut() -> R + 'static) -> Self
    where
        R: Routine<C> + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(move || Box::new(factory()) as Box<dyn Routine<C>>),
            routine: None,
            outcome: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn finish(&mut self, state: State) -> State {
        self.routine = None;
        self.outcome = Some(state);
        state
    }
}

impl<C> Behavior<C> for GeneratorTask<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.outcome = None;
        let mut routine = (self.factory)();
        match routine.resume(ctx)? {
            Step::Yield(_) => self.routine = Some(routine),
            Step::Complete => {
                self.finish(State::Success);
            }
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }
        let routine = self.routine.as_mut().ok_or_else(|| RoverError::NotStarted {
            node: self.name.clone(),
        })?;
        Ok(match routine.resume(ctx)? {
            Step::Yield(State::Running) => State::Running,
            Step::Yield(terminal) => self.finish(terminal),
            Step::Complete => self.finish(State::Success),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree → step sequence
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Running,
    Done,
}

/// A behavior tree consumed one step at a time; see [`as_generator`].
pub struct TreeSteps<C> {
    tree: BehaviorNode<C>,
    phase: Phase,
}

/// Turn `tree` into a lazy, finite sequence of states.
///
/// The first step starts the tree and produces `Running`; each later step
/// updates it and produces the result.  The sequence ends after the first
/// non-`Running` result and cannot be restarted.
///
/// ```rust
/// use rover_runtime::behavior_tree::{BehaviorNode, State, as_generator};
///
/// let mut steps = as_generator(BehaviorNode::task("once", |_: &mut ()| Ok(true)));
/// assert_eq!(steps.next(&mut ()).unwrap(), Some(State::Running));
/// assert_eq!(steps.next(&mut ()).unwrap(), Some(State::Success));
/// assert_eq!(steps.next(&mut ()).unwrap(), None);
/// ```
pub fn as_generator<C>(tree: BehaviorNode<C>) -> TreeSteps<C> {
    TreeSteps {
        tree,
        phase: Phase::Fresh,
    }
}

impl<C> TreeSteps<C> {
    /// Produce the next state, or `None` once the tree has finished.
    pub fn next(&mut self, ctx: &mut C) -> Result<Option<State>, RoverError> {
        match self.phase {
            Phase::Fresh => {
                self.tree.start(ctx)?;
                self.phase = Phase::Running;
                Ok(Some(State::Running))
            }
            Phase::Running => {
                let status = self.tree.update(ctx)?;
                if status.is_terminal() {
                    self.phase = Phase::Done;
                }
                Ok(Some(status))
            }
            Phase::Done => Ok(None),
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }
}

impl<C> Routine<C> for TreeSteps<C> {
    fn resume(&mut self, ctx: &mut C) -> Result<Step, RoverError> {
        Ok(match self.next(ctx)? {
            Some(state) => Step::Yield(state),
            None => Step::Complete,
        })
    }
}
