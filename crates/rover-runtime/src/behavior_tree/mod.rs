//! Behavior Tree Engine.
//!
//! A cooperative, tick-driven executor.  An external driver calls
//! [`Behavior::start`] once and then [`Behavior::update`] once per tick; every
//! node returns without blocking, and anything that takes several ticks is
//! carried as node-local progress state or as a suspended [`Routine`].
//!
//! # Nodes
//!
//! | Node type            | Description                                                        |
//! |----------------------|--------------------------------------------------------------------|
//! | [`Sequence`]         | Runs children in order; fails on the first child failure.          |
//! | [`Selector`]         | Runs children in order; succeeds on the first child success.       |
//! | [`Parallel`]         | Updates every unfinished child each tick (`Any` / `All` policy).   |
//! | [`Decorator`]        | Invert, Succeed, Fail, Repeat, RepeatUntilFail, RepeatUntilSuccess.|
//! | [`Delay`]            | Succeeds once a duration has elapsed.                              |
//! | [`RateLimit`]        | Forwards at most one child update per interval.                    |
//! | [`Task`]             | Polls a callback; callback errors become `Failure`.                |
//! | [`Condition`]        | Maps a predicate onto `Success`/`Failure`.                         |
//! | [`Guard`]            | `Running` while a predicate holds, `Failure` once it does not.     |
//! | [`GeneratorTask`]    | Resumes a suspended [`Routine`] once per tick.                     |
//!
//! Every node is generic over a context `C`, the robot-state value leaves
//! read and write.  The tree receives `&mut C` for the duration of one tick,
//! so only one tick can ever be in flight against a given state value.
//!
//! # Errors
//!
//! `Ok(State::Failure)` is ordinary control flow.  `Err(_)` is reserved for
//! logic errors raised by conditions, guards and routines: composites
//! propagate it with `?` and the tick is aborted.
//!
//! # Example
//!
//! ```rust
//! use rover_runtime::behavior_tree::{Behavior, BehaviorNode, State};
//!
//! let mut tree = BehaviorNode::sequence(vec![
//!     BehaviorNode::condition("armed", |armed: &bool| *armed),
//!     BehaviorNode::task("go", |_: &mut bool| Ok(true)),
//! ])
//! .unwrap();
//!
//! let mut armed = true;
//! tree.start(&mut armed).unwrap();
//! assert_eq!(tree.update(&mut armed).unwrap(), State::Running);
//! assert_eq!(tree.update(&mut armed).unwrap(), State::Success);
//! ```

pub mod composite;
pub mod decorator;
pub mod generator;
pub mod leaf;
pub mod timing;

use std::time::Duration;

use rover_types::RoverError;

pub use composite::{Parallel, ParallelPolicy, Selector, Sequence};
pub use decorator::{Decorator, DecoratorKind};
pub use generator::{GeneratorTask, Routine, Step, TreeSteps, as_generator};
pub use leaf::{Condition, Guard, Task};
pub use timing::{Clock, Delay, ManualClock, MonotonicClock, RateLimit, SharedClock};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// The result of one evaluation step of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// The node has not finished yet; update it again next tick.
    Running,
    /// The node completed its task.
    Success,
    /// The node could not complete its task.
    Failure,
}

impl State {
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, State::Running)
    }

    /// `true` for `Success` and `Failure`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_running()
    }

    /// Swaps `Success` and `Failure`; `Running` is unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            State::Running => State::Running,
            State::Success => State::Failure,
            State::Failure => State::Success,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Behavior
// ─────────────────────────────────────────────────────────────────────────────

/// The capability every node implements.
///
/// # Contract
///
/// - `start` resets the node's progress and starts the children it is about
///   to run.  It is called once before the first `update` and again before
///   every reuse.  Calling `update` on a node that was never started is a
///   caller error.
/// - `update` performs one evaluation step and must not block.
/// - A node is never told when it is abandoned mid-`Running`; it simply stops
///   receiving updates.
pub trait Behavior<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError>;

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError>;
}

impl<C, B: Behavior<C> + ?Sized> Behavior<C> for Box<B> {
    #[inline]
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        (**self).start(ctx)
    }

    #[inline]
    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        (**self).update(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BehaviorNode
// ─────────────────────────────────────────────────────────────────────────────

/// A node in a behavior tree.
///
/// Build trees with the constructors below.  Each call returns a fresh,
/// independent node; children are owned by exactly one parent.
pub enum BehaviorNode<C> {
    Sequence(Sequence<C>),
    Selector(Selector<C>),
    Parallel(Parallel<C>),
    Decorator(Decorator<C>),
    Delay(Delay),
    RateLimit(RateLimit<C>),
    Task(Task<C>),
    Condition(Condition<C>),
    Guard(Guard<C>),
    Generator(GeneratorTask<C>),
    /// Hand-written node, e.g. a robot maneuver with its own progress state.
    Custom(Box<dyn Behavior<C>>),
}

impl<C> BehaviorNode<C> {
    /// Construct a [`Sequence`].
    ///
    /// # Errors
    ///
    /// [`RoverError::EmptyComposite`] when `children` is empty.
    pub fn sequence(children: Vec<BehaviorNode<C>>) -> Result<Self, RoverError> {
        Sequence::new(children).map(BehaviorNode::Sequence)
    }

    /// Construct a [`Selector`].
    ///
    /// # Errors
    ///
    /// [`RoverError::EmptyComposite`] when `children` is empty.
    pub fn selector(children: Vec<BehaviorNode<C>>) -> Result<Self, RoverError> {
        Selector::new(children).map(BehaviorNode::Selector)
    }

    pub fn parallel_any(children: Vec<BehaviorNode<C>>) -> Self {
        BehaviorNode::Parallel(Parallel::new(ParallelPolicy::Any, children))
    }

    pub fn parallel_all(children: Vec<BehaviorNode<C>>) -> Self {
        BehaviorNode::Parallel(Parallel::new(ParallelPolicy::All, children))
    }

    pub fn invert(child: BehaviorNode<C>) -> Self {
        Self::decorate(DecoratorKind::Invert, child)
    }

    pub fn succeed(child: BehaviorNode<C>) -> Self {
        Self::decorate(DecoratorKind::Succeed, child)
    }

    pub fn fail(child: BehaviorNode<C>) -> Self {
        Self::decorate(DecoratorKind::Fail, child)
    }

    /// Restart `child` forever.  Never terminal.
    pub fn repeat(child: BehaviorNode<C>) -> Self {
        Self::decorate(DecoratorKind::Repeat, child)
    }

    pub fn repeat_until_fail(child: BehaviorNode<C>) -> Self {
        Self::decorate(DecoratorKind::RepeatUntilFail, child)
    }

    pub fn repeat_until_success(child: BehaviorNode<C>) -> Self {
        Self::decorate(DecoratorKind::RepeatUntilSuccess, child)
    }

    fn decorate(kind: DecoratorKind, child: BehaviorNode<C>) -> Self {
        BehaviorNode::Decorator(Decorator::new(kind, child))
    }

    pub fn delay(clock: SharedClock, duration: Duration) -> Self {
        BehaviorNode::Delay(Delay::new(clock, duration))
    }

    /// Construct a [`RateLimit`].
    ///
    /// # Errors
    ///
    /// [`RoverError::InvalidParameter`] when `interval` is zero.
    pub fn rate_limit(
        clock: SharedClock,
        interval: Duration,
        child: BehaviorNode<C>,
    ) -> Result<Self, RoverError> {
        RateLimit::new(clock, interval, child).map(BehaviorNode::RateLimit)
    }

    /// Construct a [`Task`] from a fallible poll callback.
    pub fn task(
        name: impl Into<String>,
        action: impl FnMut(&mut C) -> Result<bool, RoverError> + 'static,
    ) -> Self {
        BehaviorNode::Task(Task::new(name, action))
    }

    /// Construct a [`Condition`] from an infallible predicate.
    pub fn condition(name: impl Into<String>, predicate: impl Fn(&C) -> bool + 'static) -> Self {
        BehaviorNode::Condition(Condition::new(name, predicate))
    }

    /// Construct a [`Guard`] from an infallible predicate.
    pub fn guard(name: impl Into<String>, predicate: impl Fn(&C) -> bool + 'static) -> Self {
        BehaviorNode::Guard(Guard::new(name, predicate))
    }

    /// Construct a [`GeneratorTask`]; `factory` builds a fresh routine on
    /// every `start()`.
    pub fn generator<R>(name: impl Into<String>, factory: impl FnMut() -> R + 'static) -> Self
    where
        R: Routine<C> + 'static,
    {
        BehaviorNode::Generator(GeneratorTask::new(name, factory))
    }

    pub fn custom(behavior: impl Behavior<C> + 'static) -> Self {
        BehaviorNode::Custom(Box::new(behavior))
    }

    /// Return the name of this node, if it is a named leaf.
    pub fn name(&self) -> Option<&str> {
        match self {
            BehaviorNode::Task(t) => Some(t.name()),
            BehaviorNode::Condition(c) => Some(c.name()),
            BehaviorNode::Guard(g) => Some(g.name()),
            BehaviorNode::Generator(g) => Some(g.name()),
            _ => None,
        }
    }
}

impl<C> Behavior<C> for BehaviorNode<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        match self {
            BehaviorNode::Sequence(n) => n.start(ctx),
            BehaviorNode::Selector(n) => n.start(ctx),
            BehaviorNode::Parallel(n) => n.start(ctx),
            BehaviorNode::Decorator(n) => n.start(ctx),
            BehaviorNode::Delay(n) => n.start(ctx),
            BehaviorNode::RateLimit(n) => n.start(ctx),
            BehaviorNode::Task(n) => n.start(ctx),
            BehaviorNode::Condition(n) => n.start(ctx),
            BehaviorNode::Guard(n) => n.start(ctx),
            BehaviorNode::Generator(n) => n.start(ctx),
            BehaviorNode::Custom(n) => n.start(ctx),
        }
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        match self {
            BehaviorNode::Sequence(n) => n.update(ctx),
            BehaviorNode::Selector(n) => n.update(ctx),
            BehaviorNode::Parallel(n) => n.update(ctx),
            BehaviorNode::Decorator(n) => n.update(ctx),
            BehaviorNode::Delay(n) => n.update(ctx),
            BehaviorNode::RateLimit(n) => n.update(ctx),
            BehaviorNode::Task(n) => n.update(ctx),
            BehaviorNode::Condition(n) => n.update(ctx),
            BehaviorNode::Guard(n) => n.update(ctx),
            BehaviorNode::Generator(n) => n.update(ctx),
            BehaviorNode::Custom(n) => n.update(ctx),
        }
    }
}
