//! Decorator nodes.
//!
//! A decorator wraps exactly one child and transforms its result.  `start()`
//! always just starts the child.  Time-based wrappers live in
//! [`timing`][super::timing].

use rover_types::RoverError;

use super::{Behavior, BehaviorNode, State};

/// The transformation a [`Decorator`] applies to its child's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorKind {
    /// Swap `Success` and `Failure`.
    Invert,
    /// Report `Success` for either terminal result.
    Succeed,
    /// Report `Failure` for either terminal result.
    Fail,
    /// Restart the child whenever it finishes and report `Running`, forever.
    Repeat,
    /// Restart the child on `Success`; propagate `Failure`.
    RepeatUntilFail,
    /// Restart the child on `Failure`; propagate `Success`.
    RepeatUntilSuccess,
}

/// Single-child wrapper; see [`DecoratorKind`] for the available variants.
///
/// Terminal results are sticky until the next `start()`.  [`DecoratorKind::Repeat`]
/// never produces one, so it must sit under a node that can still end the
/// tree (a Selector or a `ParallelAny`, for example).
pub struct Decorator<C> {
    kind: DecoratorKind,
    child: Box<BehaviorNode<C>>,
    outcome: Option<State>,
}

impl<C> Decorator<C> {
    pub fn new(kind: DecoratorKind, child: BehaviorNode<C>) -> Self {
        Self {
            kind,
            child: Box::new(child),
            outcome: None,
        }
    }

    pub fn kind(&self) -> DecoratorKind {
        self.kind
    }
}

impl<C> Behavior<C> for Decorator<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.outcome = None;
        self.child.start(ctx)
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }

        let status = self.child.update(ctx)?;
        let result = match (self.kind, status) {
            (_, State::Running) => State::Running,
            (DecoratorKind::Invert, s) => s.invert(),
            (DecoratorKind::Succeed, _) => State::Success,
            (DecoratorKind::Fail, _) => State::Failure,
            (DecoratorKind::Repeat, _)
            | (DecoratorKind::RepeatUntilFail, State::Success)
            | (DecoratorKind::RepeatUntilSuccess, State::Failure) => {
                self.child.start(ctx)?;
                State::Running
            }
            (DecoratorKind::RepeatUntilFail, s) | (DecoratorKind::RepeatUntilSuccess, s) => s,
        };

        if result.is_terminal() {
            self.outcome = Some(result);
        }
        Ok(result)
    }
}
