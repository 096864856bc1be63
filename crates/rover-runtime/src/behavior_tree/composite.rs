//! Composite nodes.
//!
//! [`Sequence`] and [`Selector`] run one child at a time, starting each
//! child lazily when its predecessor finishes.  [`Parallel`] starts every
//! child up front and updates all unfinished children on each tick, in child
//! order.  All three report a terminal result stickily: once terminal, further
//! updates return the same result without touching any child until the next
//! `start()`.

use rover_types::RoverError;

use super::{Behavior, BehaviorNode, State};

// ─────────────────────────────────────────────────────────────────────────────
// Sequential cursor
// ─────────────────────────────────────────────────────────────────────────────

/// Shared progress state of [`Sequence`] and [`Selector`].
///
/// `advance_on` is the child result that moves the cursor to the next child;
/// the opposite terminal result ends the whole composite.
struct Cursor<C> {
    children: Vec<BehaviorNode<C>>,
    current: usize,
    advance_on: State,
    outcome: Option<State>,
}

impl<C> Cursor<C> {
    fn new(
        kind: &str,
        children: Vec<BehaviorNode<C>>,
        advance_on: State,
    ) -> Result<Self, RoverError> {
        if children.is_empty() {
            return Err(RoverError::EmptyComposite {
                kind: kind.to_string(),
            });
        }
        Ok(Self {
            children,
            current: 0,
            advance_on,
            outcome: None,
        })
    }

    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.current = 0;
        self.outcome = None;
        self.children[0].start(ctx)
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }

        let status = self.children[self.current].update(ctx)?;
        if status == self.advance_on {
            self.current += 1;
            if self.current == self.children.len() {
                self.outcome = Some(status);
                return Ok(status);
            }
            // The next child gets its first update on the following tick.
            self.children[self.current].start(ctx)?;
            Ok(State::Running)
        } else if status.is_terminal() {
            self.outcome = Some(status);
            Ok(status)
        } else {
            Ok(State::Running)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sequence
// ─────────────────────────────────────────────────────────────────────────────

/// Runs children in order until one fails.
///
/// # Semantics
///
/// - A child `Success` moves on to the next child, which is started then and
///   first updated on the following tick.
/// - A child `Failure` ends the sequence with `Failure`; later children are
///   never started.
/// - After the last child succeeds the sequence reports `Success`.
///
/// This is a short-circuited logical AND spread over ticks.
pub struct Sequence<C> {
    cursor: Cursor<C>,
}

impl<C> Sequence<C> {
    /// # Errors
    ///
    /// [`RoverError::EmptyComposite`] when `children` is empty.
    pub fn new(children: Vec<BehaviorNode<C>>) -> Result<Self, RoverError> {
        Cursor::new("Sequence", children, State::Success).map(|cursor| Self { cursor })
    }

    /// Index of the child currently being run.
    pub fn current(&self) -> usize {
        self.cursor.current
    }
}

impl<C> Behavior<C> for Sequence<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.cursor.start(ctx)
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        self.cursor.update(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selector
// ─────────────────────────────────────────────────────────────────────────────

/// Runs children in order until one succeeds.
///
/// Mirror image of [`Sequence`]: a child `Failure` moves on, the first child
/// `Success` ends the selector with `Success`, and `Failure` is reported once
/// every child has failed.
pub struct Selector<C> {
    cursor: Cursor<C>,
}

impl<C> Selector<C> {
    /// # Errors
    ///
    /// [`RoverError::EmptyComposite`] when `children` is empty.
    pub fn new(children: Vec<BehaviorNode<C>>) -> Result<Self, RoverError> {
        Cursor::new("Selector", children, State::Failure).map(|cursor| Self { cursor })
    }

    /// Index of the child currently being run.
    pub fn current(&self) -> usize {
        self.cursor.current
    }
}

impl<C> Behavior<C> for Selector<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.cursor.start(ctx)
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        self.cursor.update(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parallel
// ─────────────────────────────────────────────────────────────────────────────

/// How a [`Parallel`] node combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// OR: the first child `Success` ends the node; `Failure` once every
    /// child has failed.
    Any,
    /// AND: the first child `Failure` ends the node; `Success` once every
    /// child has succeeded.
    All,
}

impl ParallelPolicy {
    /// The child result that ends the whole node immediately.
    fn decisive(self) -> State {
        match self {
            ParallelPolicy::Any => State::Success,
            ParallelPolicy::All => State::Failure,
        }
    }
}

/// Updates every unfinished child once per tick, in child order.
///
/// A child that reaches the non-decisive terminal result is marked completed
/// and receives no further updates; the decisive result short-circuits the
/// scan so later children are not updated that tick.  The completion marks
/// live in this node, indexed by child position, and are cleared only by
/// `start()`.
pub struct Parallel<C> {
    policy: ParallelPolicy,
    children: Vec<BehaviorNode<C>>,
    completed: Vec<bool>,
    outcome: Option<State>,
}

impl<C> Parallel<C> {
    pub fn new(policy: ParallelPolicy, children: Vec<BehaviorNode<C>>) -> Self {
        let completed = vec![false; children.len()];
        Self {
            policy,
            children,
            completed,
            outcome: None,
        }
    }

    pub fn policy(&self) -> ParallelPolicy {
        self.policy
    }

    /// Append a child.  Only valid before `start()`.
    pub fn push(&mut self, child: BehaviorNode<C>) {
        self.children.push(child);
        self.completed.push(false);
    }
}

impl<C> Behavior<C> for Parallel<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.outcome = None;
        self.completed.iter_mut().for_each(|done| *done = false);
        for child in &mut self.children {
            child.start(ctx)?;
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }

        let decisive = self.policy.decisive();
        let mut evaluated = false;
        for (child, done) in self.children.iter_mut().zip(self.completed.iter_mut()) {
            if *done {
                continue;
            }
            evaluated = true;
            match child.update(ctx)? {
                State::Running => {}
                status if status == decisive => {
                    self.outcome = Some(status);
                    return Ok(status);
                }
                _ => *done = true,
            }
        }

        if evaluated {
            Ok(State::Running)
        } else {
            let settled = decisive.invert();
            self.outcome = Some(settled);
            Ok(settled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    fn run_to_end(tree: &mut BehaviorNode<Trace>, trace: &mut Trace, max_ticks: usize) -> State {
        tree.start(trace).unwrap();
        for _ in 0..max_ticks {
            let status = tree.update(trace).unwrap();
            if status.is_terminal() {
                return status;
            }
        }
        State::Running
    }

    #[test]
    fn empty_sequence_is_a_configuration_error() {
        let err = BehaviorNode::<Trace>::sequence(vec![]).err().unwrap();
        assert_eq!(
            err,
            RoverError::EmptyComposite {
                kind: "Sequence".to_string()
            }
        );
    }

    #[test]
    fn empty_selector_is_a_configuration_error() {
        assert!(BehaviorNode::<Trace>::selector(vec![]).is_err());
    }

    #[test]
    fn sequence_succeeds_when_all_children_succeed() {
        let mut tree = BehaviorNode::sequence(vec![
            always("a", State::Success),
            always("b", State::Success),
            always("c", State::Success),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Success);
        assert_eq!(
            trace.events,
            vec![
                "start:a", "update:a", "start:b", "update:b", "start:c", "update:c"
            ]
        );
    }

    #[test]
    fn sequence_starts_children_lazily() {
        let mut tree = BehaviorNode::sequence(vec![
            scripted("a", &[State::Running, State::Success]),
            always("b", State::Success),
        ])
        .unwrap();
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();
        assert_eq!(trace.count("start:b"), 0);

        assert_eq!(tree.update(&mut trace).unwrap(), State::Running);
        assert_eq!(trace.count("start:b"), 0);

        // `a` succeeds: `b` is started but not updated this tick.
        assert_eq!(tree.update(&mut trace).unwrap(), State::Running);
        assert_eq!(trace.count("start:b"), 1);
        assert_eq!(trace.count("update:b"), 0);

        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
    }

    #[test]
    fn sequence_fails_on_first_failure_and_never_starts_later_children() {
        let mut tree = BehaviorNode::sequence(vec![
            always("a", State::Success),
            always("b", State::Failure),
            always("c", State::Success),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Failure);
        assert_eq!(trace.count("start:c"), 0);
        assert_eq!(trace.count("update:c"), 0);
    }

    #[test]
    fn terminal_sequence_is_sticky_and_side_effect_free() {
        let mut tree = BehaviorNode::sequence(vec![
            always("a", State::Success),
            always("b", State::Failure),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Failure);

        let before = trace.events.len();
        assert_eq!(tree.update(&mut trace).unwrap(), State::Failure);
        assert_eq!(tree.update(&mut trace).unwrap(), State::Failure);
        assert_eq!(trace.events.len(), before);
    }

    #[test]
    fn sequence_restart_resets_progress() {
        let mut tree = BehaviorNode::sequence(vec![
            always("a", State::Success),
            always("b", State::Success),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Success);
        trace.events.clear();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Success);
        assert_eq!(trace.count("update:a"), 1);
        assert_eq!(trace.count("update:b"), 1);
    }

    #[test]
    fn sequence_propagates_running() {
        let mut tree = BehaviorNode::sequence(vec![
            always("a", State::Success),
            always("b", State::Running),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 5), State::Running);
    }

    #[test]
    fn selector_succeeds_on_first_success() {
        let mut tree = BehaviorNode::selector(vec![
            always("a", State::Failure),
            always("b", State::Success),
            always("c", State::Failure),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Success);
        assert_eq!(trace.count("start:c"), 0);
    }

    #[test]
    fn selector_fails_when_all_children_fail() {
        let mut tree = BehaviorNode::selector(vec![
            always("a", State::Failure),
            always("b", State::Failure),
        ])
        .unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Failure);
        assert_eq!(trace.count("update:a"), 1);
        assert_eq!(trace.count("update:b"), 1);
    }

    #[test]
    fn terminal_selector_is_sticky_and_side_effect_free() {
        let mut tree = BehaviorNode::selector(vec![always("a", State::Success)]).unwrap();
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Success);
        let before = trace.events.len();
        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
        assert_eq!(trace.events.len(), before);
    }

    #[test]
    fn parallel_all_short_circuits_on_failure() {
        let mut tree = BehaviorNode::parallel_all(vec![
            always("a", State::Running),
            always("b", State::Failure),
            always("c", State::Success),
        ]);
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();
        assert_eq!(trace.count("start:c"), 1);

        assert_eq!(tree.update(&mut trace).unwrap(), State::Failure);
        assert_eq!(trace.count("update:a"), 1);
        assert_eq!(trace.count("update:c"), 0);
    }

    #[test]
    fn parallel_any_short_circuits_on_success() {
        let mut tree = BehaviorNode::parallel_any(vec![
            always("a", State::Failure),
            always("b", State::Success),
            always("c", State::Running),
        ]);
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();
        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
        assert_eq!(trace.count("update:c"), 0);
    }

    #[test]
    fn parallel_all_stops_updating_completed_children() {
        let mut tree = BehaviorNode::parallel_all(vec![
            always("a", State::Success),
            scripted("b", &[State::Running, State::Running, State::Success]),
        ]);
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();

        assert_eq!(tree.update(&mut trace).unwrap(), State::Running);
        assert_eq!(tree.update(&mut trace).unwrap(), State::Running);
        assert_eq!(trace.count("update:a"), 1);

        // `b` succeeds on the third tick: every child has completed, but the
        // tick still evaluated a child so the node reports Running once more.
        assert_eq!(tree.update(&mut trace).unwrap(), State::Running);
        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
        assert_eq!(trace.count("update:a"), 1);
        assert_eq!(trace.count("update:b"), 3);
    }

    #[test]
    fn parallel_any_fails_once_every_child_has_failed() {
        let mut tree = BehaviorNode::parallel_any(vec![
            always("a", State::Failure),
            scripted("b", &[State::Running, State::Failure]),
        ]);
        let mut trace = Trace::default();
        assert_eq!(run_to_end(&mut tree, &mut trace, 10), State::Failure);
        assert_eq!(trace.count("update:a"), 1);
        assert_eq!(trace.count("update:b"), 2);
    }

    #[test]
    fn parallel_terminal_result_is_sticky() {
        let mut tree = BehaviorNode::parallel_any(vec![always("a", State::Success)]);
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();
        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
        assert_eq!(tree.update(&mut trace).unwrap(), State::Success);
        assert_eq!(trace.count("update:a"), 1);
    }

    #[test]
    fn parallel_start_clears_completion_marks() {
        let mut tree = BehaviorNode::parallel_all(vec![
            always("a", State::Success),
            always("b", State::Running),
        ]);
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();
        tree.update(&mut trace).unwrap();
        tree.update(&mut trace).unwrap();
        assert_eq!(trace.count("update:a"), 1);

        tree.start(&mut trace).unwrap();
        tree.update(&mut trace).unwrap();
        assert_eq!(trace.count("update:a"), 2);
    }

    #[test]
    fn parallel_updates_children_in_list_order() {
        let mut tree = BehaviorNode::parallel_all(vec![
            always("a", State::Running),
            always("b", State::Running),
            always("c", State::Running),
        ]);
        let mut trace = Trace::default();
        tree.start(&mut trace).unwrap();
        trace.events.clear();
        tree.update(&mut trace).unwrap();
        assert_eq!(trace.events, vec!["update:a", "update:b", "update:c"]);
    }

    #[test]
    fn empty_parallel_settles_on_first_update() {
        let mut any = BehaviorNode::<Trace>::parallel_any(vec![]);
        let mut all = BehaviorNode::<Trace>::parallel_all(vec![]);
        let mut trace = Trace::default();
        any.start(&mut trace).unwrap();
        all.start(&mut trace).unwrap();
        assert_eq!(any.update(&mut trace).unwrap(), State::Failure);
        assert_eq!(all.update(&mut trace).unwrap(), State::Success);
    }

    #[test]
    fn parallel_push_adds_a_child_before_start() {
        let mut par = Parallel::new(ParallelPolicy::All, vec![always("a", State::Success)]);
        par.push(always("b", State::Success));
        assert_eq!(par.policy(), ParallelPolicy::All);

        let mut trace = Trace::default();
        par.start(&mut trace).unwrap();
        assert_eq!(par.update(&mut trace).unwrap(), State::Running);
        assert_eq!(par.update(&mut trace).unwrap(), State::Success);
        assert_eq!(trace.count("start:b"), 1);
    }

    #[test]
    fn composite_current_tracks_progress() {
        let mut seq = Sequence::new(vec![
            always("a", State::Success),
            always("b", State::Running),
        ])
        .unwrap();
        let mut trace = Trace::default();
        seq.start(&mut trace).unwrap();
        assert_eq!(seq.current(), 0);
        seq.update(&mut trace).unwrap();
        assert_eq!(seq.current(), 1);

        let mut sel = Selector::new(vec![
            always("a", State::Failure),
            always("b", State::Running),
        ])
        .unwrap();
        sel.start(&mut trace).unwrap();
        sel.update(&mut trace).unwrap();
        assert_eq!(sel.current(), 1);
    }
}
