//! [`TickLoop`] – fixed-rate driver for a behavior tree.
//!
//! Each tick:
//!
//! 1. **Update** the main tree once.
//! 2. **Sidecars** – update every sidecar node once, in registration order.
//!    Sidecars model things that run alongside control code and whose result
//!    does not end the run, such as a simulated drive train.
//! 3. **Pace** – sleep until the next deadline.  A tick that overruns its
//!    period is logged and the schedule is re-based on the current time.
//!
//! The run ends when the main tree reaches a terminal state, when the shared
//! shutdown flag is raised, or when the optional tick limit is hit.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use std::time::Duration;
//! use rover_runtime::behavior_tree::{BehaviorNode, MonotonicClock, State};
//! use rover_runtime::tick_loop::TickLoop;
//!
//! let mut countdown = 3u32;
//! let mut tree = BehaviorNode::task("count", |n: &mut u32| {
//!     *n -= 1;
//!     Ok(*n == 0)
//! });
//! let mut driver = TickLoop::new(Duration::from_millis(1), MonotonicClock::shared());
//! let result = driver
//!     .run(&mut tree, &mut countdown, &AtomicBool::new(false))
//!     .unwrap();
//! assert_eq!(result, State::Success);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rover_types::RoverError;
use tracing::{debug, info, warn};

use crate::behavior_tree::{Behavior, BehaviorNode, SharedClock, State};

/// Fixed-rate tree driver.  See the [module docs][self].
pub struct TickLoop<C> {
    period: Duration,
    clock: SharedClock,
    sidecars: Vec<BehaviorNode<C>>,
    max_ticks: Option<u64>,
    ticks: u64,
}

impl<C> TickLoop<C> {
    pub fn new(period: Duration, clock: SharedClock) -> Self {
        Self {
            period,
            clock,
            sidecars: Vec::new(),
            max_ticks: None,
            ticks: 0,
        }
    }

    /// Register a node that is updated after the main tree on every tick.
    pub fn with_sidecar(mut self, node: BehaviorNode<C>) -> Self {
        self.sidecars.push(node);
        self
    }

    /// Stop after `limit` ticks even if the tree is still running.
    pub fn with_max_ticks(mut self, limit: u64) -> Self {
        self.max_ticks = Some(limit);
        self
    }

    /// Number of ticks performed since the last [`TickLoop::begin`].
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Start the main tree and every sidecar.
    pub fn begin(&mut self, tree: &mut BehaviorNode<C>, ctx: &mut C) -> Result<(), RoverError> {
        self.ticks = 0;
        tree.start(ctx)?;
        for sidecar in &mut self.sidecars {
            sidecar.start(ctx)?;
        }
        Ok(())
    }

    /// Perform exactly one tick without sleeping.
    ///
    /// # Errors
    ///
    /// Propagates a logic error raised anywhere in the tree or a sidecar; the
    /// tick is abandoned at that point.
    pub fn step(&mut self, tree: &mut BehaviorNode<C>, ctx: &mut C) -> Result<State, RoverError> {
        self.ticks += 1;
        let status = tree.update(ctx)?;
        self.step_sidecars(ctx)?;
        Ok(status)
    }

    /// Update only the sidecars, e.g. to let the drive apply a final stop
    /// command after the tree is done.
    pub fn step_sidecars(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        for sidecar in &mut self.sidecars {
            sidecar.update(ctx)?;
        }
        Ok(())
    }

    /// Start `tree` and tick it at the configured period until it finishes.
    ///
    /// Returns the tree's terminal state, or `State::Running` if the run was
    /// cut short by `shutdown` or the tick limit.
    ///
    /// # Errors
    ///
    /// Returns the first logic error that aborts a tick.
    pub fn run(
        &mut self,
        tree: &mut BehaviorNode<C>,
        ctx: &mut C,
        shutdown: &AtomicBool,
    ) -> Result<State, RoverError> {
        self.begin(tree, ctx)?;
        info!(period_ms = self.period.as_millis() as u64, "tick loop started");

        let mut deadline = self.clock.now() + self.period;
        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!(ticks = self.ticks, "tick loop interrupted by shutdown");
                return Ok(State::Running);
            }
            if self.max_ticks.is_some_and(|limit| self.ticks >= limit) {
                info!(ticks = self.ticks, "tick limit reached");
                return Ok(State::Running);
            }

            let status = self.step(tree, ctx).inspect_err(|e| {
                warn!(tick = self.ticks, error = %e, "tick aborted");
            })?;
            if status.is_terminal() {
                info!(ticks = self.ticks, result = ?status, "tree finished");
                return Ok(status);
            }

            let now = self.clock.now();
            if now < deadline {
                std::thread::sleep(deadline - now);
                deadline += self.period;
            } else {
                debug!(
                    tick = self.ticks,
                    overrun_us = (now - deadline).as_micros() as u64,
                    "tick overran its period"
                );
                deadline = now + self.period;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::behavior_tree::{ManualClock, MonotonicClock};

    #[derive(Default)]
    struct Counters {
        main: u32,
        sidecar: u32,
        order: Vec<&'static str>,
    }

    fn main_task(finish_after: u32) -> BehaviorNode<Counters> {
        BehaviorNode::task("main", move |c: &mut Counters| {
            c.main += 1;
            c.order.push("main");
            Ok(c.main >= finish_after)
        })
    }

    fn sidecar() -> BehaviorNode<Counters> {
        BehaviorNode::task("sidecar", |c: &mut Counters| {
            c.sidecar += 1;
            c.order.push("sidecar");
            Ok(false)
        })
    }

    #[test]
    fn step_updates_tree_then_sidecars() {
        let clock = Rc::new(ManualClock::new());
        let mut driver = TickLoop::new(Duration::from_millis(30), clock).with_sidecar(sidecar());
        let mut tree = main_task(10);
        let mut ctx = Counters::default();
        driver.begin(&mut tree, &mut ctx).unwrap();

        assert_eq!(driver.step(&mut tree, &mut ctx).unwrap(), State::Running);
        assert_eq!(driver.step(&mut tree, &mut ctx).unwrap(), State::Running);
        assert_eq!(ctx.order, vec!["main", "sidecar", "main", "sidecar"]);
        assert_eq!(driver.ticks(), 2);

        driver.step_sidecars(&mut ctx).unwrap();
        assert_eq!((ctx.main, ctx.sidecar), (2, 3));
        assert_eq!(driver.ticks(), 2);
    }

    #[test]
    fn run_returns_terminal_state() {
        let mut driver = TickLoop::new(Duration::from_micros(100), MonotonicClock::shared())
            .with_sidecar(sidecar());
        let mut tree = main_task(3);
        let mut ctx = Counters::default();
        let result = driver
            .run(&mut tree, &mut ctx, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(result, State::Success);
        assert_eq!(ctx.main, 3);
        // The finishing tick still drives the sidecars.
        assert_eq!(ctx.sidecar, 3);
    }

    #[test]
    fn run_stops_at_tick_limit() {
        let mut driver =
            TickLoop::new(Duration::from_micros(100), MonotonicClock::shared()).with_max_ticks(5);
        let mut tree = main_task(u32::MAX);
        let mut ctx = Counters::default();
        let result = driver
            .run(&mut tree, &mut ctx, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(result, State::Running);
        assert_eq!(ctx.main, 5);
    }

    #[test]
    fn run_honours_shutdown_flag() {
        let mut driver = TickLoop::new(Duration::from_micros(100), MonotonicClock::shared());
        let mut tree = main_task(u32::MAX);
        let mut ctx = Counters::default();
        let result = driver
            .run(&mut tree, &mut ctx, &AtomicBool::new(true))
            .unwrap();
        assert_eq!(result, State::Running);
        assert_eq!(ctx.main, 0);
    }

    #[test]
    fn run_propagates_aborted_tick() {
        let mut driver = TickLoop::new(Duration::from_micros(100), MonotonicClock::shared());
        let mut tree: BehaviorNode<Counters> = BehaviorNode::Guard(
            crate::behavior_tree::Guard::fallible("link", |_: &Counters| {
                Err(RoverError::leaf("link", "peer vanished"))
            }),
        );
        let mut ctx = Counters::default();
        let err = driver
            .run(&mut tree, &mut ctx, &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, RoverError::Leaf { .. }));
        assert_eq!(driver.ticks(), 1);
    }
}
