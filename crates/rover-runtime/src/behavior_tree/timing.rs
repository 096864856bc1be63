//! Time-gated nodes and the injectable clock they read.
//!
//! [`Delay`] and [`RateLimit`] never read the system clock directly.  They
//! hold a [`SharedClock`], so production code passes a [`MonotonicClock`]
//! and tests pass a [`ManualClock`] they advance by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rover_types::RoverError;

use super::{Behavior, BehaviorNode, State};

// ─────────────────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────────────────

/// Monotonic time source.
///
/// `now` returns the time elapsed since an arbitrary fixed epoch and must
/// never go backwards.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Clock handle shared by every node in a tree.
pub type SharedClock = Rc<dyn Clock>;

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn shared() -> SharedClock {
        Rc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Hand-driven clock for tests and simulations.  Starts at zero.
///
/// ```rust
/// use std::rc::Rc;
/// use std::time::Duration;
/// use rover_runtime::behavior_tree::{Clock, ManualClock};
///
/// let clock = Rc::new(ManualClock::new());
/// clock.advance(Duration::from_millis(30));
/// assert_eq!(clock.now(), Duration::from_millis(30));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delay
// ─────────────────────────────────────────────────────────────────────────────

/// Reports `Running` until `duration` has elapsed since `start()`, then
/// `Success`.
pub struct Delay {
    clock: SharedClock,
    duration: Duration,
    started_at: Option<Duration>,
}

impl Delay {
    pub fn new(clock: SharedClock, duration: Duration) -> Self {
        Self {
            clock,
            duration,
            started_at: None,
        }
    }
}

impl<C> Behavior<C> for Delay {
    fn start(&mut self, _ctx: &mut C) -> Result<(), RoverError> {
        self.started_at = Some(self.clock.now());
        Ok(())
    }

    fn update(&mut self, _ctx: &mut C) -> Result<State, RoverError> {
        let started_at = self.started_at.ok_or_else(|| RoverError::NotStarted {
            node: "Delay".to_string(),
        })?;
        if self.clock.now().saturating_sub(started_at) >= self.duration {
            Ok(State::Success)
        } else {
            Ok(State::Running)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RateLimit
// ─────────────────────────────────────────────────────────────────────────────

/// Forwards at most one `update()` to its child per `interval`.
///
/// `start()` starts the child and stamps the time.  Each `update()` returns
/// `Running` without touching the child until `interval` has elapsed since
/// the last stamp; then it re-stamps and returns whatever the child returns.
/// The child's tick rate is therefore bounded independently of the outer
/// driver's rate.
pub struct RateLimit<C> {
    clock: SharedClock,
    interval: Duration,
    child: Box<BehaviorNode<C>>,
    last_run: Option<Duration>,
}

impl<C> RateLimit<C> {
    /// # Errors
    ///
    /// [`RoverError::InvalidParameter`] when `interval` is zero.
    pub fn new(
        clock: SharedClock,
        interval: Duration,
        child: BehaviorNode<C>,
    ) -> Result<Self, RoverError> {
        if interval.is_zero() {
            return Err(RoverError::InvalidParameter {
                node: "RateLimit".to_string(),
                details: "interval must be positive".to_string(),
            });
        }
        Ok(Self {
            clock,
            interval,
            child: Box::new(child),
            last_run: None,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<C> Behavior<C> for RateLimit<C> {
    fn start(&mut self, ctx: &mut C) -> Result<(), RoverError> {
        self.last_run = Some(self.clock.now());
        self.child.start(ctx)
    }

    fn update(&mut self, ctx: &mut C) -> Result<State, RoverError> {
        let last_run = self.last_run.ok_or_else(|| RoverError::NotStarted {
            node: "RateLimit".to_string(),
        })?;
        let now = self.clock.now();
        if now.saturating_sub(last_run) < self.interval {
            return Ok(State::Running);
        }
        self.last_run = Some(now);
        self.child.update(ctx)
    }
}
