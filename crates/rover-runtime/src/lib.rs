//! `rover-runtime` – behavior-tree engine and tick driver for a mobile robot.
//!
//! # Modules
//!
//! - [`behavior_tree`] – the node algebra: [`State`], the
//!   [`Behavior`] contract and [`BehaviorNode`] with its composites,
//!   decorators, timed nodes, callback leaves and generator tasks.  Nodes are
//!   generic over the context they are ticked against, so the engine itself
//!   knows nothing about robots.
//! - [`maneuvers`] – robot behaviors built from the engine and ticked against
//!   [`RobotState`][rover_types::RobotState]: proportional drive and turn,
//!   bumper and line-sensor leaves, wall feeling and line following.
//! - [`tick_loop`] – [`TickLoop`]: fixed-rate driver that ticks a tree
//!   and its sidecars until the tree finishes or shutdown is requested.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber, with optional OTLP span export.
//!
//! # Concurrency
//!
//! The engine is single-threaded and cooperative.  A tick borrows the context
//! mutably for its whole duration, so only one tick can be in flight against
//! a given robot state.

pub mod behavior_tree;
pub mod maneuvers;
pub mod telemetry;
pub mod tick_loop;

pub use behavior_tree::{Behavior, BehaviorNode, State};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use tick_loop::TickLoop;
