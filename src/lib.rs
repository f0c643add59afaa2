//! Constraint compiler and MILP solver driver for intensified Design of
//! Experiments (iDoE) bioreactor schedules.
//!
//! The public surface is intentionally small: build a [`model::Combination`]
//! list, a [`model::ParameterBounds`], and a [`model::ConstraintConfig`],
//! then call [`solve::solve`]. Everything else — variable allocation,
//! constraint emission, the engine invocation, extraction and validation —
//! is an internal pipeline with no feedback loop: one call produces one
//! [`schedule::Schedule`].
//!
//! The core never writes to standard output or installs a logger; it only
//! emits `log` records. Callers wire their own subscriber (`env_logger`,
//! `tracing-log`, or anything else compatible with the `log` facade).

pub mod constraints;
pub mod error;
pub mod model;
pub mod registry;
pub mod scaling;
pub mod schedule;
mod solve;
pub mod solver;

pub use error::{CoreError, Result};
pub use model::{
    center_point_targets, Combination, ConstraintConfig, Parameter, ParameterBounds, ProblemModel,
    RepetitionTarget,
};
pub use schedule::{ExperimentDocument, Run, Schedule, ScheduleDocument, StageAssignment, StageDocument};
pub use solve::solve as Solve;
pub use solver::SolveStatus;
