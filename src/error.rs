//! Error taxonomy for the core.
//!
//! Only the two fatal kinds from spec §7 surface as `Result::Err`:
//! `InputValidation` (checked before the engine is ever invoked) and
//! `Extraction` (an internal consistency failure — a bug in the compiler
//! or solver, never a normal business outcome). `Infeasible`, `TimeLimit`,
//! and `SolverError` are not constructed here; they are represented as
//! `Schedule::status` values instead, per the propagation policy in §7.

use thiserror::Error;

/// Errors that can be raised by the core before or after a solve.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Malformed input: bad dimensions, negative bounds, `m3 > K`, etc.
    /// Reported synchronously; the solver engine is never invoked.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// The extractor rounded a variable outside tolerance, or the
    /// arithmetic validator found a constraint the solver claimed to
    /// satisfy but the extracted assignment violates. Indicates a bug in
    /// the constraint compiler or the solver binding, not a user error.
    #[error("extraction/validation invariant violated: {0}")]
    Extraction(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
