//! Solver Driver (spec §4.4): invokes the `cp_sat` engine against a
//! compiled model, maps its status into the crate's normalized outcome
//! set, and produces static infeasibility hints.
//!
//! Parameter choices follow `examples/bc-ross-ross/src/model/two_stage_schedule.rs`:
//! a deterministic seed and fixed-search branching so identical input always
//! drives the engine down the same search path (spec §5, P9), plus an
//! explicit time budget instead of letting the engine run unbounded.

use cp_sat::builder::CpModelBuilder;
use cp_sat::proto::{CpSolverResponse, CpSolverStatus, SatParameters};
use log::{debug, info, warn};

use crate::model::ProblemModel;

/// Normalized solve outcome (spec §4.4 / §6.3). `Schedule::status` carries
/// one of these; only `InputValidation`/`Extraction` failures raise
/// `CoreError` (see `error.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    TimeLimit,
    Error,
}

impl SolveStatus {
    /// The engine reports `Feasible` itself whenever the search holds an
    /// incumbent when the budget runs out — `Unknown` is CP-SAT's "budget
    /// exhausted with no incumbent at all" status, so it maps directly to
    /// `TimeLimit` with no need to re-inspect the response for a solution
    /// that, by construction, can't be there.
    fn from_engine(status: CpSolverStatus) -> Self {
        match status {
            CpSolverStatus::Optimal => SolveStatus::Optimal,
            CpSolverStatus::Feasible => SolveStatus::Feasible,
            CpSolverStatus::Infeasible => SolveStatus::Infeasible,
            CpSolverStatus::Unknown => SolveStatus::TimeLimit,
            _ => SolveStatus::Error,
        }
    }
}

/// Engine invocation options exposed to callers (spec §6.1, §5: "the driver
/// ... exposes only a `time_limit` (seconds) and an `msg` verbosity flag").
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub time_limit_seconds: f64,
    pub num_workers: i32,
    /// Fixed so repeated solves of the same input take the same search
    /// path (spec §5, P9). Not meant to be tuned by callers.
    pub random_seed: i32,
    /// The `msg` flag of spec §6.1: when set, the engine logs its search
    /// progress (`params.log_search_progress`) instead of staying silent.
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            time_limit_seconds: 60.0,
            num_workers: 1,
            random_seed: 42,
            verbose: false,
        }
    }
}

pub struct SolveOutcome {
    pub status: SolveStatus,
    pub response: CpSolverResponse,
    pub hints: Vec<String>,
}

/// Runs the engine over a fully-compiled builder and classifies the result.
pub fn solve(mut builder: CpModelBuilder, model: &ProblemModel, opts: &SolverOptions) -> SolveOutcome {
    let mut params = SatParameters::default();
    params.max_time_in_seconds = Some(opts.time_limit_seconds);
    params.num_search_workers = Some(opts.num_workers);
    params.search_branching = Some(2); // FIXED_SEARCH: deterministic traversal order
    params.randomize_search = Some(false);
    params.random_seed = Some(opts.random_seed);
    params.log_search_progress = Some(opts.verbose);

    debug!(
        "invoking engine: time_limit={}s workers={} verbose={}",
        opts.time_limit_seconds, opts.num_workers, opts.verbose
    );
    let response = builder.solve_with_parameters(&params);
    let status = response.status();
    let normalized = SolveStatus::from_engine(status);

    let hints = match normalized {
        SolveStatus::Infeasible => {
            info!("engine reported infeasible; generating static hints");
            static_infeasibility_hints(model)
        }
        SolveStatus::TimeLimit => {
            vec!["Budget exhausted; increase time_limit or relax C2/C6/C7/C8".to_string()]
        }
        SolveStatus::Error => {
            warn!("engine returned unexpected status: {:?}", status);
            vec![format!("solver engine returned unexpected status: {:?}", status)]
        }
        SolveStatus::Optimal | SolveStatus::Feasible => Vec::new(),
    };

    SolveOutcome {
        status: normalized,
        response,
        hints,
    }
}

/// Cheap, purely structural checks that flag a likely cause of
/// infeasibility without re-running the solver (spec §4.4). These never
/// claim certainty — they are hints, not a proof.
pub fn static_infeasibility_hints(model: &ProblemModel) -> Vec<String> {
    let mut hints = Vec::new();
    let j = model.num_combinations();
    let k = model.num_stages();
    let i_max = model.max_runs();
    let c = model.constraints();

    if c.c5_enabled && j > i_max * k {
        hints.push(format!(
            "C5 requires every one of {} combinations to appear at least once, but only {} \
             run-stage slots exist ({} runs x {} stages) — increase max_runs or relax C5",
            j, i_max * k, i_max, k
        ));
    }

    if c.c2_enabled && j > i_max {
        hints.push(format!(
            "C2 forbids a combination repeating within a stage; with {} combinations and only \
             {} runs, some stage cannot place every combination simultaneously",
            j, i_max
        ));
    }

    if c.c6_enabled {
        let max_weighted_total: i64 = (1..=k).map(|kk| model.stage_weight(kk)).sum();
        if let crate::model::RepetitionTarget::Uniform(t) = &c.t6 {
            if *t > max_weighted_total * i_max as i64 {
                hints.push(format!(
                    "C6 target {} exceeds the maximum weighted presence {} achievable across all \
                     runs and stages — lower t6 or raise max_runs",
                    t, max_weighted_total * i_max as i64
                ));
            }
        }
    }

    if c.c4_enabled && c.m4 == 1 && (c.c5_enabled || c.c6_enabled) {
        hints.push(
            "m4=1 allows each combination to appear only once in total, which is compatible \
             with C5/C6 only if every repetition target is also 1"
                .to_string(),
        );
    }

    if c.c7_enabled {
        for (p, name) in model.parameters().iter().map(|param| &param.name).enumerate() {
            let range = model
                .parameters()
                .get(p)
                .map(|param| {
                    let max = param.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let min = param.values.iter().cloned().fold(f64::INFINITY, f64::min);
                    max - min
                })
                .unwrap_or(0.0);
            if model.bounds().delta_max[p] < range / (k as f64 - 1.0).max(1.0) {
                hints.push(format!(
                    "C7 bound delta_max for parameter {} ({}) may be too tight to span its \
                     full range ({}) across {} stage transitions",
                    name, model.bounds().delta_max[p], range, k.saturating_sub(1)
                ));
            }
        }
    }

    if c.c8_enabled {
        for (p, name) in model.parameters().iter().map(|param| &param.name).enumerate() {
            let range = model
                .parameters()
                .get(p)
                .map(|param| {
                    let max = param.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let min = param.values.iter().cloned().fold(f64::INFINITY, f64::min);
                    max - min
                })
                .unwrap_or(0.0);
            if model.bounds().delta_min[p] > range {
                hints.push(format!(
                    "C8 minimum variation for parameter {} ({}) exceeds the parameter's full \
                     observed range ({}) — no pair of combinations can ever satisfy it",
                    name, model.bounds().delta_min[p], range
                ));
            }
        }
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_engine_maps_unknown_to_time_limit() {
        assert_eq!(SolveStatus::from_engine(CpSolverStatus::Unknown), SolveStatus::TimeLimit);
    }

    #[test]
    fn from_engine_maps_the_obvious_statuses() {
        assert_eq!(SolveStatus::from_engine(CpSolverStatus::Optimal), SolveStatus::Optimal);
        assert_eq!(SolveStatus::from_engine(CpSolverStatus::Feasible), SolveStatus::Feasible);
        assert_eq!(SolveStatus::from_engine(CpSolverStatus::Infeasible), SolveStatus::Infeasible);
    }

    #[test]
    fn default_options_are_quiet() {
        assert!(!SolverOptions::default().verbose);
    }

    fn model(j: u32, k: u32, i_max: u32) -> ProblemModel {
        use crate::model::{Combination, ConstraintConfig, ParameterBounds};
        let combos: Vec<Combination> = (1..=j)
            .map(|id| Combination { id, factors: vec![id as f64] })
            .collect();
        let bounds = ParameterBounds { delta_max: vec![1.0], delta_min: vec![0.1] };
        ProblemModel::new(combos, k, Some(i_max), bounds, ConstraintConfig::default()).unwrap()
    }

    #[test]
    fn static_hints_flag_c5_starved_slots() {
        let m = model(10, 2, 3);
        let hints = static_infeasibility_hints(&m);
        assert!(hints.iter().any(|h| h.contains("C5")));
    }

    #[test]
    fn static_hints_flag_c2_too_few_runs() {
        let m = model(5, 2, 3);
        let hints = static_infeasibility_hints(&m);
        assert!(hints.iter().any(|h| h.contains("C2")));
    }

    #[test]
    fn static_hints_empty_for_comfortably_sized_problem() {
        let m = model(2, 3, 12);
        let hints = static_infeasibility_hints(&m);
        assert!(hints.is_empty(), "unexpected hints: {:?}", hints);
    }
}
