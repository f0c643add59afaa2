//! Top-level `Solve` entry point (spec §6.1): wires the five core
//! components together for one session — `ProblemModel` → `VariableRegistry`
//! → `ConstraintCompiler` → solver driver → extractor/validator — and
//! returns the caller-owned `Schedule`.

use log::info;

use crate::constraints::ConstraintCompiler;
use crate::error::Result;
use crate::model::{ConstraintConfig, ParameterBounds};
use crate::model::{Combination, ProblemModel};
use crate::registry::VariableRegistry;
use crate::schedule::{extract_and_validate, Schedule};
use crate::solver::{solve as run_engine, SolveStatus, SolverOptions};

/// Runs one solve session to completion (spec §6.1's `Solve`). Malformed
/// input is rejected synchronously via `CoreError::InputValidation` before
/// the engine is ever invoked; everything else — infeasibility, time
/// limits, engine errors — is folded into the returned `Schedule`.
pub fn solve(
    combinations: Vec<Combination>,
    num_stages: u32,
    max_runs: Option<u32>,
    bounds: ParameterBounds,
    constraints: ConstraintConfig,
    time_limit_s: f64,
    verbose: bool,
) -> Result<Schedule> {
    let model = ProblemModel::new(combinations, num_stages, max_runs, bounds, constraints)?;
    info!(
        "solving: J={} K={} I_max={}",
        model.num_combinations(),
        model.num_stages(),
        model.max_runs()
    );

    let mut registry = VariableRegistry::new(&model);
    {
        let mut compiler = ConstraintCompiler::new(&model, &mut registry);
        compiler.compile();
    }

    let opts = SolverOptions {
        time_limit_seconds: time_limit_s,
        verbose,
        ..SolverOptions::default()
    };
    let i_max = registry.i_max();
    let j = registry.j();
    let k = registry.k();

    // Snapshot the x[i,j,k] variable handles before the registry (and its
    // builder) are consumed by the engine invocation.
    let x_handles: Vec<Vec<Vec<cp_sat::builder::BoolVar>>> = (1..=i_max)
        .map(|i| {
            (1..=j)
                .map(|jj| (1..=k).map(|kk| registry.x(i, jj, kk).clone()).collect())
                .collect()
        })
        .collect();

    let builder = registry.into_builder();
    let outcome = run_engine(builder, &model, &opts);

    let objective_raw = if matches!(outcome.status, SolveStatus::Optimal | SolveStatus::Feasible) {
        Some(outcome.response.objective_value.round() as i64)
    } else {
        None
    };

    let x_values: Vec<Vec<Vec<f64>>> = x_handles
        .iter()
        .map(|run| {
            run.iter()
                .map(|combo| {
                    combo
                        .iter()
                        .map(|var| {
                            if var.solution_value(&outcome.response) {
                                1.0
                            } else {
                                0.0
                            }
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    if matches!(outcome.status, SolveStatus::Optimal | SolveStatus::Feasible) {
        extract_and_validate(&model, outcome.status, objective_raw, outcome.hints, &x_values)
    } else {
        let mut hints = outcome.hints;
        if model.constraints().diagnose_infeasibility
            && matches!(outcome.status, SolveStatus::Infeasible | SolveStatus::TimeLimit)
        {
            hints.extend(diagnose_by_toggling(&model, &opts));
        }
        // No meaningful assignment to extract; report status/hints directly.
        Ok(Schedule {
            status: outcome.status,
            objective: None,
            runs_used: 0,
            stages_used: 0,
            runs: (1..=i_max)
                .map(|i| crate::schedule::Run { run_id: i, stages: Vec::new() })
                .collect(),
            infeasibility_hints: hints,
        })
    }
}

/// Re-solves once per disableable constraint (C2-C8) with that constraint
/// turned off, to localize which single relaxation restores feasibility
/// (SPEC_FULL.md §4, supplemented from `bc-ross-ross`'s diagnostic
/// constraint-toggling loop in `two_stage_schedule.rs`). Opt-in via
/// `ConstraintConfig::diagnose_infeasibility`; never changes the returned
/// `Schedule`'s own status or assignments.
fn diagnose_by_toggling(model: &ProblemModel, opts: &SolverOptions) -> Vec<String> {
    let base = model.constraints().clone();
    let variants: Vec<(&str, ConstraintConfig)> = vec![
        ("C2", ConstraintConfig { c2_enabled: false, ..base.clone() }),
        ("C3", ConstraintConfig { c3_enabled: false, ..base.clone() }),
        ("C4", ConstraintConfig { c4_enabled: false, ..base.clone() }),
        ("C5", ConstraintConfig { c5_enabled: false, ..base.clone() }),
        ("C6", ConstraintConfig { c6_enabled: false, ..base.clone() }),
        ("C7", ConstraintConfig { c7_enabled: false, ..base.clone() }),
        ("C8", ConstraintConfig { c8_enabled: false, ..base.clone() }),
    ];

    let mut hints = Vec::new();
    for (name, mut variant) in variants {
        variant.diagnose_infeasibility = false;
        let candidate = ProblemModel::new(
            model.combinations().to_vec(),
            model.num_stages(),
            Some(model.max_runs()),
            model.bounds().clone(),
            variant,
        );
        let Ok(candidate) = candidate else { continue };

        let mut registry = VariableRegistry::new(&candidate);
        {
            let mut compiler = ConstraintCompiler::new(&candidate, &mut registry);
            compiler.compile();
        }
        let builder = registry.into_builder();
        let result = run_engine(builder, &candidate, opts);
        if matches!(result.status, SolveStatus::Optimal | SolveStatus::Feasible) {
            hints.push(format!(
                "disabling {} alone would restore feasibility within the time budget",
                name
            ));
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_end_to_end_trivial_single_combination() {
        let combos = vec![Combination { id: 1, factors: vec![0.1, 10.0] }];
        let constraints = ConstraintConfig {
            c3_enabled: false,
            c4_enabled: false,
            c6_enabled: false,
            c7_enabled: false,
            c8_enabled: false,
            ..ConstraintConfig::default()
        };
        let bounds = ParameterBounds { delta_max: vec![1.0, 10.0], delta_min: vec![0.1, 1.0] };
        let schedule = solve(combos, 3, None, bounds, constraints, 10.0, false).unwrap();

        assert_eq!(schedule.status, SolveStatus::Optimal);
        assert_eq!(schedule.runs_used, 1);
        assert_eq!(schedule.stages_used, 1);
    }

    #[test]
    fn solve_propagates_input_validation_before_invoking_the_engine() {
        let result = solve(
            vec![],
            3,
            None,
            ParameterBounds { delta_max: vec![], delta_min: vec![] },
            ConstraintConfig::default(),
            10.0,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn diagnose_by_toggling_names_the_relaxing_constraint() {
        let combos = vec![
            Combination { id: 1, factors: vec![0.135, 31.0] },
            Combination { id: 2, factors: vec![0.136, 31.1] },
            Combination { id: 3, factors: vec![0.137, 31.2] },
        ];
        let bounds = ParameterBounds { delta_max: vec![0.03, 2.0], delta_min: vec![0.01, 1.0] };
        let model = ProblemModel::new(combos, 3, None, bounds, ConstraintConfig::default()).unwrap();
        let opts = SolverOptions { time_limit_seconds: 10.0, ..SolverOptions::default() };

        let hints = diagnose_by_toggling(&model, &opts);
        assert!(
            hints.iter().any(|h| h.contains("disabling C8")),
            "expected a hint naming C8 as the relaxing constraint, got {:?}",
            hints
        );
    }
}
