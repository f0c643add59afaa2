//! Schedule Extractor & Validator (spec §4.5) and the `Schedule` output
//! contract (spec §6.2/§6.3).
//!
//! Extraction rounds each `x[i,j,k]` to the nearest integer within
//! tolerance and builds the `Schedule` in index order, preserving empty
//! runs. The validator then independently re-checks every enabled
//! constraint arithmetically against the extracted assignment — a defense
//! against a bug in the constraint compiler or the solver binding that
//! the engine itself would never catch, since it only ever sees the rows
//! the compiler handed it.

use serde::{Deserialize, Serialize};

use crate::constraints::OBJECTIVE_SCALE;
use crate::error::{CoreError, Result};
use crate::model::ProblemModel;
use crate::solver::SolveStatus;

const ROUNDING_TOLERANCE: f64 = 1e-6;

/// One stage within a run (spec §3, `StageAssignment`).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StageAssignment {
    pub stage: u32,
    pub combination: u32,
    pub factors: Vec<f64>,
}

/// A run: an ordered, possibly-empty list of stage assignments (spec §3, `Run`).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Run {
    pub run_id: u32,
    pub stages: Vec<StageAssignment>,
}

impl Run {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// The sole output of the core (spec §3, §6.2).
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Schedule {
    pub status: SolveStatus,
    /// Valid only when `status` is `Optimal` or `Feasible`.
    pub objective: Option<f64>,
    pub runs_used: u32,
    pub stages_used: u32,
    pub runs: Vec<Run>,
    pub infeasibility_hints: Vec<String>,
}

/// The JSON shape documented in spec §6.3. `Schedule` itself is the
/// canonical in-process representation; this is its stable wire form.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScheduleDocument {
    pub status: SolveStatus,
    pub objective_value: Option<f64>,
    pub num_experiments_used: u32,
    pub num_stages_used: u32,
    pub experiments: Vec<ExperimentDocument>,
    pub infeasibility_hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExperimentDocument {
    pub experiment_id: u32,
    pub stages: Vec<StageDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StageDocument {
    pub stage: u32,
    pub combination: u32,
    pub factors: Vec<f64>,
}

impl From<&Schedule> for ScheduleDocument {
    fn from(schedule: &Schedule) -> Self {
        ScheduleDocument {
            status: schedule.status,
            objective_value: schedule.objective,
            num_experiments_used: schedule.runs_used,
            num_stages_used: schedule.stages_used,
            experiments: schedule
                .runs
                .iter()
                .map(|run| ExperimentDocument {
                    experiment_id: run.run_id,
                    stages: run
                        .stages
                        .iter()
                        .map(|s| StageDocument {
                            stage: s.stage,
                            combination: s.combination,
                            factors: s.factors.clone(),
                        })
                        .collect(),
                })
                .collect(),
            infeasibility_hints: schedule.infeasibility_hints.clone(),
        }
    }
}

/// Rounds a raw 0/1 solution value to a boolean, failing hard if it
/// deviates from an integer by more than `ROUNDING_TOLERANCE`.
fn round_bool(raw: f64) -> Result<bool> {
    let rounded = raw.round();
    if (raw - rounded).abs() > ROUNDING_TOLERANCE {
        return Err(CoreError::Extraction(format!(
            "solution value {} is not within tolerance of an integer",
            raw
        )));
    }
    Ok(rounded > 0.5)
}

/// Extracts a `Schedule` from a solved model's raw `x[i,j,k]` values and
/// independently validates every enabled constraint arithmetically.
///
/// `x_values[i-1][j-1][k-1]` must hold the engine's raw (possibly
/// non-integral-looking due to floating point) solution value for each
/// assignment variable.
pub fn extract_and_validate(
    model: &ProblemModel,
    status: SolveStatus,
    objective_raw: Option<i64>,
    hints: Vec<String>,
    x_values: &[Vec<Vec<f64>>],
) -> Result<Schedule> {
    let i_max = model.max_runs();
    let j = model.num_combinations();
    let k = model.num_stages();

    // x_rounded[i-1][k-1] = Some(j) if run i is assigned combination j at stage k.
    let mut x_rounded: Vec<Vec<Option<u32>>> = vec![vec![None; k as usize]; i_max as usize];
    for i in 0..i_max as usize {
        for kk in 0..k as usize {
            let mut assigned: Option<u32> = None;
            for jj in 0..j as usize {
                if round_bool(x_values[i][jj][kk])? {
                    if assigned.is_some() {
                        return Err(CoreError::Extraction(format!(
                            "run {} stage {} has more than one combination assigned",
                            i + 1,
                            kk + 1
                        )));
                    }
                    assigned = Some((jj + 1) as u32);
                }
            }
            x_rounded[i][kk] = assigned;
        }
    }

    let mut runs = Vec::with_capacity(i_max as usize);
    let mut runs_used = 0;
    let mut stages_used = 0;
    for i in 0..i_max as usize {
        let mut stages = Vec::new();
        for kk in 0..k as usize {
            if let Some(combo_j) = x_rounded[i][kk] {
                let combo = &model.combinations()[(combo_j - 1) as usize];
                stages.push(StageAssignment {
                    stage: (kk + 1) as u32,
                    combination: combo_j,
                    factors: combo.factors.clone(),
                });
            }
        }
        if !stages.is_empty() {
            runs_used += 1;
            stages_used += stages.len() as u32;
        }
        runs.push(Run {
            run_id: (i + 1) as u32,
            stages,
        });
    }

    let objective = objective_raw.map(|raw| raw as f64 / OBJECTIVE_SCALE as f64);

    let schedule = Schedule {
        status,
        objective,
        runs_used,
        stages_used,
        runs,
        infeasibility_hints: hints,
    };

    if matches!(status, SolveStatus::Optimal | SolveStatus::Feasible) {
        validate(model, &schedule)?;
    }

    Ok(schedule)
}

/// Independently re-checks every enabled constraint against the extracted
/// assignment, using plain arithmetic rather than the MILP rows the
/// compiler emitted. A violation here means the compiler or the engine
/// binding has a bug — it can never be a legitimate infeasibility, since
/// the engine already certified this assignment as feasible.
fn validate(model: &ProblemModel, schedule: &Schedule) -> Result<()> {
    let k = model.num_stages();
    let c = model.constraints();

    // C1: at most one combination per (run, stage) — guaranteed by extraction
    // itself (round_bool only ever assigns once per slot), so nothing to redo.

    // C2: at most one run per (combo, stage).
    if c.c2_enabled {
        for kk in 1..=k {
            let mut seen = std::collections::HashSet::new();
            for run in &schedule.runs {
                for s in &run.stages {
                    if s.stage == kk && !seen.insert(s.combination) {
                        return Err(CoreError::Extraction(format!(
                            "C2 violated: combination {} appears more than once at stage {}",
                            s.combination, kk
                        )));
                    }
                }
            }
        }
    }

    // C3: at most m3 stages per (run, combo).
    if c.c3_enabled {
        for run in &schedule.runs {
            let mut counts = std::collections::HashMap::new();
            for s in &run.stages {
                *counts.entry(s.combination).or_insert(0) += 1;
            }
            if let Some((&combo, &count)) = counts.iter().find(|(_, &count)| count > c.m3) {
                return Err(CoreError::Extraction(format!(
                    "C3 violated: run {} assigns combination {} {} times, exceeding m3={}",
                    run.run_id, combo, count, c.m3
                )));
            }
        }
    }

    // C4/C5/C6: total presence of each combination across the whole schedule.
    if c.c4_enabled || c.c5_enabled || c.c6_enabled {
        for combo in model.combinations() {
            let mut total = 0i64;
            let mut weighted = 0i64;
            for run in &schedule.runs {
                for s in &run.stages {
                    if s.combination == combo.id {
                        total += 1;
                        weighted += model.stage_weight(s.stage);
                    }
                }
            }
            if c.c4_enabled && total > c.m4 {
                return Err(CoreError::Extraction(format!(
                    "C4 violated: combination {} appears {} times, exceeding m4={}",
                    combo.id, total, c.m4
                )));
            }
            if c.c5_enabled && total < 1 {
                return Err(CoreError::Extraction(format!(
                    "C5 violated: combination {} does not appear in any run",
                    combo.id
                )));
            }
            if c.c6_enabled {
                let target = c.t6.get(combo.id);
                if weighted < target {
                    return Err(CoreError::Extraction(format!(
                        "C6 violated: combination {} has weighted presence {}, below target {}",
                        combo.id, weighted, target
                    )));
                }
            }
        }
    }

    // C7: bounded inter-stage transitions, evaluated at every stage index
    // k in [1, K-1] — not just the stage pairs actually present in the
    // sparse `run.stages` list. A missing side of the pair zero-fills, the
    // same semantics the compiler's `transition_diff_terms` uses (spec
    // §4.3/§9: "an empty slot is freely reachable").
    if c.c7_enabled {
        let k = model.num_stages();
        for run in &schedule.runs {
            for kk in 1..k {
                for p in 0..model.num_factors() {
                    let diff = stage_factor(run, kk, p) - stage_factor(run, kk + 1, p);
                    let delta_max = model.bounds().delta_max[p];
                    if diff.abs() > delta_max + ROUNDING_TOLERANCE {
                        return Err(CoreError::Extraction(format!(
                            "C7 violated: run {} stages {}->{} change factor {} by {}, exceeding delta_max={}",
                            run.run_id, kk, kk + 1, p + 1, diff, delta_max
                        )));
                    }
                }
            }
        }
    }

    // C8: at least one parameter must vary by at least delta_min across
    // some transition k in [1, K-1] in every non-empty run, with the same
    // index-based, zero-fill definition of "consecutive pair" as C7 above.
    if c.c8_enabled {
        let k = model.num_stages();
        for run in &schedule.runs {
            if run.is_empty() {
                continue;
            }
            let mut satisfied = false;
            'params: for p in 0..model.num_factors() {
                let delta_min = model.bounds().delta_min[p];
                for kk in 1..k {
                    let diff = stage_factor(run, kk + 1, p) - stage_factor(run, kk, p);
                    if diff.abs() >= delta_min - ROUNDING_TOLERANCE {
                        satisfied = true;
                        break 'params;
                    }
                }
            }
            if !satisfied {
                return Err(CoreError::Extraction(format!(
                    "C8 violated: run {} has no consecutive stage pair meeting any delta_min bound",
                    run.run_id
                )));
            }
        }
    }

    Ok(())
}

/// The factor value of `run` at `stage` for parameter `p` (0-based),
/// zero-filled if `stage` has no assignment in this run.
fn stage_factor(run: &Run, stage: u32, p: usize) -> f64 {
    run.stages
        .iter()
        .find(|s| s.stage == stage)
        .map(|s| s.factors[p])
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_bool_accepts_near_integers() {
        assert!(round_bool(0.999_999_6).unwrap());
        assert!(!round_bool(0.000_000_4).unwrap());
    }

    #[test]
    fn round_bool_rejects_out_of_tolerance() {
        assert!(round_bool(0.5).is_err());
    }

    #[test]
    fn stage_factor_zero_fills_missing_stage() {
        let run = Run {
            run_id: 1,
            stages: vec![
                StageAssignment { stage: 1, combination: 1, factors: vec![0.5] },
                StageAssignment { stage: 3, combination: 2, factors: vec![1.0] },
            ],
        };
        assert_eq!(stage_factor(&run, 1, 0), 0.5);
        assert_eq!(stage_factor(&run, 2, 0), 0.0);
        assert_eq!(stage_factor(&run, 3, 0), 1.0);
    }

    #[test]
    fn validate_accepts_run_with_gap_under_zero_fill_semantics() {
        use crate::model::{Combination, ConstraintConfig, ParameterBounds, ProblemModel};
        use crate::solver::SolveStatus;

        let combos = vec![
            Combination { id: 1, factors: vec![0.0] },
            Combination { id: 2, factors: vec![5.0] },
        ];
        let bounds = ParameterBounds { delta_max: vec![10.0], delta_min: vec![0.1] };
        let constraints = ConstraintConfig {
            c2_enabled: false,
            c4_enabled: false,
            c5_enabled: false,
            c6_enabled: false,
            c7_enabled: true,
            c8_enabled: true,
            m3: 2,
            ..ConstraintConfig::default()
        };
        let model = ProblemModel::new(combos, 3, Some(1), bounds, constraints).unwrap();

        // run 1 has stage 1 and stage 3 assigned, stage 2 empty — exactly the
        // shape a t6=2/m3=2 repetition target can produce within one run.
        let run = Run {
            run_id: 1,
            stages: vec![
                StageAssignment { stage: 1, combination: 1, factors: vec![0.0] },
                StageAssignment { stage: 3, combination: 2, factors: vec![5.0] },
            ],
        };
        let schedule = Schedule {
            status: SolveStatus::Optimal,
            objective: Some(0.0),
            runs_used: 1,
            stages_used: 2,
            runs: vec![run],
            infeasibility_hints: Vec::new(),
        };

        assert!(validate(&model, &schedule).is_ok());
    }
}
