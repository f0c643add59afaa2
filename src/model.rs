//! The immutable problem input: combinations, stage/run bounds, and the
//! per-constraint configuration (spec §3, §4.1).
//!
//! `ProblemModel` performs *static* validation only — dimensional
//! consistency and non-negativity of bounds. It never detects logical
//! infeasibility; that is the solver's job (spec §4.4).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// One DoE design point: a stable 1-based id and its `P` factor settings.
///
/// Duplicate factor vectors are allowed — two combinations with identical
/// settings are still distinct by id (spec §3, P11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Combination {
    /// 1-based id, stable across a solve.
    pub id: u32,
    /// The `P` factor settings for this combination.
    pub factors: Vec<f64>,
}

/// A factor dimension, derived from the combinations matrix for downstream
/// rendering. The core itself only needs `values.len()` (bounds checking);
/// `name`/`units` are carried through unmodified for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Parameter {
    /// Human-readable name, e.g. `"growth_rate"`. Defaults to `p{index}` if
    /// the caller does not supply one.
    pub name: String,
    /// Units, e.g. `"1/h"`. May be empty.
    pub units: String,
    /// Sorted, de-duplicated values this parameter takes across all
    /// combinations.
    pub values: Vec<f64>,
}

/// The minimum weighted repetition target for C6, per spec §4.3.
///
/// The legacy "center point" convention (combinations 1–3 get `1`, the
/// rest get `2`) is implicit positional behavior in the original
/// implementation, not a declared default; see [`crate::center_point_targets`]
/// for callers who want to reconstruct it explicitly (spec §9, Open
/// Question 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionTarget {
    /// The same target for every combination.
    Uniform(i64),
    /// A target per combination id. Combinations with no entry fall back
    /// to `1`.
    PerCombination(HashMap<u32, i64>),
}

impl RepetitionTarget {
    pub fn get(&self, combo_id: u32) -> i64 {
        match self {
            RepetitionTarget::Uniform(t) => *t,
            RepetitionTarget::PerCombination(map) => map.get(&combo_id).copied().unwrap_or(1),
        }
    }
}

impl Default for RepetitionTarget {
    fn default() -> Self {
        RepetitionTarget::Uniform(1)
    }
}

/// Per-constraint enable flags and tunables (spec §3, §4.3).
///
/// C1 (one combination per stage) is not listed here: it is always active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConstraintConfig {
    /// C2: a combination may occupy a given stage-index in at most one run.
    #[serde(default = "default_true")]
    pub c2_enabled: bool,
    /// C3: bounded repetition of a combination within a single run.
    #[serde(default = "default_true")]
    pub c3_enabled: bool,
    /// Max repeats of one combination within a single run (default `2`).
    #[serde(default = "default_m3")]
    pub m3: i64,
    /// C4: global repetition cap across all runs.
    #[serde(default = "default_true")]
    pub c4_enabled: bool,
    /// Max total repeats of one combination across all runs (default `2`).
    #[serde(default = "default_m4")]
    pub m4: i64,
    /// C5: every combination must be covered at least once.
    #[serde(default = "default_true")]
    pub c5_enabled: bool,
    /// C6: weighted stage-distribution target.
    #[serde(default = "default_true")]
    pub c6_enabled: bool,
    /// Weighted repetition target per spec §4.3.
    #[serde(default)]
    pub t6: RepetitionTarget,
    /// Per-stage weights for C6, `1`-indexed by stage. Defaults to `1` for
    /// every stage.
    #[serde(default)]
    pub stage_weights: Option<Vec<i64>>,
    /// C7: bounded inter-stage transitions, always evaluated per parameter.
    #[serde(default = "default_true")]
    pub c7_enabled: bool,
    /// C8: minimum variation per run (the disjunctive-OR Big-M constraint).
    #[serde(default = "default_true")]
    pub c8_enabled: bool,
    /// Use the legacy `K == 3`-specific Big-M/Big-L encoding for C8
    /// instead of the normalized, arbitrary-`K` formulation. Kept only for
    /// bit-for-bit parity tests against the original implementation
    /// (spec §9, Open Question 4).
    #[serde(default)]
    pub use_legacy_c8: bool,
    /// When a solve is `Infeasible` or `TimeLimit`, additionally resolve
    /// once per disableable constraint with that constraint turned off,
    /// to localize which single relaxation restores feasibility. Costs
    /// extra solves; never changes the returned `Schedule`.
    #[serde(default)]
    pub diagnose_infeasibility: bool,
}

fn default_true() -> bool {
    true
}
fn default_m3() -> i64 {
    2
}
fn default_m4() -> i64 {
    2
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        ConstraintConfig {
            c2_enabled: true,
            c3_enabled: true,
            m3: default_m3(),
            c4_enabled: true,
            m4: default_m4(),
            c5_enabled: true,
            c6_enabled: true,
            t6: RepetitionTarget::default(),
            stage_weights: None,
            c7_enabled: true,
            c8_enabled: true,
            use_legacy_c8: false,
            diagnose_infeasibility: false,
        }
    }
}

/// Per-parameter transition bounds (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ParameterBounds {
    /// Maximum allowed magnitude of change between consecutive stages (C7).
    pub delta_max: Vec<f64>,
    /// Minimum required magnitude of change for C8 to be satisfiable by a
    /// given parameter.
    pub delta_min: Vec<f64>,
}

/// The immutable problem input (spec §4.1).
#[derive(Debug, Clone)]
pub struct ProblemModel {
    combinations: Vec<Combination>,
    parameters: Vec<Parameter>,
    num_stages: u32,
    max_runs: u32,
    bounds: ParameterBounds,
    constraints: ConstraintConfig,
}

impl ProblemModel {
    /// Build and statically validate a `ProblemModel`. `max_runs` of `None`
    /// defaults to `J * K` so the model can never be starved of slots
    /// (spec §4.1).
    pub fn new(
        combinations: Vec<Combination>,
        num_stages: u32,
        max_runs: Option<u32>,
        bounds: ParameterBounds,
        constraints: ConstraintConfig,
    ) -> Result<Self> {
        if combinations.is_empty() {
            return Err(CoreError::InputValidation(
                "combinations must be non-empty (J >= 1)".into(),
            ));
        }
        let p = combinations[0].factors.len();
        if p == 0 {
            return Err(CoreError::InputValidation(
                "each combination must have at least one factor (P >= 1)".into(),
            ));
        }
        for c in &combinations {
            if c.factors.len() != p {
                return Err(CoreError::InputValidation(format!(
                    "combination {} has {} factors, expected {}",
                    c.id,
                    c.factors.len(),
                    p
                )));
            }
        }
        if num_stages < 2 {
            return Err(CoreError::InputValidation(format!(
                "num_stages must be >= 2, got {}",
                num_stages
            )));
        }
        let j = combinations.len() as u32;
        let max_runs = max_runs.unwrap_or(j * num_stages);
        if max_runs < 1 {
            return Err(CoreError::InputValidation(
                "max_runs must be >= 1".into(),
            ));
        }

        if bounds.delta_max.len() != p || bounds.delta_min.len() != p {
            return Err(CoreError::InputValidation(format!(
                "delta_max/delta_min must have length P={}, got {}/{}",
                p,
                bounds.delta_max.len(),
                bounds.delta_min.len()
            )));
        }
        for (idx, &d) in bounds.delta_max.iter().enumerate() {
            if d < 0.0 {
                return Err(CoreError::InputValidation(format!(
                    "delta_max[{}] must be >= 0, got {}",
                    idx, d
                )));
            }
        }
        for (idx, &d) in bounds.delta_min.iter().enumerate() {
            if d < 0.0 {
                return Err(CoreError::InputValidation(format!(
                    "delta_min[{}] must be >= 0, got {}",
                    idx, d
                )));
            }
        }

        if constraints.m3 < 1 || constraints.m3 > num_stages as i64 {
            return Err(CoreError::InputValidation(format!(
                "m3 must satisfy 1 <= m3 <= K ({}), got {}",
                num_stages, constraints.m3
            )));
        }
        if constraints.m4 < 1 {
            return Err(CoreError::InputValidation(format!(
                "m4 must be >= 1, got {}",
                constraints.m4
            )));
        }
        let upper = num_stages as i64 * max_runs as i64;
        match &constraints.t6 {
            RepetitionTarget::Uniform(t) => {
                if *t < 1 || *t > upper {
                    return Err(CoreError::InputValidation(format!(
                        "t6 must satisfy 1 <= t6 <= K*I_max ({}), got {}",
                        upper, t
                    )));
                }
            }
            RepetitionTarget::PerCombination(map) => {
                for (&combo_id, &t) in map {
                    if t < 1 || t > upper {
                        return Err(CoreError::InputValidation(format!(
                            "t6[{}] must satisfy 1 <= t6 <= K*I_max ({}), got {}",
                            combo_id, upper, t
                        )));
                    }
                }
            }
        }
        if let Some(w) = &constraints.stage_weights {
            if w.len() != num_stages as usize {
                return Err(CoreError::InputValidation(format!(
                    "stage_weights must have length K={}, got {}",
                    num_stages,
                    w.len()
                )));
            }
        }
        if constraints.use_legacy_c8 && num_stages != 3 {
            return Err(CoreError::InputValidation(
                "use_legacy_c8 is only valid when num_stages == 3".into(),
            ));
        }

        let parameters = derive_parameters(&combinations, p);

        Ok(ProblemModel {
            combinations,
            parameters,
            num_stages,
            max_runs,
            bounds,
            constraints,
        })
    }

    pub fn num_combinations(&self) -> u32 {
        self.combinations.len() as u32
    }

    pub fn num_factors(&self) -> usize {
        self.parameters.len()
    }

    pub fn num_stages(&self) -> u32 {
        self.num_stages
    }

    pub fn max_runs(&self) -> u32 {
        self.max_runs
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn bounds(&self) -> &ParameterBounds {
        &self.bounds
    }

    pub fn constraints(&self) -> &ConstraintConfig {
        &self.constraints
    }

    /// `c_jp`: the factor value of combination `j` (1-based) for parameter
    /// `p` (1-based).
    pub fn factor(&self, j: u32, p: usize) -> f64 {
        self.combinations[(j - 1) as usize].factors[p - 1]
    }

    /// Per-stage weight for C6, `1`-indexed; defaults to `1`.
    pub fn stage_weight(&self, k: u32) -> i64 {
        match &self.constraints.stage_weights {
            Some(w) => w[(k - 1) as usize],
            None => 1,
        }
    }
}

fn derive_parameters(combinations: &[Combination], p: usize) -> Vec<Parameter> {
    (0..p)
        .map(|idx| {
            let mut values: Vec<f64> = combinations.iter().map(|c| c.factors[idx]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
            Parameter {
                name: format!("p{}", idx + 1),
                units: String::new(),
                values,
            }
        })
        .collect()
}

/// The implicit "center point" repetition-target convention from the
/// original implementation: combinations 1–3 get target `1`, every other
/// combination gets target `2` (spec §9, Open Question 2; see
/// `examples/original_source/src/config.py::get_repetition_targets`).
///
/// This is a positional convention over combination ids, not a declared
/// invariant of the core; callers opt into it explicitly by building a
/// [`RepetitionTarget::PerCombination`] from this map.
pub fn center_point_targets(num_combinations: u32) -> HashMap<u32, i64> {
    (1..=num_combinations)
        .map(|j| (j, if j <= 3 { 1 } else { 2 }))
        .collect()
}
