use idoe_planner::{Combination, ConstraintConfig, ParameterBounds, RepetitionTarget};
use std::collections::HashMap;

/// The seed scenario's nine combinations (spec §8): `(0.135, 31.0)` repeated
/// three times plus six distinct points, each with a stable 1-based id.
pub fn seed_combinations() -> Vec<Combination> {
    let rows: &[(f64, f64)] = &[
        (0.135, 31.0),
        (0.135, 31.0),
        (0.135, 31.0),
        (0.16, 31.0),
        (0.1475, 33.0),
        (0.11, 31.0),
        (0.1225, 29.0),
        (0.1475, 29.0),
        (0.1225, 33.0),
    ];
    rows.iter()
        .enumerate()
        .map(|(idx, &(mu, temp))| Combination {
            id: (idx + 1) as u32,
            factors: vec![mu, temp],
        })
        .collect()
}

pub fn seed_bounds() -> ParameterBounds {
    ParameterBounds {
        delta_max: vec![0.03, 2.0],
        delta_min: vec![0.01, 1.0],
    }
}

pub fn seed_constraints() -> ConstraintConfig {
    let mut targets = HashMap::new();
    for (idx, &t) in [1, 1, 1, 2, 2, 2, 2, 2, 2].iter().enumerate() {
        targets.insert((idx + 1) as u32, t);
    }
    ConstraintConfig {
        t6: RepetitionTarget::PerCombination(targets),
        m3: 2,
        m4: 2,
        ..ConstraintConfig::default()
    }
}
