//! C1 (one combination per stage) through C6 (weighted stage-distribution
//! target) — the simple counting constraints of spec §4.3.

use cp_sat::builder::LinearExpr;
use log::debug;

use super::ConstraintCompiler;

impl<'a> ConstraintCompiler<'a> {
    /// C1: `Σ_j x[i,j,k] <= 1` for every `(i, k)`. Always active.
    pub(super) fn add_c1(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let mut rows = 0;
        for i in 1..=i_max {
            for kk in 1..=k {
                let expr: LinearExpr = (1..=j)
                    .map(|jj| LinearExpr::from(self.registry.x(i, jj, kk).clone()))
                    .fold(LinearExpr::from(0), |acc, t| acc + t);
                self.registry.builder_mut().add_le(expr, LinearExpr::from(1));
                rows += 1;
            }
        }
        debug!("C1: {} rows", rows);
    }

    /// C2: `Σ_i x[i,j,k] <= 1` for every `(j, k)`.
    pub(super) fn add_c2(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let mut rows = 0;
        for jj in 1..=j {
            for kk in 1..=k {
                let expr: LinearExpr = (1..=i_max)
                    .map(|i| LinearExpr::from(self.registry.x(i, jj, kk).clone()))
                    .fold(LinearExpr::from(0), |acc, t| acc + t);
                self.registry.builder_mut().add_le(expr, LinearExpr::from(1));
                rows += 1;
            }
        }
        debug!("C2: {} rows", rows);
    }

    /// C3: `Σ_k x[i,j,k] <= m3` for every `(i, j)`.
    pub(super) fn add_c3(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let m3 = self.model.constraints().m3;
        let mut rows = 0;
        for i in 1..=i_max {
            for jj in 1..=j {
                let expr: LinearExpr = (1..=k)
                    .map(|kk| LinearExpr::from(self.registry.x(i, jj, kk).clone()))
                    .fold(LinearExpr::from(0), |acc, t| acc + t);
                self.registry
                    .builder_mut()
                    .add_le(expr, LinearExpr::from(m3));
                rows += 1;
            }
        }
        debug!("C3: {} rows (m3={})", rows, m3);
    }

    /// C4: `Σ_{i,k} x[i,j,k] <= m4` for every `j`.
    pub(super) fn add_c4(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let m4 = self.model.constraints().m4;
        let mut rows = 0;
        for jj in 1..=j {
            let expr: LinearExpr = (1..=i_max)
                .flat_map(|i| (1..=k).map(move |kk| (i, kk)))
                .map(|(i, kk)| LinearExpr::from(self.registry.x(i, jj, kk).clone()))
                .fold(LinearExpr::from(0), |acc, t| acc + t);
            self.registry
                .builder_mut()
                .add_le(expr, LinearExpr::from(m4));
            rows += 1;
        }
        debug!("C4: {} rows (m4={})", rows, m4);
    }

    /// C5: `Σ_{i,k} x[i,j,k] >= 1` for every `j`.
    pub(super) fn add_c5(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let mut rows = 0;
        for jj in 1..=j {
            let expr: LinearExpr = (1..=i_max)
                .flat_map(|i| (1..=k).map(move |kk| (i, kk)))
                .map(|(i, kk)| LinearExpr::from(self.registry.x(i, jj, kk).clone()))
                .fold(LinearExpr::from(0), |acc, t| acc + t);
            self.registry.builder_mut().add_ge(expr, LinearExpr::from(1));
            rows += 1;
        }
        debug!("C5: {} rows", rows);
    }

    /// C6: `Σ_{i,k} w[k] * x[i,j,k] >= t6[j]` for every `j`.
    pub(super) fn add_c6(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let mut rows = 0;
        for jj in 1..=j {
            let combo_id = self.model.combinations()[(jj - 1) as usize].id;
            let target = self.model.constraints().t6.get(combo_id);
            let terms: Vec<(i64, cp_sat::builder::BoolVar)> = (1..=i_max)
                .flat_map(|i| (1..=k).map(move |kk| (i, kk)))
                .map(|(i, kk)| {
                    (
                        self.model.stage_weight(kk),
                        self.registry.x(i, jj, kk).clone(),
                    )
                })
                .collect();
            let expr: LinearExpr = terms.into_iter().collect();
            self.registry
                .builder_mut()
                .add_ge(expr, LinearExpr::from(target));
            rows += 1;
        }
        debug!("C6: {} rows", rows);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::model::{Combination, ConstraintConfig, ParameterBounds, ProblemModel, RepetitionTarget};
    use crate::registry::VariableRegistry;

    use super::ConstraintCompiler;

    fn model(j: u32, k: u32, i_max: u32, constraints: ConstraintConfig) -> ProblemModel {
        let combos: Vec<Combination> = (1..=j)
            .map(|id| Combination { id, factors: vec![id as f64] })
            .collect();
        let bounds = ParameterBounds { delta_max: vec![100.0], delta_min: vec![0.1] };
        ProblemModel::new(combos, k, Some(i_max), bounds, constraints).unwrap()
    }

    #[test]
    fn c1_through_c6_do_not_panic_on_a_representative_problem() {
        let m = model(3, 3, 5, ConstraintConfig::default());
        let mut registry = VariableRegistry::new(&m);
        let mut compiler = ConstraintCompiler::new(&m, &mut registry);
        compiler.add_c1();
        compiler.add_c2();
        compiler.add_c3();
        compiler.add_c4();
        compiler.add_c5();
        compiler.add_c6();
    }

    #[test]
    fn c6_reads_per_combination_target_for_each_row() {
        let mut targets = HashMap::new();
        targets.insert(1, 1);
        targets.insert(2, 2);
        targets.insert(3, 2);
        let constraints = ConstraintConfig { t6: RepetitionTarget::PerCombination(targets), ..ConstraintConfig::default() };
        let m = model(3, 3, 5, constraints);
        let mut registry = VariableRegistry::new(&m);
        let mut compiler = ConstraintCompiler::new(&m, &mut registry);
        // Exercises the per-combination lookup path (as opposed to Uniform)
        // for every j without panicking on a missing map entry.
        compiler.add_c6();
    }

    #[test]
    fn c3_respects_m3_equal_to_k() {
        let constraints = ConstraintConfig { m3: 3, ..ConstraintConfig::default() };
        let m = model(2, 3, 2, constraints);
        let mut registry = VariableRegistry::new(&m);
        let mut compiler = ConstraintCompiler::new(&m, &mut registry);
        compiler.add_c3();
    }
}
