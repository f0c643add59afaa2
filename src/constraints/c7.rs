//! C7: bounded inter-stage transitions (spec §4.3).
//!
//! For every run, every consecutive stage pair, and every parameter, the
//! signed change in that parameter's value is bounded by `±Δmax[p]`. An
//! empty stage contributes `0` to its side of the sum — the compiler does
//! not special-case it, matching the spec's "an empty slot is freely
//! reachable" semantics.

use cp_sat::builder::{BoolVar, LinearExpr};
use log::debug;

use super::ConstraintCompiler;

impl<'a> ConstraintCompiler<'a> {
    pub(super) fn add_c7(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let p = self.registry.p();
        let mut rows = 0;

        for i in 1..=i_max {
            for kk in 1..k {
                for pp in 1..=p {
                    let delta_max = self.model.bounds().delta_max[pp - 1];
                    let scaled_max = self.scale.scale(delta_max);

                    let terms: Vec<(i64, BoolVar)> = (1..=j)
                        .map(|jj| {
                            let c_jp = self.scale.scale(self.model.factor(jj, pp));
                            (c_jp, self.registry.x(i, jj, kk).clone())
                        })
                        .chain((1..=j).map(|jj| {
                            let c_jp = self.scale.scale(self.model.factor(jj, pp));
                            (-c_jp, self.registry.x(i, jj, kk + 1).clone())
                        }))
                        .collect();
                    let diff: LinearExpr = terms.into_iter().collect();

                    self.registry
                        .builder_mut()
                        .add_le(diff.clone(), LinearExpr::from(scaled_max));
                    self.registry
                        .builder_mut()
                        .add_ge(diff, LinearExpr::from(-scaled_max));
                    rows += 2;
                }
            }
        }
        debug!("C7: {} rows", rows);
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Combination, ConstraintConfig, ParameterBounds, ProblemModel};
    use crate::registry::VariableRegistry;

    use super::ConstraintCompiler;

    #[test]
    fn add_c7_does_not_panic_across_every_transition_and_parameter() {
        let combos = vec![
            Combination { id: 1, factors: vec![0.1, 10.0] },
            Combination { id: 2, factors: vec![0.2, 20.0] },
            Combination { id: 3, factors: vec![0.3, 30.0] },
        ];
        let bounds = ParameterBounds { delta_max: vec![0.05, 5.0], delta_min: vec![0.01, 1.0] };
        let model = ProblemModel::new(combos, 4, Some(3), bounds, ConstraintConfig::default()).unwrap();
        let mut registry = VariableRegistry::new(&model);
        let mut compiler = ConstraintCompiler::new(&model, &mut registry);
        compiler.add_c7();
    }

    #[test]
    fn add_c7_handles_minimum_two_stage_runs() {
        let combos = vec![Combination { id: 1, factors: vec![0.1] }];
        let bounds = ParameterBounds { delta_max: vec![1.0], delta_min: vec![0.1] };
        let model = ProblemModel::new(combos, 2, Some(1), bounds, ConstraintConfig::default()).unwrap();
        let mut registry = VariableRegistry::new(&model);
        let mut compiler = ConstraintCompiler::new(&model, &mut registry);
        compiler.add_c7();
    }
}
