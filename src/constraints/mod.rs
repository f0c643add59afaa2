//! Translates C1–C8 into linear rows over the [`VariableRegistry`]'s
//! variables (spec §4.3) — the algorithmic heart of the crate.
//!
//! Each constraint is emitted only if enabled in the [`ConstraintConfig`];
//! C1 is always active. The compiler also assembles the objective, since
//! spec §4.3 describes it alongside the constraints it shapes.

mod c1_c6;
mod c7;
mod c8;

use cp_sat::builder::LinearExpr;
use log::debug;

use crate::model::ProblemModel;
use crate::registry::VariableRegistry;
use crate::scaling::FixedPointScale;

/// Scale used for the objective's cubic run-index weights. Kept separate
/// from the factor-value scale ([`FixedPointScale::default`]) since the
/// objective coefficients are already normalized into `[0, 1]` and need
/// more headroom to stay distinguishable after rounding to integers.
/// `schedule::extract_and_validate` divides the engine's raw objective
/// back down by this same constant.
pub(crate) const OBJECTIVE_SCALE: i64 = 1_000_000_000;

/// Emits every enabled constraint and the objective into the registry's
/// underlying [`cp_sat::builder::CpModelBuilder`].
pub struct ConstraintCompiler<'a> {
    model: &'a ProblemModel,
    registry: &'a mut VariableRegistry,
    scale: FixedPointScale,
}

impl<'a> ConstraintCompiler<'a> {
    pub fn new(model: &'a ProblemModel, registry: &'a mut VariableRegistry) -> Self {
        ConstraintCompiler {
            model,
            registry,
            scale: FixedPointScale::default(),
        }
    }

    /// Compile the objective and every enabled constraint, in order.
    pub fn compile(&mut self) {
        self.build_objective();
        self.add_c1();
        if self.model.constraints().c2_enabled {
            self.add_c2();
        }
        if self.model.constraints().c3_enabled {
            self.add_c3();
        }
        if self.model.constraints().c4_enabled {
            self.add_c4();
        }
        if self.model.constraints().c5_enabled {
            self.add_c5();
        }
        if self.model.constraints().c6_enabled {
            self.add_c6();
        }
        if self.model.constraints().c7_enabled {
            self.add_c7();
        }
        if self.model.constraints().c8_enabled {
            self.add_c8();
        }
    }

    fn build_objective(&mut self) {
        let j = self.registry.j();
        let i_max = self.registry.i_max();
        let k = self.registry.k();

        let mut terms: Vec<(i64, cp_sat::builder::BoolVar)> = Vec::new();
        for i in 1..=i_max {
            let w_i = (i as f64 / (j as f64 + 1.0)).powi(3);
            let coeff = (w_i * OBJECTIVE_SCALE as f64).round() as i64;
            if coeff == 0 {
                continue;
            }
            for jj in 1..=j {
                for kk in 1..=k {
                    terms.push((coeff, self.registry.x(i, jj, kk).clone()));
                }
            }
        }
        debug!("objective: {} weighted terms", terms.len());
        let expr: LinearExpr = terms.into_iter().collect();
        self.registry.builder_mut().minimize(expr);
    }
}
