//! C8: minimum variation per run — the disjunctive-OR Big-M constraint
//! (spec §4.3).
//!
//! Two encodings are implemented:
//!
//! - **Normalized** (default, arbitrary `K`): a run-active indicator `u[i]`,
//!   a per-(run, parameter) selector `y[i,p]` ("this parameter satisfies
//!   the bound in this run"), and per-transition selectors `w`/`s` picking
//!   which consecutive pair and which sign demonstrates it. This is the
//!   formulation spec §4.3 calls "cleaner and should be preferred."
//! - **Legacy** (`K == 3` only): the literal `z`/`q` Big-M/Big-L formulas
//!   from the original implementation, kept only for bit-for-bit parity
//!   tests (spec §9, Open Question 4).
//!
//! `cp_sat`'s `LinearExpr` has no `Mul<i64>`; every row here is built as a
//! single `Vec<(i64, BoolVar)>` of weighted terms collected once, the same
//! pattern the objective uses (see `constraints::mod`'s `build_objective`).

use cp_sat::builder::{BoolVar, LinearExpr};
use log::debug;

use super::ConstraintCompiler;

/// Legacy Big-M/Big-L constants, taken verbatim from
/// `examples/original_source/src/config.py` (`BIG_M = 1000`, `BIG_L = 500`)
/// and scaled into the fixed-point integer domain.
const LEGACY_BIG_M: i64 = 1000;
const LEGACY_BIG_L: i64 = 500;

impl<'a> ConstraintCompiler<'a> {
    pub(super) fn add_c8(&mut self) {
        if self.model.constraints().use_legacy_c8 {
            self.add_c8_legacy();
        } else {
            self.add_c8_normalized();
        }
    }

    /// Weighted terms for `d_k = Σ_j c_jp * (x[i,j,k] - x[i,j,k+1])`, in
    /// scaled-integer units.
    fn transition_diff_terms(&self, i: u32, k: u32, p: usize) -> Vec<(i64, BoolVar)> {
        let j = self.registry.j();
        (1..=j)
            .map(|jj| {
                let c_jp = self.scale.scale(self.model.factor(jj, p));
                (c_jp, self.registry.x(i, jj, k).clone())
            })
            .chain((1..=j).map(|jj| {
                let c_jp = self.scale.scale(self.model.factor(jj, p));
                (-c_jp, self.registry.x(i, jj, k + 1).clone())
            }))
            .collect()
    }

    /// `d_k` zero-fills an unassigned stage (spec §4.3/§9: "an empty slot
    /// is freely reachable"), so it ranges over
    /// `[0.min(min_v) - 0.max(max_v), 0.max(max_v) - 0.min(min_v)]`, not
    /// just `±(max_v - min_v)` — a run with one assigned stage next to an
    /// empty one still has to be covered by the Big-M. `max(0, max_v) -
    /// min(0, min_v)` is that full swing.
    fn big_m_for_param(&self, p: usize) -> i64 {
        let values = &self.model.parameters()[p - 1].values;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let swing = max.max(0.0) - min.min(0.0);
        let scaled_swing = self.scale.scale(swing);
        let scaled_delta_min = self.scale.scale(self.model.bounds().delta_min[p - 1]);
        scaled_swing + scaled_delta_min
    }

    /// `u[i]` is exactly the indicator of run `i` having any assignment:
    /// `assigned_i <= K * u[i]` and `u[i] <= assigned_i`.
    fn run_active_link(&mut self, i: u32) {
        let j = self.registry.j();
        let k = self.registry.k();
        let u = self.registry.u(i).clone();

        let assigned_terms: Vec<(i64, BoolVar)> = (1..=j)
            .flat_map(|jj| (1..=k).map(move |kk| (jj, kk)))
            .map(|(jj, kk)| (1, self.registry.x(i, jj, kk).clone()))
            .collect();
        let assigned: LinearExpr = assigned_terms.into_iter().collect();

        let k_u: LinearExpr = vec![(k as i64, u.clone())].into_iter().collect();
        self.registry.builder_mut().add_le(assigned.clone(), k_u);
        self.registry
            .builder_mut()
            .add_le(LinearExpr::from(u), assigned);
    }

    fn add_c8_normalized(&mut self) {
        let i_max = self.registry.i_max();
        let k = self.registry.k();
        let p = self.registry.p();
        let mut rows = 0;

        for i in 1..=i_max {
            self.run_active_link(i);

            // at least one parameter must satisfy the bound if the run is used
            let y_sum: LinearExpr = (1..=p)
                .map(|pp| LinearExpr::from(self.registry.y(i, pp).clone()))
                .fold(LinearExpr::from(0), |acc, t| acc + t);
            let u = self.registry.u(i).clone();
            self.registry.builder_mut().add_ge(y_sum, LinearExpr::from(u));
            rows += 1;

            for pp in 1..=p {
                let delta_min = self.scale.scale(self.model.bounds().delta_min[pp - 1]);
                let big_m = self.big_m_for_param(pp);
                let y = self.registry.y(i, pp).clone();

                // at least one transition chosen to demonstrate the bound
                let w_sum: LinearExpr = (1..k)
                    .map(|kk| LinearExpr::from(self.registry.w(kk, i, pp).clone()))
                    .fold(LinearExpr::from(0), |acc, t| acc + t);
                self.registry.builder_mut().add_ge(w_sum, LinearExpr::from(y));
                rows += 1;

                for kk in 1..k {
                    let w = self.registry.w(kk, i, pp).clone();
                    let s = self.registry.s(kk, i, pp).clone();

                    // d_k >= delta_min - M(1-w) - M(1-s)
                    //   <=> d_k - M*w - M*s >= delta_min - 2M
                    let mut lower_terms = self.transition_diff_terms(i, kk, pp);
                    lower_terms.push((-big_m, w.clone()));
                    lower_terms.push((-big_m, s.clone()));
                    let lower: LinearExpr = lower_terms.into_iter().collect();
                    self.registry
                        .builder_mut()
                        .add_ge(lower, LinearExpr::from(delta_min - 2 * big_m));

                    // d_k <= -delta_min + M(1-w) + M*s
                    //   <=> d_k + M*w - M*s <= -delta_min + M
                    let mut upper_terms = self.transition_diff_terms(i, kk, pp);
                    upper_terms.push((big_m, w));
                    upper_terms.push((-big_m, s));
                    let upper: LinearExpr = upper_terms.into_iter().collect();
                    self.registry
                        .builder_mut()
                        .add_le(upper, LinearExpr::from(big_m - delta_min));
                    rows += 2;
                }
            }
        }
        debug!("C8 (normalized): {} rows", rows);
    }

    /// Literal port of `examples/original_source/src/optimizer.py`'s
    /// `_add_constraint_c8`, valid only for `K == 3` (spec §9, Open
    /// Question 4). `ProblemModel::new` rejects `use_legacy_c8` unless
    /// `num_stages == 3`.
    fn add_c8_legacy(&mut self) {
        debug_assert_eq!(self.registry.k(), 3, "legacy C8 encoding requires K == 3");
        let i_max = self.registry.i_max();
        let p = self.registry.p();
        let big_m = LEGACY_BIG_M * self.scale.factor();
        let big_l = LEGACY_BIG_L * self.scale.factor();
        let mut rows = 0;

        for i in 1..=i_max {
            for pp in 1..=p {
                let delta_min = self.scale.scale(self.model.bounds().delta_min[pp - 1]);
                let diff1 = self.transition_diff_terms(i, 1, pp);
                let diff2 = self.transition_diff_terms(i, 2, pp);
                let z = self.registry.z(i, pp).clone();
                let q1 = self.registry.q(1, i, pp).clone();
                let q2 = self.registry.q(2, i, pp).clone();

                // C8_min_var_k1: diff1 + M*z + L*q1 + L*q2 >= delta_min
                let mut terms = diff1.clone();
                terms.push((big_m, z.clone()));
                terms.push((big_l, q1.clone()));
                terms.push((big_l, q2.clone()));
                let lhs: LinearExpr = terms.into_iter().collect();
                self.registry.builder_mut().add_ge(lhs, LinearExpr::from(delta_min));

                // C8_min_var_k1_alt: diff1 - M*z + L*q1 + L*q2 >= delta_min - M
                let mut terms = diff1;
                terms.push((-big_m, z.clone()));
                terms.push((big_l, q1.clone()));
                terms.push((big_l, q2.clone()));
                let lhs: LinearExpr = terms.into_iter().collect();
                self.registry
                    .builder_mut()
                    .add_ge(lhs, LinearExpr::from(delta_min - big_m));

                // C8_min_var_k2: diff2 + M*z - L*q1 + L*q2 >= delta_min - L
                let mut terms = diff2.clone();
                terms.push((big_m, z.clone()));
                terms.push((-big_l, q1.clone()));
                terms.push((big_l, q2.clone()));
                let lhs: LinearExpr = terms.into_iter().collect();
                self.registry
                    .builder_mut()
                    .add_ge(lhs, LinearExpr::from(delta_min - big_l));

                // C8_min_var_k2_alt: diff2 - M*z - L*q1 + L*q2 >= delta_min - M - L
                let mut terms = diff2;
                terms.push((-big_m, z));
                terms.push((-big_l, q1));
                terms.push((big_l, q2));
                let lhs: LinearExpr = terms.into_iter().collect();
                self.registry
                    .builder_mut()
                    .add_ge(lhs, LinearExpr::from(delta_min - big_m - big_l));
                rows += 4;
            }
        }
        debug!("C8 (legacy, K=3): {} rows", rows);
    }
}
