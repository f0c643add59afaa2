//! Allocates and names the MILP variables (spec §4.2).
//!
//! The registry owns the single [`CpModelBuilder`] for a solve session and
//! creates every binary variable in a fixed, deterministic order — the
//! same input always produces variables in the same order, so two solves
//! over identical input are bit-identical (spec §5, P9).
//!
//! Primary variables: `x[i,j,k]`. C8 auxiliaries come in two families,
//! built only when C8 is enabled: the normalized formulation (`y`, `w`,
//! `s`, `u`, preferred, arbitrary `K`) and the legacy formulation (`z`,
//! `q`, `K == 3` only, kept for parity tests per spec §9).

use cp_sat::builder::{BoolVar, CpModelBuilder};

use crate::model::ProblemModel;

/// Dense index grid of the primary assignment variables, one per
/// `(run, combination, stage)` triple.
pub struct VariableRegistry {
    builder: CpModelBuilder,
    i_max: u32,
    j: u32,
    k: u32,
    p: usize,
    /// `x[i-1][j-1][k-1]`
    x: Vec<Vec<Vec<BoolVar>>>,
    /// `u[i-1]`: 1 iff run `i` has any assignment. Only built when C8 is enabled.
    u: Vec<BoolVar>,
    /// `y[i-1][p-1]`: 1 iff parameter `p` satisfies the variation bound in run `i`.
    y: Vec<Vec<BoolVar>>,
    /// `w[k-1][i-1][p-1]`: transition `(k,k+1)` is the one demonstrating the bound.
    w: Vec<Vec<Vec<BoolVar>>>,
    /// `s[k-1][i-1][p-1]`: the positive-direction branch was chosen for that transition.
    s: Vec<Vec<Vec<BoolVar>>>,
    /// `z[i-1][p-1]`: legacy sign selector.
    z: Vec<Vec<BoolVar>>,
    /// `q[k-1][i-1][p-1]`: legacy transition-pair selector.
    q: Vec<Vec<Vec<BoolVar>>>,
}

impl VariableRegistry {
    pub fn new(model: &ProblemModel) -> Self {
        let mut builder = CpModelBuilder::default();
        let i_max = model.max_runs();
        let j = model.num_combinations();
        let k = model.num_stages();
        let p = model.num_factors();

        let x = (0..i_max)
            .map(|_| {
                (0..j)
                    .map(|_| (0..k).map(|_| builder.new_bool_var()).collect())
                    .collect()
            })
            .collect();

        let c8 = model.constraints().c8_enabled;
        let legacy = model.constraints().use_legacy_c8;

        let u = if c8 {
            (0..i_max).map(|_| builder.new_bool_var()).collect()
        } else {
            Vec::new()
        };

        let (y, w, s) = if c8 && !legacy {
            let y = (0..i_max)
                .map(|_| (0..p).map(|_| builder.new_bool_var()).collect())
                .collect();
            let w = (0..k.saturating_sub(1))
                .map(|_| {
                    (0..i_max)
                        .map(|_| (0..p).map(|_| builder.new_bool_var()).collect())
                        .collect()
                })
                .collect();
            let s = (0..k.saturating_sub(1))
                .map(|_| {
                    (0..i_max)
                        .map(|_| (0..p).map(|_| builder.new_bool_var()).collect())
                        .collect()
                })
                .collect();
            (y, w, s)
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        let (z, q) = if c8 && legacy {
            let z = (0..i_max)
                .map(|_| (0..p).map(|_| builder.new_bool_var()).collect())
                .collect();
            let q = (0..k.saturating_sub(1))
                .map(|_| {
                    (0..i_max)
                        .map(|_| (0..p).map(|_| builder.new_bool_var()).collect())
                        .collect()
                })
                .collect();
            (z, q)
        } else {
            (Vec::new(), Vec::new())
        };

        VariableRegistry {
            builder,
            i_max,
            j,
            k,
            p,
            x,
            u,
            y,
            w,
            s,
            z,
            q,
        }
    }

    pub fn builder_mut(&mut self) -> &mut CpModelBuilder {
        &mut self.builder
    }

    pub fn builder(&self) -> &CpModelBuilder {
        &self.builder
    }

    pub fn into_builder(self) -> CpModelBuilder {
        self.builder
    }

    pub fn i_max(&self) -> u32 {
        self.i_max
    }
    pub fn j(&self) -> u32 {
        self.j
    }
    pub fn k(&self) -> u32 {
        self.k
    }
    pub fn p(&self) -> usize {
        self.p
    }

    /// `x[i,j,k]`, all indices 1-based.
    pub fn x(&self, i: u32, j: u32, k: u32) -> &BoolVar {
        &self.x[(i - 1) as usize][(j - 1) as usize][(k - 1) as usize]
    }

    pub fn u(&self, i: u32) -> &BoolVar {
        &self.u[(i - 1) as usize]
    }

    pub fn y(&self, i: u32, p: usize) -> &BoolVar {
        &self.y[(i - 1) as usize][p - 1]
    }

    /// `k` here ranges over transitions `1..=K-1`.
    pub fn w(&self, k: u32, i: u32, p: usize) -> &BoolVar {
        &self.w[(k - 1) as usize][(i - 1) as usize][p - 1]
    }

    pub fn s(&self, k: u32, i: u32, p: usize) -> &BoolVar {
        &self.s[(k - 1) as usize][(i - 1) as usize][p - 1]
    }

    pub fn z(&self, i: u32, p: usize) -> &BoolVar {
        &self.z[(i - 1) as usize][p - 1]
    }

    pub fn q(&self, k: u32, i: u32, p: usize) -> &BoolVar {
        &self.q[(k - 1) as usize][(i - 1) as usize][p - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Combination, ConstraintConfig, ParameterBounds};

    fn test_model(num_stages: u32, constraints: ConstraintConfig) -> ProblemModel {
        let combos = vec![
            Combination { id: 1, factors: vec![0.0, 10.0] },
            Combination { id: 2, factors: vec![1.0, 20.0] },
            Combination { id: 3, factors: vec![2.0, 30.0] },
        ];
        let bounds = ParameterBounds { delta_max: vec![5.0, 50.0], delta_min: vec![0.1, 1.0] };
        ProblemModel::new(combos, num_stages, Some(4), bounds, constraints).unwrap()
    }

    #[test]
    fn allocates_dense_x_grid_and_every_index_is_reachable() {
        let model = test_model(3, ConstraintConfig { c8_enabled: false, ..ConstraintConfig::default() });
        let registry = VariableRegistry::new(&model);
        assert_eq!(registry.i_max(), 4);
        assert_eq!(registry.j(), 3);
        assert_eq!(registry.k(), 3);
        assert_eq!(registry.p(), 2);
        for i in 1..=registry.i_max() {
            for j in 1..=registry.j() {
                for k in 1..=registry.k() {
                    registry.x(i, j, k);
                }
            }
        }
    }

    #[test]
    fn c8_disabled_allocates_no_auxiliaries() {
        let model = test_model(3, ConstraintConfig { c8_enabled: false, ..ConstraintConfig::default() });
        let registry = VariableRegistry::new(&model);
        assert!(registry.u.is_empty());
        assert!(registry.y.is_empty());
        assert!(registry.w.is_empty());
        assert!(registry.z.is_empty());
    }

    #[test]
    fn c8_normalized_allocates_u_y_w_s_but_not_legacy() {
        let model = test_model(3, ConstraintConfig { c8_enabled: true, use_legacy_c8: false, ..ConstraintConfig::default() });
        let registry = VariableRegistry::new(&model);
        assert_eq!(registry.u.len(), registry.i_max() as usize);
        assert_eq!(registry.y.len(), registry.i_max() as usize);
        assert_eq!(registry.y[0].len(), registry.p());
        assert_eq!(registry.w.len(), (registry.k() - 1) as usize);
        assert!(registry.z.is_empty());
        assert!(registry.q.is_empty());
        for i in 1..=registry.i_max() {
            for p in 1..=registry.p() {
                registry.y(i, p);
            }
        }
        for kk in 1..registry.k() {
            for i in 1..=registry.i_max() {
                for p in 1..=registry.p() {
                    registry.w(kk, i, p);
                    registry.s(kk, i, p);
                }
            }
        }
    }

    #[test]
    fn c8_legacy_allocates_z_and_q_not_normalized() {
        let model = test_model(3, ConstraintConfig { c8_enabled: true, use_legacy_c8: true, ..ConstraintConfig::default() });
        let registry = VariableRegistry::new(&model);
        assert_eq!(registry.z.len(), registry.i_max() as usize);
        assert_eq!(registry.q.len(), (registry.k() - 1) as usize);
        assert!(registry.y.is_empty());
        assert!(registry.w.is_empty());
        for i in 1..=registry.i_max() {
            for p in 1..=registry.p() {
                registry.z(i, p);
            }
        }
        for kk in 1..registry.k() {
            for i in 1..=registry.i_max() {
                for p in 1..=registry.p() {
                    registry.q(kk, i, p);
                }
            }
        }
    }
}
