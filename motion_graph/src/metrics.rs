// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use crate::state::State;

/// The cost capability consumed by the graph model.
///
/// A `Metrics` scores the cost of moving from one configuration to another.
/// It must satisfy `cost(q, q) == 0.0`; symmetry is **not** required, since
/// directional metrics (e.g. time-aware ones, weighted by a maximum joint
/// speed per direction) are explicitly supported by the data model's
/// `Connection::time` field. A cost of `f64::INFINITY` denotes an
/// infeasible/obstructed edge and must never be treated as a thrown error —
/// callers propagate it arithmetically (infinity absorbs in sums).
pub trait Metrics<S: State>: Send + Sync {
    /// Non-negative cost of moving from `from` to `to` (or `f64::INFINITY`).
    fn cost(&self, from: &S, to: &S) -> f64;
}

/// The Euclidean-distance metric: `cost(a, b) == ||b - a||`.
///
/// This is the default metric used throughout the graph model's tests and
/// matches `Connection`'s own cached Euclidean norm, so edges built from it
/// have `cost == norm`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EuclideanMetrics;

impl Metrics<crate::state::RealVectorState> for EuclideanMetrics {
    fn cost(&self, from: &crate::state::RealVectorState, to: &crate::state::RealVectorState) -> f64 {
        from.distance(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RealVectorState;

    #[test]
    fn euclidean_metric_matches_state_distance() {
        let m = EuclideanMetrics;
        let a = RealVectorState::new(vec![0.0, 0.0]);
        let b = RealVectorState::new(vec![3.0, 4.0]);
        assert_eq!(m.cost(&a, &b), 5.0);
        assert_eq!(m.cost(&a, &a), 0.0);
    }
}
