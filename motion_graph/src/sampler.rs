// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use rand::Rng;

use crate::{error::StateSamplingError, state::State};

/// The configuration-sampling capability consumed by the solvers.
///
/// Concrete strategies (uniform, informed, time-based) are external
/// collaborators by design (`spec.md` §1 scopes them out of the core); this
/// trait is the seam the solvers are written against, plus a plain
/// `UniformSampler` used by this crate's own tests and as a sane default.
pub trait Sampler<S: State> {
    /// Draws a new candidate configuration.
    fn sample(&mut self, rng: &mut impl Rng) -> Result<S, StateSamplingError>;

    /// The configuration the planning problem starts from.
    fn start_config(&self) -> &S;

    /// The configuration (or representative configuration) the planning
    /// problem is aiming for.
    fn stop_config(&self) -> &S;

    /// Per-dimension lower bound of the sampled region.
    fn lower(&self) -> &[f64];

    /// Per-dimension upper bound of the sampled region.
    fn upper(&self) -> &[f64];

    /// The current best known solution cost, used by informed samplers to
    /// shrink their sampling region. Returns `f64::INFINITY` until a
    /// solution exists.
    fn cost(&self) -> f64;

    /// Informs the sampler of a new best solution cost.
    fn update_cost(&mut self, cost: f64);
}

/// A sampler that draws uniformly from an axis-aligned box, ignoring the
/// current best cost. Grounded on `RealVectorStateSpace::sample_uniform`.
pub struct UniformSampler {
    start: crate::state::RealVectorState,
    stop: crate::state::RealVectorState,
    lower: Vec<f64>,
    upper: Vec<f64>,
    best_cost: f64,
}

impl UniformSampler {
    pub fn new(
        start: crate::state::RealVectorState,
        stop: crate::state::RealVectorState,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Self {
        UniformSampler {
            start,
            stop,
            lower,
            upper,
            best_cost: f64::INFINITY,
        }
    }
}

impl Sampler<crate::state::RealVectorState> for UniformSampler {
    fn sample(
        &mut self,
        rng: &mut impl Rng,
    ) -> Result<crate::state::RealVectorState, StateSamplingError> {
        let mut values = Vec::with_capacity(self.lower.len());
        for i in 0..self.lower.len() {
            let (lower, upper) = (self.lower[i], self.upper[i]);
            if !lower.is_finite() || !upper.is_finite() {
                return Err(StateSamplingError::UnboundedDimension { dimension_index: i });
            }
            if lower >= upper {
                return Err(StateSamplingError::ZeroVolume);
            }
            values.push(rng.random_range(lower..upper));
        }
        Ok(crate::state::RealVectorState { values })
    }

    fn start_config(&self) -> &crate::state::RealVectorState {
        &self.start
    }

    fn stop_config(&self) -> &crate::state::RealVectorState {
        &self.stop
    }

    fn lower(&self) -> &[f64] {
        &self.lower
    }

    fn upper(&self) -> &[f64] {
        &self.upper
    }

    fn cost(&self) -> f64 {
        self.best_cost
    }

    fn update_cost(&mut self, cost: f64) {
        self.best_cost = cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RealVectorState;

    #[test]
    fn uniform_sampler_stays_in_bounds() {
        let mut sampler = UniformSampler::new(
            RealVectorState::new(vec![0.0, 0.0]),
            RealVectorState::new(vec![1.0, 1.0]),
            vec![0.0, 0.0],
            vec![1.0, 1.0],
        );
        let mut rng = rand::rng();
        for _ in 0..50 {
            let s = sampler.sample(&mut rng).unwrap();
            assert!(s.values[0] >= 0.0 && s.values[0] <= 1.0);
            assert!(s.values[1] >= 0.0 && s.values[1] <= 1.0);
        }
    }

    #[test]
    fn update_cost_is_reported_back() {
        let mut sampler = UniformSampler::new(
            RealVectorState::new(vec![0.0]),
            RealVectorState::new(vec![1.0]),
            vec![0.0],
            vec![1.0],
        );
        assert_eq!(sampler.cost(), f64::INFINITY);
        sampler.update_cost(2.5);
        assert_eq!(sampler.cost(), 2.5);
    }
}
