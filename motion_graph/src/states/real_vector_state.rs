// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use crate::state::State;

/// A configuration: a point in an N-dimensional Euclidean joint-space (R^n).
#[derive(Clone, Debug, PartialEq)]
pub struct RealVectorState {
    /// Values of each dimension of the configuration.
    pub values: Vec<f64>,
}
impl RealVectorState {
    /// Creates a new `RealVectorState`.
    pub fn new(vals: Vec<f64>) -> Self {
        RealVectorState { values: vals }
    }

    /// Euclidean distance to another configuration of the same dimension.
    pub fn distance(&self, other: &Self) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
/// Implements the `State` marker trait for `RealVectorState`.
impl State for RealVectorState {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_vector_state_creation() {
        let state = RealVectorState {
            values: vec![1.0, 2.0],
        };
        assert_eq!(state.values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_real_vector_state_clone() {
        let state1 = RealVectorState {
            values: vec![1.0, 2.0],
        };
        let state2 = state1.clone();
        assert_eq!(state1, state2);
    }

    #[test]
    fn test_distance() {
        let a = RealVectorState::new(vec![0.0, 0.0]);
        let b = RealVectorState::new(vec![3.0, 4.0]);
        assert_eq!(a.distance(&b), 5.0);
    }
}
