// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use rand::Rng;

pub use crate::spaces::real_vector_state_space::RealVectorStateSpace;
use crate::{error::StateSamplingError, state::State};

/// Defines a space in which planning can be performed.
///
/// A `StateSpace` represents the manifold where configurations exist. It defines
/// the properties and operations applicable to that space as a whole, such as
/// how to measure distance, how to interpolate between configurations, and how
/// to generate new ones.
///
/// This is an external-interface stub, carried over from `oxmpl` as one of
/// the capability traits a complete crate in this style exposes, but it is
/// not wired into anything: the graph model (`Node`/`Connection`/`Tree`/
/// `Path`) and the solvers are hardcoded against the concrete
/// `RealVectorState` type (see `Tree::extend`), not generic over
/// `StateSpace::StateType`. A caller is free to implement this trait for a
/// custom manifold, but doing so does not currently change how `Tree`/`Path`
/// or any `Solver` behaves.
pub trait StateSpace {
    /// StateType defines what is acceptable in the current StateSpace.
    type StateType: State;

    /// Find distance between current state1 and target state2.
    fn distance(&self, state1: &Self::StateType, state2: &Self::StateType) -> f64;

    /// Find state interpolated between `from` and `to` states given 0<=`t`<=1.
    fn interpolate(
        &self,
        from: &Self::StateType,
        to: &Self::StateType,
        t: f64,
        state: &mut Self::StateType,
    );

    /// Modifies the given state in place to conform to the space's bounds.
    fn enforce_bounds(&self, state: &mut Self::StateType);

    /// Checks if a state is within the valid bounds of this space.
    fn satisfies_bounds(&self, state: &Self::StateType) -> bool;

    /// Generates a state uniformly at random from the entire state space.
    fn sample_uniform(&self, rng: &mut impl Rng) -> Result<Self::StateType, StateSamplingError>;

    /// Gets the length of the longest segment that can be assumed valid.
    ///
    /// This is a heuristic used to determine the resolution for motion validation. A smaller value
    /// means motions are checked more frequently.
    fn get_longest_valid_segment_length(&self) -> f64;
}
