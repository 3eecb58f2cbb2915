// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use crate::{error::StateSamplingError, state::State};
use rand::Rng;

/// The base trait for all goal definitions.
///
/// A `Goal` represents the termination condition for a planner. This trait is the minimum
/// requirement for any goal.
pub trait Goal<S: State> {
    /// Returns `true` if the given state satisfies the goal condition.
    fn is_satisfied(&self, state: &S) -> bool;
}

/// A `Goal` that is also a region.
///
/// `Goal<S>` makes this a **subtrait** of `Goal`. Any type that implements `GoalRegion` must also
/// implement `Goal`.
pub trait GoalRegion<S: State>: Goal<S> {
    /// Returns the distance from a state to the goal region.
    ///
    /// If the state is inside the goal region, the distance should be `0.0`.
    fn distance_goal(&self, state: &S) -> f64;
}

/// A `GoalRegion` that can be sampled directly.
pub trait GoalSampleableRegion<S: State>: GoalRegion<S> {
    /// Generates a state from within the goal region.
    ///
    /// # Errors
    /// Can return an error if sampling is not possible.
    fn sample_goal(&self, rng: &mut impl Rng) -> Result<S, StateSamplingError>;
}
