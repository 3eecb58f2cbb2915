// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use crate::state::State;

/// The collision/validity-checking capability consumed by the graph model and
/// the solvers.
///
/// This is an external collaborator: the core graph/tree/path data structure
/// never implements collision checking itself, only calls out to one. A
/// `Checker` is expected to hold mutable planning-scene state, which is why
/// `clone()` is part of the trait rather than relying on `Clone` — a caller
/// that owns several independent `Tree`s/`Solver`s needs one checker per
/// planning instance (see the crate-level concurrency notes).
///
/// The edge-shaped methods (`check_connection`, `check_connection_from_conf`)
/// take the already-resolved endpoint configurations rather than a
/// `Connection` value: `Connection` in this crate stores arena indices, not
/// configurations, so resolving it to `(parent, child)` is the caller's job
/// (`Tree`/`Path` always have arena access; a bare `Checker` implementation
/// does not need to).
///
/// Implementations are not required to be deterministic across clones;
/// callers that need reproducibility must reuse one checker instance.
pub trait Checker<S: State>: Send + Sync {
    /// Returns `true` if `state` is free of collisions / satisfies all
    /// constraints.
    fn check(&self, state: &S) -> bool;

    /// Returns `true` if the straight-line motion between `from` and `to` is
    /// entirely valid. Implementations are expected to discretise the motion
    /// at their own resolution.
    fn check_path(&self, from: &S, to: &S) -> bool;

    /// Convenience form of `check_path` for an already-materialised edge.
    fn check_connection(&self, parent: &S, child: &S) -> bool {
        self.check_path(parent, child)
    }

    /// Like `check_connection`, but only validates the sub-segment from an
    /// arbitrary on-edge configuration `conf` to `child` (used by
    /// `Path::is_valid_from_conf` when resuming validation partway along an
    /// edge).
    fn check_connection_from_conf(&self, conf: &S, child: &S) -> bool {
        self.check_path(conf, child)
    }

    /// Produces an independent clone of this checker, including whatever
    /// mutable planning-scene state it holds.
    fn clone_box(&self) -> Box<dyn Checker<S>>;

    /// The minimum clearance this checker currently considers safe.
    fn min_distance(&self) -> f64;

    /// A human-readable identifier for the group of bodies this checker
    /// validates against (e.g. a kinematic chain name).
    fn group_name(&self) -> String;
}

impl<S: State> Clone for Box<dyn Checker<S>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
