// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The RRT / RRT* / Multigoal solver framework (`spec.md` §4.E), grounded on
//! `oxmpl`'s `geometric::planners::{rrt, rrt_star}` and generalized so the
//! tree they grow is the shared `graph::Tree` instead of each planner's
//! private `Vec<Node>`.

mod multigoal;
mod rrt;
mod rrt_star;

pub use multigoal::Multigoal;
pub use rrt::Rrt;
pub use rrt_star::RrtStar;

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::GraphError,
    graph::{arena::ConnectionId, GraphArena, NodeId, Path, Tree},
    time::Duration,
};

/// A solver that grows a `Tree` towards one or more goals and reports the
/// best-cost completed `Path` it has found.
pub trait Solver {
    /// Registers the start configuration as the tree's root. Must be called
    /// exactly once, before any other method.
    fn add_start(&mut self, start: crate::state::RealVectorState) -> Result<NodeId, GraphError>;

    /// Registers a goal configuration. `time_budget` bounds how long this
    /// solver should keep trying to improve a connection to this particular
    /// goal (consumed meaningfully by `Multigoal`; `Rrt`/`RrtStar` accept it
    /// for interface symmetry but do not schedule per-goal).
    fn add_goal(&mut self, goal: crate::state::RealVectorState, time_budget: Duration) -> Result<NodeId, GraphError>;

    /// Runs a single iteration: one sample, one `extend`, and (depending on
    /// the solver) a choose-parent/rewire or goal-reconnection step.
    /// Returns whether `solution` was set or improved by this call.
    fn update(&mut self, solution: &mut Option<Path>) -> Result<bool, GraphError>;

    /// Runs iterations until `max_iter` is reached, `time_budget` elapses,
    /// or (for single-shot solvers) a first feasible solution is found.
    /// Returns whether a solution was produced by this call.
    fn solve(
        &mut self,
        solution: &mut Option<Path>,
        max_iter: usize,
        time_budget: Duration,
    ) -> Result<bool, GraphError>;
}

/// Walks the parent chain from `node` back to the tree root, returning the
/// connections in root-to-`node` order. Shared by every solver's
/// path-reconstruction step.
pub(crate) fn collect_connections_to_root(
    arena: &Rc<RefCell<GraphArena>>,
    mut node: NodeId,
) -> Result<Vec<ConnectionId>, GraphError> {
    let a = arena.borrow();
    let mut connections = Vec::new();
    loop {
        let parents = a.parents(node)?;
        match parents.first() {
            None => break,
            Some(&edge) => {
                connections.push(edge);
                node = a.parent_of(edge)?;
            }
        }
    }
    connections.reverse();
    Ok(connections)
}

pub(crate) fn new_tree_rooted_at(
    arena: &Rc<RefCell<GraphArena>>,
    start: crate::state::RealVectorState,
) -> (NodeId, Rc<RefCell<Tree>>) {
    let root = arena.borrow_mut().create_node(start);
    (root, Rc::new(RefCell::new(Tree::new(arena.clone(), root))))
}
