// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! A rooted, acyclic bundle of nodes with nearest-neighbor queries and the
//! extend/rewire operations that grow it (`spec.md` §4.C).

use std::{cell::RefCell, rc::Rc};

use crate::{
    checker::Checker,
    error::GraphError,
    graph::arena::{GraphArena, NodeId},
    metrics::Metrics,
    state::RealVectorState as Configuration,
};

/// Outcome of a single `Tree::extend` call: a step-limited candidate
/// configuration towards a target, together with whether the motion from
/// `from` to it is collision-free.
pub struct Extension {
    pub configuration: Configuration,
    pub valid: bool,
}

/// A rooted tree over nodes/connections held in a shared `GraphArena`.
///
/// `Tree` only tracks *membership* (which arena nodes belong to it) and its
/// root; the actual parent/child edges live in the arena so that a `Path`
/// built from this tree's nodes can share them directly (§3's "Path may
/// optionally reference an owning Tree").
pub struct Tree {
    arena: Rc<RefCell<GraphArena>>,
    root: NodeId,
    nodes: Vec<NodeId>,
}

impl Tree {
    /// Creates a new tree rooted at `root`, which must already exist in
    /// `arena` and have no parent edges.
    pub fn new(arena: Rc<RefCell<GraphArena>>, root: NodeId) -> Self {
        Tree {
            arena,
            root,
            nodes: vec![root],
        }
    }

    pub fn arena(&self) -> Rc<RefCell<GraphArena>> {
        self.arena.clone()
    }

    pub fn get_root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The cumulative cost from the root to `id`, summing connection costs
    /// along the (unique, by T1) parent chain.
    pub fn cost_to_root(&self, id: NodeId) -> Result<f64, GraphError> {
        let arena = self.arena.borrow();
        let mut cost = 0.0;
        let mut current = id;
        loop {
            let parents = arena.parents(current)?;
            match parents.first() {
                None => break,
                Some(&edge) => {
                    cost += arena.cost(edge)?;
                    current = arena.parent_of(edge)?;
                }
            }
        }
        Ok(cost)
    }

    /// The node in this tree minimizing Euclidean distance to `q`. A program
    /// error (panics) on an empty tree: that can only happen if `nodes` was
    /// emptied behind the constructor's back, which this type never does.
    pub fn nearest_neighbor(&self, q: &Configuration) -> NodeId {
        assert!(!self.nodes.is_empty(), "nearest_neighbor on an empty tree");
        let arena = self.arena.borrow();
        let mut best = self.nodes[0];
        let mut best_dist = arena
            .configuration(best)
            .expect("tree holds a stale node id")
            .distance(q);
        for &candidate in &self.nodes[1..] {
            let dist = arena
                .configuration(candidate)
                .expect("tree holds a stale node id")
                .distance(q);
            if dist < best_dist {
                best_dist = dist;
                best = candidate;
            }
        }
        best
    }

    /// The `k` nodes in this tree closest to `q`, ordered nearest-first.
    pub fn near_k(&self, q: &Configuration, k: usize) -> Vec<NodeId> {
        let arena = self.arena.borrow();
        let mut with_dist: Vec<(f64, NodeId)> = self
            .nodes
            .iter()
            .map(|&id| {
                (
                    arena
                        .configuration(id)
                        .expect("tree holds a stale node id")
                        .distance(q),
                    id,
                )
            })
            .collect();
        with_dist.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        with_dist.into_iter().take(k).map(|(_, id)| id).collect()
    }

    /// Every node in this tree within radius `r` of `q`.
    pub fn near_r(&self, q: &Configuration, r: f64) -> Vec<NodeId> {
        let arena = self.arena.borrow();
        self.nodes
            .iter()
            .copied()
            .filter(|&id| {
                arena
                    .configuration(id)
                    .expect("tree holds a stale node id")
                    .distance(q)
                    < r
            })
            .collect()
    }

    /// Produces the step-limited interpolation from `from` towards
    /// `q_target`, capped at `max_distance`, and reports whether the motion
    /// to it is collision-free per `checker`. Does not mutate the tree.
    pub fn extend(
        &self,
        from: NodeId,
        q_target: &Configuration,
        max_distance: f64,
        checker: &dyn Checker<Configuration>,
    ) -> Result<Extension, GraphError> {
        let arena = self.arena.borrow();
        let from_conf = arena.configuration(from)?;
        let dist = from_conf.distance(q_target);

        let candidate = if dist <= max_distance || dist == 0.0 {
            q_target.clone()
        } else {
            let t = max_distance / dist;
            let values = from_conf
                .values
                .iter()
                .zip(q_target.values.iter())
                .map(|(a, b)| a + (b - a) * t)
                .collect();
            Configuration { values }
        };

        let valid = checker.check_path(from_conf, &candidate);
        Ok(Extension {
            configuration: candidate,
            valid,
        })
    }

    /// Allocates a new node for `configuration`, optionally attaching it as
    /// the child of `parent` via a fresh connection of cost `cost`, and
    /// registers it in this tree's membership set. Maintains T1/T2: the new
    /// node has exactly one parent edge (or zero, only valid for the very
    /// first call establishing the root — ordinary callers always pass
    /// `Some`).
    pub fn add_node(
        &mut self,
        configuration: Configuration,
        parent: Option<NodeId>,
        cost: f64,
    ) -> Result<NodeId, GraphError> {
        let mut arena = self.arena.borrow_mut();
        let id = arena.create_node(configuration);
        if let Some(parent_id) = parent {
            let conn = arena.create_connection(parent_id, id, cost, None)?;
            arena.attach(conn)?;
        }
        drop(arena);
        self.nodes.push(id);
        Ok(id)
    }

    /// Registers a node already present in the arena (e.g. one created by a
    /// `Path` mutation sharing this tree) without creating an edge. Mirrors
    /// the original's `addNode(n, /*attach_edge=*/false)`.
    pub fn register_existing_node(&mut self, id: NodeId) {
        if !self.nodes.contains(&id) {
            self.nodes.push(id);
        }
    }

    /// Drops `id` from membership without touching the arena. Used by `Path`
    /// operations (`simplify`, `warp`, `remove_colinear_nodes`) that have
    /// already disconnected and destroyed the node themselves and only need
    /// this tree's bookkeeping to catch up.
    pub fn forget(&mut self, id: NodeId) {
        self.nodes.retain(|&n| n != id);
    }

    /// Removes `id` from the tree: detaches its edges, frees its arena slot,
    /// and drops it from membership. Removing the root is a fatal
    /// programmer error (T1 requires the root have no parent, and every
    /// other node requires exactly one — deleting the root would leave the
    /// remaining nodes parentless).
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if id == self.root {
            return Err(GraphError::FatalInvariant {
                message: "cannot remove the tree root".to_string(),
            });
        }
        let mut arena = self.arena.borrow_mut();
        arena.disconnect(id)?;
        arena.destroy_node(id)?;
        drop(arena);
        self.nodes.retain(|&n| n != id);
        Ok(())
    }

    /// RRT* neighborhood optimization (`spec.md` §4.C): first re-parents
    /// `n` through whichever neighbor offers a strictly lower cost-to-`n`
    /// with a collision-free edge, then offers every neighbor a chance to
    /// re-parent through `n` on the same terms. Ties never trigger
    /// rewiring.
    pub fn rewire(
        &mut self,
        n: NodeId,
        neighborhood: &[NodeId],
        metrics: &dyn Metrics<Configuration>,
        checker: &dyn Checker<Configuration>,
    ) -> Result<(), GraphError> {
        // Phase 1: choose the cheapest valid parent for n among neighborhood.
        let mut best_parent = None;
        let mut best_cost = self.cost_to_root(n)?;
        for &m in neighborhood {
            if m == n {
                continue;
            }
            let n_conf = self.arena.borrow().configuration(n)?.clone();
            let m_conf = self.arena.borrow().configuration(m)?.clone();
            let cost_via_m = self.cost_to_root(m)? + metrics.cost(&m_conf, &n_conf);
            if cost_via_m < best_cost && checker.check_path(&m_conf, &n_conf) {
                best_cost = cost_via_m;
                best_parent = Some(m);
            }
        }
        if let Some(new_parent) = best_parent {
            self.reparent(n, new_parent, best_cost)?;
        }

        // Phase 2: offer every neighbor a cheaper path routed through n.
        for &m in neighborhood {
            if m == n {
                continue;
            }
            let n_conf = self.arena.borrow().configuration(n)?.clone();
            let m_conf = self.arena.borrow().configuration(m)?.clone();
            let cost_via_n = self.cost_to_root(n)? + metrics.cost(&n_conf, &m_conf);
            if cost_via_n < self.cost_to_root(m)? && checker.check_path(&n_conf, &m_conf) {
                self.reparent(m, n, cost_via_n)?;
            }
        }
        Ok(())
    }

    /// Detaches `child`'s current parent edge (if any) and attaches a fresh
    /// `new_parent -> child` edge with the given cost. Transiently violates
    /// T1 between the detach and the attach, as §3 allows. Exposed for
    /// solvers (e.g. `RrtStar`'s goal re-optimization) that need to reparent
    /// a node outside of a full `rewire` pass.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId, cost: f64) -> Result<(), GraphError> {
        let mut arena = self.arena.borrow_mut();
        let old_parent_edge = arena.parents(child)?.first().copied();
        if let Some(edge) = old_parent_edge {
            arena.detach(edge)?;
        }
        let new_edge = arena.create_connection(new_parent, child, cost, None)?;
        arena.attach(new_edge)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EuclideanMetrics;
    use crate::state::RealVectorState;

    struct AcceptAllChecker;
    impl Checker<Configuration> for AcceptAllChecker {
        fn check(&self, _: &Configuration) -> bool {
            true
        }
        fn check_path(&self, _: &Configuration, _: &Configuration) -> bool {
            true
        }
        fn clone_box(&self) -> Box<dyn Checker<Configuration>> {
            Box::new(AcceptAllChecker)
        }
        fn min_distance(&self) -> f64 {
            0.0
        }
        fn group_name(&self) -> String {
            "accept-all".to_string()
        }
    }

    fn new_tree() -> (Tree, NodeId) {
        let arena = Rc::new(RefCell::new(GraphArena::new()));
        let root = arena.borrow_mut().create_node(RealVectorState::new(vec![0.0, 0.0]));
        (Tree::new(arena, root), root)
    }

    #[test]
    fn nearest_neighbor_finds_closest_node() {
        let (mut tree, root) = new_tree();
        let far = tree
            .add_node(RealVectorState::new(vec![10.0, 0.0]), Some(root), 10.0)
            .unwrap();
        let near = tree
            .add_node(RealVectorState::new(vec![1.0, 0.0]), Some(root), 1.0)
            .unwrap();

        let found = tree.nearest_neighbor(&RealVectorState::new(vec![1.1, 0.0]));
        assert_eq!(found, near);
        assert_ne!(found, far);
    }

    #[test]
    fn extend_caps_step_at_max_distance() {
        let (tree, root) = new_tree();
        let checker = AcceptAllChecker;
        let ext = tree
            .extend(root, &RealVectorState::new(vec![10.0, 0.0]), 1.0, &checker)
            .unwrap();
        assert!((ext.configuration.values[0] - 1.0).abs() < 1e-9);
        assert!(ext.valid);
    }

    #[test]
    fn add_node_establishes_parent_edge() {
        let (mut tree, root) = new_tree();
        let child = tree
            .add_node(RealVectorState::new(vec![1.0, 0.0]), Some(root), 1.0)
            .unwrap();
        assert_eq!(tree.cost_to_root(child).unwrap(), 1.0);
        assert!(tree.contains(child));
    }

    #[test]
    fn remove_node_detaches_and_forgets_it() {
        let (mut tree, root) = new_tree();
        let child = tree
            .add_node(RealVectorState::new(vec![1.0, 0.0]), Some(root), 1.0)
            .unwrap();
        tree.remove_node(child).unwrap();
        assert!(!tree.contains(child));
    }

    #[test]
    fn removing_root_is_a_fatal_invariant_error() {
        let (mut tree, root) = new_tree();
        let err = tree.remove_node(root).unwrap_err();
        assert!(matches!(err, GraphError::FatalInvariant { .. }));
    }

    #[test]
    fn rewire_reparents_through_cheaper_neighbour() {
        // root -(2)-> a, root -(1)-> b -(0.1)-> a_candidate near a.
        // n (newly added near a) should prefer the cheaper path via b.
        let (mut tree, root) = new_tree();
        let metrics = EuclideanMetrics;
        let checker = AcceptAllChecker;

        let b = tree
            .add_node(RealVectorState::new(vec![0.0, 1.0]), Some(root), 1.0)
            .unwrap();
        // n is directly reachable from root at cost 2.0, but via b it would
        // cost 1.0 (b) + distance(b, n).
        let n = tree
            .add_node(RealVectorState::new(vec![0.0, 2.0]), Some(root), 2.0)
            .unwrap();

        tree.rewire(n, &[b], &metrics, &checker).unwrap();
        assert_eq!(tree.cost_to_root(n).unwrap(), 2.0); // 1.0 + dist(b,n)=1.0
    }
}
