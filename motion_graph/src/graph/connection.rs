// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Directed parent->child edges (`spec.md` §4.B), grounded on
//! `examples/original_source/graph_core/src/graph_core/graph/connection.cpp`.

use crate::{
    error::GraphError,
    graph::arena::{ConnectionData, ConnectionId, GraphArena, NodeId},
};

impl GraphArena {
    /// Constructs a new, detached connection between `parent` and `child`,
    /// caching the Euclidean distance between their configurations (C1).
    /// The connection is not attached to either endpoint's adjacency list
    /// until `attach` is called.
    pub fn create_connection(
        &mut self,
        parent: NodeId,
        child: NodeId,
        cost: f64,
        time: Option<f64>,
    ) -> Result<ConnectionId, GraphError> {
        let euclidean_norm = self.configuration(parent)?.distance(self.configuration(child)?);
        let data = ConnectionData {
            parent,
            child,
            euclidean_norm,
            cost,
            added: false,
            time,
        };
        Ok(self.allocate_connection_slot(data))
    }

    /// Attaches a connection, pushing it into `parent.children` and
    /// `child.parents` and marking it `added`. Establishes invariant N1/T2
    /// for this edge.
    pub fn attach(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        let (parent, child) = {
            let data = self.connection(id)?;
            (data.parent, data.child)
        };
        self.add_child_connection(parent, id)?;
        self.add_parent_connection(child, id)?;
        self.connection_mut(id)?.added = true;
        Ok(())
    }

    /// Removes a connection from both endpoint adjacency lists. Idempotent
    /// with respect to `added`: detaching an already-detached connection is
    /// a no-op.
    pub fn detach(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        let data = self.connection(id)?;
        if !data.added {
            return Ok(());
        }
        let (parent, child) = (data.parent, data.child);
        self.remove_child_connection(parent, id)?;
        self.remove_parent_connection(child, id)?;
        self.connection_mut(id)?.added = false;
        Ok(())
    }

    /// Detaches, swaps endpoints, and re-attaches. The cached norm is
    /// unchanged (Euclidean distance is symmetric).
    pub fn flip(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        self.detach(id)?;
        {
            let data = self.connection_mut(id)?;
            std::mem::swap(&mut data.parent, &mut data.child);
        }
        self.attach(id)
    }

    /// Produces a new, attached connection between freshly allocated copies
    /// of this connection's endpoint configurations. Cost is preserved.
    pub fn clone_connection(&mut self, id: ConnectionId) -> Result<ConnectionId, GraphError> {
        let (parent_conf, child_conf, cost, time) = {
            let data = self.connection(id)?;
            let parent_conf = self.configuration(data.parent)?.clone();
            let child_conf = self.configuration(data.child)?.clone();
            (parent_conf, child_conf, data.cost, data.time)
        };
        let new_parent = self.create_node(parent_conf);
        let new_child = self.create_node(child_conf);
        let new_id = self.create_connection(new_parent, new_child, cost, time)?;
        self.attach(new_id)?;
        Ok(new_id)
    }

    /// Frees a detached connection's slot. Internal helper used by
    /// operations (`simplify`, `insert_at`, ...) that replace an edge
    /// outright rather than leaving it dangling for later reuse.
    pub(crate) fn destroy_connection(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        self.detach(id)?;
        self.free_connection_slot(id);
        Ok(())
    }

    /// Returns true when `self` and `other` point in the same direction
    /// (not anti-parallel), i.e. the signed dot product of their direction
    /// vectors is at least `||self|| * ||other|| - tol`.
    pub fn is_parallel(
        &self,
        a: ConnectionId,
        b: ConnectionId,
        tol: f64,
    ) -> Result<bool, GraphError> {
        let (a_parent, a_child, a_norm) = {
            let data = self.connection(a)?;
            (data.parent, data.child, data.euclidean_norm)
        };
        let (b_parent, b_child, b_norm) = {
            let data = self.connection(b)?;
            (data.parent, data.child, data.euclidean_norm)
        };

        let av = diff(self.configuration(a_child)?, self.configuration(a_parent)?);
        let bv = diff(self.configuration(b_child)?, self.configuration(b_parent)?);
        let scalar: f64 = av.iter().zip(bv.iter()).map(|(x, y)| x * y).sum();

        Ok(scalar > (a_norm * b_norm) - tol)
    }
}

fn diff(
    a: &crate::state::RealVectorState,
    b: &crate::state::RealVectorState,
) -> Vec<f64> {
    a.values.iter().zip(b.values.iter()).map(|(x, y)| x - y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RealVectorState;

    fn arena_with_line() -> (GraphArena, crate::graph::arena::NodeId, crate::graph::arena::NodeId) {
        let mut arena = GraphArena::new();
        let a = arena.create_node(RealVectorState::new(vec![0.0, 0.0]));
        let b = arena.create_node(RealVectorState::new(vec![1.0, 0.0]));
        (arena, a, b)
    }

    #[test]
    fn connection_caches_euclidean_norm() {
        let (mut arena, a, b) = arena_with_line();
        let conn = arena.create_connection(a, b, 0.0, None).unwrap();
        assert_eq!(arena.norm(conn).unwrap(), 1.0);
    }

    #[test]
    fn attach_is_visible_in_both_adjacency_lists() {
        let (mut arena, a, b) = arena_with_line();
        let conn = arena.create_connection(a, b, 1.0, None).unwrap();
        arena.attach(conn).unwrap();
        assert!(arena.children(a).unwrap().contains(&conn));
        assert!(arena.parents(b).unwrap().contains(&conn));
        assert!(arena.is_added(conn).unwrap());
    }

    #[test]
    fn detach_is_idempotent() {
        let (mut arena, a, b) = arena_with_line();
        let conn = arena.create_connection(a, b, 1.0, None).unwrap();
        arena.attach(conn).unwrap();
        arena.detach(conn).unwrap();
        assert!(!arena.children(a).unwrap().contains(&conn));
        arena.detach(conn).unwrap();
        assert!(!arena.is_added(conn).unwrap());
    }

    #[test]
    fn flip_swaps_endpoints_and_preserves_norm() {
        let (mut arena, a, b) = arena_with_line();
        let conn = arena.create_connection(a, b, 1.0, None).unwrap();
        arena.attach(conn).unwrap();
        arena.flip(conn).unwrap();
        assert_eq!(arena.parent_of(conn).unwrap(), b);
        assert_eq!(arena.child_of(conn).unwrap(), a);
        assert_eq!(arena.norm(conn).unwrap(), 1.0);
        assert!(arena.children(b).unwrap().contains(&conn));
        assert!(arena.parents(a).unwrap().contains(&conn));
    }

    #[test]
    fn clone_connection_allocates_fresh_endpoints() {
        let (mut arena, a, b) = arena_with_line();
        let conn = arena.create_connection(a, b, 3.0, None).unwrap();
        arena.attach(conn).unwrap();
        let cloned = arena.clone_connection(conn).unwrap();
        assert_ne!(arena.parent_of(cloned).unwrap(), a);
        assert_ne!(arena.child_of(cloned).unwrap(), b);
        assert_eq!(arena.cost(cloned).unwrap(), 3.0);
        assert!(arena.is_added(cloned).unwrap());
    }

    #[test]
    fn collinear_same_direction_connections_are_parallel() {
        let mut arena = GraphArena::new();
        let a = arena.create_node(RealVectorState::new(vec![0.0, 0.0]));
        let b = arena.create_node(RealVectorState::new(vec![1.0, 0.0]));
        let c = arena.create_node(RealVectorState::new(vec![2.0, 0.0]));
        let ab = arena.create_connection(a, b, 0.0, None).unwrap();
        let bc = arena.create_connection(b, c, 0.0, None).unwrap();
        assert!(arena.is_parallel(ab, bc, 1e-9).unwrap());
    }

    #[test]
    fn perpendicular_connections_are_not_parallel() {
        let mut arena = GraphArena::new();
        let a = arena.create_node(RealVectorState::new(vec![0.0, 0.0]));
        let b = arena.create_node(RealVectorState::new(vec![1.0, 0.0]));
        let c = arena.create_node(RealVectorState::new(vec![1.0, 1.0]));
        let ab = arena.create_connection(a, b, 0.0, None).unwrap();
        let bc = arena.create_connection(b, c, 0.0, None).unwrap();
        assert!(!arena.is_parallel(ab, bc, 1e-9).unwrap());
    }
}
