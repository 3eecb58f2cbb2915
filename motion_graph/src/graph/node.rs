// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Node-level adjacency operations (`spec.md` §4.A).
//!
//! A `Node` is identified by a `NodeId` and owns no behaviour of its own
//! beyond its two adjacency lists; all mutation goes through `GraphArena` so
//! that invariant N1 (every edge listed in a node's adjacency list points
//! back to that node) stays enforceable in one place.

use crate::{
    error::GraphError,
    graph::arena::{ConnectionId, GraphArena, NodeId},
};

impl GraphArena {
    /// Appends `connection` to this node's parent list. Internal: called
    /// only from `Connection::attach`, which is responsible for maintaining
    /// N1 by only ever calling this with a connection whose `child` is
    /// `id`.
    pub(crate) fn add_parent_connection(
        &mut self,
        id: NodeId,
        connection: ConnectionId,
    ) -> Result<(), GraphError> {
        self.node_mut(id)?.parents.push(connection);
        Ok(())
    }

    /// Appends `connection` to this node's child list. See
    /// `add_parent_connection` for the N1 contract this relies on.
    pub(crate) fn add_child_connection(
        &mut self,
        id: NodeId,
        connection: ConnectionId,
    ) -> Result<(), GraphError> {
        self.node_mut(id)?.children.push(connection);
        Ok(())
    }

    pub(crate) fn remove_parent_connection(
        &mut self,
        id: NodeId,
        connection: ConnectionId,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.parents.retain(|&c| c != connection);
        Ok(())
    }

    pub(crate) fn remove_child_connection(
        &mut self,
        id: NodeId,
        connection: ConnectionId,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.children.retain(|&c| c != connection);
        Ok(())
    }

    /// Detaches every edge incident to `id`, leaving the node isolated but
    /// alive. Required before `destroy_node`.
    pub fn disconnect(&mut self, id: NodeId) -> Result<(), GraphError> {
        let parents = self.parents(id)?.to_vec();
        let children = self.children(id)?.to_vec();

        for conn in parents {
            self.detach(conn)?;
        }
        for conn in children {
            self.detach(conn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RealVectorState;

    #[test]
    fn fresh_node_has_empty_adjacency() {
        let mut arena = GraphArena::new();
        let n = arena.create_node(RealVectorState::new(vec![0.0]));
        assert!(arena.parents(n).unwrap().is_empty());
        assert!(arena.children(n).unwrap().is_empty());
    }

    #[test]
    fn disconnect_detaches_all_incident_edges() {
        let mut arena = GraphArena::new();
        let a = arena.create_node(RealVectorState::new(vec![0.0]));
        let b = arena.create_node(RealVectorState::new(vec![1.0]));
        let c = arena.create_node(RealVectorState::new(vec![2.0]));

        let ab = arena.create_connection(a, b, 0.0, None).unwrap();
        arena.attach(ab).unwrap();
        let bc = arena.create_connection(b, c, 0.0, None).unwrap();
        arena.attach(bc).unwrap();

        arena.disconnect(b).unwrap();

        assert!(arena.parents(b).unwrap().is_empty());
        assert!(arena.children(b).unwrap().is_empty());
        assert!(!arena.children(a).unwrap().contains(&ab));
        assert!(!arena.parents(c).unwrap().contains(&bc));
        assert!(!arena.is_added(ab).unwrap());
        assert!(!arena.is_added(bc).unwrap());
    }
}
