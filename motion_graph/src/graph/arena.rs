// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The shared arena that resolves the cyclic node/connection ownership the
//! original `pathplan::Node`/`pathplan::Connection` pair expressed through
//! `shared_ptr` back-references (see `examples/original_source/graph_core/src/graph_core/graph/connection.cpp`).
//!
//! Nodes and Connections are stored by generation-checked index. A stale id
//! (its slot has since been freed and reused) is detected rather than
//! silently aliasing a different value — this is the Rust-native answer to
//! `spec.md`'s "detach-while-referenced" Design Note.

use crate::{error::GraphError, state::RealVectorState as Configuration};

/// Identifies a `Node` within a `GraphArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Identifies a `Connection` within a `GraphArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

pub(crate) struct NodeData {
    pub(crate) configuration: Configuration,
    pub(crate) parents: Vec<ConnectionId>,
    pub(crate) children: Vec<ConnectionId>,
}

pub(crate) struct ConnectionData {
    pub(crate) parent: NodeId,
    pub(crate) child: NodeId,
    pub(crate) euclidean_norm: f64,
    pub(crate) cost: f64,
    pub(crate) added: bool,
    pub(crate) time: Option<f64>,
}

enum Slot<T> {
    Occupied(T),
    Free,
}

/// Owns every `Node` and `Connection` shared by a family of `Tree`s and
/// `Path`s. See the module docs for why this exists instead of `Rc`-cycles.
#[derive(Default)]
pub struct GraphArena {
    nodes: Vec<Slot<NodeData>>,
    node_generation: Vec<u32>,
    free_nodes: Vec<usize>,

    connections: Vec<Slot<ConnectionData>>,
    connection_generation: Vec<u32>,
    free_connections: Vec<usize>,
}

impl GraphArena {
    pub fn new() -> Self {
        GraphArena {
            nodes: Vec::new(),
            node_generation: Vec::new(),
            free_nodes: Vec::new(),
            connections: Vec::new(),
            connection_generation: Vec::new(),
            free_connections: Vec::new(),
        }
    }

    /// Allocates a new, unconnected node holding `configuration`. Invariant
    /// N2 (a node never appears in its own adjacency lists) holds trivially
    /// for a freshly created node.
    pub fn create_node(&mut self, configuration: Configuration) -> NodeId {
        let data = NodeData {
            configuration,
            parents: Vec::new(),
            children: Vec::new(),
        };
        if let Some(index) = self.free_nodes.pop() {
            self.nodes[index] = Slot::Occupied(data);
            NodeId {
                index,
                generation: self.node_generation[index],
            }
        } else {
            let index = self.nodes.len();
            self.nodes.push(Slot::Occupied(data));
            self.node_generation.push(0);
            NodeId { index, generation: 0 }
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        if self.node_generation.get(id.index) != Some(&id.generation) {
            return Err(GraphError::Stale);
        }
        match &self.nodes[id.index] {
            Slot::Occupied(data) => Ok(data),
            Slot::Free => Err(GraphError::Stale),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, GraphError> {
        if self.node_generation.get(id.index) != Some(&id.generation) {
            return Err(GraphError::Stale);
        }
        match &mut self.nodes[id.index] {
            Slot::Occupied(data) => Ok(data),
            Slot::Free => Err(GraphError::Stale),
        }
    }

    pub(crate) fn connection(&self, id: ConnectionId) -> Result<&ConnectionData, GraphError> {
        if self.connection_generation.get(id.index) != Some(&id.generation) {
            return Err(GraphError::Stale);
        }
        match &self.connections[id.index] {
            Slot::Occupied(data) => Ok(data),
            Slot::Free => Err(GraphError::Stale),
        }
    }

    pub(crate) fn connection_mut(
        &mut self,
        id: ConnectionId,
    ) -> Result<&mut ConnectionData, GraphError> {
        if self.connection_generation.get(id.index) != Some(&id.generation) {
            return Err(GraphError::Stale);
        }
        match &mut self.connections[id.index] {
            Slot::Occupied(data) => Ok(data),
            Slot::Free => Err(GraphError::Stale),
        }
    }

    pub(crate) fn allocate_connection_slot(&mut self, data: ConnectionData) -> ConnectionId {
        if let Some(index) = self.free_connections.pop() {
            self.connections[index] = Slot::Occupied(data);
            ConnectionId {
                index,
                generation: self.connection_generation[index],
            }
        } else {
            let index = self.connections.len();
            self.connections.push(Slot::Occupied(data));
            self.connection_generation.push(0);
            ConnectionId { index, generation: 0 }
        }
    }

    /// Returns the configuration a node holds. No operation ever mutates it
    /// after construction (§3).
    pub fn configuration(&self, id: NodeId) -> Result<&Configuration, GraphError> {
        Ok(&self.node(id)?.configuration)
    }

    pub fn parents(&self, id: NodeId) -> Result<&[ConnectionId], GraphError> {
        Ok(&self.node(id)?.parents)
    }

    pub fn children(&self, id: NodeId) -> Result<&[ConnectionId], GraphError> {
        Ok(&self.node(id)?.children)
    }

    pub fn parent_of(&self, id: ConnectionId) -> Result<NodeId, GraphError> {
        Ok(self.connection(id)?.parent)
    }

    pub fn child_of(&self, id: ConnectionId) -> Result<NodeId, GraphError> {
        Ok(self.connection(id)?.child)
    }

    pub fn norm(&self, id: ConnectionId) -> Result<f64, GraphError> {
        Ok(self.connection(id)?.euclidean_norm)
    }

    pub fn cost(&self, id: ConnectionId) -> Result<f64, GraphError> {
        Ok(self.connection(id)?.cost)
    }

    pub fn set_cost(&mut self, id: ConnectionId, cost: f64) -> Result<(), GraphError> {
        self.connection_mut(id)?.cost = cost;
        Ok(())
    }

    pub fn time(&self, id: ConnectionId) -> Result<Option<f64>, GraphError> {
        Ok(self.connection(id)?.time)
    }

    pub fn is_added(&self, id: ConnectionId) -> Result<bool, GraphError> {
        Ok(self.connection(id)?.added)
    }

    /// Frees a node's slot. The caller must have already detached every
    /// incident edge via `disconnect` — attempting to destroy a still
    /// attached node is a fatal programmer error (`spec.md` §3 Lifecycle),
    /// so this panics rather than returning `Err`.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let data = self.node(id)?;
        assert!(
            data.parents.is_empty() && data.children.is_empty(),
            "destroy_node: node {:?} still has attached edges; call disconnect() first",
            id
        );
        self.nodes[id.index] = Slot::Free;
        self.node_generation[id.index] = self.node_generation[id.index].wrapping_add(1);
        self.free_nodes.push(id.index);
        Ok(())
    }

    pub(crate) fn free_connection_slot(&mut self, id: ConnectionId) {
        self.connections[id.index] = Slot::Free;
        self.connection_generation[id.index] =
            self.connection_generation[id.index].wrapping_add(1);
        self.free_connections.push(id.index);
    }
}
