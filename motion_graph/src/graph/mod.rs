// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The node/connection/tree/path graph model (`spec.md` §3-4) and its
//! path-refinement algorithms.

pub mod arena;
mod connection;
mod node;
pub mod path;
pub mod tree;

pub use arena::{ConnectionId, GraphArena, NodeId};
pub use path::Path;
pub use tree::{Extension, Tree};
