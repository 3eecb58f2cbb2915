// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! An ordered sequence of attached connections (`spec.md` §4.D), grounded on
//! `examples/original_source/graph_core/src/graph_core/graph/path.cpp`.

use std::{cell::RefCell, rc::Rc};

use crate::{
    checker::Checker,
    error::GraphError,
    graph::{
        arena::{ConnectionId, GraphArena, NodeId},
        tree::Tree,
    },
    metrics::Metrics,
    state::RealVectorState as Configuration,
    time::{Duration, Instant},
};

/// Tolerance for `find_connection`'s "is q on this segment" test:
/// `|p-q| + |q-c| - |p-c| < tol`.
const FIND_CONNECTION_TOLERANCE: f64 = 1e-5;
/// Tolerance for treating a node's configuration as identical to a
/// requested waypoint.
const WAYPOINT_IDENTITY_TOLERANCE: f64 = 1e-6;
/// Tolerance passed to `GraphArena::is_parallel` when merging colinear nodes.
const PARALLEL_TOLERANCE: f64 = 1e-6;

/// An ordered sequence of mutually attached connections from a start
/// configuration to a goal configuration.
///
/// A `Path` may optionally share a `Tree`'s arena and keep it informed of
/// structural changes (§3's Tree-sync requirement): whenever a mutation adds
/// or destroys a node, the owning `Tree`'s membership set is updated in
/// lock-step.
pub struct Path {
    arena: Rc<RefCell<GraphArena>>,
    connections: Vec<ConnectionId>,
    changed: Vec<bool>,
    tree: Option<Rc<RefCell<Tree>>>,
}

impl Path {
    /// Builds a path from an already-attached, endpoint-linked sequence of
    /// connections. `changed` is initialized `true` for every index except
    /// 0.
    pub fn new_from_connections(
        arena: Rc<RefCell<GraphArena>>,
        connections: Vec<ConnectionId>,
        tree: Option<Rc<RefCell<Tree>>>,
    ) -> Result<Self, GraphError> {
        if connections.is_empty() {
            return Err(GraphError::InvalidArgument {
                message: "a path needs at least one connection".to_string(),
            });
        }
        {
            let a = arena.borrow();
            for w in connections.windows(2) {
                if a.child_of(w[0])? != a.parent_of(w[1])? {
                    return Err(GraphError::InvalidArgument {
                        message: "connections are not endpoint-linked".to_string(),
                    });
                }
            }
            for &c in &connections {
                if !a.is_added(c)? {
                    return Err(GraphError::InvalidArgument {
                        message: "path connections must be attached".to_string(),
                    });
                }
            }
        }
        let mut changed = vec![true; connections.len()];
        changed[0] = false;
        Ok(Path {
            arena,
            connections,
            changed,
            tree,
        })
    }

    /// Builds a path from a sequence of nodes, creating and attaching a
    /// fresh connection between each consecutive pair with cost taken from
    /// `metrics`.
    pub fn new_from_nodes(
        arena: Rc<RefCell<GraphArena>>,
        nodes: Vec<NodeId>,
        metrics: &dyn Metrics<Configuration>,
        tree: Option<Rc<RefCell<Tree>>>,
    ) -> Result<Self, GraphError> {
        if nodes.len() < 2 {
            return Err(GraphError::InvalidArgument {
                message: "a path needs at least two nodes".to_string(),
            });
        }
        let mut connections = Vec::with_capacity(nodes.len() - 1);
        {
            let mut a = arena.borrow_mut();
            for w in nodes.windows(2) {
                let cost = metrics.cost(a.configuration(w[0])?, a.configuration(w[1])?);
                let conn = a.create_connection(w[0], w[1], cost, None)?;
                a.attach(conn)?;
                connections.push(conn);
            }
        }
        let mut changed = vec![true; connections.len()];
        changed[0] = false;
        Ok(Path {
            arena,
            connections,
            changed,
            tree,
        })
    }

    /// Deep-copies every connection (and its endpoint configurations),
    /// preserving per-connection cost and the `changed` vector. Does not
    /// carry over the owning tree reference.
    pub fn clone_path(&self) -> Result<Self, GraphError> {
        let mut new_connections = Vec::with_capacity(self.connections.len());
        {
            let mut a = self.arena.borrow_mut();
            for &c in &self.connections {
                new_connections.push(a.clone_connection(c)?);
            }
        }
        Ok(Path {
            arena: self.arena.clone(),
            connections: new_connections,
            changed: self.changed.clone(),
            tree: None,
        })
    }

    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    pub fn total_cost(&self) -> Result<f64, GraphError> {
        let a = self.arena.borrow();
        let mut total = 0.0;
        for &c in &self.connections {
            total += a.cost(c)?;
        }
        Ok(total)
    }

    /// Recomputes every connection's cost from `metrics` and returns the new
    /// total.
    pub fn recompute_cost(&mut self, metrics: &dyn Metrics<Configuration>) -> Result<f64, GraphError> {
        let mut a = self.arena.borrow_mut();
        let mut total = 0.0;
        for &c in &self.connections {
            let p = a.configuration(a.parent_of(c)?)?.clone();
            let ch = a.configuration(a.child_of(c)?)?.clone();
            let cost = metrics.cost(&p, &ch);
            a.set_cost(c, cost)?;
            total += cost;
        }
        Ok(total)
    }

    pub fn euclidean_length(&self) -> Result<f64, GraphError> {
        let a = self.arena.borrow();
        euclidean_length_locked(&self.connections, &a)
    }

    pub fn waypoints(&self) -> Result<Vec<Configuration>, GraphError> {
        let a = self.arena.borrow();
        let mut out = Vec::with_capacity(self.connections.len() + 1);
        out.push(a.configuration(a.parent_of(self.connections[0])?)?.clone());
        for &c in &self.connections {
            out.push(a.configuration(a.child_of(c)?)?.clone());
        }
        Ok(out)
    }

    pub fn nodes(&self) -> Result<Vec<NodeId>, GraphError> {
        let a = self.arena.borrow();
        let mut out = Vec::with_capacity(self.connections.len() + 1);
        out.push(a.parent_of(self.connections[0])?);
        for &c in &self.connections {
            out.push(a.child_of(c)?);
        }
        Ok(out)
    }

    /// The point reached by walking `s` units of Euclidean arc length along
    /// the path from its start. `s <= 0` snaps to the start; `s` beyond the
    /// total length snaps to the goal.
    pub fn point_at_arc_length(&self, s: f64) -> Result<Configuration, GraphError> {
        let a = self.arena.borrow();
        if s <= 0.0 {
            return Ok(a.configuration(a.parent_of(self.connections[0])?)?.clone());
        }
        let mut remaining = s;
        for &c in &self.connections {
            let norm = a.norm(c)?;
            if remaining <= norm {
                let p = a.configuration(a.parent_of(c)?)?;
                let ch = a.configuration(a.child_of(c)?)?;
                let t = if norm > 0.0 { remaining / norm } else { 0.0 };
                return Ok(lerp(p, ch, t));
            }
            remaining -= norm;
        }
        let last = *self.connections.last().expect("path is never empty");
        Ok(a.configuration(a.child_of(last)?)?.clone())
    }

    /// The normalized (0..1) cumulative arc length of `q`, which must lie on
    /// the path within `FIND_CONNECTION_TOLERANCE`.
    pub fn arc_length_of(&self, q: &Configuration) -> Result<f64, GraphError> {
        let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
        let a = self.arena.borrow();
        let mut cumulative = 0.0;
        for &c in &self.connections[..idx] {
            cumulative += a.norm(c)?;
        }
        let conn = self.connections[idx];
        let p = a.configuration(a.parent_of(conn)?)?;
        cumulative += p.distance(q);
        let total = euclidean_length_locked(&self.connections, &a)?;
        if total == 0.0 {
            Ok(0.0)
        } else {
            Ok(cumulative / total)
        }
    }

    /// Locates the first connection for which `q` lies on its segment (by
    /// the triangle-equality test), returning its index.
    pub fn find_connection(&self, q: &Configuration) -> Result<Option<usize>, GraphError> {
        let a = self.arena.borrow();
        for (i, &c) in self.connections.iter().enumerate() {
            let p = a.configuration(a.parent_of(c)?)?;
            let ch = a.configuration(a.child_of(c)?)?;
            let pq = p.distance(q);
            let qc = q.distance(ch);
            let pc = p.distance(ch);
            if (pq + qc - pc).abs() < FIND_CONNECTION_TOLERANCE {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Projects `q` onto whichever connection's segment is closest,
    /// clamping the foot to the segment's endpoints. Falls back to
    /// `find_closer_node` if every connection is degenerate (zero length).
    pub fn project_on_closest_connection(&self, q: &Configuration) -> Result<(Configuration, usize), GraphError> {
        let a = self.arena.borrow();
        let mut best: Option<(Configuration, usize, f64)> = None;
        for (i, &c) in self.connections.iter().enumerate() {
            let p = a.configuration(a.parent_of(c)?)?;
            let ch = a.configuration(a.child_of(c)?)?;
            let (foot, dist) = project_onto_segment(p, ch, q);
            if best.as_ref().map_or(true, |(_, _, d)| dist < *d) {
                best = Some((foot, i, dist));
            }
        }
        drop(a);
        match best {
            Some((foot, i, dist)) if dist.is_finite() => Ok((foot, i)),
            _ => {
                let node = self.find_closer_node(q)?;
                let conf = self.arena.borrow().configuration(node)?.clone();
                Ok((conf, 0))
            }
        }
    }

    /// Like `project_on_closest_connection`, but only the connection at
    /// `n_conn` or its immediate successor are admissible, preventing
    /// projection jumps on paths with nearly-parallel segments.
    pub fn project_on_keeping_past(&self, q: &Configuration, n_conn: usize) -> Result<(Configuration, usize), GraphError> {
        let a = self.arena.borrow();
        let candidates: Vec<usize> = [n_conn, n_conn + 1]
            .into_iter()
            .filter(|&i| i < self.connections.len())
            .collect();
        let mut best: Option<(Configuration, usize, f64)> = None;
        for &i in &candidates {
            let c = self.connections[i];
            let p = a.configuration(a.parent_of(c)?)?;
            let ch = a.configuration(a.child_of(c)?)?;
            let (foot, dist) = project_onto_segment(p, ch, q);
            if best.as_ref().map_or(true, |(_, _, d)| dist < *d) {
                best = Some((foot, i, dist));
            }
        }
        drop(a);
        match best {
            Some((foot, i, dist)) if dist.is_finite() => Ok((foot, i)),
            _ => {
                let node = self.find_closer_node(q)?;
                Ok((self.arena.borrow().configuration(node)?.clone(), n_conn))
            }
        }
    }

    /// Like `project_on_keeping_past`, but additionally requires the new
    /// normalized arc length to be at least `past_abscissa`; otherwise the
    /// previous projection (reconstructed from `past_abscissa`) is kept.
    pub fn project_on_keeping_curvilinear_abscissa(
        &self,
        q: &Configuration,
        n_conn: usize,
        past_abscissa: f64,
    ) -> Result<(Configuration, usize, f64), GraphError> {
        let (foot, idx) = self.project_on_keeping_past(q, n_conn)?;
        let new_abscissa = self.arc_length_of(&foot).unwrap_or(past_abscissa);
        if new_abscissa >= past_abscissa {
            Ok((foot, idx, new_abscissa))
        } else {
            let total = self.euclidean_length()?;
            let kept = self.point_at_arc_length(past_abscissa * total)?;
            Ok((kept, n_conn, past_abscissa))
        }
    }

    /// Splits the connection containing `q` into two: a fresh node at `q`
    /// and two new connections replacing the original. `+inf` cost
    /// propagates to both halves. If this path shares an owning tree, the
    /// new node is registered with it.
    pub fn insert_at(&mut self, q: &Configuration, metrics: &dyn Metrics<Configuration>) -> Result<NodeId, GraphError> {
        let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
        let old_conn = self.connections[idx];

        let mut a = self.arena.borrow_mut();
        let parent = a.parent_of(old_conn)?;
        let child = a.child_of(old_conn)?;
        let old_cost = a.cost(old_conn)?;
        let parent_conf = a.configuration(parent)?.clone();
        let child_conf = a.configuration(child)?.clone();

        a.destroy_connection(old_conn)?;
        let new_node = a.create_node(q.clone());

        let (cost_pn, cost_nc) = if old_cost.is_infinite() {
            (f64::INFINITY, f64::INFINITY)
        } else {
            (metrics.cost(&parent_conf, q), metrics.cost(q, &child_conf))
        };

        let pn = a.create_connection(parent, new_node, cost_pn, None)?;
        a.attach(pn)?;
        let nc = a.create_connection(new_node, child, cost_nc, None)?;
        a.attach(nc)?;
        drop(a);

        let old_changed = self.changed[idx];
        self.connections.splice(idx..=idx, [pn, nc]);
        self.changed.splice(idx..=idx, [old_changed, true]);

        if let Some(tree) = &self.tree {
            tree.borrow_mut().register_existing_node(new_node);
        }

        Ok(new_node)
    }

    /// Repeatedly merges interior nodes whose incident edges are parallel
    /// into a single edge, skipping nodes in `whitelist` or the tree root.
    /// Returns whether anything was removed.
    pub fn remove_colinear_nodes(&mut self, whitelist: &[NodeId]) -> Result<bool, GraphError> {
        let mut any_removed = false;
        loop {
            let mut removed_this_pass = false;
            let mut i = 0;
            while i + 1 < self.connections.len() {
                let c1 = self.connections[i];
                let c2 = self.connections[i + 1];
                let n = self.arena.borrow().child_of(c1)?;
                debug_assert_eq!(n, self.arena.borrow().parent_of(c2)?);

                let is_root = self
                    .tree
                    .as_ref()
                    .map(|t| t.borrow().get_root() == n)
                    .unwrap_or(false);
                let parallel = self.arena.borrow().is_parallel(c1, c2, PARALLEL_TOLERANCE)?;

                if !whitelist.contains(&n) && !is_root && parallel {
                    let (parent, child, summed_cost) = {
                        let a = self.arena.borrow();
                        (a.parent_of(c1)?, a.child_of(c2)?, a.cost(c1)? + a.cost(c2)?)
                    };
                    let new_conn = {
                        let mut a = self.arena.borrow_mut();
                        a.destroy_connection(c1)?;
                        a.destroy_connection(c2)?;
                        a.destroy_node(n)?;
                        let nc = a.create_connection(parent, child, summed_cost, None)?;
                        a.attach(nc)?;
                        nc
                    };
                    if let Some(tree) = &self.tree {
                        tree.borrow_mut().forget(n);
                    }
                    self.connections.splice(i..=i + 1, [new_conn]);
                    self.changed.splice(i..=i + 1, [true]);
                    removed_this_pass = true;
                    any_removed = true;
                } else {
                    i += 1;
                }
            }
            if !removed_this_pass {
                break;
            }
        }
        Ok(any_removed)
    }

    /// Bisection-based smoothing: for each interior vertex whose incident
    /// edges both exceed `min_edge_length` and whose `changed` flag is set,
    /// tries up to 5 bisection steps to pull it towards the chord midpoint
    /// of its neighbors without raising cost or introducing a collision.
    /// Stops early once `time_budget * 0.98` has elapsed. Returns whether
    /// any vertex is still marked `changed`.
    pub fn warp(
        &mut self,
        min_edge_length: f64,
        time_budget: Duration,
        metrics: &dyn Metrics<Configuration>,
        checker: &dyn Checker<Configuration>,
    ) -> Result<bool, GraphError> {
        let start = Instant::now();
        let deadline = time_budget.mul_f64(0.98);

        let mut i = 1;
        while i + 1 < self.nodes()?.len() {
            if start.elapsed() > deadline {
                break;
            }

            let parent_conn = self.connections[i - 1];
            let child_conn = self.connections[i];
            let vertex_changed = self.changed[i - 1] || self.changed[i];

            let (parent_node, vertex_node, child_node, prev, vertex, next, both_long_enough) = {
                let a = self.arena.borrow();
                let parent_node = a.parent_of(parent_conn)?;
                let vertex_node = a.child_of(parent_conn)?;
                debug_assert_eq!(vertex_node, a.parent_of(child_conn)?);
                let child_node = a.child_of(child_conn)?;
                let prev = a.configuration(parent_node)?.clone();
                let vertex = a.configuration(vertex_node)?.clone();
                let next = a.configuration(child_node)?.clone();
                let ok = a.norm(parent_conn)? > min_edge_length && a.norm(child_conn)? > min_edge_length;
                (parent_node, vertex_node, child_node, prev, vertex, next, ok)
            };

            if !both_long_enough || !vertex_changed {
                self.changed[i - 1] = false;
                self.changed[i] = false;
                i += 1;
                continue;
            }

            let center = midpoint(&prev, &next);
            let raw_direction = subtract(&vertex, &center);
            let max_dist_initial = vector_norm(&raw_direction);
            if max_dist_initial == 0.0 {
                self.changed[i - 1] = false;
                self.changed[i] = false;
                i += 1;
                continue;
            }
            let mut direction = raw_direction;
            scale_in_place(&mut direction, 1.0 / max_dist_initial);

            let original_cost = metrics.cost(&prev, &vertex) + metrics.cost(&vertex, &next);
            let mut min_distance = 0.0_f64;
            let mut max_distance = max_dist_initial;
            let mut best_point: Option<Configuration> = None;
            let mut iter = 0;
            while iter < 5 && (max_distance - min_distance) > min_edge_length {
                let distance = (min_distance + max_distance) / 2.0;
                let candidate = add_scaled(&center, &direction, distance);
                let candidate_cost = metrics.cost(&prev, &candidate) + metrics.cost(&candidate, &next);
                let valid = checker.check_path(&prev, &candidate) && checker.check_path(&candidate, &next);
                if candidate_cost < original_cost && valid {
                    max_distance = distance;
                    best_point = Some(candidate);
                } else {
                    min_distance = distance;
                }
                iter += 1;
            }

            match best_point {
                Some(point) => {
                    let new_vertex = {
                        let mut a = self.arena.borrow_mut();
                        a.destroy_connection(parent_conn)?;
                        a.destroy_connection(child_conn)?;
                        a.destroy_node(vertex_node)?;
                        a.create_node(point.clone())
                    };
                    let (new_parent_conn, new_child_conn) = {
                        let mut a = self.arena.borrow_mut();
                        let pc = metrics.cost(&prev, &point);
                        let cc = metrics.cost(&point, &next);
                        let pn = a.create_connection(parent_node, new_vertex, pc, None)?;
                        a.attach(pn)?;
                        let nc = a.create_connection(new_vertex, child_node, cc, None)?;
                        a.attach(nc)?;
                        (pn, nc)
                    };
                    if let Some(tree) = &self.tree {
                        let mut t = tree.borrow_mut();
                        t.forget(vertex_node);
                        t.register_existing_node(new_vertex);
                    }
                    self.connections[i - 1] = new_parent_conn;
                    self.connections[i] = new_child_conn;
                    self.changed[i - 1] = true;
                    self.changed[i] = true;
                }
                None => {
                    self.changed[i - 1] = false;
                    self.changed[i] = false;
                }
            }
            i += 1;
        }

        Ok(self.changed.iter().any(|&c| c))
    }

    /// A single greedy pass: for each connection whose length is at or
    /// below `threshold` (and always attempted at index 0 when it qualifies
    /// under the same test), replaces it and its successor by a direct
    /// shortcut if that motion is collision-free. Returns whether anything
    /// was simplified.
    pub fn simplify(
        &mut self,
        threshold: f64,
        metrics: &dyn Metrics<Configuration>,
        checker: &dyn Checker<Configuration>,
    ) -> Result<bool, GraphError> {
        let mut any = false;
        let mut i = 0;
        while i + 1 < self.connections.len() {
            let conn = self.connections[i];
            let short_enough = self.arena.borrow().norm(conn)? <= threshold;
            if !short_enough {
                i += 1;
                continue;
            }

            let next_conn = self.connections[i + 1];
            let (parent, mid, child) = {
                let a = self.arena.borrow();
                (a.parent_of(conn)?, a.child_of(conn)?, a.child_of(next_conn)?)
            };
            let (parent_conf, child_conf) = {
                let a = self.arena.borrow();
                (a.configuration(parent)?.clone(), a.configuration(child)?.clone())
            };

            if checker.check_path(&parent_conf, &child_conf) {
                let shortcut = {
                    let mut a = self.arena.borrow_mut();
                    let cost = metrics.cost(&parent_conf, &child_conf);
                    a.destroy_connection(conn)?;
                    a.destroy_connection(next_conn)?;
                    a.destroy_node(mid)?;
                    let nc = a.create_connection(parent, child, cost, None)?;
                    a.attach(nc)?;
                    nc
                };
                if let Some(tree) = &self.tree {
                    tree.borrow_mut().forget(mid);
                }
                self.connections.splice(i..=i + 1, [shortcut]);
                self.changed.splice(i..=i + 1, [true]);
                any = true;
                continue;
            }
            i += 1;
        }
        Ok(any)
    }

    /// Flips every connection in place and reverses the connection list, so
    /// the path now runs from the old goal to the old start.
    pub fn flip(&mut self) -> Result<(), GraphError> {
        let mut a = self.arena.borrow_mut();
        for &c in &self.connections {
            a.flip(c)?;
        }
        drop(a);
        self.connections.reverse();
        self.changed.reverse();
        Ok(())
    }

    fn index_of_waypoint(&self, q: &Configuration) -> Result<usize, GraphError> {
        let waypoints = self.waypoints()?;
        waypoints
            .iter()
            .position(|w| w.distance(q) < WAYPOINT_IDENTITY_TOLERANCE)
            .ok_or(GraphError::NotOnPath)
    }

    fn subpath_to_index(&self, idx: usize, get_copy: bool) -> Result<Path, GraphError> {
        if idx == 0 {
            return Err(GraphError::InvalidArgument {
                message: "subpath to the first waypoint would be empty".to_string(),
            });
        }
        let selected: Vec<ConnectionId> = self.connections[..idx].to_vec();
        if get_copy {
            let mut new_connections = Vec::with_capacity(selected.len());
            let mut a = self.arena.borrow_mut();
            for &c in &selected {
                new_connections.push(a.clone_connection(c)?);
            }
            drop(a);
            Ok(Path {
                arena: self.arena.clone(),
                connections: new_connections,
                changed: self.changed[..idx].to_vec(),
                tree: None,
            })
        } else {
            Ok(Path {
                arena: self.arena.clone(),
                connections: selected,
                changed: self.changed[..idx].to_vec(),
                tree: self.tree.clone(),
            })
        }
    }

    fn subpath_from_index(&self, idx: usize, get_copy: bool) -> Result<Path, GraphError> {
        if idx >= self.connections.len() {
            return Err(GraphError::InvalidArgument {
                message: "subpath from the last waypoint would be empty".to_string(),
            });
        }
        let selected: Vec<ConnectionId> = self.connections[idx..].to_vec();
        if get_copy {
            let mut new_connections = Vec::with_capacity(selected.len());
            let mut a = self.arena.borrow_mut();
            for &c in &selected {
                new_connections.push(a.clone_connection(c)?);
            }
            drop(a);
            Ok(Path {
                arena: self.arena.clone(),
                connections: new_connections,
                changed: self.changed[idx..].to_vec(),
                tree: None,
            })
        } else {
            Ok(Path {
                arena: self.arena.clone(),
                connections: selected,
                changed: self.changed[idx..].to_vec(),
                tree: self.tree.clone(),
            })
        }
    }

    /// Subpath up to `node`, which must match (within 1e-6) a waypoint
    /// already on this path.
    pub fn subpath_to_node(&self, node: NodeId, get_copy: bool) -> Result<Path, GraphError> {
        let conf = self.arena.borrow().configuration(node)?.clone();
        let idx = self.index_of_waypoint(&conf)?;
        self.subpath_to_index(idx, get_copy)
    }

    /// Subpath from `node` onward; see `subpath_to_node`.
    pub fn subpath_from_node(&self, node: NodeId, get_copy: bool) -> Result<Path, GraphError> {
        let conf = self.arena.borrow().configuration(node)?.clone();
        let idx = self.index_of_waypoint(&conf)?;
        self.subpath_from_index(idx, get_copy)
    }

    /// Subpath up to an arbitrary on-path configuration `q`. When
    /// `get_copy` is true the result shares no nodes or edges with this
    /// path; when false, `q` is first spliced into this path via
    /// `insert_at` and the returned subpath references the live graph.
    pub fn subpath_to_conf(
        &mut self,
        q: &Configuration,
        get_copy: bool,
        metrics: &dyn Metrics<Configuration>,
    ) -> Result<Path, GraphError> {
        if get_copy {
            let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
            let mut a = self.arena.borrow_mut();
            let mut new_connections = Vec::with_capacity(idx + 1);
            for &c in &self.connections[..idx] {
                new_connections.push(a.clone_connection(c)?);
            }
            let parent_conf = a.configuration(a.parent_of(self.connections[idx])?)?.clone();
            let parent_node = a.create_node(parent_conf.clone());
            let q_node = a.create_node(q.clone());
            let cost = metrics.cost(&parent_conf, q);
            let partial = a.create_connection(parent_node, q_node, cost, None)?;
            a.attach(partial)?;
            new_connections.push(partial);
            drop(a);
            let mut changed = self.changed[..idx].to_vec();
            changed.push(true);
            Ok(Path {
                arena: self.arena.clone(),
                connections: new_connections,
                changed,
                tree: None,
            })
        } else {
            let new_node = self.insert_at(q, metrics)?;
            let idx = self.index_of_waypoint(q).unwrap_or_else(|_| {
                self.nodes().unwrap().iter().position(|&n| n == new_node).unwrap()
            });
            self.subpath_to_index(idx, false)
        }
    }

    /// Subpath from an arbitrary on-path configuration `q` onward; see
    /// `subpath_to_conf`.
    pub fn subpath_from_conf(
        &mut self,
        q: &Configuration,
        get_copy: bool,
        metrics: &dyn Metrics<Configuration>,
    ) -> Result<Path, GraphError> {
        if get_copy {
            let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
            let mut a = self.arena.borrow_mut();
            let child_conf = a.configuration(a.child_of(self.connections[idx])?)?.clone();
            let q_node = a.create_node(q.clone());
            let child_node = a.create_node(child_conf.clone());
            let cost = metrics.cost(q, &child_conf);
            let partial = a.create_connection(q_node, child_node, cost, None)?;
            a.attach(partial)?;
            let mut new_connections = vec![partial];
            for &c in &self.connections[idx + 1..] {
                new_connections.push(a.clone_connection(c)?);
            }
            drop(a);
            let mut changed = vec![false];
            changed.extend_from_slice(&self.changed[idx + 1..]);
            Ok(Path {
                arena: self.arena.clone(),
                connections: new_connections,
                changed,
                tree: None,
            })
        } else {
            let new_node = self.insert_at(q, metrics)?;
            let idx = self.index_of_waypoint(q).unwrap_or_else(|_| {
                self.nodes().unwrap().iter().position(|&n| n == new_node).unwrap()
            });
            self.subpath_from_index(idx, false)
        }
    }

    pub fn is_valid(&mut self, checker: &dyn Checker<Configuration>, metrics: &dyn Metrics<Configuration>) -> Result<bool, GraphError> {
        self.is_valid_from_connection(0, checker, metrics)
    }

    pub fn is_valid_from_connection(
        &mut self,
        from_idx: usize,
        checker: &dyn Checker<Configuration>,
        metrics: &dyn Metrics<Configuration>,
    ) -> Result<bool, GraphError> {
        let mut all_valid = true;
        for i in from_idx..self.connections.len() {
            let conn = self.connections[i];
            let (p, c) = {
                let a = self.arena.borrow();
                (a.configuration(a.parent_of(conn)?)?.clone(), a.configuration(a.child_of(conn)?)?.clone())
            };
            let ok = checker.check_path(&p, &c);
            let mut a = self.arena.borrow_mut();
            if ok {
                let cost = metrics.cost(&p, &c);
                a.set_cost(conn, cost)?;
            } else {
                a.set_cost(conn, f64::INFINITY)?;
                all_valid = false;
            }
        }
        Ok(all_valid)
    }

    /// Re-validates from an arbitrary on-path configuration `q` onward.
    /// Returns overall validity plus `pos_closest_obs_from_goal`: the
    /// number of edges between the goal and the nearest now-infeasible
    /// edge (the path length if none are infeasible).
    pub fn is_valid_from_conf(
        &mut self,
        q: &Configuration,
        checker: &dyn Checker<Configuration>,
        metrics: &dyn Metrics<Configuration>,
    ) -> Result<(bool, usize), GraphError> {
        let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
        let conn = self.connections[idx];
        let (parent_conf, child_conf) = {
            let a = self.arena.borrow();
            (a.configuration(a.parent_of(conn)?)?.clone(), a.configuration(a.child_of(conn)?)?.clone())
        };

        let all_valid;
        let scan_start;
        if q.distance(&parent_conf) < WAYPOINT_IDENTITY_TOLERANCE {
            scan_start = idx;
            all_valid = self.is_valid_from_connection(scan_start, checker, metrics)?;
        } else if q.distance(&child_conf) < WAYPOINT_IDENTITY_TOLERANCE {
            scan_start = idx + 1;
            all_valid = self.is_valid_from_connection(scan_start, checker, metrics)?;
        } else {
            let ok = checker.check_connection_from_conf(q, &child_conf);
            {
                let mut a = self.arena.borrow_mut();
                if ok {
                    a.set_cost(conn, metrics.cost(q, &child_conf))?;
                } else {
                    a.set_cost(conn, f64::INFINITY)?;
                }
            }
            scan_start = idx;
            all_valid = ok & self.is_valid_from_connection(idx + 1, checker, metrics)?;
        }

        // Only the just-revalidated suffix (scan_start..) can have changed;
        // a stale +inf cost left over elsewhere in the path is not "now"
        // infeasible and must not be reported as the closest obstruction.
        let mut pos_closest_obs_from_goal = self.connections.len();
        if !all_valid {
            for i in (scan_start..self.connections.len()).rev() {
                if self.arena.borrow().cost(self.connections[i])?.is_infinite() {
                    pos_closest_obs_from_goal = self.connections.len() - 1 - i;
                    break;
                }
            }
        }

        Ok((all_valid, pos_closest_obs_from_goal))
    }

    /// Remaining metric cost from on-path configuration `q` to the goal,
    /// prorating the connection `q` sits on by its fractional position.
    pub fn cost_from_conf(&self, q: &Configuration) -> Result<f64, GraphError> {
        let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
        let a = self.arena.borrow();
        let conn = self.connections[idx];
        let child_conf = a.configuration(a.child_of(conn)?)?;
        let conn_cost = a.cost(conn)?;
        let conn_norm = a.norm(conn)?;
        let partial = if conn_cost.is_infinite() {
            f64::INFINITY
        } else if conn_norm > 0.0 {
            conn_cost * (q.distance(child_conf) / conn_norm)
        } else {
            0.0
        };
        let mut total = partial;
        for &c in &self.connections[idx + 1..] {
            total += a.cost(c)?;
        }
        Ok(total)
    }

    /// Remaining Euclidean length from on-path configuration `q` to the
    /// goal.
    pub fn norm_from_conf(&self, q: &Configuration) -> Result<f64, GraphError> {
        let idx = self.find_connection(q)?.ok_or(GraphError::NotOnPath)?;
        let a = self.arena.borrow();
        let conn = self.connections[idx];
        let child_conf = a.configuration(a.child_of(conn)?)?;
        let mut total = q.distance(child_conf);
        for &c in &self.connections[idx + 1..] {
            total += a.norm(c)?;
        }
        Ok(total)
    }

    /// The waypoint on this path closest to `q` by Euclidean distance;
    /// fallback used by the projection family when every connection is
    /// degenerate.
    pub fn find_closer_node(&self, q: &Configuration) -> Result<NodeId, GraphError> {
        let nodes = self.nodes()?;
        let a = self.arena.borrow();
        let mut best = nodes[0];
        let mut best_dist = a.configuration(best)?.distance(q);
        for &n in &nodes[1..] {
            let d = a.configuration(n)?.distance(q);
            if d < best_dist {
                best_dist = d;
                best = n;
            }
        }
        Ok(best)
    }

    /// Uniform arc-length resubdivision. Declared but never defined in the
    /// original this was ported from; semantics were never specified.
    pub fn resample(&mut self, _step: f64) -> Result<(), GraphError> {
        Err(GraphError::InvalidArgument {
            message: "resample is not yet defined".to_string(),
        })
    }

    /// A line-oriented textual dump: `cost = <value>\nwaypoints=\n[<q0>;\n<q1>;\n...\n<qn>];`,
    /// each `qi` a comma-separated list of its values.
    pub fn to_dump(&self) -> Result<String, GraphError> {
        let waypoints = self.waypoints()?;
        let cost = self.total_cost()?;
        let mut out = format!("cost = {cost}\nwaypoints=\n[");
        for (i, w) in waypoints.iter().enumerate() {
            if i > 0 {
                out.push_str(";\n");
            }
            let values: Vec<String> = w.values.iter().map(|v| v.to_string()).collect();
            out.push_str(&values.join(","));
        }
        out.push_str("];");
        Ok(out)
    }

    /// The path's waypoints as a plain, language-neutral list, optionally
    /// reversed.
    pub fn to_structured(&self, reverse: bool) -> Result<Vec<Configuration>, GraphError> {
        let mut waypoints = self.waypoints()?;
        if reverse {
            waypoints.reverse();
        }
        Ok(waypoints)
    }
}

fn euclidean_length_locked(connections: &[ConnectionId], a: &GraphArena) -> Result<f64, GraphError> {
    let mut total = 0.0;
    for &c in connections {
        total += a.norm(c)?;
    }
    Ok(total)
}

fn lerp(a: &Configuration, b: &Configuration, t: f64) -> Configuration {
    let values = a.values.iter().zip(b.values.iter()).map(|(x, y)| x + (y - x) * t).collect();
    Configuration { values }
}

fn midpoint(a: &Configuration, b: &Configuration) -> Configuration {
    lerp(a, b, 0.5)
}

fn subtract(a: &Configuration, b: &Configuration) -> Configuration {
    let values = a.values.iter().zip(b.values.iter()).map(|(x, y)| x - y).collect();
    Configuration { values }
}

fn vector_norm(v: &Configuration) -> f64 {
    v.values.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn scale_in_place(v: &mut Configuration, s: f64) {
    for x in v.values.iter_mut() {
        *x *= s;
    }
}

fn add_scaled(base: &Configuration, direction: &Configuration, distance: f64) -> Configuration {
    let values = base
        .values
        .iter()
        .zip(direction.values.iter())
        .map(|(b, d)| b + d * distance)
        .collect();
    Configuration { values }
}

/// Clamped orthogonal projection of `q` onto segment `p..c`; returns
/// `f64::INFINITY` for a zero-length segment.
fn project_onto_segment(p: &Configuration, c: &Configuration, q: &Configuration) -> (Configuration, f64) {
    let edge = subtract(c, p);
    let len_sq: f64 = edge.values.iter().map(|x| x * x).sum();
    if len_sq == 0.0 {
        return (p.clone(), f64::INFINITY);
    }
    let to_q = subtract(q, p);
    let dot: f64 = edge.values.iter().zip(to_q.values.iter()).map(|(e, t)| e * t).sum();
    let t = (dot / len_sq).clamp(0.0, 1.0);
    let foot = lerp(p, c, t);
    let dist = foot.distance(q);
    (foot, dist)
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

    fn path_from_points(points: &[[f64; 2]]) -> (Path, Rc<RefCell<GraphArena>>) {
        let arena = Rc::new(RefCell::new(GraphArena::new()));
        let metrics = EuclideanMetrics;
        let nodes: Vec<NodeId> = {
            let mut a = arena.borrow_mut();
            points.iter().map(|p| a.create_node(RealVectorState::new(p.to_vec()))).collect()
        };
        let path = Path::new_from_nodes(arena.clone(), nodes, &metrics, None).unwrap();
        (path, arena)
    }

    #[test]
    fn s1_straight_line_merges_to_one_edge() {
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let original_cost = path.total_cost().unwrap();
        let removed = path.remove_colinear_nodes(&[]).unwrap();
        assert!(removed);
        assert_eq!(path.connections().len(), 1);
        assert_eq!(path.total_cost().unwrap(), original_cost);
    }

    #[test]
    fn s2_warp_on_a_v_reduces_cost() {
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
        let metrics = EuclideanMetrics;
        let checker = AcceptAllChecker;
        let original_cost = path.total_cost().unwrap();
        path.warp(0.01, Duration::from_secs(3600), &metrics, &checker).unwrap();
        assert!(path.total_cost().unwrap() <= original_cost);
    }

    #[test]
    fn s3_simplify_replaces_tiny_first_edge() {
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [0.01, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let metrics = EuclideanMetrics;
        let checker = AcceptAllChecker;
        let simplified = path.simplify(0.1, &metrics, &checker).unwrap();
        assert!(simplified);
        assert_eq!(path.connections().len(), 2);
    }

    #[test]
    fn s5_insert_at_splits_edge_preserving_total_length() {
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [2.0, 0.0]]);
        let metrics = EuclideanMetrics;
        let original_length = path.euclidean_length().unwrap();
        path.insert_at(&RealVectorState::new(vec![1.0, 0.0]), &metrics).unwrap();
        assert_eq!(path.connections().len(), 2);
        assert!((path.euclidean_length().unwrap() - original_length).abs() < 1e-9);
    }

    #[test]
    fn s6_subpath_copy_allocates_fresh_start_node() {
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [2.0, 0.0]]);
        let metrics = EuclideanMetrics;
        let subpath = path.subpath_from_conf(&RealVectorState::new(vec![0.5, 0.0]), true, &metrics).unwrap();
        let waypoints = subpath.waypoints().unwrap();
        assert_eq!(waypoints[0].values, vec![0.5, 0.0]);
    }

    #[test]
    fn flip_twice_is_structurally_identical() {
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [1.0, 0.0], [2.0, 1.0]]);
        let original_waypoints = path.waypoints().unwrap();
        let original_cost = path.total_cost().unwrap();
        path.flip().unwrap();
        path.flip().unwrap();
        assert_eq!(path.waypoints().unwrap(), original_waypoints);
        assert_eq!(path.total_cost().unwrap(), original_cost);
    }

    #[test]
    fn find_connection_locates_on_path_point() {
        let (path, _arena) = path_from_points(&[[0.0, 0.0], [2.0, 0.0]]);
        assert_eq!(path.find_connection(&RealVectorState::new(vec![1.0, 0.0])).unwrap(), Some(0));
        assert_eq!(path.find_connection(&RealVectorState::new(vec![1.0, 5.0])).unwrap(), None);
    }

    #[test]
    fn is_valid_marks_infeasible_edges_infinite() {
        struct RejectAll;
        impl Checker<Configuration> for RejectAll {
            fn check(&self, _: &Configuration) -> bool {
                false
            }
            fn check_path(&self, _: &Configuration, _: &Configuration) -> bool {
                false
            }
            fn clone_box(&self) -> Box<dyn Checker<Configuration>> {
                Box::new(RejectAll)
            }
            fn min_distance(&self) -> f64 {
                0.0
            }
            fn group_name(&self) -> String {
                "reject-all".to_string()
            }
        }
        let (mut path, _arena) = path_from_points(&[[0.0, 0.0], [1.0, 0.0]]);
        let metrics = EuclideanMetrics;
        let checker = RejectAll;
        let valid = path.is_valid(&checker, &metrics).unwrap();
        assert!(!valid);
        assert!(path.total_cost().unwrap().is_infinite());
    }
}
