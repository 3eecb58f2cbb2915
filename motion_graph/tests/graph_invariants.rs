// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use std::{cell::RefCell, rc::Rc};

use motion_graph::{
    checker::Checker,
    graph::{GraphArena, Path, Tree},
    metrics::{EuclideanMetrics, Metrics},
    state::RealVectorState as Configuration,
};

#[derive(Clone)]
struct AcceptAllChecker;
impl Checker<Configuration> for AcceptAllChecker {
    fn check(&self, _: &Configuration) -> bool {
        true
    }
    fn check_path(&self, _: &Configuration, _: &Configuration) -> bool {
        true
    }
    fn clone_box(&self) -> Box<dyn Checker<Configuration>> {
        Box::new(self.clone())
    }
    fn min_distance(&self) -> f64 {
        0.0
    }
    fn group_name(&self) -> String {
        "accept-all".to_string()
    }
}

fn q(values: &[f64]) -> Configuration {
    Configuration::new(values.to_vec())
}

fn path_from_points(points: &[[f64; 2]]) -> Path {
    let arena = Rc::new(RefCell::new(GraphArena::new()));
    let metrics = EuclideanMetrics;
    let nodes: Vec<_> = points
        .iter()
        .map(|p| arena.borrow_mut().create_node(q(p)))
        .collect();
    let confs: Vec<_> = nodes
        .iter()
        .map(|&n| arena.borrow().configuration(n).unwrap().clone())
        .collect();
    let mut connections = Vec::new();
    for i in 0..nodes.len() - 1 {
        let cost = metrics.cost(&confs[i], &confs[i + 1]);
        let c = arena
            .borrow_mut()
            .create_connection(nodes[i], nodes[i + 1], cost, None)
            .unwrap();
        arena.borrow_mut().attach(c).unwrap();
        connections.push(c);
    }
    Path::new_from_connections(arena, connections, None).unwrap()
}

#[test]
fn invariant_1_attached_connection_is_listed_on_both_endpoints() {
    let arena = Rc::new(RefCell::new(GraphArena::new()));
    let a = arena.borrow_mut().create_node(q(&[0.0, 0.0]));
    let b = arena.borrow_mut().create_node(q(&[1.0, 0.0]));
    let c = arena.borrow_mut().create_connection(a, b, 1.0, None).unwrap();
    arena.borrow_mut().attach(c).unwrap();

    assert!(arena.borrow().children(a).unwrap().contains(&c));
    assert!(arena.borrow().parents(b).unwrap().contains(&c));

    arena.borrow_mut().detach(c).unwrap();
    assert!(!arena.borrow().children(a).unwrap().contains(&c));
    assert!(!arena.borrow().parents(b).unwrap().contains(&c));
}

#[test]
fn invariant_2_total_cost_is_the_sum_of_connection_costs() {
    let path = path_from_points(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
    assert_eq!(path.total_cost().unwrap(), 2.0);
}

#[test]
fn invariant_3_euclidean_length_matches_manual_sum() {
    let path = path_from_points(&[[0.0, 0.0], [3.0, 0.0], [3.0, 4.0]]);
    assert_eq!(path.euclidean_length().unwrap(), 3.0 + 4.0);
}

#[test]
fn invariant_4_insert_at_splits_length_conserving_the_total() {
    let path = path_from_points(&[[0.0, 0.0], [2.0, 0.0]]);
    let before = path.euclidean_length().unwrap();
    let metrics = EuclideanMetrics;
    let mut path = path;
    path.insert_at(&q(&[1.0, 0.0]), &metrics).unwrap();
    let after = path.euclidean_length().unwrap();
    assert!((before - after).abs() < 1e-9);
    assert_eq!(path.connections().len(), 2);
}

#[test]
fn invariant_5_flip_twice_restores_the_original_path() {
    let original = path_from_points(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
    let original_dump = original.to_dump().unwrap();
    let mut roundtrip = original.clone_path().unwrap();
    roundtrip.flip().unwrap();
    roundtrip.flip().unwrap();
    assert_eq!(roundtrip.to_dump().unwrap(), original_dump);
}

#[test]
fn invariant_6_warp_never_increases_cost() {
    let mut path = path_from_points(&[[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
    let before = path.total_cost().unwrap();
    let metrics = EuclideanMetrics;
    let checker = AcceptAllChecker;
    path.warp(0.01, motion_graph::time::Duration::from_secs(1), &metrics, &checker)
        .unwrap();
    let after = path.total_cost().unwrap();
    assert!(after <= before + 1e-9);
}

#[test]
fn invariant_9_projection_distance_is_zero_iff_on_path() {
    let path = path_from_points(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
    let on_path = q(&[0.5, 0.0]);
    assert!(path.find_connection(&on_path).unwrap().is_some());

    let (projected, _) = path.project_on_closest_connection(&q(&[0.5, 0.3])).unwrap();
    let dist = projected.distance(&q(&[0.5, 0.0]));
    assert!(dist > 1e-9);
}

#[test]
fn clone_then_dump_matches_the_original_dump() {
    let original = path_from_points(&[[0.0, 0.0], [1.0, 0.0]]);
    let cloned = original.clone_path().unwrap();
    assert_eq!(original.to_dump().unwrap(), cloned.to_dump().unwrap());
}

#[test]
fn tree_extend_respects_the_step_cap_and_rewire_prefers_the_cheaper_parent() {
    let arena = Rc::new(RefCell::new(GraphArena::new()));
    let root = arena.borrow_mut().create_node(q(&[0.0, 0.0]));
    let mut tree = Tree::new(arena.clone(), root);
    let checker = AcceptAllChecker;
    let metrics = EuclideanMetrics;

    let far = Configuration::new(vec![10.0, 0.0]);
    let ext = tree.extend(root, &far, 1.0, &checker).unwrap();
    assert!(ext.valid);
    assert!((ext.configuration.distance(&Configuration::new(vec![0.0, 0.0])) - 1.0).abs() < 1e-9);

    let a = tree.add_node(q(&[5.0, 0.0]), Some(root), 5.0).unwrap();
    let cheap = tree.add_node(q(&[1.0, 0.0]), Some(root), 1.0).unwrap();
    let n = tree.add_node(q(&[2.0, 0.0]), Some(a), 2.0 + 5.0).unwrap();

    tree.rewire(n, &[a, cheap, root], &metrics, &checker).unwrap();
    assert!(tree.cost_to_root(n).unwrap() < 7.0);
}
