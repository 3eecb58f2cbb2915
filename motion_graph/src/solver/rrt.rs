// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use std::{cell::RefCell, rc::Rc};

use crate::{
    checker::Checker,
    error::GraphError,
    graph::{GraphArena, NodeId, Path, Tree},
    metrics::Metrics,
    sampler::Sampler,
    state::RealVectorState as Configuration,
    time::{Duration, Instant},
};

use super::{collect_connections_to_root, new_tree_rooted_at, Solver};

/// The basic RRT planner (`spec.md` §4.E), grounded on
/// `oxmpl::geometric::planners::rrt::RRT` with its private `Vec<Node>` tree
/// replaced by the shared `graph::Tree`. Accepts the first feasible
/// extension towards a goal; does not attempt to improve it afterwards.
pub struct Rrt<Spl: Sampler<Configuration>> {
    arena: Rc<RefCell<GraphArena>>,
    tree: Option<Rc<RefCell<Tree>>>,
    goals: Vec<(NodeId, Duration)>,
    max_distance: f64,
    goal_threshold: f64,
    sampler: Spl,
    checker: Box<dyn Checker<Configuration>>,
    metrics: Box<dyn Metrics<Configuration>>,
}

impl<Spl: Sampler<Configuration>> Rrt<Spl> {
    pub fn new(
        max_distance: f64,
        goal_threshold: f64,
        sampler: Spl,
        checker: Box<dyn Checker<Configuration>>,
        metrics: Box<dyn Metrics<Configuration>>,
    ) -> Self {
        Rrt {
            arena: Rc::new(RefCell::new(GraphArena::new())),
            tree: None,
            goals: Vec::new(),
            max_distance,
            goal_threshold,
            sampler,
            checker,
            metrics,
        }
    }

    fn tree(&self) -> Result<Rc<RefCell<Tree>>, GraphError> {
        self.tree.clone().ok_or_else(|| GraphError::InvalidArgument {
            message: "add_start must be called before the solver can iterate".to_string(),
        })
    }

    fn try_connect_goal(&mut self, tree: &Rc<RefCell<Tree>>, node: NodeId) -> Result<Option<Path>, GraphError> {
        let node_conf = self.arena.borrow().configuration(node)?.clone();
        for i in 0..self.goals.len() {
            let (goal, _) = self.goals[i];
            let goal_conf = self.arena.borrow().configuration(goal)?.clone();
            if node_conf.distance(&goal_conf) <= self.goal_threshold
                && self.checker.check_path(&node_conf, &goal_conf)
            {
                let cost = self.metrics.cost(&node_conf, &goal_conf);
                let goal_node = tree.borrow_mut().add_node(goal_conf, Some(node), cost)?;
                let connections = collect_connections_to_root(&self.arena, goal_node)?;
                let path = Path::new_from_connections(self.arena.clone(), connections, Some(tree.clone()))?;
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

impl<Spl: Sampler<Configuration>> Solver for Rrt<Spl> {
    fn add_start(&mut self, start: Configuration) -> Result<NodeId, GraphError> {
        if self.tree.is_some() {
            return Err(GraphError::InvalidArgument {
                message: "add_start was already called".to_string(),
            });
        }
        let (root, tree) = new_tree_rooted_at(&self.arena, start);
        self.tree = Some(tree);
        Ok(root)
    }

    fn add_goal(&mut self, goal: Configuration, time_budget: Duration) -> Result<NodeId, GraphError> {
        let id = self.arena.borrow_mut().create_node(goal);
        self.goals.push((id, time_budget));
        Ok(id)
    }

    fn update(&mut self, solution: &mut Option<Path>) -> Result<bool, GraphError> {
        let tree = self.tree()?;

        let mut rng = rand::rng();
        let target = match self.sampler.sample(&mut rng) {
            Ok(q) => q,
            Err(_) => return Ok(false),
        };

        let nearest = tree.borrow().nearest_neighbor(&target);
        let extension = {
            let t = tree.borrow();
            t.extend(nearest, &target, self.max_distance, self.checker.as_ref())?
        };
        if !extension.valid {
            return Ok(false);
        }

        let nearest_conf = self.arena.borrow().configuration(nearest)?.clone();
        let cost_to_new = self.metrics.cost(&nearest_conf, &extension.configuration);
        let new_node = tree
            .borrow_mut()
            .add_node(extension.configuration, Some(nearest), cost_to_new)?;

        if let Some(path) = self.try_connect_goal(&tree, new_node)? {
            println!("Solution found after {} nodes.", tree.borrow().len());
            self.sampler.update_cost(path.total_cost()?);
            *solution = Some(path);
            return Ok(true);
        }
        Ok(false)
    }

    fn solve(
        &mut self,
        solution: &mut Option<Path>,
        max_iter: usize,
        time_budget: Duration,
    ) -> Result<bool, GraphError> {
        let start_time = Instant::now();
        for _ in 0..max_iter {
            if start_time.elapsed() > time_budget {
                break;
            }
            if self.update(solution)? {
                return Ok(true);
            }
        }
        Ok(solution.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EuclideanMetrics;
    use crate::sampler::UniformSampler;

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

    #[test]
    fn rrt_connects_start_to_goal_in_an_open_space() {
        let sampler = UniformSampler::new(
            Configuration::new(vec![0.0, 0.0]),
            Configuration::new(vec![5.0, 5.0]),
            vec![0.0, 0.0],
            vec![5.0, 5.0],
        );
        let mut rrt = Rrt::new(
            0.5,
            0.6,
            sampler,
            Box::new(AcceptAllChecker),
            Box::new(EuclideanMetrics),
        );
        rrt.add_start(Configuration::new(vec![0.0, 0.0])).unwrap();
        rrt.add_goal(Configuration::new(vec![5.0, 5.0]), Duration::from_secs(1)).unwrap();

        let mut solution = None;
        let found = rrt.solve(&mut solution, 2000, Duration::from_secs(5)).unwrap();
        assert!(found);
        assert!(solution.is_some());
    }
}
