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

struct GoalHandle {
    node: NodeId,
    time_budget: Duration,
    started_at: Option<Instant>,
    reached: Option<NodeId>,
}

/// Extends one shared tree towards several registered goals at once
/// (`spec.md` §4.E "Multigoal variants"), grounded on
/// `examples/original_source/graph_core/include/graph_core/solvers/time_multigoal.h`'s
/// `TimeMultigoalSolver`, generalized from a per-goal time cap plus a
/// velocity-bounded sampler to a plain round-robin schedule over whichever
/// registered goals still have time budget remaining.
pub struct Multigoal<Spl: Sampler<Configuration>> {
    arena: Rc<RefCell<GraphArena>>,
    tree: Option<Rc<RefCell<Tree>>>,
    goals: Vec<GoalHandle>,
    next_goal: usize,
    max_distance: f64,
    search_radius: f64,
    goal_threshold: f64,
    sampler: Spl,
    checker: Box<dyn Checker<Configuration>>,
    metrics: Box<dyn Metrics<Configuration>>,
    best_cost: f64,
}

impl<Spl: Sampler<Configuration>> Multigoal<Spl> {
    pub fn new(
        max_distance: f64,
        search_radius: f64,
        goal_threshold: f64,
        sampler: Spl,
        checker: Box<dyn Checker<Configuration>>,
        metrics: Box<dyn Metrics<Configuration>>,
    ) -> Self {
        Multigoal {
            arena: Rc::new(RefCell::new(GraphArena::new())),
            tree: None,
            goals: Vec::new(),
            next_goal: 0,
            max_distance,
            search_radius,
            goal_threshold,
            sampler,
            checker,
            metrics,
            best_cost: f64::INFINITY,
        }
    }

    fn tree(&self) -> Result<Rc<RefCell<Tree>>, GraphError> {
        self.tree.clone().ok_or_else(|| GraphError::InvalidArgument {
            message: "add_start must be called before the solver can iterate".to_string(),
        })
    }

    /// Picks the next goal still within its time budget, round-robin from
    /// wherever the last pick left off. Returns `None` once every goal's
    /// budget has elapsed.
    fn pick_goal(&mut self) -> Option<usize> {
        if self.goals.is_empty() {
            return None;
        }
        for offset in 0..self.goals.len() {
            let i = (self.next_goal + offset) % self.goals.len();
            let handle = &self.goals[i];
            let elapsed = handle.started_at.map(|t| t.elapsed()).unwrap_or_default();
            if elapsed <= handle.time_budget {
                self.next_goal = (i + 1) % self.goals.len();
                return Some(i);
            }
        }
        None
    }

    fn path_to(&self, tree: &Rc<RefCell<Tree>>, goal_node: NodeId) -> Result<Path, GraphError> {
        let connections = collect_connections_to_root(&self.arena, goal_node)?;
        Path::new_from_connections(self.arena.clone(), connections, Some(tree.clone()))
    }
}

impl<Spl: Sampler<Configuration>> Solver for Multigoal<Spl> {
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
        self.goals.push(GoalHandle {
            node: id,
            time_budget,
            started_at: None,
            reached: None,
        });
        Ok(id)
    }

    fn update(&mut self, solution: &mut Option<Path>) -> Result<bool, GraphError> {
        let tree = self.tree()?;
        let Some(goal_idx) = self.pick_goal() else {
            return Ok(false);
        };
        if self.goals[goal_idx].started_at.is_none() {
            self.goals[goal_idx].started_at = Some(Instant::now());
        }

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

        let neighborhood = tree.borrow().near_r(&extension.configuration, self.search_radius);
        let nearest_conf = self.arena.borrow().configuration(nearest)?.clone();
        let seed_cost = self.metrics.cost(&nearest_conf, &extension.configuration);
        let new_node = tree
            .borrow_mut()
            .add_node(extension.configuration, Some(nearest), seed_cost)?;
        tree.borrow_mut()
            .rewire(new_node, &neighborhood, self.metrics.as_ref(), self.checker.as_ref())?;

        let new_conf = self.arena.borrow().configuration(new_node)?.clone();
        let goal = &self.goals[goal_idx];
        let goal_conf = self.arena.borrow().configuration(goal.node)?.clone();
        if new_conf.distance(&goal_conf) > self.goal_threshold
            || !self.checker.check_path(&new_conf, &goal_conf)
        {
            return Ok(false);
        }
        let cost_via_new = tree.borrow().cost_to_root(new_node)? + self.metrics.cost(&new_conf, &goal_conf);

        let improved = match self.goals[goal_idx].reached {
            None => {
                let reached = tree.borrow_mut().add_node(goal_conf, Some(new_node), cost_via_new)?;
                self.goals[goal_idx].reached = Some(reached);
                true
            }
            Some(reached) => {
                if cost_via_new < tree.borrow().cost_to_root(reached)? {
                    tree.borrow_mut().reparent(reached, new_node, cost_via_new)?;
                    true
                } else {
                    false
                }
            }
        };

        if improved && cost_via_new < self.best_cost {
            self.best_cost = cost_via_new;
            println!("Solution found after {} nodes.", tree.borrow().len());
            self.sampler.update_cost(cost_via_new);
            *solution = Some(self.path_to(&tree, self.goals[goal_idx].reached.unwrap())?);
        }
        Ok(improved)
    }

    fn solve(
        &mut self,
        solution: &mut Option<Path>,
        max_iter: usize,
        time_budget: Duration,
    ) -> Result<bool, GraphError> {
        let start_time = Instant::now();
        let mut improved_once = false;
        for _ in 0..max_iter {
            if start_time.elapsed() > time_budget {
                break;
            }
            if self.update(solution)? {
                improved_once = true;
            }
        }
        Ok(improved_once)
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
    fn multigoal_reaches_the_closer_of_two_goals() {
        let sampler = UniformSampler::new(
            Configuration::new(vec![0.0, 0.0]),
            Configuration::new(vec![5.0, 5.0]),
            vec![-1.0, -1.0],
            vec![6.0, 6.0],
        );
        let mut solver = Multigoal::new(
            0.5,
            1.2,
            0.6,
            sampler,
            Box::new(AcceptAllChecker),
            Box::new(EuclideanMetrics),
        );
        solver.add_start(Configuration::new(vec![0.0, 0.0])).unwrap();
        solver.add_goal(Configuration::new(vec![5.0, 5.0]), Duration::from_secs(2)).unwrap();
        solver.add_goal(Configuration::new(vec![1.0, 1.0]), Duration::from_secs(2)).unwrap();

        let mut solution: Option<Path> = None;
        let found = solver.solve(&mut solution, 3000, Duration::from_secs(5)).unwrap();
        assert!(found);
        assert!(solution.is_some());
    }
}
