//! topology.rs
//! The dependency graph observed while evaluating formulas.
//!
//! Edges point from a dependency to its consumer, so the nodes downstream of an
//! input are exactly the cached values that become stale when it changes.

use crate::compute::CacheKey;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<CacheKey, ()>,
    nodes: HashMap<CacheKey, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self { Self::default() }

    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    fn index(&mut self, key: CacheKey) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(key);
        self.nodes.insert(key, idx);
        idx
    }

    /// Records that `consumer` read `dependency`. Repeated reads add no edge.
    pub fn record(&mut self, dependency: CacheKey, consumer: CacheKey) {
        let from = self.index(dependency);
        let to = self.index(consumer);
        self.graph.update_edge(from, to, ());
    }

    /// Direct dependencies of `key`, in first-read order.
    pub fn dependencies_of(&self, key: &CacheKey) -> Vec<CacheKey> {
        let Some(&idx) = self.nodes.get(key) else { return Vec::new() };
        // petgraph lists neighbours most-recent first.
        let mut deps: Vec<CacheKey> = self.graph.neighbors_directed(idx, Direction::Incoming).map(|n| self.graph[n]).collect();
        deps.reverse();
        deps
    }

    /// `start` together with every key that transitively consumed it.
    pub fn downstream_from(&self, start: &[CacheKey]) -> HashSet<CacheKey> {
        let mut visited: HashSet<CacheKey> = start.iter().copied().collect();
        let mut queue: VecDeque<NodeIndex> = start.iter().filter_map(|k| self.nodes.get(k).copied()).collect();

        while let Some(idx) = queue.pop_front() {
            for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if visited.insert(self.graph[child]) {
                    queue.push_back(child);
                }
            }
        }
        visited
    }

    /// Dependencies before consumers; `Err` carries one key of a cycle.
    pub fn evaluation_order(&self) -> Result<Vec<CacheKey>, CacheKey> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx]).collect())
            .map_err(|cycle| self.graph[cycle.node_id()])
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::Period;
    use crate::store::VariableId;

    fn key(id: u32) -> CacheKey {
        (VariableId(id), Period::year(2015).unwrap())
    }

    #[test]
    fn test_diamond_order_and_downstream() {
        // a -> b, a -> c, b + c -> d
        let mut g = DependencyGraph::new();
        g.record(key(0), key(1));
        g.record(key(0), key(2));
        g.record(key(1), key(3));
        g.record(key(2), key(3));
        g.record(key(1), key(3));
        assert_eq!(g.edge_count(), 4);

        let order = g.evaluation_order().unwrap();
        let pos = |k: CacheKey| order.iter().position(|&x| x == k).unwrap();
        assert!(pos(key(0)) < pos(key(1)));
        assert!(pos(key(2)) < pos(key(3)));

        let stale = g.downstream_from(&[key(1)]);
        assert_eq!(stale, [key(1), key(3)].into_iter().collect());
        assert_eq!(g.dependencies_of(&key(3)), vec![key(1), key(2)]);
    }

    #[test]
    fn test_unknown_key_is_its_own_downstream() {
        let g = DependencyGraph::new();
        assert_eq!(g.downstream_from(&[key(7)]).len(), 1);
        assert!(g.dependencies_of(&key(7)).is_empty());
    }

    #[test]
    fn test_cycle_reported() {
        let mut g = DependencyGraph::new();
        g.record(key(0), key(1));
        g.record(key(1), key(0));
        assert!(g.evaluation_order().is_err());
    }
}
