//! Cache dependency graph.
//!
//! Edges point from a target to the resources that depend on it. Any part
//! of the graph may be cyclic; every walk tracks visited URIs.

use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: HashMap<Url, HashSet<Url>>,
    dependencies: HashMap<Url, HashSet<Url>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` must be invalidated together with `target`.
    pub fn add(&mut self, target: Url, dependent: Url) {
        if target == dependent {
            return;
        }
        self.dependencies
            .entry(dependent.clone())
            .or_default()
            .insert(target.clone());
        self.dependents.entry(target).or_default().insert(dependent);
    }

    pub fn dependents_of(&self, target: &Url) -> impl Iterator<Item = &Url> {
        self.dependents.get(target).into_iter().flatten()
    }

    pub fn dependencies_of(&self, dependent: &Url) -> impl Iterator<Item = &Url> {
        self.dependencies.get(dependent).into_iter().flatten()
    }

    /// Every URI reachable from `seeds` following edges in both directions.
    ///
    /// Seeds come first, in order; the rest follow in breadth-first order.
    pub fn closure<I>(&self, seeds: I) -> Vec<Url>
    where
        I: IntoIterator<Item = Url>,
    {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        for seed in seeds {
            if visited.insert(seed.clone()) {
                order.push(seed.clone());
                queue.push_back(seed);
            }
        }

        while let Some(uri) = queue.pop_front() {
            for next in self.dependents_of(&uri).chain(self.dependencies_of(&uri)) {
                if visited.insert(next.clone()) {
                    order.push(next.clone());
                    queue.push_back(next.clone());
                }
            }
        }
        order
    }

    pub fn len(&self) -> usize {
        self.dependents.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
    }
}
