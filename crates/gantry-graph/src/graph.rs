//! Typed project graph

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use gantry_core::model::{DependencyEdge, ProjectConfiguration};

/// Immutable project graph: projects keyed by name, typed edges, and
/// derived adjacency indices. Transitive closures are memoized per lookup.
///
/// The graph may be cyclic; cycles are reported through [`ProjectGraph::cycles`]
/// and rejected by task planning, not here.
#[derive(Debug)]
pub struct ProjectGraph {
    projects: BTreeMap<String, ProjectConfiguration>,
    edges: Vec<DependencyEdge>,
    forward: HashMap<String, Vec<String>>,
    reverse: HashMap<String, Vec<String>>,
    transitive_deps: Mutex<HashMap<String, Arc<BTreeSet<String>>>>,
    transitive_dependents: Mutex<HashMap<String, Arc<BTreeSet<String>>>>,
}

impl ProjectGraph {
    /// Build a graph from validated projects and edges.
    ///
    /// Both endpoints of every edge must name a project and self-loops must
    /// already have been dropped; the builder enforces this.
    pub fn new(
        projects: BTreeMap<String, ProjectConfiguration>,
        edges: Vec<DependencyEdge>,
    ) -> Self {
        let mut forward: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

        for name in projects.keys() {
            forward.insert(name.clone(), Vec::new());
            reverse.insert(name.clone(), Vec::new());
        }

        for edge in &edges {
            if let Some(deps) = forward.get_mut(&edge.source) {
                if !deps.contains(&edge.target) {
                    deps.push(edge.target.clone());
                }
            }
            if let Some(dependents) = reverse.get_mut(&edge.target) {
                if !dependents.contains(&edge.source) {
                    dependents.push(edge.source.clone());
                }
            }
        }

        for list in forward.values_mut().chain(reverse.values_mut()) {
            list.sort();
        }

        Self {
            projects,
            edges,
            forward,
            reverse,
            transitive_deps: Mutex::new(HashMap::new()),
            transitive_dependents: Mutex::new(HashMap::new()),
        }
    }

    /// Empty graph
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), Vec::new())
    }

    /// Get a project by name
    pub fn project(&self, name: &str) -> Option<&ProjectConfiguration> {
        self.projects.get(name)
    }

    /// All projects keyed by name
    pub fn projects(&self) -> &BTreeMap<String, ProjectConfiguration> {
        &self.projects
    }

    /// Project names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    /// All edges
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Number of projects
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether the graph has no projects
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Direct dependencies of a project
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.forward.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct dependents of a project
    pub fn dependents(&self, name: &str) -> &[String] {
        self.reverse.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transitive dependencies of a project (memoized)
    pub fn transitive_dependencies(&self, name: &str) -> Arc<BTreeSet<String>> {
        if let Some(cached) = self.transitive_deps.lock().unwrap().get(name) {
            return cached.clone();
        }
        let closure = Arc::new(self.closure(name, &self.forward));
        self.transitive_deps
            .lock()
            .unwrap()
            .insert(name.to_string(), closure.clone());
        closure
    }

    /// Transitive dependents of a project (memoized)
    pub fn transitive_dependents(&self, name: &str) -> Arc<BTreeSet<String>> {
        if let Some(cached) = self.transitive_dependents.lock().unwrap().get(name) {
            return cached.clone();
        }
        let closure = Arc::new(self.closure(name, &self.reverse));
        self.transitive_dependents
            .lock()
            .unwrap()
            .insert(name.to_string(), closure.clone());
        closure
    }

    fn closure(&self, start: &str, adjacency: &HashMap<String, Vec<String>>) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = adjacency.get(current) {
                for neighbor in neighbors {
                    if neighbor != start && seen.insert(neighbor.clone()) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        seen
    }

    /// Strongly connected components with more than one member, i.e. the
    /// project cycles. Tarjan over an index arena; deterministic order.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let names: Vec<&String> = self.projects.keys().collect();
        let index_of: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let adjacency: Vec<Vec<usize>> = names
            .iter()
            .map(|name| {
                self.dependencies(name)
                    .iter()
                    .filter_map(|dep| index_of.get(dep.as_str()).copied())
                    .collect()
            })
            .collect();

        let mut state = TarjanState::new(names.len());
        for v in 0..names.len() {
            if state.index[v].is_none() {
                state.strongconnect(v, &adjacency);
            }
        }

        let mut cycles: Vec<Vec<String>> = state
            .components
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut cycle: Vec<String> =
                    component.into_iter().map(|i| names[i].clone()).collect();
                cycle.sort();
                cycle
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Whether any project cycle exists
    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }

    /// Serializable snapshot: node names plus edges
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            projects: self.projects.keys().cloned().collect(),
            edges: self.edges.clone(),
        }
    }
}

/// Serializable graph overview
#[derive(Debug, Serialize)]
pub struct GraphSummary {
    /// Sorted project names
    pub projects: Vec<String>,
    /// All edges
    pub edges: Vec<DependencyEdge>,
}

struct TarjanState {
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl TarjanState {
    fn new(n: usize) -> Self {
        Self {
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        }
    }

    fn strongconnect(&mut self, v: usize, adjacency: &[Vec<usize>]) {
        self.index[v] = Some(self.next_index);
        self.lowlink[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        for &w in &adjacency[v] {
            match self.index[w] {
                None => {
                    self.strongconnect(w, adjacency);
                    self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                }
                Some(w_index) if self.on_stack[w] => {
                    self.lowlink[v] = self.lowlink[v].min(w_index);
                }
                _ => {}
            }
        }

        if Some(self.lowlink[v]) == self.index[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
