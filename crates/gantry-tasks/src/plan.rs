//! Layered execution planning
//!
//! Kahn's algorithm with leveling: each layer holds tasks whose
//! dependencies all sit in strictly earlier layers. Within a layer, tasks
//! are sorted by id so downstream scheduling decisions are deterministic.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{info, instrument};

use gantry_core::error::{GraphError, Result};

use crate::graph::TaskGraph;

/// An ordered sequence of concurrently runnable task layers
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    layers: Vec<Vec<String>>,
    max_parallelism: usize,
}

impl ExecutionPlan {
    /// Compute the plan for a task graph.
    ///
    /// The cycle re-check is defensive: graph construction already
    /// rejected cycles.
    #[instrument(skip_all, fields(tasks = graph.len()))]
    pub fn compute(graph: &TaskGraph) -> Result<Self> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for (id, deps) in graph.dependency_map() {
            in_degree.insert(id.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }

        let mut layers: Vec<Vec<String>> = Vec::new();
        let mut remaining = in_degree.len();

        while remaining > 0 {
            // BTreeMap iteration keeps the layer sorted by task id.
            let layer: Vec<&str> = in_degree
                .iter()
                .filter(|(_, degree)| **degree == 0)
                .map(|(id, _)| *id)
                .collect();

            if layer.is_empty() {
                let stuck: Vec<&str> = in_degree.keys().copied().collect();
                return Err(GraphError::TaskCycle(stuck.join(", ")).into());
            }

            for id in &layer {
                in_degree.remove(*id);
                if let Some(waiting) = dependents.get(*id) {
                    for dependent in waiting {
                        if let Some(degree) = in_degree.get_mut(dependent) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
            }

            remaining -= layer.len();
            layers.push(layer.into_iter().map(String::from).collect());
        }

        let max_parallelism = layers.iter().map(Vec::len).max().unwrap_or(0);
        info!(
            layers = layers.len(),
            max_parallelism, "execution plan computed"
        );

        Ok(Self {
            layers,
            max_parallelism,
        })
    }

    /// The layers, earliest first
    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    /// Width of the widest layer
    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Total number of planned tasks
    pub fn len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Whether the plan holds no tasks
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Human-readable layer listing
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, layer) in self.layers.iter().enumerate() {
            out.push_str(&format!("Layer {} ({} tasks):\n", i, layer.len()));
            for id in layer {
                out.push_str(&format!("  {}\n", id));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    use gantry_core::model::{DependencyEdge, ProjectConfiguration, TargetConfiguration};
    use gantry_graph::ProjectGraph;

    use crate::selection::ProjectSelection;

    fn chain_graph() -> ProjectGraph {
        let mut projects = Map::new();
        for name in ["web", "ui", "utils"] {
            projects.insert(
                name.to_string(),
                ProjectConfiguration::new(name, format!("packages/{}", name)).with_target(
                    "build",
                    TargetConfiguration::new("gantry:run-commands")
                        .with_commands(vec!["npm run build".to_string()])
                        .with_depends_on("^build"),
                ),
            );
        }
        ProjectGraph::new(
            projects,
            vec![
                DependencyEdge::stat("web", "ui"),
                DependencyEdge::stat("ui", "utils"),
            ],
        )
    }

    #[test]
    fn test_chain_produces_three_layers() {
        let graph = chain_graph();
        let tasks = TaskGraph::build(&graph, "build", &ProjectSelection::All).unwrap();
        let plan = ExecutionPlan::compute(&tasks).unwrap();

        assert_eq!(plan.layers().len(), 3);
        assert_eq!(plan.layers()[0], vec!["utils:build"]);
        assert_eq!(plan.layers()[1], vec!["ui:build"]);
        assert_eq!(plan.layers()[2], vec!["web:build"]);
        assert_eq!(plan.max_parallelism(), 1);
    }

    #[test]
    fn test_independent_tasks_share_a_layer() {
        let mut projects = Map::new();
        for name in ["api", "web"] {
            projects.insert(
                name.to_string(),
                ProjectConfiguration::new(name, name).with_target(
                    "build",
                    TargetConfiguration::new("gantry:run-commands")
                        .with_commands(vec!["make".to_string()]),
                ),
            );
        }
        let graph = ProjectGraph::new(projects, Vec::new());
        let tasks = TaskGraph::build(&graph, "build", &ProjectSelection::All).unwrap();
        let plan = ExecutionPlan::compute(&tasks).unwrap();

        assert_eq!(plan.layers().len(), 1);
        assert_eq!(plan.layers()[0], vec!["api:build", "web:build"]);
        assert_eq!(plan.max_parallelism(), 2);
    }

    #[test]
    fn test_dependencies_in_strictly_earlier_layers() {
        let graph = chain_graph();
        let tasks = TaskGraph::build(&graph, "build", &ProjectSelection::All).unwrap();
        let plan = ExecutionPlan::compute(&tasks).unwrap();

        let layer_of = |id: &str| {
            plan.layers()
                .iter()
                .position(|layer| layer.iter().any(|t| t == id))
                .unwrap()
        };

        for (id, deps) in tasks.dependency_map() {
            for dep in deps {
                assert!(layer_of(dep) < layer_of(id));
            }
        }
    }

    #[test]
    fn test_empty_graph_empty_plan() {
        let plan = ExecutionPlan::compute(&TaskGraph::empty()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.max_parallelism(), 0);
    }

    #[test]
    fn test_render_lists_layers() {
        let graph = chain_graph();
        let tasks = TaskGraph::build(&graph, "build", &ProjectSelection::All).unwrap();
        let plan = ExecutionPlan::compute(&tasks).unwrap();

        let rendered = plan.render();
        assert!(rendered.contains("Layer 0"));
        assert!(rendered.contains("utils:build"));
    }
}
