//! Project selection modes

use tracing::debug;

use gantry_core::model::ProjectType;
use gantry_graph::ProjectGraph;

/// Which projects a target request expands over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSelection {
    /// Every project in the graph that defines the target
    All,
    /// Only the named projects. Their project-graph dependencies are not
    /// pulled in automatically.
    Specific(Vec<String>),
    /// The changed projects plus their transitive dependents
    Affected(Vec<String>),
    /// Projects carrying a tag
    WithTag(String),
    /// Projects of a type
    OfType(ProjectType),
}

impl ProjectSelection {
    /// Resolve the selection to the sorted list of projects that define
    /// the requested target.
    pub fn select(&self, graph: &ProjectGraph, target: &str) -> Vec<String> {
        let mut selected: Vec<String> = match self {
            Self::All => graph.names().map(String::from).collect(),
            Self::Specific(names) => names
                .iter()
                .filter(|name| {
                    let known = graph.project(name).is_some();
                    if !known {
                        debug!(project = %name, "selected project not in graph, skipping");
                    }
                    known
                })
                .cloned()
                .collect(),
            Self::Affected(changed) => {
                let mut affected: Vec<String> = Vec::new();
                for name in changed {
                    if graph.project(name).is_none() {
                        debug!(project = %name, "changed project not in graph, skipping");
                        continue;
                    }
                    if !affected.contains(name) {
                        affected.push(name.clone());
                    }
                    for dependent in graph.transitive_dependents(name).iter() {
                        if !affected.contains(dependent) {
                            affected.push(dependent.clone());
                        }
                    }
                }
                affected
            }
            Self::WithTag(tag) => graph
                .projects()
                .values()
                .filter(|p| p.tags.contains(tag))
                .map(|p| p.name.clone())
                .collect(),
            Self::OfType(project_type) => graph
                .projects()
                .values()
                .filter(|p| p.project_type == *project_type)
                .map(|p| p.name.clone())
                .collect(),
        };

        selected.retain(|name| {
            graph
                .project(name)
                .map(|p| p.targets.contains_key(target))
                .unwrap_or(false)
        });
        selected.sort();
        selected.dedup();
        selected
    }
}
