//! Task graph construction
//!
//! Expands a target request over a project selection into tasks, resolves
//! the three `dependsOn` shapes, and verifies acyclicity.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info, instrument};

use gantry_core::error::{GraphError, Result};
use gantry_core::model::DependsOnRef;
use gantry_graph::ProjectGraph;

use crate::selection::ProjectSelection;
use crate::task::{Task, TaskId};

/// Acyclic graph of tasks for one target request
#[derive(Debug)]
pub struct TaskGraph {
    /// Tasks keyed by "project:target" id
    tasks: BTreeMap<String, Task>,
    /// Forward dependencies: task id -> sorted ids it depends on
    dependencies: BTreeMap<String, Vec<String>>,
    /// Tasks with no dependencies
    roots: BTreeSet<String>,
}

impl TaskGraph {
    /// Build a task graph for a target over a project selection.
    ///
    /// Fails when the request traverses a project-graph cycle or when
    /// `dependsOn` resolution produces a task cycle.
    #[instrument(skip_all, fields(target = target_name))]
    pub fn build(
        graph: &ProjectGraph,
        target_name: &str,
        selection: &ProjectSelection,
    ) -> Result<Self> {
        let selected = selection.select(graph, target_name);
        if selected.is_empty() {
            debug!(target = target_name, "no projects define the target");
            return Ok(Self::empty());
        }

        // Cycles are tolerated at the project layer but never planned over.
        let cycles = graph.cycles();
        for cycle in &cycles {
            if cycle.iter().any(|p| selected.contains(p)) {
                return Err(GraphError::ProjectCycle(cycle.join(" -> ")).into());
            }
        }

        // Materialize selected tasks plus, recursively, any same-project
        // dependsOn targets. Cross-project references are resolved against
        // this set later and never retro-created.
        let mut tasks: BTreeMap<String, Task> = BTreeMap::new();
        let mut queue: VecDeque<TaskId> = selected
            .iter()
            .map(|p| TaskId::new(p, target_name))
            .collect();

        while let Some(id) = queue.pop_front() {
            if tasks.contains_key(&id.to_string()) {
                continue;
            }
            let Some(project) = graph.project(&id.project) else {
                continue;
            };
            let Some(target) = project.targets.get(&id.target) else {
                continue;
            };

            let task = Task::new(project, &id.target, target);
            for dep in &task.depends_on {
                match dep {
                    DependsOnRef::Target(t) => queue.push_back(TaskId::new(&id.project, t)),
                    DependsOnRef::Qualified { project, target } if *project == id.project => {
                        queue.push_back(TaskId::new(project, target))
                    }
                    _ => {}
                }
            }
            tasks.insert(id.to_string(), task);
        }

        // Resolve dependsOn references against the materialized set.
        let mut dependencies: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, task) in &tasks {
            let mut deps: BTreeSet<String> = BTreeSet::new();
            for dep in &task.depends_on {
                match dep {
                    DependsOnRef::Upstream(target) => {
                        for upstream in graph.dependencies(&task.id.project) {
                            let candidate = format!("{}:{}", upstream, target);
                            if tasks.contains_key(&candidate) {
                                deps.insert(candidate);
                            }
                        }
                    }
                    DependsOnRef::Qualified { project, target } => {
                        let candidate = format!("{}:{}", project, target);
                        if tasks.contains_key(&candidate) {
                            deps.insert(candidate);
                        } else {
                            debug!(task = %id, reference = %candidate, "unresolved task reference ignored");
                        }
                    }
                    DependsOnRef::Target(target) => {
                        let candidate = format!("{}:{}", task.id.project, target);
                        if tasks.contains_key(&candidate) {
                            deps.insert(candidate);
                        }
                    }
                }
            }
            deps.remove(id);
            dependencies.insert(id.clone(), deps.into_iter().collect());
        }

        Self::check_acyclic(&dependencies)?;

        let roots = dependencies
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        info!(tasks = tasks.len(), target = target_name, "task graph built");
        Ok(Self {
            tasks,
            dependencies,
            roots,
        })
    }

    /// Empty task graph
    pub fn empty() -> Self {
        Self {
            tasks: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            roots: BTreeSet::new(),
        }
    }

    /// DFS cycle check with a path diagnostic
    fn check_acyclic(dependencies: &BTreeMap<String, Vec<String>>) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: BTreeMap<&str, Color> = dependencies
            .keys()
            .map(|id| (id.as_str(), Color::White))
            .collect();

        fn visit<'a>(
            id: &'a str,
            dependencies: &'a BTreeMap<String, Vec<String>>,
            colors: &mut BTreeMap<&'a str, Color>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            colors.insert(id, Color::Gray);
            path.push(id);

            if let Some(deps) = dependencies.get(id) {
                for dep in deps {
                    match colors.get(dep.as_str()).copied() {
                        Some(Color::Gray) => {
                            let start =
                                path.iter().position(|p| *p == dep.as_str()).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|s| s.to_string()).collect();
                            cycle.push(dep.clone());
                            return Some(cycle);
                        }
                        Some(Color::White) => {
                            if let Some(cycle) = visit(dep, dependencies, colors, path) {
                                return Some(cycle);
                            }
                        }
                        _ => {}
                    }
                }
            }

            path.pop();
            colors.insert(id, Color::Black);
            None
        }

        let ids: Vec<&str> = dependencies.keys().map(String::as_str).collect();
        for id in ids {
            if colors.get(id) == Some(&Color::White) {
                let mut path = Vec::new();
                if let Some(cycle) = visit(id, dependencies, &mut colors, &mut path) {
                    return Err(GraphError::TaskCycle(cycle.join(" -> ")).into());
                }
            }
        }
        Ok(())
    }

    /// All tasks keyed by id
    pub fn tasks(&self) -> &BTreeMap<String, Task> {
        &self.tasks
    }

    /// Get a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Dependencies of a task
    pub fn dependencies(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The forward-dependency mapping
    pub fn dependency_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.dependencies
    }

    /// Tasks with no dependencies
    pub fn roots(&self) -> &BTreeSet<String> {
        &self.roots
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph holds no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
