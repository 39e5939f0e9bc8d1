//! CLI commands

mod graph;
mod plan;
mod run;

pub use graph::GraphCommand;
pub use plan::PlanCommand;
pub use run::RunCommand;

use gantry_core::model::ProjectType;
use gantry_tasks::ProjectSelection;

/// Shared selection flags for run/plan
#[derive(Debug, clap::Args)]
pub struct SelectionArgs {
    /// Run only these projects (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub projects: Vec<String>,

    /// Treat these projects as changed and run them plus their dependents
    /// (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub affected_from: Vec<String>,

    /// Run projects carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Run projects of this type
    #[arg(long, value_enum)]
    pub project_type: Option<TypeArg>,
}

/// Project type flag
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TypeArg {
    /// Applications
    Application,
    /// Libraries
    Library,
}

impl SelectionArgs {
    /// Resolve the flags into a selection mode (first match wins)
    pub fn to_selection(&self) -> ProjectSelection {
        if !self.projects.is_empty() {
            return ProjectSelection::Specific(self.projects.clone());
        }
        if !self.affected_from.is_empty() {
            return ProjectSelection::Affected(self.affected_from.clone());
        }
        if let Some(tag) = &self.tag {
            return ProjectSelection::WithTag(tag.clone());
        }
        if let Some(project_type) = self.project_type {
            return ProjectSelection::OfType(match project_type {
                TypeArg::Application => ProjectType::Application,
                TypeArg::Library => ProjectType::Library,
            });
        }
        ProjectSelection::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_priority() {
        let args = SelectionArgs {
            projects: vec!["web".to_string()],
            affected_from: vec!["utils".to_string()],
            tag: Some("frontend".to_string()),
            project_type: None,
        };
        assert_eq!(
            args.to_selection(),
            ProjectSelection::Specific(vec!["web".to_string()])
        );
    }

    #[test]
    fn test_selection_default_is_all() {
        let args = SelectionArgs {
            projects: Vec::new(),
            affected_from: Vec::new(),
            tag: None,
            project_type: None,
        };
        assert_eq!(args.to_selection(), ProjectSelection::All);
    }
}
