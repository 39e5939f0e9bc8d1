//! Gantry Graph - Project graph construction
//!
//! Walks the workspace, runs the inference plugins, merges their
//! contributions, and produces an immutable typed project graph.

pub mod builder;
pub mod graph;
pub mod walker;

pub use builder::{GraphBuild, ProjectGraphBuilder};
pub use graph::ProjectGraph;
pub use walker::WorkspaceWalker;
