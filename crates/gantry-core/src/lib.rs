//! Gantry Core - Core library for the Gantry build orchestrator
//!
//! This crate provides the foundational types, error handling, and workspace
//! configuration shared by the inference, graph, task, and execution layers.

pub mod config;
pub mod error;
pub mod model;

pub use error::{GantryError, Result};
pub use model::{
    DependencyEdge, DependencyType, DependsOnRef, ProjectConfiguration, ProjectType,
    TargetConfiguration, TargetOptions, TargetRemoteOverride,
};
