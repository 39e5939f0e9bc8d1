//! Gantry Inference - Manifest inference plugins
//!
//! Each plugin recognizes a class of ecosystem manifests (package.json,
//! pom.xml, go.mod, Dockerfile) and contributes projects, targets, and
//! cross-project dependency edges to the project graph.

pub mod context;
pub mod docker;
pub mod external;
pub mod golang;
pub mod javascript;
pub mod maven;
pub mod registry;
pub mod traits;

pub use context::{DependencyContext, NodeContext};
pub use docker::DockerPlugin;
pub use external::ExternalInferencePlugin;
pub use golang::GoPlugin;
pub use javascript::JavaScriptPlugin;
pub use maven::MavenPlugin;
pub use registry::{InferenceRegistry, RegisteredPlugin};
pub use traits::{CreateNodesResult, InferencePlugin};
