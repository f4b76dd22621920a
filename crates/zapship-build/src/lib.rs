//! zapship image build / publish
//!
//! This crate provides the two pipeline stages: building the image from
//! its build context and pushing it to a container registry, plus the
//! orchestrator that runs them in order behind the branch gate.

pub mod auth;
pub mod builder;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod pusher;
pub mod recipe;

pub use auth::RegistryAuth;
pub use builder::ImageBuilder;
pub use context::{ContextBuilder, DockerIgnore};
pub use error::{BuildError, BuildResult};
pub use pipeline::{ImageBuild, ImagePublish, Pipeline, RunOutcome, RunReport};
pub use progress::BuildProgress;
pub use pusher::{ImagePusher, validate_tag};
pub use recipe::{Finding, Instruction, Recipe, Severity};
