//! Skill sources, their deployed instances, and the operations between them.
//!
//! A source is a directory under the skills root (usually a git checkout).
//! Its sub-skills are deployed into coding-assistant skill directories either
//! as copies or as symbolic links, and every deployment is tracked in a
//! persistent registry so it can be refreshed or removed later.

pub mod acquire;
pub mod author;
pub mod deploy;
pub mod discover;
pub mod error;
pub mod lifecycle;
pub mod parse;
pub mod registry;
pub mod targets;
pub mod types;

pub use {
    deploy::{DeployStrategy, Removal},
    error::{Error, Result},
    lifecycle::{DeployReport, DeployRequest, SkillManager},
    registry::{InMemoryRegistryStore, JsonRegistryStore, RegistryStore},
    targets::{Scope, Tool},
    types::{Candidate, DeployedInstance, Origin, SourceEntry},
};
