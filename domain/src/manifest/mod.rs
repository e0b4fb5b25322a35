//! The manifest: the declared unit of work for one engine run.
//!
//! A [`Manifest`] lists the components to build, their dependencies and
//! file ownership, and is validated once at load time — acyclic and
//! file-disjoint — before the engine will schedule any work from it.

pub mod entities;
pub mod validate;

pub use entities::{ComponentDef, Manifest, Quality};
pub use validate::validate_manifest;
