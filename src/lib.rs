//! Playforge: deterministic role composition for Ansible-style projects.
//!
//! A selection of roles and a target environment go in; a complete project
//! tree comes out: role tasks, handlers, defaults, templates, inventories for
//! each environment, and a main playbook that prepares hosts, applies every
//! role against its routed host group, and closes with a best-effort report.

pub mod catalog;
pub mod cli;
pub mod core;
pub mod export;
pub mod ledger;

pub use crate::catalog::RoleCatalog;
pub use crate::core::builder::build;
pub use crate::core::composer::{compose, Composer};
pub use crate::core::error::{CompositionError, ErrorKind};
pub use crate::core::types::{Environment, ProjectArtifact, RoleId, Selection};
