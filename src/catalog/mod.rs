//! Role catalog: maps a role id and environment to a rendered role artifact.
//!
//! Lookup is two-tier. Specialized strategies (the container/orchestration
//! family) are consulted first, in registration order; the generic table
//! second. Role text lives in static `RoleTemplate` tables and is rendered
//! with environment-derived parameters.

pub mod generic;
pub mod orchestration;

use crate::core::error::{CatalogError, CompositionError};
use crate::core::profile::EnvProfile;
use crate::core::resolver;
use crate::core::types::{Environment, RoleArtifact, RoleId};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::debug;

static ROLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*$").unwrap_or_else(|e| panic!("role name pattern: {e}"))
});

/// True when `name` can be used as a role directory name.
pub fn is_valid_role_name(name: &str) -> bool {
    ROLE_NAME.is_match(name)
}

/// Static role text with `{{params.key}}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct RoleTemplate {
    pub name: &'static str,
    pub tasks: &'static str,
    pub handlers: Option<&'static str>,
    pub defaults: Option<&'static str>,
    pub templates: &'static [(&'static str, &'static str)],
    pub files: &'static [(&'static str, &'static str)],
}

impl RoleTemplate {
    /// Render every text field with the given parameters.
    pub fn render(&self, params: &IndexMap<&'static str, String>) -> RoleArtifact {
        RoleArtifact {
            name: self.name.to_string(),
            tasks: resolver::render(self.tasks, params),
            handlers: self.handlers.map(|h| resolver::render(h, params)),
            defaults: self.defaults.map(|d| resolver::render(d, params)),
            templates: self
                .templates
                .iter()
                .map(|(file, body)| (file.to_string(), resolver::render(body, params)))
                .collect(),
            files: self
                .files
                .iter()
                .map(|(file, body)| (file.to_string(), resolver::render(body, params)))
                .collect(),
        }
    }
}

/// Policy strictness for admission, approval gates, and similar checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    Advisory,
    Blocking,
}

impl Enforcement {
    /// Pod Security Admission mode label value.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Advisory => "warn",
            Self::Blocking => "enforce",
        }
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisory => write!(f, "advisory"),
            Self::Blocking => write!(f, "blocking"),
        }
    }
}

/// Capacity and retention computed by a specialized strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sizing {
    pub replicas: u32,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub retention_days: u32,
    pub storage_gb: u32,
    pub enforcement: Enforcement,
    /// Pinned chart, engine, or branch version
    pub version: &'static str,
}

impl Sizing {
    fn extend_params(&self, params: &mut IndexMap<&'static str, String>) {
        params.insert("replicas", self.replicas.to_string());
        params.insert("min_replicas", self.min_replicas.to_string());
        params.insert("max_replicas", self.max_replicas.to_string());
        params.insert("retention_days", self.retention_days.to_string());
        params.insert("storage_gb", self.storage_gb.to_string());
        params.insert("enforcement_mode", self.enforcement.mode().to_string());
        params.insert(
            "approval_required",
            (self.enforcement == Enforcement::Blocking).to_string(),
        );
        params.insert("version", self.version.to_string());
    }
}

/// A specialized generator consulted before the generic table.
pub trait RoleStrategy: Send + Sync {
    /// Whether this strategy serves `id`.
    fn handles(&self, id: &RoleId) -> bool;

    /// Artifact name this strategy produces.
    fn artifact_name(&self) -> &str;

    /// Capacity and retention for an environment.
    fn sizing(&self, env: Environment) -> Sizing;

    /// Produce the artifact for an environment.
    fn resolve(&self, env: Environment) -> RoleArtifact;
}

/// Strategy backed by a template table and a sizing function.
pub struct TableStrategy {
    pub id: RoleId,
    pub template: &'static RoleTemplate,
    pub sizing: fn(Environment) -> Sizing,
}

impl RoleStrategy for TableStrategy {
    fn handles(&self, id: &RoleId) -> bool {
        *id == self.id
    }

    fn artifact_name(&self) -> &str {
        self.template.name
    }

    fn sizing(&self, env: Environment) -> Sizing {
        (self.sizing)(env)
    }

    fn resolve(&self, env: Environment) -> RoleArtifact {
        let mut params = EnvProfile::for_env(env).params();
        self.sizing(env).extend_params(&mut params);
        self.template.render(&params)
    }
}

/// Which lookup tier serves a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Specialized,
    Generic,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specialized => write!(f, "specialized"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// One row of a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: RoleId,
    pub artifact_name: String,
    pub tier: Tier,
}

/// Immutable registry of role generators. Build once, share by reference.
pub struct RoleCatalog {
    strategies: Vec<Box<dyn RoleStrategy>>,
    generic: IndexMap<RoleId, &'static RoleTemplate>,
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoleCatalog {
    /// A catalog with no entries.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
            generic: IndexMap::new(),
        }
    }

    /// The built-in generic and orchestration tables.
    pub fn builtin() -> Self {
        Self {
            strategies: orchestration::strategies(),
            generic: generic::table().into_iter().collect(),
        }
    }

    /// Register a generic entry.
    pub fn with_generic(
        mut self,
        id: RoleId,
        template: &'static RoleTemplate,
    ) -> Result<Self, CatalogError> {
        if !is_valid_role_name(template.name) {
            return Err(CatalogError::InvalidRoleName(template.name.to_string()));
        }
        if self.generic.contains_key(&id) {
            return Err(CatalogError::AlreadyRegistered(id.to_string()));
        }
        self.generic.insert(id, template);
        Ok(self)
    }

    /// Register a specialized strategy behind the existing ones.
    pub fn with_strategy(mut self, strategy: Box<dyn RoleStrategy>) -> Result<Self, CatalogError> {
        if !is_valid_role_name(strategy.artifact_name()) {
            return Err(CatalogError::InvalidRoleName(
                strategy.artifact_name().to_string(),
            ));
        }
        self.strategies.push(strategy);
        Ok(self)
    }

    /// Specialized strategy serving `id`, if any.
    pub fn strategy_for(&self, id: &RoleId) -> Option<&dyn RoleStrategy> {
        self.strategies
            .iter()
            .find(|s| s.handles(id))
            .map(|s| s.as_ref())
    }

    /// Tier that would serve `id`.
    pub fn tier(&self, id: &RoleId) -> Option<Tier> {
        if self.strategy_for(id).is_some() {
            Some(Tier::Specialized)
        } else if self.generic.contains_key(id) {
            Some(Tier::Generic)
        } else {
            None
        }
    }

    pub fn contains(&self, id: &RoleId) -> bool {
        self.tier(id).is_some()
    }

    /// Resolve a role for an environment.
    pub fn resolve(&self, id: &RoleId, env: Environment) -> Result<RoleArtifact, CompositionError> {
        if let Some(strategy) = self.strategy_for(id) {
            debug!(role = %id, env = %env, tier = "specialized", "resolving role");
            return Ok(strategy.resolve(env));
        }
        if let Some(template) = self.generic.get(id) {
            debug!(role = %id, env = %env, tier = "generic", "resolving role");
            return Ok(template.render(&EnvProfile::for_env(env).params()));
        }
        Err(CompositionError::UnknownRoleId(id.to_string()))
    }

    /// Every registered role id, built-ins in listing order, then extensions.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let mut ids: Vec<RoleId> = RoleId::BUILTIN.to_vec();
        ids.extend(self.generic.keys().filter(|id| id.is_unknown()).cloned());

        ids.into_iter()
            .filter_map(|id| {
                if let Some(s) = self.strategy_for(&id) {
                    Some(CatalogEntry {
                        artifact_name: s.artifact_name().to_string(),
                        tier: Tier::Specialized,
                        id,
                    })
                } else {
                    self.generic.get(&id).map(|t| CatalogEntry {
                        artifact_name: t.name.to_string(),
                        tier: Tier::Generic,
                        id: id.clone(),
                    })
                }
            })
            .collect()
    }
}
