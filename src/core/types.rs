//! Value types for role composition.
//!
//! Every type here is immutable once built and carries no process state.
//! Maps are order-preserving so rendered output is byte-stable.

use super::error::CompositionError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Environment
// ============================================================================

/// Deployment context. Every environment-sensitive default is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    /// Both environments, in export order.
    pub const ALL: [Environment; 2] = [Environment::Staging, Environment::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(CompositionError::InvalidEnvironment(other.to_string())),
        }
    }
}

// ============================================================================
// Role identifiers
// ============================================================================

/// Key into the role catalog.
///
/// The named variants are the built-in set. Anything else parses to
/// `Unknown`, which a catalog may still serve if a caller registered it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleId {
    Web,
    Database,
    Security,
    Backup,
    Monitoring,
    Vault,
    CloudVm,
    LoadBalancer,
    Kubernetes,
    Helm,
    KubeMonitoring,
    ManagedCluster,
    Pipeline,
    Unknown(String),
}

impl RoleId {
    /// Built-in identifiers in catalog listing order.
    pub const BUILTIN: [RoleId; 13] = [
        RoleId::Web,
        RoleId::Database,
        RoleId::Security,
        RoleId::Backup,
        RoleId::Monitoring,
        RoleId::Vault,
        RoleId::CloudVm,
        RoleId::LoadBalancer,
        RoleId::Kubernetes,
        RoleId::Helm,
        RoleId::KubeMonitoring,
        RoleId::ManagedCluster,
        RoleId::Pipeline,
    ];

    /// Canonical string key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Web => "web",
            Self::Database => "database",
            Self::Security => "security",
            Self::Backup => "backup",
            Self::Monitoring => "monitoring",
            Self::Vault => "vault",
            Self::CloudVm => "cloud_vm",
            Self::LoadBalancer => "loadbalancer",
            Self::Kubernetes => "kubernetes",
            Self::Helm => "helm",
            Self::KubeMonitoring => "kube_monitoring",
            Self::ManagedCluster => "managed_cluster",
            Self::Pipeline => "pipeline",
            Self::Unknown(s) => s,
        }
    }

    /// Parse a role key, accepting the common aliases. Never fails.
    pub fn parse(s: &str) -> Self {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "web" | "nginx" | "webserver" => Self::Web,
            "database" | "db" | "postgres" | "postgresql" => Self::Database,
            "security" | "hardening" => Self::Security,
            "backup" => Self::Backup,
            "monitoring" => Self::Monitoring,
            "vault" => Self::Vault,
            "cloud_vm" | "ec2" => Self::CloudVm,
            "loadbalancer" | "haproxy" => Self::LoadBalancer,
            "kubernetes" | "k8s" => Self::Kubernetes,
            "helm" => Self::Helm,
            "kube_monitoring" | "prometheus_stack" => Self::KubeMonitoring,
            "managed_cluster" | "eks" => Self::ManagedCluster,
            "pipeline" | "cicd" | "ci_cd" => Self::Pipeline,
            _ => Self::Unknown(s.trim().to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Ordered, duplicate-free, non-empty list of roles to compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    roles: Vec<RoleId>,
}

impl Selection {
    /// Collapse duplicates to first-occurrence order. Fails when nothing is left.
    pub fn new<I>(roles: I) -> Result<Self, CompositionError>
    where
        I: IntoIterator<Item = RoleId>,
    {
        let mut unique: Vec<RoleId> = Vec::new();
        for role in roles {
            if !unique.contains(&role) {
                unique.push(role);
            }
        }
        if unique.is_empty() {
            return Err(CompositionError::EmptySelection);
        }
        Ok(Self { roles: unique })
    }

    /// Parse role keys. Blank entries are ignored.
    pub fn parse<S: AsRef<str>>(keys: &[S]) -> Result<Self, CompositionError> {
        Self::new(
            keys.iter()
                .map(|k| k.as_ref())
                .filter(|k| !k.trim().is_empty())
                .map(RoleId::parse),
        )
    }

    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Validate a raw request: environment first, then the selection.
/// Nothing here touches the catalog.
pub fn parse_request<S: AsRef<str>>(
    roles: &[S],
    environment: &str,
) -> Result<(Selection, Environment), CompositionError> {
    let env = environment.parse::<Environment>()?;
    let selection = Selection::parse(roles)?;
    Ok((selection, env))
}

// ============================================================================
// Artifacts
// ============================================================================

/// One role's contribution to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleArtifact {
    /// Externally visible role name (directory under `roles/`)
    pub name: String,

    /// `tasks/main.yml`
    pub tasks: String,

    /// `handlers/main.yml`
    #[serde(default)]
    pub handlers: Option<String>,

    /// `defaults/main.yml`
    #[serde(default)]
    pub defaults: Option<String>,

    /// `templates/<file>`
    #[serde(default)]
    pub templates: IndexMap<String, String>,

    /// `files/<file>`
    #[serde(default)]
    pub files: IndexMap<String, String>,
}

/// Host topology and group variables for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryArtifact {
    pub hosts: String,
    pub group_vars: IndexMap<String, String>,
}

/// One execution phase of the main playbook bound to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePhase {
    pub role_id: String,
    pub name: String,
    pub group: String,
}

/// A fully assembled project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectArtifact {
    /// `site.yml`
    pub main_playbook: String,

    /// `ansible.cfg`
    pub control_config: String,

    /// Environment the playbook and control config target
    pub environment: Environment,

    /// Ordered role phases as they appear in the main playbook
    pub plan: Vec<RolePhase>,

    /// Role artifacts keyed by artifact name, in selection order
    pub roles: IndexMap<String, RoleArtifact>,

    /// Inventories keyed by environment
    pub inventories: BTreeMap<Environment, InventoryArtifact>,
}

impl ProjectArtifact {
    /// Role names in execution order.
    pub fn role_names(&self) -> Vec<&str> {
        self.plan.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!(
            " production ".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn test_environment_parse_invalid() {
        let err = "qa".parse::<Environment>().unwrap_err();
        assert_eq!(err, CompositionError::InvalidEnvironment("qa".to_string()));
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Staging.to_string(), "staging");
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn test_role_id_aliases() {
        assert_eq!(RoleId::parse("nginx"), RoleId::Web);
        assert_eq!(RoleId::parse("PostgreSQL"), RoleId::Database);
        assert_eq!(RoleId::parse("k8s"), RoleId::Kubernetes);
        assert_eq!(RoleId::parse("ci-cd"), RoleId::Pipeline);
        assert_eq!(RoleId::parse("eks"), RoleId::ManagedCluster);
    }

    #[test]
    fn test_role_id_unknown_sentinel() {
        let id = RoleId::parse("mainframe");
        assert_eq!(id, RoleId::Unknown("mainframe".to_string()));
        assert!(id.is_unknown());
        assert_eq!(id.as_str(), "mainframe");
    }

    #[test]
    fn test_role_id_builtin_roundtrip() {
        for id in RoleId::BUILTIN.iter() {
            assert_eq!(&RoleId::parse(id.as_str()), id);
            assert!(!id.is_unknown());
        }
    }

    #[test]
    fn test_selection_dedup_first_occurrence() {
        let sel = Selection::parse(&["web", "security", "nginx", "web", "db"]).unwrap();
        assert_eq!(
            sel.roles(),
            &[RoleId::Web, RoleId::Security, RoleId::Database]
        );
        assert_eq!(sel.len(), 3);
    }

    #[test]
    fn test_selection_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(
            Selection::parse(&empty).unwrap_err(),
            CompositionError::EmptySelection
        );
        assert_eq!(
            Selection::parse(&["", "  "]).unwrap_err(),
            CompositionError::EmptySelection
        );
    }

    #[test]
    fn test_parse_request_checks_environment_first() {
        let empty: [&str; 0] = [];
        let err = parse_request(&empty, "qa").unwrap_err();
        assert!(matches!(err, CompositionError::InvalidEnvironment(_)));

        let err = parse_request(&empty, "staging").unwrap_err();
        assert_eq!(err, CompositionError::EmptySelection);

        let (sel, env) = parse_request(&["web"], "production").unwrap();
        assert_eq!(sel.roles(), &[RoleId::Web]);
        assert_eq!(env, Environment::Production);
    }

    #[test]
    fn test_environment_ordering_for_maps() {
        let mut map = BTreeMap::new();
        map.insert(Environment::Production, 1);
        map.insert(Environment::Staging, 0);
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, Environment::ALL.to_vec());
    }
}
