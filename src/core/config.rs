//! Request file (`playforge.yaml`): parsing, structural validation, schema.

use super::types::{Environment, Selection};
use super::validate::ValidationError;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default request file name.
pub const CONFIG_FILE: &str = "playforge.yaml";

/// Root of `playforge.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlayforgeConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Identity charged by the generation ledger
    #[serde(default)]
    pub user: Option<String>,

    /// Projects to generate, in order
    #[serde(default)]
    pub projects: IndexMap<String, ProjectRequest>,

    /// Where and how to write output
    #[serde(default)]
    pub output: OutputConfig,

    /// Batch policy
    #[serde(default)]
    pub policy: Policy,
}

/// One project to compose.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectRequest {
    /// `staging` or `production`
    pub environment: String,

    /// Role ids in execution order
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ProjectRequest {
    /// Parse into typed inputs. Environment is checked before the selection.
    pub fn parse(&self) -> Result<(Selection, Environment), super::error::CompositionError> {
        super::types::parse_request(&self.roles, &self.environment)
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    /// Root directory; each project is written to `<dir>/<project>`
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Archive format written alongside each tree
    #[serde(default)]
    pub archive: ArchiveFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            archive: ArchiveFormat::default(),
        }
    }
}

fn default_output_dir() -> String {
    "build".to_string()
}

/// Archive format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    #[default]
    None,
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// File extension, if this format produces an archive.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Zip => Some("zip"),
            Self::TarGz => Some("tar.gz"),
        }
    }
}

impl std::str::FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "zip" => Ok(Self::Zip),
            "tar_gz" | "tar.gz" | "tgz" => Ok(Self::TarGz),
            other => Err(format!(
                "unknown archive format '{other}' (expected none, zip, or tar_gz)"
            )),
        }
    }
}

/// Batch policy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Policy {
    /// Failure handling
    #[serde(default)]
    pub failure: FailurePolicy,

    /// Worker threads for multi-project runs
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Record each generation in `<dir>/generations.jsonl`
    #[serde(default = "default_true")]
    pub ledger: bool,

    /// Maximum recorded generations per user
    #[serde(default)]
    pub quota: Option<u32>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            failure: FailurePolicy::default(),
            jobs: default_jobs(),
            ledger: true,
            quota: None,
        }
    }
}

fn default_jobs() -> usize {
    4
}

fn default_true() -> bool {
    true
}

/// Failure handling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    StopOnFirst,
    ContinueIndependent,
}

/// True when a project name can be used as a single output directory.
pub fn is_valid_project_dir(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Parse a playforge.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<PlayforgeConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse YAML text into a PlayforgeConfig.
pub fn parse_config(yaml: &str) -> Result<PlayforgeConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns all errors found.
pub fn validate_config(config: &PlayforgeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    if config.name.is_empty() {
        errors.push(ValidationError {
            message: "name must not be empty".to_string(),
        });
    }

    if config.projects.is_empty() {
        errors.push(ValidationError {
            message: "at least one project is required".to_string(),
        });
    }

    for (name, project) in &config.projects {
        if !is_valid_project_dir(name) {
            errors.push(ValidationError {
                message: format!("project name '{}' is not a valid directory name", name),
            });
        }
        if project.environment.parse::<Environment>().is_err() {
            errors.push(ValidationError {
                message: format!(
                    "project '{}' has invalid environment '{}' (expected staging or production)",
                    name, project.environment
                ),
            });
        }
        if project.roles.iter().all(|r| r.trim().is_empty()) {
            errors.push(ValidationError {
                message: format!("project '{}' selects no roles", name),
            });
        }
    }

    if config.policy.jobs == 0 {
        errors.push(ValidationError {
            message: "policy.jobs must be at least 1".to_string(),
        });
    }

    if config.policy.quota == Some(0) {
        errors.push(ValidationError {
            message: "policy.quota of 0 forbids every generation".to_string(),
        });
    }

    errors
}

/// JSON Schema for `playforge.yaml`.
pub fn json_schema() -> Result<String, String> {
    let schema = schemars::schema_for!(PlayforgeConfig);
    serde_json::to_string_pretty(&schema).map_err(|e| format!("schema serialization: {}", e))
}

/// Starter request file written by `playforge init`.
pub fn starter_config(name: &str) -> String {
    format!(
        r#"version: "1.0"
name: {name}
description: "Generated by playforge init"

projects:
  web-stack:
    environment: staging
    roles: [security, web, database, monitoring]

output:
  dir: build
  archive: none

policy:
  failure: stop_on_first
  jobs: 4
  ledger: true
"#
    )
}
