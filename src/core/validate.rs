//! Structural validation of generated projects and exported trees.

use super::resolver;
use super::types::ProjectArtifact;
use std::path::Path;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Check that `text` parses as YAML.
pub fn check_yaml(text: &str) -> Result<(), String> {
    serde_yaml_ng::from_str::<serde_yaml_ng::Value>(text)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Check that `text` is line-oriented INI: sections, `key = value`, comments.
pub fn check_ini(text: &str) -> Result<(), String> {
    let mut in_section = false;
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            if !line.ends_with(']') || line.len() < 3 {
                return Err(format!("line {}: malformed section header", n + 1));
            }
            in_section = true;
            continue;
        }
        if !in_section {
            return Err(format!("line {}: key outside of a section", n + 1));
        }
        if !line.contains('=') {
            return Err(format!("line {}: expected 'key = value'", n + 1));
        }
    }
    Ok(())
}

fn check_text(path: &str, text: &str, yaml: bool, errors: &mut Vec<ValidationError>) {
    if yaml {
        if let Err(e) = check_yaml(text) {
            errors.push(ValidationError::new(format!("{path}: invalid YAML: {e}")));
        }
    }
    let left = resolver::unresolved(text);
    if !left.is_empty() {
        errors.push(ValidationError::new(format!(
            "{path}: unrendered parameters: {}",
            left.join(", ")
        )));
    }
}

/// Validate a composed project in memory.
pub fn validate_project(project: &ProjectArtifact) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_text("site.yml", &project.main_playbook, true, &mut errors);
    if let Ok(doc) = serde_yaml_ng::from_str::<serde_yaml_ng::Value>(&project.main_playbook) {
        match doc.as_sequence() {
            Some(plays) => {
                let referenced: Vec<&str> = plays
                    .iter()
                    .filter_map(|play| play["roles"].as_sequence())
                    .flatten()
                    .filter_map(|r| r["role"].as_str())
                    .collect();
                for name in &referenced {
                    if !project.roles.contains_key(*name) {
                        errors.push(ValidationError::new(format!(
                            "site.yml references role '{name}' that is not in the project"
                        )));
                    }
                }
                for name in project.roles.keys() {
                    if !referenced.contains(&name.as_str()) {
                        errors.push(ValidationError::new(format!(
                            "role '{name}' is not applied by site.yml"
                        )));
                    }
                }
            }
            None => errors.push(ValidationError::new("site.yml: expected a list of plays")),
        }
    }

    if let Err(e) = check_ini(&project.control_config) {
        errors.push(ValidationError::new(format!("ansible.cfg: {e}")));
    }
    check_text("ansible.cfg", &project.control_config, false, &mut errors);

    for (name, role) in &project.roles {
        if role.name != *name {
            errors.push(ValidationError::new(format!(
                "role key '{name}' does not match artifact name '{}'",
                role.name
            )));
        }
        let base = format!("roles/{name}");
        check_text(&format!("{base}/tasks/main.yml"), &role.tasks, true, &mut errors);
        if let Some(ref h) = role.handlers {
            check_text(&format!("{base}/handlers/main.yml"), h, true, &mut errors);
        }
        if let Some(ref d) = role.defaults {
            check_text(&format!("{base}/defaults/main.yml"), d, true, &mut errors);
        }
        for (file, body) in &role.templates {
            check_text(&format!("{base}/templates/{file}"), body, false, &mut errors);
        }
        for (file, body) in &role.files {
            check_text(&format!("{base}/files/{file}"), body, false, &mut errors);
        }
    }

    if !project.inventories.contains_key(&project.environment) {
        errors.push(ValidationError::new(format!(
            "no inventory for target environment '{}'",
            project.environment
        )));
    }
    for (env, inventory) in &project.inventories {
        let base = format!("inventories/{env}");
        check_text(&format!("{base}/hosts.yml"), &inventory.hosts, true, &mut errors);
        for (group, vars) in &inventory.group_vars {
            check_text(
                &format!("{base}/group_vars/{group}.yml"),
                vars,
                true,
                &mut errors,
            );
        }
    }

    errors
}

/// Validate every `.yml`/`.yaml` file below `dir`, plus `ansible.cfg` if present.
pub fn validate_tree(dir: &Path) -> Result<Vec<ValidationError>, String> {
    if !dir.is_dir() {
        return Err(format!("{} is not a directory", dir.display()));
    }

    let mut errors = Vec::new();
    let mut checked = 0usize;
    for ext in ["yml", "yaml"] {
        let pattern = format!("{}/**/*.{ext}", dir.display());
        let paths = glob::glob(&pattern).map_err(|e| format!("bad pattern {pattern}: {e}"))?;
        for entry in paths {
            let path = entry.map_err(|e| format!("cannot list {}: {e}", dir.display()))?;
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
            let rel = path.strip_prefix(dir).unwrap_or(&path).display().to_string();
            check_text(&rel, &content, true, &mut errors);
            checked += 1;
        }
    }

    let cfg = dir.join("ansible.cfg");
    if cfg.is_file() {
        let content = std::fs::read_to_string(&cfg)
            .map_err(|e| format!("failed to read {}: {}", cfg.display(), e))?;
        if let Err(e) = check_ini(&content) {
            errors.push(ValidationError::new(format!("ansible.cfg: {e}")));
        }
    }

    if checked == 0 {
        errors.push(ValidationError::new(format!(
            "{}: no YAML files found",
            dir.display()
        )));
    }
    Ok(errors)
}
