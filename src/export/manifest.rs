//! Export manifest (`playforge.lock.yaml`): load, save (atomic), verify.

use super::hasher;
use crate::core::error::ExportError;
use crate::core::types::{Environment, ProjectArtifact};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manifest file name at the root of an exported tree.
pub const MANIFEST_FILE: &str = "playforge.lock.yaml";

/// Record of one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: String,
    pub generator: String,
    pub generated_at: String,
    pub environment: Environment,
    pub roles: Vec<String>,
    pub fingerprint: String,
    pub files: IndexMap<String, String>,
}

/// Current UTC time as ISO 8601 with second precision.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Build a manifest for a project, stamped with the current time.
pub fn new_manifest(project: &ProjectArtifact) -> Manifest {
    let files = super::file_hashes(&super::project_files(project));
    let fingerprint = hasher::tree_hash(files.iter().map(|(p, h)| (p.as_str(), h.as_str())));
    Manifest {
        schema: "1.0".to_string(),
        generator: format!("playforge {}", env!("CARGO_PKG_VERSION")),
        generated_at: now_iso8601(),
        environment: project.environment,
        roles: project.role_names().iter().map(|s| s.to_string()).collect(),
        fingerprint,
        files,
    }
}

/// Save a manifest atomically (write to temp, then rename). Returns its path.
pub fn save_manifest(dir: &Path, manifest: &Manifest) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;
    let path = dir.join(MANIFEST_FILE);

    let yaml = serde_yaml_ng::to_string(manifest)
        .map_err(|e| ExportError::Manifest(format!("serialize error: {}", e)))?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| ExportError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| ExportError::io(&path, e))?;
    Ok(path)
}

/// Load the manifest of an exported tree. Returns None if there is none.
pub fn load_manifest(dir: &Path) -> Result<Option<Manifest>, ExportError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ExportError::io(&path, e))?;
    let manifest = serde_yaml_ng::from_str(&content).map_err(|e| {
        ExportError::Manifest(format!("invalid manifest {}: {}", path.display(), e))
    })?;
    Ok(Some(manifest))
}

/// Compare files on disk against the manifest. Returns one line per mismatch.
pub fn verify_tree(dir: &Path, manifest: &Manifest) -> Vec<String> {
    let mut drift = Vec::new();
    for (rel, expected) in &manifest.files {
        match hasher::hash_file(&dir.join(rel)) {
            Ok(actual) if actual == *expected => {}
            Ok(actual) => drift.push(format!("{rel}: expected {expected}, found {actual}")),
            Err(e) => drift.push(format!("{rel}: {e}")),
        }
    }
    drift
}

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?")
        .unwrap_or_else(|e| panic!("timestamp pattern: {e}"))
});

/// Replace ISO 8601 timestamps with a fixed placeholder.
pub fn normalize_volatile(text: &str) -> String {
    TIMESTAMP.replace_all(text, "<timestamp>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RoleCatalog;
    use crate::core::builder;
    use crate::core::types::Selection;

    fn project() -> ProjectArtifact {
        let catalog = RoleCatalog::builtin();
        let selection = Selection::parse(&["database", "monitoring"]).unwrap();
        builder::build(&catalog, &selection, Environment::Production).unwrap()
    }

    #[test]
    fn test_new_manifest() {
        let p = project();
        let m = new_manifest(&p);
        assert_eq!(m.environment, Environment::Production);
        assert_eq!(m.roles, vec!["database", "monitoring"]);
        assert_eq!(m.fingerprint, p.fingerprint());
        assert!(m.generator.starts_with("playforge "));
        assert_eq!(m.files["site.yml"], hasher::hash_string(&p.main_playbook));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let m = new_manifest(&project());
        save_manifest(dir.path(), &m).unwrap();
        let loaded = load_manifest(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, m);
        assert!(!dir.path().join("playforge.lock.yaml.tmp").exists());
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_manifest(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "schema: [\n").unwrap();
        assert!(matches!(
            load_manifest(dir.path()),
            Err(ExportError::Manifest(_))
        ));
    }

    #[test]
    fn test_verify_tree_detects_edit() {
        let dir = tempfile::tempdir().unwrap();
        let p = project();
        super::super::write_tree(&p, dir.path()).unwrap();
        let m = load_manifest(dir.path()).unwrap().unwrap();
        assert!(verify_tree(dir.path(), &m).is_empty());

        std::fs::write(dir.path().join("site.yml"), "---\n[]\n").unwrap();
        std::fs::remove_file(dir.path().join("ansible.cfg")).unwrap();
        let drift = verify_tree(dir.path(), &m);
        assert_eq!(drift.len(), 2);
        assert!(drift[0].starts_with("site.yml: expected"));
        assert!(drift[1].starts_with("ansible.cfg: cannot open"));
    }

    #[test]
    fn test_normalize_volatile() {
        let a = "generated_at: 2026-02-16T14:00:00Z\nx: 1\n";
        let b = "generated_at: 2026-10-18T09:30:12.123+02:00\nx: 1\n";
        assert_eq!(normalize_volatile(a), normalize_volatile(b));
        assert_eq!(normalize_volatile(a), "generated_at: <timestamp>\nx: 1\n");
        assert_eq!(normalize_volatile("no time here"), "no time here");
    }

    #[test]
    fn test_manifests_equal_after_normalization() {
        let p = project();
        let a = serde_yaml_ng::to_string(&new_manifest(&p)).unwrap();
        let b = serde_yaml_ng::to_string(&new_manifest(&p)).unwrap();
        assert_eq!(normalize_volatile(&a), normalize_volatile(&b));
    }
}
