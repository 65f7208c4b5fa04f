//! Project export: canonical file tree, directory writer, zip and tar.gz archives.

pub mod hasher;
pub mod manifest;

use crate::core::error::ExportError;
use crate::core::types::ProjectArtifact;
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical relative path of the main playbook.
pub const MAIN_PLAYBOOK: &str = "site.yml";
/// Canonical relative path of the control configuration.
pub const CONTROL_CONFIG: &str = "ansible.cfg";

/// The project as ordered `relative path -> contents`.
pub fn project_files(project: &ProjectArtifact) -> IndexMap<String, String> {
    let mut files = IndexMap::new();
    files.insert(MAIN_PLAYBOOK.to_string(), project.main_playbook.clone());
    files.insert(CONTROL_CONFIG.to_string(), project.control_config.clone());

    for (name, role) in &project.roles {
        let base = format!("roles/{name}");
        files.insert(format!("{base}/tasks/main.yml"), role.tasks.clone());
        if let Some(ref h) = role.handlers {
            files.insert(format!("{base}/handlers/main.yml"), h.clone());
        }
        if let Some(ref d) = role.defaults {
            files.insert(format!("{base}/defaults/main.yml"), d.clone());
        }
        for (file, body) in &role.templates {
            files.insert(format!("{base}/templates/{file}"), body.clone());
        }
        for (file, body) in &role.files {
            files.insert(format!("{base}/files/{file}"), body.clone());
        }
    }

    for (env, inventory) in &project.inventories {
        let base = format!("inventories/{env}");
        files.insert(format!("{base}/hosts.yml"), inventory.hosts.clone());
        for (group, vars) in &inventory.group_vars {
            files.insert(format!("{base}/group_vars/{group}.yml"), vars.clone());
        }
    }

    files
}

/// Per-file content hashes in canonical order.
pub fn file_hashes(files: &IndexMap<String, String>) -> IndexMap<String, String> {
    files
        .iter()
        .map(|(path, body)| (path.clone(), hasher::hash_string(body)))
        .collect()
}

/// BLAKE3 fingerprint over the canonical file tree.
pub fn fingerprint(project: &ProjectArtifact) -> String {
    let hashes = file_hashes(&project_files(project));
    hasher::tree_hash(hashes.iter().map(|(p, h)| (p.as_str(), h.as_str())))
}

impl ProjectArtifact {
    /// BLAKE3 fingerprint over the canonical file tree.
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }
}

fn file_mode(path: &str) -> u32 {
    if path.ends_with(".sh") {
        0o755
    } else {
        0o644
    }
}

/// Write the project tree and its manifest under `dir`. Returns written paths.
pub fn write_tree(project: &ProjectArtifact, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let files = project_files(project);
    let mut written = Vec::with_capacity(files.len() + 1);

    for (rel, body) in &files {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }
        std::fs::write(&path, body).map_err(|e| ExportError::io(&path, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(file_mode(rel));
            std::fs::set_permissions(&path, perms).map_err(|e| ExportError::io(&path, e))?;
        }
        written.push(path);
    }

    let lock = manifest::new_manifest(project);
    written.push(manifest::save_manifest(dir, &lock)?);

    debug!(dir = %dir.display(), files = written.len(), "wrote project tree");
    Ok(written)
}

fn zip_into<W: Write + std::io::Seek>(
    files: &IndexMap<String, String>,
    root: &str,
    writer: W,
) -> zip::result::ZipResult<W> {
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    let mut zip = zip::ZipWriter::new(writer);
    for (rel, body) in files {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(file_mode(rel));
        zip.start_file(format!("{root}/{rel}"), options)?;
        zip.write_all(body.as_bytes())?;
    }
    zip.finish()
}

/// Zip archive bytes with every file under `root/`.
pub fn zip_bytes(project: &ProjectArtifact, root: &str) -> Result<Vec<u8>, ExportError> {
    let files = project_files(project);
    zip_into(&files, root, Cursor::new(Vec::new()))
        .map(|c| c.into_inner())
        .map_err(|e| ExportError::Archive {
            path: PathBuf::from(format!("{root}.zip")),
            message: e.to_string(),
        })
}

/// Gzipped tar archive bytes with every file under `root/`.
pub fn tar_gz_bytes(project: &ProjectArtifact, root: &str) -> Result<Vec<u8>, ExportError> {
    let archive_err = |e: std::io::Error| ExportError::Archive {
        path: PathBuf::from(format!("{root}.tar.gz")),
        message: e.to_string(),
    };

    let files = project_files(project);
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (rel, body) in &files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(file_mode(rel));
        header.set_mtime(0);
        builder
            .append_data(&mut header, format!("{root}/{rel}"), body.as_bytes())
            .map_err(archive_err)?;
    }
    let encoder = builder.into_inner().map_err(archive_err)?;
    encoder.finish().map_err(archive_err)
}

fn write_archive(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }
    }
    std::fs::write(path, bytes).map_err(|e| ExportError::io(path, e))
}

fn archive_root(path: &Path, suffix: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .and_then(|n| n.strip_suffix(suffix).map(|s| s.to_string()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "project".to_string())
}

/// Write a zip archive to `path`. Returns the archive bytes.
pub fn write_zip(project: &ProjectArtifact, path: &Path) -> Result<Vec<u8>, ExportError> {
    let bytes = zip_bytes(project, &archive_root(path, ".zip"))?;
    write_archive(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote zip archive");
    Ok(bytes)
}

/// Write a gzipped tar archive to `path`. Returns the archive bytes.
pub fn write_tar_gz(project: &ProjectArtifact, path: &Path) -> Result<Vec<u8>, ExportError> {
    let bytes = tar_gz_bytes(project, &archive_root(path, ".tar.gz"))?;
    write_archive(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote tar.gz archive");
    Ok(bytes)
}
