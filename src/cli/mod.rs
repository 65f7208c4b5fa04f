//! CLI subcommands: init, validate, roles, inventory, generate, check, schema.

use crate::catalog::RoleCatalog;
use crate::core::batch::{self, BatchError, BatchRequest};
use crate::core::config::{self, ArchiveFormat, FailurePolicy, PlayforgeConfig};
use crate::core::error::{CompositionError, ErrorKind};
use crate::core::types::{Environment, ProjectArtifact};
use crate::core::{inventory, router, validate};
use crate::export::{self, manifest};
use crate::ledger::{ArtifactKind, GenerationLedger, JsonlLedger, Unmetered};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter playforge.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate playforge.yaml without generating anything
    Validate {
        /// Path to playforge.yaml
        #[arg(short, long, default_value = config::CONFIG_FILE)]
        file: PathBuf,
    },

    /// List catalog roles with their artifact name, tier, and host group
    Roles,

    /// Print the generated inventory for an environment
    Inventory {
        /// staging or production
        #[arg(short, long, default_value = "staging")]
        env: String,
    },

    /// Generate project trees (from playforge.yaml, or ad hoc with --role/--env)
    Generate {
        /// Path to playforge.yaml
        #[arg(short, long, conflicts_with_all = ["role", "env"])]
        file: Option<PathBuf>,

        /// Role to include, in execution order (repeatable or comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        role: Vec<String>,

        /// Target environment for an ad-hoc project
        #[arg(short, long)]
        env: Option<String>,

        /// Ad-hoc project name (output subdirectory)
        #[arg(long, default_value = "project")]
        name: String,

        /// Output directory (overrides output.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Archive format: none, zip, tar_gz (overrides output.archive)
        #[arg(long)]
        archive: Option<ArchiveFormat>,

        /// Worker threads (overrides policy.jobs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Validate an exported project tree and verify it against its manifest
    Check {
        /// Exported project directory
        dir: PathBuf,
    },

    /// Print the JSON Schema of playforge.yaml
    Schema,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Roles => cmd_roles(),
        Commands::Inventory { env } => cmd_inventory(&env),
        Commands::Generate {
            file,
            role,
            env,
            name,
            out,
            archive,
            jobs,
        } => match file {
            Some(file) => cmd_generate_file(&file, out.as_deref(), archive, jobs),
            None => cmd_generate_adhoc(&name, &role, env.as_deref(), out.as_deref(), archive),
        },
        Commands::Check { dir } => cmd_check(&dir),
        Commands::Schema => cmd_schema(),
    }
}

/// Present a composition error the way its kind asks for.
pub fn describe_error(err: &CompositionError) -> String {
    match err.kind() {
        ErrorKind::InputValidation => format!("invalid input: {}", err),
        ErrorKind::CatalogConfiguration => format!("catalog error: {}", err),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(config::CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let name = path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "my-automation".to_string());

    std::fs::write(&config_path, config::starter_config(&name))
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized playforge project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = config::parse_config_file(file)?;
    let errors = config::validate_config(&config);

    if errors.is_empty() {
        let roles: usize = config.projects.values().map(|p| p.roles.len()).sum();
        println!(
            "OK: {} ({} projects, {} role selections)",
            config.name,
            config.projects.len(),
            roles
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse and validate a playforge config file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<PlayforgeConfig, String> {
    let config = config::parse_config_file(file)?;
    let errors = config::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn cmd_roles() -> Result<(), String> {
    let catalog = RoleCatalog::builtin();
    println!("{:<18} {:<18} {:<12} GROUP", "ROLE", "ARTIFACT", "TIER");
    for entry in catalog.entries() {
        println!(
            "{:<18} {:<18} {:<12} {}",
            entry.id,
            entry.artifact_name,
            entry.tier,
            router::route_for(&entry.id)
        );
    }
    Ok(())
}

fn cmd_inventory(env: &str) -> Result<(), String> {
    let env: Environment = env.parse().map_err(|e| describe_error(&e))?;
    let inv = inventory::cached(env);
    println!("# inventories/{}/hosts.yml", env);
    print!("{}", inv.hosts);
    for (group, vars) in &inv.group_vars {
        println!();
        println!("# inventories/{}/group_vars/{}.yml", env, group);
        print!("{}", vars);
    }
    Ok(())
}

/// Write one project (tree plus optional archive) and record it in the ledger.
fn export_project(
    project: &ProjectArtifact,
    name: &str,
    out: &Path,
    archive: ArchiveFormat,
    user: &str,
    ledger: &dyn GenerationLedger,
) -> Result<(), String> {
    if !ledger.can_generate(user) {
        return Err(format!("generation quota exhausted for user '{}'", user));
    }

    let tree = out.join(name);
    let written = export::write_tree(project, &tree).map_err(|e| e.to_string())?;

    let (kind, bytes, target) = match archive {
        ArchiveFormat::None => {
            let lock = tree.join(manifest::MANIFEST_FILE);
            let bytes = std::fs::read(&lock)
                .map_err(|e| format!("cannot read {}: {}", lock.display(), e))?;
            (ArtifactKind::Tree, bytes, tree.clone())
        }
        ArchiveFormat::Zip => {
            let path = out.join(format!("{name}.zip"));
            let bytes = export::write_zip(project, &path).map_err(|e| e.to_string())?;
            (ArtifactKind::Zip, bytes, path)
        }
        ArchiveFormat::TarGz => {
            let path = out.join(format!("{name}.tar.gz"));
            let bytes = export::write_tar_gz(project, &path).map_err(|e| e.to_string())?;
            (ArtifactKind::TarGz, bytes, path)
        }
    };

    let summary = format!(
        "{} ({}, {} roles, {})",
        name,
        project.environment,
        project.roles.len(),
        project.fingerprint()
    );
    let outcome = ledger.record_generation(user, &summary, &bytes, kind);
    if let Some(err) = outcome.error {
        return Err(format!("cannot record generation of '{}': {}", name, err));
    }

    info!(project = name, files = written.len(), "exported project");
    println!(
        "  {}: {} roles [{}] -> {}",
        name,
        project.roles.len(),
        project.role_names().join(", "),
        target.display()
    );
    Ok(())
}

fn cmd_generate_file(
    file: &Path,
    out: Option<&Path>,
    archive: Option<ArchiveFormat>,
    jobs: Option<usize>,
) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let archive = archive.unwrap_or(config.output.archive);
    let jobs = jobs.unwrap_or(config.policy.jobs);
    let user = config.user.as_deref().unwrap_or("anonymous");

    let ledger: Box<dyn GenerationLedger> = if config.policy.ledger {
        Box::new(JsonlLedger::in_dir(&out, config.policy.quota))
    } else {
        Box::new(Unmetered)
    };

    let catalog = RoleCatalog::builtin();
    let requests = batch::requests_from_config(&config);
    println!("Generating: {} ({} projects)", config.name, requests.len());

    let report = batch::run(&catalog, &requests, jobs, config.policy.failure).map_err(|e| match e {
        BatchError::Failed { name, source } => {
            format!("project '{}': {}", name, describe_error(&source))
        }
        other => other.to_string(),
    })?;

    let mut exported = 0usize;
    let mut export_failures = 0usize;
    for success in &report.successes {
        let result = export_project(
            &success.project,
            &success.name,
            &out,
            archive,
            user,
            ledger.as_ref(),
        );
        match result {
            Ok(()) => exported += 1,
            Err(e) if config.policy.failure == FailurePolicy::StopOnFirst => return Err(e),
            Err(e) => {
                eprintln!("  FAILED: {}: {}", success.name, e);
                export_failures += 1;
            }
        }
    }

    for failure in &report.failures {
        eprintln!("  FAILED: {}: {}", failure.name, describe_error(&failure.error));
    }

    let failed = report.failures.len() + export_failures;
    if failed > 0 {
        return Err(format!("{} project(s) failed", failed));
    }
    println!("Generated {} project(s) in {}", exported, out.display());
    Ok(())
}

fn cmd_generate_adhoc(
    name: &str,
    roles: &[String],
    env: Option<&str>,
    out: Option<&Path>,
    archive: Option<ArchiveFormat>,
) -> Result<(), String> {
    let env = env.ok_or_else(|| "either --file or --env is required".to_string())?;
    if !config::is_valid_project_dir(name) {
        return Err(format!("project name '{}' is not a valid directory name", name));
    }
    let request = BatchRequest {
        name: name.to_string(),
        roles: roles.to_vec(),
        environment: env.to_string(),
    };
    let catalog = RoleCatalog::builtin();
    let report = batch::run(
        &catalog,
        std::slice::from_ref(&request),
        1,
        FailurePolicy::StopOnFirst,
    )
    .map_err(|e| match e {
        BatchError::Failed { source, .. } => describe_error(&source),
        other => other.to_string(),
    })?;

    let out = out.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("build"));
    for success in &report.successes {
        export_project(
            &success.project,
            &success.name,
            &out,
            archive.unwrap_or_default(),
            "anonymous",
            &Unmetered,
        )?;
    }
    Ok(())
}

fn cmd_check(dir: &Path) -> Result<(), String> {
    let errors = validate::validate_tree(dir)?;
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }

    let drift = match manifest::load_manifest(dir).map_err(|e| e.to_string())? {
        Some(lock) => {
            let drift = manifest::verify_tree(dir, &lock);
            for d in &drift {
                eprintln!("  DRIFTED: {}", d);
            }
            println!(
                "Manifest: {} ({} files, {})",
                lock.generator,
                lock.files.len(),
                lock.fingerprint
            );
            drift.len()
        }
        None => {
            println!("Manifest: none ({} not found)", manifest::MANIFEST_FILE);
            0
        }
    };

    if errors.is_empty() && drift == 0 {
        println!("OK: {}", dir.display());
        Ok(())
    } else {
        Err(format!(
            "{} validation error(s), {} drifted file(s)",
            errors.len(),
            drift
        ))
    }
}

fn cmd_schema() -> Result<(), String> {
    println!("{}", config::json_schema()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("playforge.yaml");
        std::fs::write(&path, body).unwrap();
        path
    }

    const VALID: &str = r#"
version: "1.0"
name: test-platform
user: ops
projects:
  web-stack:
    environment: production
    roles: [security, web, monitoring]
  cluster:
    environment: staging
    roles: [managed_cluster, kubernetes]
policy:
  failure: stop_on_first
  jobs: 2
"#;

    #[test]
    fn test_init() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let config = config::parse_config_file(&dir.path().join("playforge.yaml")).unwrap();
        assert!(config::validate_config(&config).is_empty());
    }

    #[test]
    fn test_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let err = cmd_init(dir.path()).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_validate_valid() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(dir.path(), VALID);
        cmd_validate(&file).unwrap();
    }

    #[test]
    fn test_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(
            dir.path(),
            "version: \"2.0\"\nname: x\nprojects:\n  p:\n    environment: qa\n    roles: [web]\n",
        );
        let err = cmd_validate(&file).unwrap_err();
        assert!(err.contains("2 validation error(s)"));
    }

    #[test]
    fn test_roles_and_schema() {
        cmd_roles().unwrap();
        cmd_schema().unwrap();
    }

    #[test]
    fn test_inventory() {
        cmd_inventory("production").unwrap();
        let err = cmd_inventory("qa").unwrap_err();
        assert!(err.starts_with("invalid input:"));
    }

    #[test]
    fn test_generate_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(dir.path(), VALID);
        let out = dir.path().join("out");
        cmd_generate_file(&file, Some(&out), Some(ArchiveFormat::Zip), None).unwrap();

        assert!(out.join("web-stack/site.yml").exists());
        assert!(out.join("web-stack/roles/webserver/tasks/main.yml").exists());
        assert!(out.join("cluster/roles/k8s_app/tasks/main.yml").exists());
        assert!(out.join("web-stack.zip").exists());
        assert!(out.join("cluster.zip").exists());

        let ledger = JsonlLedger::in_dir(&out, None);
        assert_eq!(ledger.count_for("ops").unwrap(), 2);

        cmd_check(&out.join("web-stack")).unwrap();
    }

    #[test]
    fn test_generate_stop_on_first() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(
            dir.path(),
            "version: \"1.0\"\nname: x\nprojects:\n  ok:\n    environment: staging\n    roles: [web]\n  bad:\n    environment: staging\n    roles: [mainframe]\n",
        );
        let out = dir.path().join("out");
        let err = cmd_generate_file(&file, Some(&out), None, Some(1)).unwrap_err();
        assert!(err.contains("project 'bad'"));
        assert!(err.contains("catalog error: unknown role id 'mainframe'"));
        assert!(!out.join("ok").exists());
    }

    #[test]
    fn test_generate_continue_independent() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(
            dir.path(),
            "version: \"1.0\"\nname: x\nprojects:\n  ok:\n    environment: staging\n    roles: [web]\n  bad:\n    environment: staging\n    roles: [mainframe]\npolicy:\n  failure: continue_independent\n",
        );
        let out = dir.path().join("out");
        let err = cmd_generate_file(&file, Some(&out), None, None).unwrap_err();
        assert_eq!(err, "1 project(s) failed");
        assert!(out.join("ok/site.yml").exists());
    }

    #[test]
    fn test_generate_quota() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(
            dir.path(),
            "version: \"1.0\"\nname: x\nuser: q\nprojects:\n  a:\n    environment: staging\n    roles: [web]\npolicy:\n  quota: 1\n",
        );
        let out = dir.path().join("out");
        cmd_generate_file(&file, Some(&out), None, None).unwrap();
        let err = cmd_generate_file(&file, Some(&out), None, None).unwrap_err();
        assert!(err.contains("quota exhausted"));
    }

    #[test]
    fn test_generate_quota_continue_independent() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(
            dir.path(),
            "version: \"1.0\"\nname: x\nuser: q\nprojects:\n  a:\n    environment: staging\n    roles: [web]\n  b:\n    environment: staging\n    roles: [database]\npolicy:\n  failure: continue_independent\n  jobs: 1\n  quota: 1\n",
        );
        let out = dir.path().join("out");
        let err = cmd_generate_file(&file, Some(&out), None, None).unwrap_err();
        assert_eq!(err, "1 project(s) failed");
        assert!(out.join("a/site.yml").exists());
        assert!(!out.join("b/site.yml").exists());
        assert_eq!(JsonlLedger::in_dir(&out, None).count_for("q").unwrap(), 1);
    }

    #[test]
    fn test_generate_adhoc_rejects_escaping_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let roles = vec!["web".to_string()];
        for name in ["../x", "a/b", "..", " "] {
            let err = cmd_generate_adhoc(name, &roles, Some("staging"), Some(&out), None).unwrap_err();
            assert!(err.contains("not a valid directory name"), "{name}: {err}");
        }
        assert!(!dir.path().join("x").exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_generate_adhoc() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let roles = vec!["security".to_string(), "web".to_string()];
        cmd_generate_adhoc("demo", &roles, Some("staging"), Some(&out), Some(ArchiveFormat::TarGz))
            .unwrap();
        assert!(out.join("demo/roles/security/tasks/main.yml").exists());
        assert!(out.join("demo.tar.gz").exists());
        assert!(!out.join("generations.jsonl").exists());
    }

    #[test]
    fn test_generate_adhoc_errors() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = cmd_generate_adhoc("demo", &[], Some("staging"), Some(&out), None).unwrap_err();
        assert!(err.contains("selection is empty"));
        let err = cmd_generate_adhoc("demo", &["web".to_string()], None, Some(&out), None).unwrap_err();
        assert!(err.contains("--env"));
        let err =
            cmd_generate_adhoc("demo", &["web".to_string()], Some("qa"), Some(&out), None).unwrap_err();
        assert!(err.starts_with("invalid input:"));
    }

    #[test]
    fn test_check_detects_drift() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        cmd_generate_adhoc("demo", &["database".to_string()], Some("production"), Some(&out), None)
            .unwrap();
        let tree = out.join("demo");
        std::fs::write(tree.join("roles/database/tasks/main.yml"), "- name: [broken\n").unwrap();
        let err = cmd_check(&tree).unwrap_err();
        assert_eq!(err, "1 validation error(s), 1 drifted file(s)");
    }

    #[test]
    fn test_describe_error() {
        assert!(describe_error(&CompositionError::EmptySelection).starts_with("invalid input:"));
        assert!(describe_error(&CompositionError::UnknownRoleId("x".into()))
            .starts_with("catalog error:"));
    }

    #[test]
    fn test_dispatch_init_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        dispatch(Commands::Init {
            path: dir.path().to_path_buf(),
        })
        .unwrap();
        dispatch(Commands::Validate {
            file: dir.path().join("playforge.yaml"),
        })
        .unwrap();
    }
}
