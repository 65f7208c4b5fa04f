//! Composition engine: selection + environment to a project artifact.

use super::assembler;
use super::error::CompositionError;
use super::inventory;
use super::router;
use super::types::{Environment, ProjectArtifact, RoleArtifact, RoleId, RolePhase, Selection};
use crate::catalog::RoleCatalog;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::info;

/// Path of an environment's inventory relative to the project root.
pub fn inventory_path(env: Environment) -> String {
    format!("inventories/{env}/hosts.yml")
}

/// The `ansible.cfg` text for an environment.
pub fn control_config(env: Environment) -> String {
    format!(
        "# Managed by playforge\n\
         [defaults]\n\
         inventory = {}\n\
         roles_path = roles\n\
         host_key_checking = False\n\
         retry_files_enabled = False\n\
         interpreter_python = auto_silent\n\
         gathering = smart\n\
         forks = 10\n\
         stdout_callback = yaml\n\
         \n\
         [privilege_escalation]\n\
         become = True\n\
         become_method = sudo\n\
         \n\
         [ssh_connection]\n\
         pipelining = True\n",
        inventory_path(env)
    )
}

/// Composes projects against a borrowed catalog.
pub struct Composer<'a> {
    catalog: &'a RoleCatalog,
}

impl<'a> Composer<'a> {
    pub fn new(catalog: &'a RoleCatalog) -> Self {
        Self { catalog }
    }

    /// Parse raw strings then compose. Input errors surface before any lookup.
    pub fn compose_request<S: AsRef<str>>(
        &self,
        roles: &[S],
        environment: &str,
    ) -> Result<ProjectArtifact, CompositionError> {
        let (selection, env) = super::types::parse_request(roles, environment)?;
        self.compose(&selection, env)
    }

    /// Resolve every selected role, assemble the main playbook, and attach
    /// the requested environment's inventory.
    pub fn compose(
        &self,
        selection: &Selection,
        env: Environment,
    ) -> Result<ProjectArtifact, CompositionError> {
        let (roles, plan) = self.resolve_all(selection, env)?;

        let mut inventories = BTreeMap::new();
        inventories.insert(env, inventory::cached(env).clone());

        let project = ProjectArtifact {
            main_playbook: assembler::assemble(&plan, env),
            control_config: control_config(env),
            environment: env,
            plan,
            roles,
            inventories,
        };
        info!(
            env = %env,
            roles = project.roles.len(),
            "composed project"
        );
        Ok(project)
    }

    fn resolve_all(
        &self,
        selection: &Selection,
        env: Environment,
    ) -> Result<(IndexMap<String, RoleArtifact>, Vec<RolePhase>), CompositionError> {
        let mut roles: IndexMap<String, RoleArtifact> = IndexMap::new();
        let mut owners: IndexMap<String, &RoleId> = IndexMap::new();
        let mut plan = Vec::with_capacity(selection.len());

        for id in selection.roles() {
            let artifact = self.catalog.resolve(id, env)?;
            if let Some(first) = owners.get(&artifact.name) {
                return Err(CompositionError::DuplicateArtifactName {
                    name: artifact.name,
                    first: first.to_string(),
                    second: id.to_string(),
                });
            }
            owners.insert(artifact.name.clone(), id);
            plan.push(RolePhase {
                role_id: id.to_string(),
                name: artifact.name.clone(),
                group: router::route_for(id).to_string(),
            });
            roles.insert(artifact.name.clone(), artifact);
        }

        Ok((roles, plan))
    }
}

/// Compose with the given catalog.
pub fn compose(
    catalog: &RoleCatalog,
    selection: &Selection,
    env: Environment,
) -> Result<ProjectArtifact, CompositionError> {
    Composer::new(catalog).compose(selection, env)
}
