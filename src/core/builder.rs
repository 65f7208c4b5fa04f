//! Project builder: composition plus the full inventory set.

use super::composer::Composer;
use super::error::CompositionError;
use super::inventory;
use super::types::{Environment, ProjectArtifact, Selection};
use crate::catalog::RoleCatalog;

/// Compose a project and attach inventories for every environment.
pub fn build(
    catalog: &RoleCatalog,
    selection: &Selection,
    env: Environment,
) -> Result<ProjectArtifact, CompositionError> {
    let mut project = Composer::new(catalog).compose(selection, env)?;
    for other in Environment::ALL {
        project
            .inventories
            .entry(other)
            .or_insert_with(|| inventory::cached(other).clone());
    }
    Ok(project)
}
