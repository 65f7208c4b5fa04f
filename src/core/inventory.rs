//! Inventory generation: a fixed host-group topology per environment.
//!
//! `build_inventory` is pure in the environment; `cached` memoizes it once
//! per environment for repeated builds.

use super::profile::EnvProfile;
use super::router::INVENTORY_GROUPS;
use super::types::{Environment, InventoryArtifact};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

static STAGING: Lazy<InventoryArtifact> = Lazy::new(|| build_inventory(Environment::Staging));
static PRODUCTION: Lazy<InventoryArtifact> =
    Lazy::new(|| build_inventory(Environment::Production));

/// Memoized inventory for an environment.
pub fn cached(env: Environment) -> &'static InventoryArtifact {
    match env {
        Environment::Staging => &STAGING,
        Environment::Production => &PRODUCTION,
    }
}

/// Host name prefix, subnet octet, and host count for a group.
fn group_shape(group: &str, env: Environment) -> (&'static str, u8, usize) {
    let (prefix, octet) = match group {
        "webservers" => ("web", 1),
        "databases" => ("db", 2),
        "monitoring" => ("mon", 3),
        _ => ("lb", 4),
    };
    let count = match (group, env) {
        ("webservers", Environment::Staging) => 2,
        ("webservers", Environment::Production) => 3,
        ("databases", Environment::Production) => 2,
        ("loadbalancers", Environment::Production) => 2,
        _ => 1,
    };
    (prefix, octet, count)
}

/// Build the inventory for an environment.
pub fn build_inventory(env: Environment) -> InventoryArtifact {
    let profile = EnvProfile::for_env(env);
    InventoryArtifact {
        hosts: hosts_text(profile),
        group_vars: group_vars(profile),
    }
}

fn hosts_text(profile: &EnvProfile) -> String {
    let env = profile.environment;
    let mut out = String::from("---\nall:\n  children:\n");
    for group in INVENTORY_GROUPS {
        let (prefix, octet, count) = group_shape(group, env);
        out.push_str(&format!("    {group}:\n      hosts:\n"));
        for i in 1..=count {
            out.push_str(&format!(
                "        {prefix}-{i:02}.{env}.internal:\n          ansible_host: {}.{octet}.{}\n",
                profile.subnet_prefix,
                10 + i
            ));
        }
    }
    out
}

fn group_vars(profile: &EnvProfile) -> IndexMap<String, String> {
    let env = profile.environment;
    let mut vars = IndexMap::new();

    vars.insert(
        "all".to_string(),
        format!(
            "---\n\
             deploy_environment: {env}\n\
             ansible_user: deploy\n\
             ansible_python_interpreter: /usr/bin/python3\n\
             tls_enforced: {}\n\
             cert_issuer: {}\n\
             acme_directory: {}\n\
             log_level: {}\n\
             log_retention_days: {}\n\
             backup_retention_days: {}\n\
             management_cidr: {}\n",
            profile.tls_enforced,
            profile.cert_issuer,
            profile.acme_directory,
            profile.log_level,
            profile.log_retention_days,
            profile.backup_retention_days,
            profile.firewall_ssh_cidr,
        ),
    );

    vars.insert(
        "webservers".to_string(),
        format!(
            "---\n\
             webserver_worker_connections: {}\n\
             webserver_tls_enabled: {}\n\
             webserver_tls_certificate: {}\n\
             webserver_tls_certificate_key: {}\n",
            profile.web_worker_connections,
            profile.tls_enforced,
            profile.tls_cert_path,
            profile.tls_key_path,
        ),
    );

    vars.insert(
        "databases".to_string(),
        format!(
            "---\n\
             database_max_connections: {}\n\
             database_shared_buffers: {}\n\
             database_ssl: {}\n\
             backup_retention_days: {}\n",
            profile.db_max_connections,
            profile.db_shared_buffers,
            profile.tls_enforced,
            profile.backup_retention_days,
        ),
    );

    vars.insert(
        "monitoring".to_string(),
        format!(
            "---\n\
             monitoring_retention_days: {}\n\
             monitoring_scrape_interval: {}\n",
            profile.metrics_retention_days,
            match env {
                Environment::Staging => "30s",
                Environment::Production => "15s",
            },
        ),
    );

    vars.insert(
        "loadbalancers".to_string(),
        format!(
            "---\n\
             loadbalancer_maxconn: {}\n\
             loadbalancer_tls_enabled: {}\n",
            profile.lb_max_connections, profile.tls_enforced,
        ),
    );

    vars
}
