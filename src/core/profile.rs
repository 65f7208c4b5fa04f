//! Environment profiles.
//!
//! The only place environment-sensitive values live. Role templates,
//! inventories, and the control config read from here and nowhere else.

use super::types::Environment;
use indexmap::IndexMap;

/// Environment-derived defaults shared by generic roles and inventories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvProfile {
    pub environment: Environment,
    pub tls_enforced: bool,
    pub tls_cert_path: &'static str,
    pub tls_key_path: &'static str,
    pub cert_issuer: &'static str,
    pub acme_directory: &'static str,
    pub backup_retention_days: u32,
    pub log_retention_days: u32,
    pub metrics_retention_days: u32,
    pub firewall_ssh_cidr: &'static str,
    pub fail2ban_max_retry: u32,
    pub fail2ban_ban_seconds: u32,
    pub web_worker_connections: u32,
    pub db_max_connections: u32,
    pub db_shared_buffers: &'static str,
    pub lb_max_connections: u32,
    pub instance_type: &'static str,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub log_level: &'static str,
    pub subnet_prefix: &'static str,
}

const STAGING: EnvProfile = EnvProfile {
    environment: Environment::Staging,
    tls_enforced: false,
    tls_cert_path: "/etc/ssl/playforge/staging.crt",
    tls_key_path: "/etc/ssl/private/playforge-staging.key",
    cert_issuer: "letsencrypt-staging",
    acme_directory: "https://acme-staging-v02.api.letsencrypt.org/directory",
    backup_retention_days: 7,
    log_retention_days: 14,
    metrics_retention_days: 7,
    firewall_ssh_cidr: "10.0.0.0/8",
    fail2ban_max_retry: 5,
    fail2ban_ban_seconds: 600,
    web_worker_connections: 1024,
    db_max_connections: 100,
    db_shared_buffers: "256MB",
    lb_max_connections: 2000,
    instance_type: "t3.small",
    instance_count: 1,
    volume_size_gb: 20,
    log_level: "debug",
    subnet_prefix: "10.10",
};

const PRODUCTION: EnvProfile = EnvProfile {
    environment: Environment::Production,
    tls_enforced: true,
    tls_cert_path: "/etc/ssl/playforge/production.crt",
    tls_key_path: "/etc/ssl/private/playforge-production.key",
    cert_issuer: "letsencrypt-prod",
    acme_directory: "https://acme-v02.api.letsencrypt.org/directory",
    backup_retention_days: 30,
    log_retention_days: 90,
    metrics_retention_days: 30,
    firewall_ssh_cidr: "10.20.0.0/16",
    fail2ban_max_retry: 3,
    fail2ban_ban_seconds: 3600,
    web_worker_connections: 4096,
    db_max_connections: 400,
    db_shared_buffers: "2GB",
    lb_max_connections: 20000,
    instance_type: "m5.large",
    instance_count: 2,
    volume_size_gb: 100,
    log_level: "warn",
    subnet_prefix: "10.20",
};

impl EnvProfile {
    /// Profile for an environment.
    pub fn for_env(env: Environment) -> &'static EnvProfile {
        match env {
            Environment::Staging => &STAGING,
            Environment::Production => &PRODUCTION,
        }
    }

    /// Template parameters in `{{params.<key>}}` form.
    pub fn params(&self) -> IndexMap<&'static str, String> {
        let mut p = IndexMap::new();
        p.insert("env", self.environment.to_string());
        p.insert("tls_enforced", self.tls_enforced.to_string());
        p.insert("tls_disabled", (!self.tls_enforced).to_string());
        p.insert("tls_cert_path", self.tls_cert_path.to_string());
        p.insert("tls_key_path", self.tls_key_path.to_string());
        p.insert("cert_issuer", self.cert_issuer.to_string());
        p.insert("acme_directory", self.acme_directory.to_string());
        p.insert("backup_retention_days", self.backup_retention_days.to_string());
        p.insert("log_retention_days", self.log_retention_days.to_string());
        p.insert("metrics_retention_days", self.metrics_retention_days.to_string());
        p.insert("firewall_ssh_cidr", self.firewall_ssh_cidr.to_string());
        p.insert("fail2ban_max_retry", self.fail2ban_max_retry.to_string());
        p.insert("fail2ban_ban_seconds", self.fail2ban_ban_seconds.to_string());
        p.insert("web_worker_connections", self.web_worker_connections.to_string());
        p.insert("db_max_connections", self.db_max_connections.to_string());
        p.insert("db_shared_buffers", self.db_shared_buffers.to_string());
        p.insert("lb_max_connections", self.lb_max_connections.to_string());
        p.insert("instance_type", self.instance_type.to_string());
        p.insert("instance_count", self.instance_count.to_string());
        p.insert("volume_size_gb", self.volume_size_gb.to_string());
        p.insert("log_level", self.log_level.to_string());
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_env_matches() {
        for env in Environment::ALL {
            assert_eq!(EnvProfile::for_env(env).environment, env);
        }
    }

    #[test]
    fn test_production_is_stricter() {
        let s = EnvProfile::for_env(Environment::Staging);
        let p = EnvProfile::for_env(Environment::Production);
        assert!(!s.tls_enforced);
        assert!(p.tls_enforced);
        assert!(p.backup_retention_days > s.backup_retention_days);
        assert!(p.log_retention_days > s.log_retention_days);
        assert!(p.fail2ban_max_retry < s.fail2ban_max_retry);
        assert!(p.instance_count >= s.instance_count);
    }

    #[test]
    fn test_params_cover_profile() {
        let params = EnvProfile::for_env(Environment::Production).params();
        assert_eq!(params["env"], "production");
        assert_eq!(params["tls_enforced"], "true");
        assert_eq!(params["tls_disabled"], "false");
        assert_eq!(params["backup_retention_days"], "30");
    }
}
