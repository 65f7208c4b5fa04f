//! Host-group routing: which inventory group a role's play targets.

use super::types::RoleId;

/// Groups a generated inventory defines, in declaration order.
pub const INVENTORY_GROUPS: [&str; 4] = ["webservers", "databases", "monitoring", "loadbalancers"];

/// Target host group for a role. Unmapped roles run on `all`.
pub fn route_for(id: &RoleId) -> &'static str {
    match id {
        RoleId::Web => "webservers",
        RoleId::Database | RoleId::Backup => "databases",
        RoleId::Monitoring | RoleId::KubeMonitoring => "monitoring",
        RoleId::LoadBalancer => "loadbalancers",
        // API-driven roles talk to a cloud or cluster endpoint from the control node.
        RoleId::CloudVm
        | RoleId::ManagedCluster
        | RoleId::Kubernetes
        | RoleId::Helm
        | RoleId::Pipeline => "localhost",
        RoleId::Security | RoleId::Vault | RoleId::Unknown(_) => "all",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        assert_eq!(route_for(&RoleId::Web), "webservers");
        assert_eq!(route_for(&RoleId::Database), "databases");
        assert_eq!(route_for(&RoleId::Backup), "databases");
        assert_eq!(route_for(&RoleId::Monitoring), "monitoring");
        assert_eq!(route_for(&RoleId::KubeMonitoring), "monitoring");
        assert_eq!(route_for(&RoleId::LoadBalancer), "loadbalancers");
        assert_eq!(route_for(&RoleId::Kubernetes), "localhost");
        assert_eq!(route_for(&RoleId::Pipeline), "localhost");
        assert_eq!(route_for(&RoleId::Security), "all");
        assert_eq!(route_for(&RoleId::parse("custom")), "all");
    }

    #[test]
    fn test_routes_target_known_groups() {
        for id in RoleId::BUILTIN.iter() {
            let group = route_for(id);
            assert!(
                group == "all" || group == "localhost" || INVENTORY_GROUPS.contains(&group),
                "{id} -> {group}"
            );
        }
    }
}
