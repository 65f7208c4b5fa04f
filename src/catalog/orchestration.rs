//! Specialized strategies for the container and orchestration family.
//!
//! Each strategy pairs a role template with a sizing function, so replica
//! counts, retention, and enforcement come from one place per role.

use super::{Enforcement, RoleStrategy, RoleTemplate, Sizing, TableStrategy};
use crate::core::types::{Environment, RoleId};

/// Built-in strategies in lookup order.
pub fn strategies() -> Vec<Box<dyn RoleStrategy>> {
    vec![
        Box::new(TableStrategy {
            id: RoleId::Kubernetes,
            template: &K8S_APP,
            sizing: k8s_app_sizing,
        }),
        Box::new(TableStrategy {
            id: RoleId::Helm,
            template: &HELM_RELEASE,
            sizing: helm_release_sizing,
        }),
        Box::new(TableStrategy {
            id: RoleId::KubeMonitoring,
            template: &KUBE_PROMETHEUS,
            sizing: kube_prometheus_sizing,
        }),
        Box::new(TableStrategy {
            id: RoleId::ManagedCluster,
            template: &EKS_CLUSTER,
            sizing: eks_cluster_sizing,
        }),
        Box::new(TableStrategy {
            id: RoleId::Pipeline,
            template: &PIPELINE_TRIGGER,
            sizing: pipeline_trigger_sizing,
        }),
    ]
}

fn enforcement(env: Environment) -> Enforcement {
    match env {
        Environment::Staging => Enforcement::Advisory,
        Environment::Production => Enforcement::Blocking,
    }
}

fn k8s_app_sizing(env: Environment) -> Sizing {
    let (replicas, min_replicas, max_replicas, retention_days, storage_gb) = match env {
        Environment::Staging => (2, 1, 4, 7, 5),
        Environment::Production => (3, 2, 10, 30, 20),
    };
    Sizing {
        replicas,
        min_replicas,
        max_replicas,
        retention_days,
        storage_gb,
        enforcement: enforcement(env),
        version: "1.27",
    }
}

fn helm_release_sizing(env: Environment) -> Sizing {
    match env {
        Environment::Staging => Sizing {
            replicas: 1,
            min_replicas: 1,
            max_replicas: 2,
            retention_days: 7,
            storage_gb: 8,
            enforcement: enforcement(env),
            version: "18.2.0",
        },
        Environment::Production => Sizing {
            replicas: 3,
            min_replicas: 2,
            max_replicas: 6,
            retention_days: 30,
            storage_gb: 50,
            enforcement: enforcement(env),
            version: "18.1.6",
        },
    }
}

// max_replicas doubles as the Alertmanager replica count.
fn kube_prometheus_sizing(env: Environment) -> Sizing {
    let (replicas, max_replicas, retention_days, storage_gb) = match env {
        Environment::Staging => (1, 1, 7, 10),
        Environment::Production => (2, 3, 30, 50),
    };
    Sizing {
        replicas,
        min_replicas: replicas,
        max_replicas,
        retention_days,
        storage_gb,
        enforcement: enforcement(env),
        version: "58.2.1",
    }
}

fn eks_cluster_sizing(env: Environment) -> Sizing {
    match env {
        Environment::Staging => Sizing {
            replicas: 2,
            min_replicas: 1,
            max_replicas: 3,
            retention_days: 7,
            storage_gb: 20,
            enforcement: enforcement(env),
            version: "1.29",
        },
        Environment::Production => Sizing {
            replicas: 3,
            min_replicas: 3,
            max_replicas: 6,
            retention_days: 90,
            storage_gb: 100,
            enforcement: enforcement(env),
            version: "1.29",
        },
    }
}

fn pipeline_trigger_sizing(env: Environment) -> Sizing {
    let (replicas, max_replicas, retention_days, version) = match env {
        Environment::Staging => (1, 2, 7, "develop"),
        Environment::Production => (2, 4, 30, "main"),
    };
    Sizing {
        replicas,
        min_replicas: 1,
        max_replicas,
        retention_days,
        storage_gb: 1,
        enforcement: enforcement(env),
        version,
    }
}

// ============================================================================
// Kubernetes application
// ============================================================================

pub static K8S_APP: RoleTemplate = RoleTemplate {
    name: "k8s_app",
    tasks: r#"---
- name: Ensure application namespace
  kubernetes.core.k8s:
    kubeconfig: "{{ k8s_app_kubeconfig }}"
    state: present
    definition:
      apiVersion: v1
      kind: Namespace
      metadata:
        name: "{{ k8s_app_namespace }}"
        labels:
          app.kubernetes.io/managed-by: playforge
          environment: {{params.env}}
          pod-security.kubernetes.io/{{params.enforcement_mode}}: restricted

- name: Apply deployment
  kubernetes.core.k8s:
    kubeconfig: "{{ k8s_app_kubeconfig }}"
    state: present
    namespace: "{{ k8s_app_namespace }}"
    template: deployment.yaml.j2

- name: Apply service
  kubernetes.core.k8s:
    kubeconfig: "{{ k8s_app_kubeconfig }}"
    state: present
    namespace: "{{ k8s_app_namespace }}"
    template: service.yaml.j2

- name: Apply horizontal pod autoscaler
  kubernetes.core.k8s:
    kubeconfig: "{{ k8s_app_kubeconfig }}"
    state: present
    namespace: "{{ k8s_app_namespace }}"
    template: hpa.yaml.j2

- name: Apply pod disruption budget
  kubernetes.core.k8s:
    kubeconfig: "{{ k8s_app_kubeconfig }}"
    state: present
    definition:
      apiVersion: policy/v1
      kind: PodDisruptionBudget
      metadata:
        name: "{{ k8s_app_name }}"
        namespace: "{{ k8s_app_namespace }}"
      spec:
        minAvailable: {{params.min_replicas}}
        selector:
          matchLabels:
            app: "{{ k8s_app_name }}"

- name: Wait for rollout to complete
  kubernetes.core.k8s_info:
    kubeconfig: "{{ k8s_app_kubeconfig }}"
    kind: Deployment
    name: "{{ k8s_app_name }}"
    namespace: "{{ k8s_app_namespace }}"
  register: k8s_app_rollout
  until: "(k8s_app_rollout.resources[0].status.readyReplicas | default(0)) >= (k8s_app_replicas | int)"
  retries: 30
  delay: 10
"#,
    handlers: None,
    defaults: Some(
        r#"---
k8s_app_environment: {{params.env}}
k8s_app_kubeconfig: "~/.kube/config"
k8s_app_name: app
k8s_app_namespace: app-{{params.env}}
k8s_app_image: "nginx:{{params.version}}"
k8s_app_port: 8080
k8s_app_replicas: {{params.replicas}}
k8s_app_min_replicas: {{params.min_replicas}}
k8s_app_max_replicas: {{params.max_replicas}}
k8s_app_cpu_target_percent: 70
k8s_app_pod_security: {{params.enforcement_mode}}
k8s_app_log_level: {{params.log_level}}
"#,
    ),
    templates: &[
        (
            "deployment.yaml.j2",
            r##"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{ k8s_app_name }}
  labels:
    app: {{ k8s_app_name }}
    environment: {{params.env}}
spec:
  replicas: {{ k8s_app_replicas }}
  selector:
    matchLabels:
      app: {{ k8s_app_name }}
  template:
    metadata:
      labels:
        app: {{ k8s_app_name }}
    spec:
      securityContext:
        runAsNonRoot: true
        seccompProfile:
          type: RuntimeDefault
      containers:
        - name: {{ k8s_app_name }}
          image: {{ k8s_app_image }}
          ports:
            - containerPort: {{ k8s_app_port }}
          env:
            - name: LOG_LEVEL
              value: "{{ k8s_app_log_level }}"
          securityContext:
            allowPrivilegeEscalation: false
            capabilities:
              drop: ["ALL"]
          readinessProbe:
            httpGet:
              path: /
              port: {{ k8s_app_port }}
          resources:
            requests:
              cpu: 100m
              memory: 128Mi
            limits:
              memory: 256Mi
"##,
        ),
        (
            "service.yaml.j2",
            r##"apiVersion: v1
kind: Service
metadata:
  name: {{ k8s_app_name }}
spec:
  selector:
    app: {{ k8s_app_name }}
  ports:
    - port: 80
      targetPort: {{ k8s_app_port }}
"##,
        ),
        (
            "hpa.yaml.j2",
            r##"apiVersion: autoscaling/v2
kind: HorizontalPodAutoscaler
metadata:
  name: {{ k8s_app_name }}
spec:
  scaleTargetRef:
    apiVersion: apps/v1
    kind: Deployment
    name: {{ k8s_app_name }}
  minReplicas: {{ k8s_app_min_replicas }}
  maxReplicas: {{ k8s_app_max_replicas }}
  metrics:
    - type: Resource
      resource:
        name: cpu
        target:
          type: Utilization
          averageUtilization: {{ k8s_app_cpu_target_percent }}
"##,
        ),
    ],
    files: &[],
};

// ============================================================================
// Helm release
// ============================================================================

pub static HELM_RELEASE: RoleTemplate = RoleTemplate {
    name: "helm_release",
    tasks: r#"---
- name: Add chart repository
  kubernetes.core.helm_repository:
    name: "{{ helm_release_repo_name }}"
    repo_url: "{{ helm_release_repo_url }}"

- name: Deploy release
  kubernetes.core.helm:
    kubeconfig: "{{ helm_release_kubeconfig }}"
    name: "{{ helm_release_name }}"
    chart_ref: "{{ helm_release_chart }}"
    chart_version: "{{ helm_release_chart_version }}"
    release_namespace: "{{ helm_release_namespace }}"
    create_namespace: true
    update_repo_cache: true
    atomic: "{{ helm_release_atomic }}"
    wait: true
    values: "{{ lookup('ansible.builtin.template', 'values.yaml.j2') | from_yaml }}"
  register: helm_release_result

- name: Report release status
  ansible.builtin.debug:
    msg: "{{ helm_release_name }} at chart {{ helm_release_chart_version }}: {{ helm_release_result.status.status | default('unknown') }}"
"#,
    handlers: None,
    defaults: Some(
        r#"---
helm_release_environment: {{params.env}}
helm_release_kubeconfig: "~/.kube/config"
helm_release_repo_name: bitnami
helm_release_repo_url: https://charts.bitnami.com/bitnami
helm_release_name: web
helm_release_chart: bitnami/nginx
helm_release_chart_version: "{{params.version}}"
helm_release_namespace: web-{{params.env}}
helm_release_replicas: {{params.replicas}}
helm_release_storage_gb: {{params.storage_gb}}
helm_release_atomic: {{params.approval_required}}
"#,
    ),
    templates: &[(
        "values.yaml.j2",
        r##"replicaCount: {{ helm_release_replicas }}
commonLabels:
  environment: {{params.env}}
autoscaling:
  enabled: {{ (helm_release_replicas | int > 1) | lower }}
  minReplicas: {{params.min_replicas}}
  maxReplicas: {{params.max_replicas}}
persistence:
  enabled: true
  size: {{ helm_release_storage_gb }}Gi
podSecurityContext:
  enabled: true
"##,
    )],
    files: &[],
};

// ============================================================================
// Cluster monitoring (kube-prometheus-stack)
// ============================================================================

pub static KUBE_PROMETHEUS: RoleTemplate = RoleTemplate {
    name: "kube_prometheus",
    tasks: r#"---
- name: Add prometheus-community repository
  kubernetes.core.helm_repository:
    name: prometheus-community
    repo_url: https://prometheus-community.github.io/helm-charts

- name: Deploy kube-prometheus-stack
  kubernetes.core.helm:
    kubeconfig: "{{ kube_prometheus_kubeconfig }}"
    name: kube-prometheus
    chart_ref: prometheus-community/kube-prometheus-stack
    chart_version: "{{ kube_prometheus_chart_version }}"
    release_namespace: "{{ kube_prometheus_namespace }}"
    create_namespace: true
    wait: true
    values: "{{ lookup('ansible.builtin.template', 'values.yaml.j2') | from_yaml }}"

- name: Wait for Prometheus to be ready
  kubernetes.core.k8s_info:
    kubeconfig: "{{ kube_prometheus_kubeconfig }}"
    kind: Prometheus
    api_version: monitoring.coreos.com/v1
    namespace: "{{ kube_prometheus_namespace }}"
  register: kube_prometheus_status
  until: "kube_prometheus_status.resources | length > 0"
  retries: 20
  delay: 15
"#,
    handlers: None,
    defaults: Some(
        r#"---
kube_prometheus_environment: {{params.env}}
kube_prometheus_kubeconfig: "~/.kube/config"
kube_prometheus_namespace: monitoring
kube_prometheus_chart_version: "{{params.version}}"
kube_prometheus_replicas: {{params.replicas}}
kube_prometheus_alertmanager_replicas: {{params.max_replicas}}
kube_prometheus_retention_days: {{params.retention_days}}
kube_prometheus_storage_gb: {{params.storage_gb}}
"#,
    ),
    templates: &[(
        "values.yaml.j2",
        r##"prometheus:
  prometheusSpec:
    replicas: {{ kube_prometheus_replicas }}
    retention: {{ kube_prometheus_retention_days }}d
    externalLabels:
      environment: {{params.env}}
    storageSpec:
      volumeClaimTemplate:
        spec:
          accessModes: ["ReadWriteOnce"]
          resources:
            requests:
              storage: {{ kube_prometheus_storage_gb }}Gi
alertmanager:
  alertmanagerSpec:
    replicas: {{ kube_prometheus_alertmanager_replicas }}
grafana:
  enabled: true
  adminPassword: "{{ vault_grafana_admin_password | default('change-me') }}"
"##,
    )],
    files: &[],
};

// ============================================================================
// Managed cluster (EKS)
// ============================================================================

pub static EKS_CLUSTER: RoleTemplate = RoleTemplate {
    name: "eks_cluster",
    tasks: r#"---
- name: Ensure control plane log group
  amazon.aws.cloudwatchlogs_log_group:
    log_group_name: "/aws/eks/{{ eks_cluster_name }}/cluster"
    retention: "{{ eks_cluster_log_retention_days }}"
    region: "{{ eks_cluster_region }}"
    state: present

- name: Create EKS cluster
  community.aws.eks_cluster:
    name: "{{ eks_cluster_name }}"
    version: "{{ eks_cluster_version }}"
    role_arn: "{{ eks_cluster_role_arn }}"
    subnets: "{{ eks_cluster_subnets }}"
    security_groups: "{{ eks_cluster_security_groups }}"
    region: "{{ eks_cluster_region }}"
    state: present
    wait: true
  register: eks_cluster_result

- name: Create managed node group
  community.aws.eks_nodegroup:
    name: "{{ eks_cluster_name }}-workers"
    cluster_name: "{{ eks_cluster_name }}"
    node_role: "{{ eks_cluster_node_role_arn }}"
    subnets: "{{ eks_cluster_subnets }}"
    instance_types:
      - "{{ eks_cluster_instance_type }}"
    disk_size: "{{ eks_cluster_node_disk_gb }}"
    scaling_config:
      min_size: "{{ eks_cluster_min_nodes }}"
      max_size: "{{ eks_cluster_max_nodes }}"
      desired_size: "{{ eks_cluster_desired_nodes }}"
    labels:
      environment: "{{ eks_cluster_environment }}"
    region: "{{ eks_cluster_region }}"
    state: present
    wait: true

- name: Write kubeconfig
  ansible.builtin.command:
    cmd: "aws eks update-kubeconfig --name {{ eks_cluster_name }} --region {{ eks_cluster_region }}"
  changed_when: false
"#,
    handlers: None,
    defaults: Some(
        r#"---
eks_cluster_environment: {{params.env}}
eks_cluster_name: playforge-{{params.env}}
eks_cluster_version: "{{params.version}}"
eks_cluster_region: us-east-1
eks_cluster_role_arn: "{{ vault_eks_cluster_role_arn }}"
eks_cluster_node_role_arn: "{{ vault_eks_node_role_arn }}"
eks_cluster_subnets: []
eks_cluster_security_groups: []
eks_cluster_instance_type: {{params.instance_type}}
eks_cluster_desired_nodes: {{params.replicas}}
eks_cluster_min_nodes: {{params.min_replicas}}
eks_cluster_max_nodes: {{params.max_replicas}}
eks_cluster_node_disk_gb: {{params.storage_gb}}
eks_cluster_log_retention_days: {{params.retention_days}}
"#,
    ),
    templates: &[],
    files: &[],
};

// ============================================================================
// CI/CD pipeline trigger
// ============================================================================

pub static PIPELINE_TRIGGER: RoleTemplate = RoleTemplate {
    name: "pipeline_trigger",
    tasks: r#"---
- name: Wait for manual approval
  ansible.builtin.pause:
    prompt: "Approve the {{ pipeline_trigger_environment }} pipeline run on {{ pipeline_trigger_branch }}"
  when: pipeline_trigger_approval_required | bool

- name: Trigger pipeline
  ansible.builtin.uri:
    url: "{{ pipeline_trigger_api_url }}/pipelines/{{ pipeline_trigger_pipeline_id }}/runs"
    method: POST
    headers:
      Authorization: "Bearer {{ pipeline_trigger_token }}"
    body_format: json
    body:
      ref: "{{ pipeline_trigger_branch }}"
      variables:
        ENVIRONMENT: "{{ pipeline_trigger_environment }}"
        PARALLEL_JOBS: "{{ pipeline_trigger_parallel_jobs }}"
        ARTIFACT_RETENTION_DAYS: "{{ pipeline_trigger_artifact_retention_days }}"
    status_code:
      - 200
      - 201
  register: pipeline_trigger_run
  no_log: true

- name: Poll pipeline status
  ansible.builtin.uri:
    url: "{{ pipeline_trigger_api_url }}/runs/{{ pipeline_trigger_run.json.id }}"
    headers:
      Authorization: "Bearer {{ pipeline_trigger_token }}"
    return_content: true
  register: pipeline_trigger_status
  until: "pipeline_trigger_status.json.status in ['success', 'failed', 'canceled']"
  retries: "{{ pipeline_trigger_poll_retries }}"
  delay: 20
  no_log: true

- name: Fail when the pipeline did not succeed
  ansible.builtin.fail:
    msg: "Pipeline run {{ pipeline_trigger_run.json.id }} finished with {{ pipeline_trigger_status.json.status }}"
  when: pipeline_trigger_status.json.status != 'success'
"#,
    handlers: None,
    defaults: Some(
        r#"---
pipeline_trigger_environment: {{params.env}}
pipeline_trigger_api_url: https://ci.example.com/api/v1
pipeline_trigger_pipeline_id: deploy
pipeline_trigger_token: "{{ vault_pipeline_token }}"
pipeline_trigger_branch: {{params.version}}
pipeline_trigger_parallel_jobs: {{params.replicas}}
pipeline_trigger_artifact_retention_days: {{params.retention_days}}
pipeline_trigger_approval_required: {{params.approval_required}}
pipeline_trigger_poll_retries: 90
"#,
    ),
    templates: &[],
    files: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(strategy: &dyn RoleStrategy, env: Environment) -> serde_yaml_ng::Value {
        let artifact = strategy.resolve(env);
        serde_yaml_ng::from_str(artifact.defaults.as_deref().unwrap()).unwrap()
    }

    fn find(id: RoleId) -> Box<dyn RoleStrategy> {
        strategies().into_iter().find(|s| s.handles(&id)).unwrap()
    }

    #[test]
    fn test_one_strategy_per_id() {
        let all = strategies();
        assert_eq!(all.len(), 5);
        for id in [
            RoleId::Kubernetes,
            RoleId::Helm,
            RoleId::KubeMonitoring,
            RoleId::ManagedCluster,
            RoleId::Pipeline,
        ] {
            assert_eq!(all.iter().filter(|s| s.handles(&id)).count(), 1, "{id}");
        }
        assert!(!all.iter().any(|s| s.handles(&RoleId::Web)));
    }

    #[test]
    fn test_k8s_namespace_label_staging_warns() {
        let s = find(RoleId::Kubernetes);
        let tasks = s.resolve(Environment::Staging).tasks;
        assert!(tasks.contains("pod-security.kubernetes.io/warn: restricted"));
        assert!(!tasks.contains("pod-security.kubernetes.io/enforce"));
    }

    #[test]
    fn test_k8s_pdb_uses_min_replicas() {
        let s = find(RoleId::Kubernetes);
        let tasks: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(&s.resolve(Environment::Production).tasks).unwrap();
        let pdb = tasks
            .as_sequence()
            .unwrap()
            .iter()
            .find(|t| t["name"].as_str() == Some("Apply pod disruption budget"))
            .unwrap();
        assert_eq!(
            pdb["kubernetes.core.k8s"]["definition"]["spec"]["minAvailable"].as_u64(),
            Some(2)
        );
    }

    #[test]
    fn test_helm_chart_pinned_per_env() {
        let s = find(RoleId::Helm);
        let staging = defaults(s.as_ref(), Environment::Staging);
        let prod = defaults(s.as_ref(), Environment::Production);
        assert_eq!(staging["helm_release_chart_version"].as_str(), Some("18.2.0"));
        assert_eq!(prod["helm_release_chart_version"].as_str(), Some("18.1.6"));
        assert_eq!(prod["helm_release_atomic"].as_bool(), Some(true));
        assert_eq!(staging["helm_release_atomic"].as_bool(), Some(false));
    }

    #[test]
    fn test_kube_prometheus_values() {
        let s = find(RoleId::KubeMonitoring);
        let prod = defaults(s.as_ref(), Environment::Production);
        assert_eq!(prod["kube_prometheus_replicas"].as_u64(), Some(2));
        assert_eq!(prod["kube_prometheus_alertmanager_replicas"].as_u64(), Some(3));
        assert_eq!(prod["kube_prometheus_retention_days"].as_u64(), Some(30));
        assert_eq!(prod["kube_prometheus_storage_gb"].as_u64(), Some(50));
        let staging = defaults(s.as_ref(), Environment::Staging);
        assert_eq!(staging["kube_prometheus_alertmanager_replicas"].as_u64(), Some(1));
    }

    #[test]
    fn test_eks_scaling() {
        let s = find(RoleId::ManagedCluster);
        let staging = defaults(s.as_ref(), Environment::Staging);
        let prod = defaults(s.as_ref(), Environment::Production);
        assert_eq!(staging["eks_cluster_desired_nodes"].as_u64(), Some(2));
        assert_eq!(staging["eks_cluster_min_nodes"].as_u64(), Some(1));
        assert_eq!(prod["eks_cluster_max_nodes"].as_u64(), Some(6));
        assert_eq!(prod["eks_cluster_log_retention_days"].as_u64(), Some(90));
        assert_eq!(prod["eks_cluster_name"].as_str(), Some("playforge-production"));
    }

    #[test]
    fn test_pipeline_approval_gate_production_only() {
        let s = find(RoleId::Pipeline);
        let staging = defaults(s.as_ref(), Environment::Staging);
        let prod = defaults(s.as_ref(), Environment::Production);
        assert_eq!(staging["pipeline_trigger_approval_required"].as_bool(), Some(false));
        assert_eq!(prod["pipeline_trigger_approval_required"].as_bool(), Some(true));
        assert_eq!(staging["pipeline_trigger_branch"].as_str(), Some("develop"));
        assert_eq!(prod["pipeline_trigger_branch"].as_str(), Some("main"));
    }

    #[test]
    fn test_sizing_bounds_consistent() {
        for s in strategies() {
            for env in Environment::ALL {
                let z = s.sizing(env);
                assert!(z.min_replicas <= z.replicas, "{}", s.artifact_name());
                assert!(z.replicas <= z.max_replicas, "{}", s.artifact_name());
            }
        }
    }
}
