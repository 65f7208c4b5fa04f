//! Generic role table: web, database, security, backup, monitoring, vault,
//! cloud VM, and load balancer.
//!
//! Text is data. Environment-sensitive values come in through
//! `{{params.key}}`; everything in `{{ ... }}` with spaces is runtime Jinja.

use super::RoleTemplate;
use crate::core::types::RoleId;

/// The generic table in listing order.
pub fn table() -> Vec<(RoleId, &'static RoleTemplate)> {
    vec![
        (RoleId::Web, &WEBSERVER),
        (RoleId::Database, &DATABASE),
        (RoleId::Security, &SECURITY),
        (RoleId::Backup, &BACKUP),
        (RoleId::Monitoring, &MONITORING),
        (RoleId::Vault, &VAULT),
        (RoleId::CloudVm, &CLOUD_VM),
        (RoleId::LoadBalancer, &LOADBALANCER),
    ]
}

// ============================================================================
// Web server (nginx)
// ============================================================================

pub static WEBSERVER: RoleTemplate = RoleTemplate {
    name: "webserver",
    tasks: r#"---
- name: Install nginx
  ansible.builtin.package:
    name: nginx
    state: present

- name: Create web root
  ansible.builtin.file:
    path: "{{ webserver_root }}"
    state: directory
    owner: www-data
    group: www-data
    mode: "0755"

- name: Check TLS certificate
  ansible.builtin.stat:
    path: "{{ webserver_tls_certificate }}"
  register: webserver_tls_certificate_stat
  when: webserver_tls_enabled | bool

- name: Require TLS certificate when TLS is enforced
  ansible.builtin.assert:
    that:
      - webserver_tls_certificate_stat.stat.exists
    fail_msg: "TLS is enforced but {{ webserver_tls_certificate }} is missing"
  when: webserver_tls_enabled | bool

- name: Deploy nginx main configuration
  ansible.builtin.template:
    src: nginx.conf.j2
    dest: /etc/nginx/nginx.conf
    owner: root
    group: root
    mode: "0644"
    validate: nginx -t -c %s
  notify: Reload nginx

- name: Deploy site configuration
  ansible.builtin.template:
    src: site.conf.j2
    dest: "/etc/nginx/conf.d/{{ webserver_site_name }}.conf"
    owner: root
    group: root
    mode: "0644"
  notify: Reload nginx

- name: Remove default site
  ansible.builtin.file:
    path: /etc/nginx/sites-enabled/default
    state: absent
  notify: Reload nginx

- name: Deploy default index page
  ansible.builtin.copy:
    src: index.html
    dest: "{{ webserver_root }}/index.html"
    owner: www-data
    group: www-data
    mode: "0644"

- name: Configure log rotation
  ansible.builtin.template:
    src: logrotate-nginx.j2
    dest: /etc/logrotate.d/nginx
    mode: "0644"

- name: Ensure nginx is running and enabled
  ansible.builtin.service:
    name: nginx
    state: started
    enabled: true
"#,
    handlers: Some(
        r#"---
- name: Reload nginx
  ansible.builtin.service:
    name: nginx
    state: reloaded

- name: Restart nginx
  ansible.builtin.service:
    name: nginx
    state: restarted
"#,
    ),
    defaults: Some(
        r#"---
webserver_environment: {{params.env}}
webserver_root: /var/www/html
webserver_site_name: playforge
webserver_server_name: "_"
webserver_worker_connections: {{params.web_worker_connections}}
webserver_log_level: {{params.log_level}}
webserver_log_retention_days: {{params.log_retention_days}}
webserver_tls_enabled: {{params.tls_enforced}}
webserver_tls_certificate: {{params.tls_cert_path}}
webserver_tls_certificate_key: {{params.tls_key_path}}
"#,
    ),
    templates: &[
        (
            "nginx.conf.j2",
            r##"# Managed by playforge ({{params.env}})
user www-data;
worker_processes auto;
pid /run/nginx.pid;

events {
    worker_connections {{ webserver_worker_connections }};
}

http {
    sendfile on;
    tcp_nopush on;
    server_tokens off;
    include /etc/nginx/mime.types;
    default_type application/octet-stream;
    access_log /var/log/nginx/access.log;
    error_log /var/log/nginx/error.log {{ webserver_log_level }};
    gzip on;
    include /etc/nginx/conf.d/*.conf;
}
"##,
        ),
        (
            "site.conf.j2",
            r##"# Managed by playforge
server {
    listen 80;
    server_name {{ webserver_server_name }};
{% if webserver_tls_enabled | bool %}
    return 301 https://$host$request_uri;
}

server {
    listen 443 ssl http2;
    server_name {{ webserver_server_name }};
    ssl_certificate {{ webserver_tls_certificate }};
    ssl_certificate_key {{ webserver_tls_certificate_key }};
    ssl_protocols TLSv1.2 TLSv1.3;
    add_header Strict-Transport-Security "max-age=31536000" always;
{% endif %}
    root {{ webserver_root }};
    index index.html;

    location / {
        try_files $uri $uri/ =404;
    }
}
"##,
        ),
        (
            "logrotate-nginx.j2",
            r##"/var/log/nginx/*.log {
    daily
    rotate {{ webserver_log_retention_days }}
    missingok
    notifempty
    compress
    delaycompress
    sharedscripts
    postrotate
        [ -s /run/nginx.pid ] && kill -USR1 $(cat /run/nginx.pid)
    endscript
}
"##,
        ),
    ],
    files: &[(
        "index.html",
        r##"<!DOCTYPE html>
<html>
  <head><title>playforge ({{params.env}})</title></head>
  <body><h1>Deployed by playforge</h1></body>
</html>
"##,
    )],
};

// ============================================================================
// Database (PostgreSQL)
// ============================================================================

pub static DATABASE: RoleTemplate = RoleTemplate {
    name: "database",
    tasks: r#"---
- name: Install PostgreSQL packages
  ansible.builtin.package:
    name:
      - "postgresql-{{ database_version }}"
      - python3-psycopg2
    state: present

- name: Deploy postgresql.conf
  ansible.builtin.template:
    src: postgresql.conf.j2
    dest: "/etc/postgresql/{{ database_version }}/main/postgresql.conf"
    owner: postgres
    group: postgres
    mode: "0644"
  notify: Restart postgresql

- name: Deploy pg_hba.conf
  ansible.builtin.template:
    src: pg_hba.conf.j2
    dest: "/etc/postgresql/{{ database_version }}/main/pg_hba.conf"
    owner: postgres
    group: postgres
    mode: "0640"
  notify: Reload postgresql

- name: Ensure PostgreSQL is running and enabled
  ansible.builtin.service:
    name: postgresql
    state: started
    enabled: true

- name: Create application database
  community.postgresql.postgresql_db:
    name: "{{ database_name }}"
    state: present
  become: true
  become_user: postgres

- name: Create application user
  community.postgresql.postgresql_user:
    db: "{{ database_name }}"
    name: "{{ database_user }}"
    password: "{{ database_password }}"
    state: present
  become: true
  become_user: postgres
  no_log: true

- name: Grant application privileges
  community.postgresql.postgresql_privs:
    db: "{{ database_name }}"
    role: "{{ database_user }}"
    type: database
    privs: ALL
  become: true
  become_user: postgres
"#,
    handlers: Some(
        r#"---
- name: Restart postgresql
  ansible.builtin.service:
    name: postgresql
    state: restarted

- name: Reload postgresql
  ansible.builtin.service:
    name: postgresql
    state: reloaded
"#,
    ),
    defaults: Some(
        r#"---
database_environment: {{params.env}}
database_version: 15
database_name: app
database_user: app
database_password: "{{ vault_database_password | default('change-me') }}"
database_listen_addresses: "*"
database_port: 5432
database_max_connections: {{params.db_max_connections}}
database_shared_buffers: {{params.db_shared_buffers}}
database_allowed_cidr: {{params.firewall_ssh_cidr}}
database_ssl: {{params.tls_enforced}}
database_ssl_cert_file: {{params.tls_cert_path}}
database_ssl_key_file: {{params.tls_key_path}}
database_log_min_duration_ms: 500
database_backup_retention_days: {{params.backup_retention_days}}
"#,
    ),
    templates: &[
        (
            "postgresql.conf.j2",
            r##"# Managed by playforge ({{params.env}})
data_directory = '/var/lib/postgresql/{{ database_version }}/main'
hba_file = '/etc/postgresql/{{ database_version }}/main/pg_hba.conf'
listen_addresses = '{{ database_listen_addresses }}'
port = {{ database_port }}
max_connections = {{ database_max_connections }}
shared_buffers = {{ database_shared_buffers }}
ssl = {{ 'on' if database_ssl | bool else 'off' }}
{% if database_ssl | bool %}
ssl_cert_file = '{{ database_ssl_cert_file }}'
ssl_key_file = '{{ database_ssl_key_file }}'
{% endif %}
log_min_duration_statement = {{ database_log_min_duration_ms }}
log_line_prefix = '%m [%p] %q%u@%d '
"##,
        ),
        (
            "pg_hba.conf.j2",
            r##"# Managed by playforge
local   all             postgres                                peer
local   all             all                                     peer
host    all             all             127.0.0.1/32            scram-sha-256
{% if database_ssl | bool %}
hostssl {{ database_name }} {{ database_user }} {{ database_allowed_cidr }} scram-sha-256
{% else %}
host    {{ database_name }} {{ database_user }} {{ database_allowed_cidr }} scram-sha-256
{% endif %}
"##,
        ),
    ],
    files: &[],
};

// ============================================================================
// Security hardening
// ============================================================================

pub static SECURITY: RoleTemplate = RoleTemplate {
    name: "security",
    tasks: r#"---
- name: Install security packages
  ansible.builtin.package:
    name:
      - ufw
      - fail2ban
      - unattended-upgrades
    state: present

- name: Deny incoming traffic by default
  community.general.ufw:
    direction: incoming
    default: deny

- name: Allow outgoing traffic by default
  community.general.ufw:
    direction: outgoing
    default: allow

- name: Allow SSH from the management network
  community.general.ufw:
    rule: allow
    port: "22"
    proto: tcp
    from_ip: "{{ security_ssh_allowed_cidr }}"

- name: Allow public service ports
  community.general.ufw:
    rule: allow
    port: "{{ item }}"
    proto: tcp
  loop: "{{ security_open_ports }}"

- name: Enable firewall
  community.general.ufw:
    state: enabled
    logging: "on"

- name: Harden SSH daemon
  ansible.builtin.lineinfile:
    path: /etc/ssh/sshd_config
    regexp: "^#?{{ item.key }}\\s"
    line: "{{ item.key }} {{ item.value }}"
    validate: /usr/sbin/sshd -t -f %s
  loop: "{{ security_sshd_settings | dict2items }}"
  notify: Restart sshd

- name: Configure fail2ban jail
  ansible.builtin.template:
    src: jail.local.j2
    dest: /etc/fail2ban/jail.local
    owner: root
    group: root
    mode: "0644"
  notify: Restart fail2ban

- name: Apply kernel hardening parameters
  ansible.posix.sysctl:
    name: "{{ item.key }}"
    value: "{{ item.value }}"
    sysctl_set: true
    state: present
  loop: "{{ security_sysctl | dict2items }}"

- name: Enable automatic security updates
  ansible.builtin.copy:
    src: 20auto-upgrades
    dest: /etc/apt/apt.conf.d/20auto-upgrades
    owner: root
    group: root
    mode: "0644"
  when: ansible_os_family == "Debian"

- name: Ensure fail2ban is running and enabled
  ansible.builtin.service:
    name: fail2ban
    state: started
    enabled: true
"#,
    handlers: Some(
        r#"---
- name: Restart sshd
  ansible.builtin.service:
    name: "{{ 'ssh' if ansible_os_family == 'Debian' else 'sshd' }}"
    state: restarted

- name: Restart fail2ban
  ansible.builtin.service:
    name: fail2ban
    state: restarted
"#,
    ),
    defaults: Some(
        r#"---
security_environment: {{params.env}}
security_ssh_allowed_cidr: {{params.firewall_ssh_cidr}}
security_open_ports:
  - "80"
  - "443"
security_enforce_tls: {{params.tls_enforced}}
security_fail2ban_maxretry: {{params.fail2ban_max_retry}}
security_fail2ban_bantime: {{params.fail2ban_ban_seconds}}
security_fail2ban_findtime: 600
security_sshd_settings:
  PermitRootLogin: "no"
  PasswordAuthentication: "no"
  X11Forwarding: "no"
  MaxAuthTries: "3"
  ClientAliveInterval: "300"
security_sysctl:
  net.ipv4.conf.all.rp_filter: 1
  net.ipv4.conf.all.accept_redirects: 0
  net.ipv4.conf.all.send_redirects: 0
  net.ipv4.tcp_syncookies: 1
  kernel.randomize_va_space: 2
"#,
    ),
    templates: &[(
        "jail.local.j2",
        r##"# Managed by playforge
[DEFAULT]
bantime = {{ security_fail2ban_bantime }}
findtime = {{ security_fail2ban_findtime }}
maxretry = {{ security_fail2ban_maxretry }}
ignoreip = 127.0.0.1/8 {{ security_ssh_allowed_cidr }}

[sshd]
enabled = true
"##,
    )],
    files: &[(
        "20auto-upgrades",
        r##"APT::Periodic::Update-Package-Lists "1";
APT::Periodic::Unattended-Upgrade "1";
"##,
    )],
};

// ============================================================================
// Backup
// ============================================================================

pub static BACKUP: RoleTemplate = RoleTemplate {
    name: "backup",
    tasks: r#"---
- name: Create backup directory
  ansible.builtin.file:
    path: "{{ backup_dir }}"
    state: directory
    owner: root
    group: root
    mode: "0700"

- name: Install backup script
  ansible.builtin.copy:
    src: playforge-backup.sh
    dest: /usr/local/bin/playforge-backup
    owner: root
    group: root
    mode: "0750"

- name: Deploy backup configuration
  ansible.builtin.template:
    src: backup.conf.j2
    dest: /etc/playforge-backup.conf
    owner: root
    group: root
    mode: "0600"

- name: Schedule nightly backup
  ansible.builtin.cron:
    name: playforge nightly backup
    minute: "0"
    hour: "{{ backup_hour }}"
    job: /usr/local/bin/playforge-backup /etc/playforge-backup.conf
    user: root

- name: Schedule backup pruning
  ansible.builtin.cron:
    name: playforge backup pruning
    minute: "30"
    hour: "{{ backup_hour }}"
    job: "find {{ backup_dir }} -type f -mtime +{{ backup_retention_days }} -delete"
    user: root

- name: Run an initial backup
  ansible.builtin.command:
    cmd: /usr/local/bin/playforge-backup /etc/playforge-backup.conf
    creates: "{{ backup_dir }}/.initialized"
"#,
    handlers: None,
    defaults: Some(
        r#"---
backup_environment: {{params.env}}
backup_dir: /var/backups/playforge
backup_hour: "2"
backup_retention_days: {{params.backup_retention_days}}
backup_paths:
  - /etc
  - /var/www
backup_postgres: true
backup_compress: true
"#,
    ),
    templates: &[(
        "backup.conf.j2",
        r##"# Managed by playforge ({{params.env}})
BACKUP_DIR="{{ backup_dir }}"
BACKUP_PATHS="{{ backup_paths | join(' ') }}"
BACKUP_POSTGRES="{{ backup_postgres | bool | lower }}"
BACKUP_RETENTION_DAYS="{{ backup_retention_days }}"
"##,
    )],
    files: &[(
        "playforge-backup.sh",
        r##"#!/usr/bin/env bash
set -euo pipefail

# shellcheck source=/dev/null
source "${1:-/etc/playforge-backup.conf}"

stamp="$(date -u +%Y%m%dT%H%M%SZ)"
mkdir -p "${BACKUP_DIR}"

tar -czf "${BACKUP_DIR}/files-${stamp}.tar.gz" ${BACKUP_PATHS}

if [ "${BACKUP_POSTGRES}" = "true" ] && command -v pg_dumpall >/dev/null 2>&1; then
  sudo -u postgres pg_dumpall | gzip > "${BACKUP_DIR}/postgres-${stamp}.sql.gz"
fi

touch "${BACKUP_DIR}/.initialized"
"##,
    )],
};

// ============================================================================
// Monitoring (Prometheus + node exporter)
// ============================================================================

pub static MONITORING: RoleTemplate = RoleTemplate {
    name: "monitoring",
    tasks: r#"---
- name: Install monitoring packages
  ansible.builtin.package:
    name:
      - prometheus
      - prometheus-node-exporter
    state: present

- name: Deploy Prometheus configuration
  ansible.builtin.template:
    src: prometheus.yml.j2
    dest: /etc/prometheus/prometheus.yml
    owner: root
    group: root
    mode: "0644"
  notify: Restart prometheus

- name: Configure Prometheus retention
  ansible.builtin.template:
    src: prometheus-defaults.j2
    dest: /etc/default/prometheus
    owner: root
    group: root
    mode: "0644"
  notify: Restart prometheus

- name: Ensure node exporter is running and enabled
  ansible.builtin.service:
    name: prometheus-node-exporter
    state: started
    enabled: true

- name: Ensure Prometheus is running and enabled
  ansible.builtin.service:
    name: prometheus
    state: started
    enabled: true

- name: Wait for Prometheus to become ready
  ansible.builtin.uri:
    url: "http://127.0.0.1:{{ monitoring_prometheus_port }}/-/ready"
    status_code: 200
  register: monitoring_ready
  until: monitoring_ready.status == 200
  retries: 10
  delay: 5
"#,
    handlers: Some(
        r#"---
- name: Restart prometheus
  ansible.builtin.service:
    name: prometheus
    state: restarted
"#,
    ),
    defaults: Some(
        r#"---
monitoring_environment: {{params.env}}
monitoring_retention_days: {{params.metrics_retention_days}}
monitoring_scrape_interval: 15s
monitoring_prometheus_port: 9090
monitoring_node_exporter_port: 9100
"#,
    ),
    templates: &[
        (
            "prometheus.yml.j2",
            r##"# Managed by playforge
global:
  scrape_interval: {{ monitoring_scrape_interval }}
  external_labels:
    environment: {{ monitoring_environment }}

scrape_configs:
  - job_name: prometheus
    static_configs:
      - targets: ["127.0.0.1:{{ monitoring_prometheus_port }}"]

  - job_name: node
    static_configs:
      - targets:
{% for host in groups['all'] %}
          - "{{ hostvars[host]['ansible_host'] | default(host) }}:{{ monitoring_node_exporter_port }}"
{% endfor %}
"##,
        ),
        (
            "prometheus-defaults.j2",
            r##"# Managed by playforge
ARGS="--storage.tsdb.retention.time={{ monitoring_retention_days }}d"
"##,
        ),
    ],
    files: &[],
};

// ============================================================================
// Secrets (HashiCorp Vault)
// ============================================================================

pub static VAULT: RoleTemplate = RoleTemplate {
    name: "vault",
    tasks: r#"---
- name: Install prerequisites
  ansible.builtin.package:
    name:
      - gpg
      - unzip
    state: present

- name: Add HashiCorp signing key
  ansible.builtin.get_url:
    url: https://apt.releases.hashicorp.com/gpg
    dest: /usr/share/keyrings/hashicorp.asc
    mode: "0644"
  when: ansible_os_family == "Debian"

- name: Add HashiCorp repository
  ansible.builtin.apt_repository:
    repo: "deb [signed-by=/usr/share/keyrings/hashicorp.asc] https://apt.releases.hashicorp.com {{ ansible_distribution_release }} main"
    filename: hashicorp
    state: present
  when: ansible_os_family == "Debian"

- name: Install Vault
  ansible.builtin.package:
    name: vault
    state: present

- name: Create Vault data directory
  ansible.builtin.file:
    path: "{{ vault_data_dir }}"
    state: directory
    owner: vault
    group: vault
    mode: "0750"

- name: Deploy Vault configuration
  ansible.builtin.template:
    src: vault.hcl.j2
    dest: /etc/vault.d/vault.hcl
    owner: vault
    group: vault
    mode: "0640"
  notify: Restart vault

- name: Ensure Vault is running and enabled
  ansible.builtin.service:
    name: vault
    state: started
    enabled: true
"#,
    handlers: Some(
        r#"---
- name: Restart vault
  ansible.builtin.service:
    name: vault
    state: restarted
"#,
    ),
    defaults: Some(
        r#"---
vault_environment: {{params.env}}
vault_data_dir: /opt/vault/data
vault_listen_address: "0.0.0.0:8200"
vault_ui: true
vault_log_level: {{params.log_level}}
vault_tls_disable: {{params.tls_disabled}}
vault_tls_cert_file: {{params.tls_cert_path}}
vault_tls_key_file: {{params.tls_key_path}}
vault_audit_retention_days: {{params.log_retention_days}}
"#,
    ),
    templates: &[(
        "vault.hcl.j2",
        r##"# Managed by playforge ({{params.env}})
ui = {{ vault_ui | bool | lower }}
log_level = "{{ vault_log_level }}"

storage "raft" {
  path    = "{{ vault_data_dir }}"
  node_id = "{{ inventory_hostname }}"
}

listener "tcp" {
  address     = "{{ vault_listen_address }}"
  tls_disable = {{ 1 if vault_tls_disable | bool else 0 }}
{% if not vault_tls_disable | bool %}
  tls_cert_file = "{{ vault_tls_cert_file }}"
  tls_key_file  = "{{ vault_tls_key_file }}"
{% endif %}
}

api_addr     = "{{ 'http' if vault_tls_disable | bool else 'https' }}://{{ ansible_default_ipv4.address }}:8200"
cluster_addr = "https://{{ ansible_default_ipv4.address }}:8201"
"##,
    )],
    files: &[],
};

// ============================================================================
// Cloud VM (AWS EC2)
// ============================================================================

pub static CLOUD_VM: RoleTemplate = RoleTemplate {
    name: "cloud_vm",
    tasks: r#"---
- name: Ensure security group exists
  amazon.aws.ec2_security_group:
    name: "playforge-{{ cloud_vm_environment }}"
    description: "playforge {{ cloud_vm_environment }} instances"
    region: "{{ cloud_vm_region }}"
    rules:
      - proto: tcp
        ports:
          - 22
        cidr_ip: "{{ cloud_vm_ssh_cidr }}"
      - proto: tcp
        ports:
          - 80
          - 443
        cidr_ip: 0.0.0.0/0
  register: cloud_vm_security_group

- name: Launch instances
  amazon.aws.ec2_instance:
    name: "playforge-{{ cloud_vm_environment }}"
    region: "{{ cloud_vm_region }}"
    instance_type: "{{ cloud_vm_instance_type }}"
    image_id: "{{ cloud_vm_image_id }}"
    key_name: "{{ cloud_vm_key_name }}"
    security_group: "{{ cloud_vm_security_group.group_id }}"
    exact_count: "{{ cloud_vm_count }}"
    volumes:
      - device_name: /dev/sda1
        ebs:
          volume_size: "{{ cloud_vm_volume_size_gb }}"
          delete_on_termination: true
    tags:
      Environment: "{{ cloud_vm_environment }}"
      ManagedBy: playforge
    wait: true
  register: cloud_vm_instances

- name: Wait for SSH on new instances
  ansible.builtin.wait_for:
    host: "{{ item.public_ip_address }}"
    port: 22
    timeout: 300
  loop: "{{ cloud_vm_instances.instances }}"

- name: Add instances to the in-memory inventory
  ansible.builtin.add_host:
    name: "{{ item.public_ip_address }}"
    groups: cloud_vm_launched
  loop: "{{ cloud_vm_instances.instances }}"
"#,
    handlers: None,
    defaults: Some(
        r#"---
cloud_vm_environment: {{params.env}}
cloud_vm_region: us-east-1
cloud_vm_instance_type: {{params.instance_type}}
cloud_vm_count: {{params.instance_count}}
cloud_vm_volume_size_gb: {{params.volume_size_gb}}
cloud_vm_image_id: "ami-0c7217cdde317cfec"
cloud_vm_key_name: playforge
cloud_vm_ssh_cidr: {{params.firewall_ssh_cidr}}
"#,
    ),
    templates: &[],
    files: &[],
};

// ============================================================================
// Load balancer (HAProxy)
// ============================================================================

pub static LOADBALANCER: RoleTemplate = RoleTemplate {
    name: "loadbalancer",
    tasks: r#"---
- name: Install HAProxy
  ansible.builtin.package:
    name: haproxy
    state: present

- name: Deploy HAProxy configuration
  ansible.builtin.template:
    src: haproxy.cfg.j2
    dest: /etc/haproxy/haproxy.cfg
    owner: root
    group: root
    mode: "0644"
    validate: haproxy -c -f %s
  notify: Reload haproxy

- name: Ensure HAProxy is running and enabled
  ansible.builtin.service:
    name: haproxy
    state: started
    enabled: true
"#,
    handlers: Some(
        r#"---
- name: Reload haproxy
  ansible.builtin.service:
    name: haproxy
    state: reloaded
"#,
    ),
    defaults: Some(
        r#"---
loadbalancer_environment: {{params.env}}
loadbalancer_maxconn: {{params.lb_max_connections}}
loadbalancer_balance: roundrobin
loadbalancer_backend_port: 80
loadbalancer_stats_port: 8404
loadbalancer_tls_enabled: {{params.tls_enforced}}
loadbalancer_tls_pem: /etc/haproxy/certs/playforge.pem
"#,
    ),
    templates: &[(
        "haproxy.cfg.j2",
        r##"# Managed by playforge ({{params.env}})
global
    log /dev/log local0
    maxconn {{ loadbalancer_maxconn }}
    user haproxy
    group haproxy
    daemon

defaults
    mode http
    log global
    option httplog
    timeout connect 5s
    timeout client 30s
    timeout server 30s

frontend http_in
    bind *:80
{% if loadbalancer_tls_enabled | bool %}
    bind *:443 ssl crt {{ loadbalancer_tls_pem }}
    http-request redirect scheme https unless { ssl_fc }
{% endif %}
    default_backend web_pool

backend web_pool
    balance {{ loadbalancer_balance }}
    option httpchk GET /
{% for host in groups['webservers'] | default([]) %}
    server {{ host }} {{ hostvars[host]['ansible_host'] | default(host) }}:{{ loadbalancer_backend_port }} check
{% endfor %}

listen stats
    bind *:{{ loadbalancer_stats_port }}
    stats enable
    stats uri /stats
"##,
    )],
    files: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::EnvProfile;
    use crate::core::types::Environment;

    #[test]
    fn test_table_ids_unique() {
        let t = table();
        for (i, (a, _)) in t.iter().enumerate() {
            for (b, _) in t.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_webserver_tls_follows_env() {
        let staging = WEBSERVER.render(&EnvProfile::for_env(Environment::Staging).params());
        let prod = WEBSERVER.render(&EnvProfile::for_env(Environment::Production).params());
        assert!(staging
            .defaults
            .as_ref()
            .unwrap()
            .contains("webserver_tls_enabled: false"));
        assert!(prod
            .defaults
            .as_ref()
            .unwrap()
            .contains("webserver_tls_enabled: true"));
        assert!(prod
            .defaults
            .unwrap()
            .contains("/etc/ssl/playforge/production.crt"));
    }

    #[test]
    fn test_backup_retention_follows_env() {
        let prod = BACKUP.render(&EnvProfile::for_env(Environment::Production).params());
        let defaults: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(prod.defaults.as_ref().unwrap()).unwrap();
        assert_eq!(defaults["backup_retention_days"].as_u64(), Some(30));
    }

    #[test]
    fn test_security_firewall_cidr() {
        let staging = SECURITY.render(&EnvProfile::for_env(Environment::Staging).params());
        let defaults: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(staging.defaults.as_ref().unwrap()).unwrap();
        assert_eq!(
            defaults["security_ssh_allowed_cidr"].as_str(),
            Some("10.0.0.0/8")
        );
        assert_eq!(defaults["security_fail2ban_maxretry"].as_u64(), Some(5));
    }

    #[test]
    fn test_jinja_passes_through() {
        let a = WEBSERVER.render(&EnvProfile::for_env(Environment::Staging).params());
        assert!(a.tasks.contains("{{ webserver_root }}"));
        assert!(a.templates["nginx.conf.j2"].contains("# Managed by playforge (staging)"));
    }

    #[test]
    fn test_tasks_are_task_lists() {
        let params = EnvProfile::for_env(Environment::Production).params();
        for (id, template) in table() {
            let a = template.render(&params);
            let tasks: serde_yaml_ng::Value = serde_yaml_ng::from_str(&a.tasks).unwrap();
            let list = tasks.as_sequence().unwrap_or_else(|| panic!("{id}: not a list"));
            assert!(!list.is_empty(), "{id}");
            for task in list {
                assert!(task["name"].as_str().is_some(), "{id}: unnamed task");
            }
        }
    }
}
