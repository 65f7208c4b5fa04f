//! Main playbook assembly: preparation, one play per role, closing report.

use super::profile::EnvProfile;
use super::resolver;
use super::types::{Environment, RolePhase};

const PREPARATION: &str = r#"---
- name: Prepare hosts ({{params.env}})
  hosts: all
  become: true
  gather_facts: true
  any_errors_fatal: true
  tags:
    - always
  tasks:
    - name: Verify connectivity
      ansible.builtin.ping:

    - name: Measure root filesystem usage
      ansible.builtin.shell:
        cmd: "df -P / | awk 'NR==2 {print $5}' | tr -d '%'"
      register: playforge_disk_usage
      changed_when: false

    - name: Abort when the root filesystem is 90% used or more
      ansible.builtin.assert:
        that:
          - playforge_disk_usage.stdout | int < 90
        fail_msg: "Root filesystem is {{ playforge_disk_usage.stdout }}% used"

    - name: Refresh apt cache
      ansible.builtin.apt:
        update_cache: true
        cache_valid_time: 3600
      when: ansible_os_family == "Debian"

    - name: Refresh dnf cache
      ansible.builtin.dnf:
        update_cache: true
      when: ansible_os_family == "RedHat"
"#;

const CLOSING_HEAD: &str = r#"
- name: Close out deployment ({{params.env}})
  hosts: all
  become: true
  gather_facts: true
  tags:
    - always
  tasks:
    - name: Remove packages that are no longer required
      ansible.builtin.apt:
        autoremove: true
        autoclean: true
      when: ansible_os_family == "Debian"
      ignore_errors: true

    - name: Remove temporary deployment files
      ansible.builtin.file:
        path: /tmp/playforge
        state: absent
      ignore_errors: true

    - name: Gather service status
      ansible.builtin.service_facts:
      ignore_errors: true

    - name: Write deployment summary
      ansible.builtin.copy:
        dest: /var/log/playforge-deploy-summary.txt
        mode: "0644"
        content: |
          playforge deployment summary
          environment: {{params.env}}
          timestamp: {{ ansible_date_time.iso8601 | default('unknown') }}
          executed by: {{ ansible_user_id | default('unknown') }}
          host: {{ inventory_hostname }}
          distribution: {{ ansible_distribution | default('unknown') }} {{ ansible_distribution_version | default('') }}
          running services: {{ ansible_facts.services | default({}) | dict2items | selectattr('value.state', 'equalto', 'running') | list | length }}
          roles applied:
"#;

const CLOSING_TAIL: &str = r#"      ignore_errors: true
"#;

/// Name of the preparation play.
pub fn preparation_name(env: Environment) -> String {
    format!("Prepare hosts ({env})")
}

/// Name of the closing play.
pub fn closing_name(env: Environment) -> String {
    format!("Close out deployment ({env})")
}

/// Name of a role play.
pub fn phase_name(role_name: &str) -> String {
    format!("Apply {role_name}")
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn role_play(phase: &RolePhase) -> String {
    let mut play = format!(
        "\n- name: {}\n  hosts: {}\n",
        phase_name(&phase.name),
        phase.group
    );
    if phase.group == "localhost" {
        play.push_str("  connection: local\n  gather_facts: false\n");
    } else {
        play.push_str("  become: true\n");
    }
    play.push_str(&format!(
        "  tags:\n    - {}\n  roles:\n    - role: {}\n",
        quoted(&phase.role_id),
        phase.name
    ));
    play
}

/// Assemble the main playbook for phases in execution order.
pub fn assemble(phases: &[RolePhase], env: Environment) -> String {
    let params = EnvProfile::for_env(env).params();

    let mut out = resolver::render(PREPARATION, &params);
    for phase in phases {
        out.push_str(&role_play(phase));
    }
    out.push_str(&resolver::render(CLOSING_HEAD, &params));
    for phase in phases {
        out.push_str(&format!("            - {}\n", phase.name));
    }
    out.push_str(CLOSING_TAIL);
    out
}
