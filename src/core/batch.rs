//! Bounded-parallel composition of several projects.
//!
//! Each request is built independently on a rayon pool capped at `jobs`
//! threads. Results are reported in request order regardless of which
//! worker finished first.

use super::builder;
use super::config::{FailurePolicy, PlayforgeConfig};
use super::error::CompositionError;
use super::types::{parse_request, ProjectArtifact};
use crate::catalog::RoleCatalog;
use rayon::prelude::*;
use thiserror::Error;
use tracing::warn;

/// One named project to compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub name: String,
    pub roles: Vec<String>,
    pub environment: String,
}

impl BatchRequest {
    pub fn new(name: impl Into<String>, roles: &[&str], environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            environment: environment.into(),
        }
    }
}

/// Requests for every project in a config, in file order.
pub fn requests_from_config(config: &PlayforgeConfig) -> Vec<BatchRequest> {
    config
        .projects
        .iter()
        .map(|(name, p)| BatchRequest {
            name: name.clone(),
            roles: p.roles.clone(),
            environment: p.environment.clone(),
        })
        .collect()
}

#[derive(Debug)]
pub struct BatchSuccess {
    pub name: String,
    pub project: ProjectArtifact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub name: String,
    pub error: CompositionError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub successes: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("project '{name}' failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: CompositionError,
    },

    #[error("jobs must be at least 1")]
    NoWorkers,

    #[error("cannot start worker pool: {0}")]
    Pool(String),
}

fn build_one(catalog: &RoleCatalog, request: &BatchRequest) -> Result<ProjectArtifact, CompositionError> {
    let (selection, env) = parse_request(&request.roles, &request.environment)?;
    builder::build(catalog, &selection, env)
}

/// Build every request on at most `jobs` threads.
///
/// With [`FailurePolicy::StopOnFirst`] the first failure in request order
/// is returned as an error. With [`FailurePolicy::ContinueIndependent`]
/// failures are collected next to the successes.
pub fn run(
    catalog: &RoleCatalog,
    requests: &[BatchRequest],
    jobs: usize,
    policy: FailurePolicy,
) -> Result<BatchReport, BatchError> {
    if jobs == 0 {
        return Err(BatchError::NoWorkers);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| BatchError::Pool(e.to_string()))?;

    let results: Vec<Result<ProjectArtifact, CompositionError>> = pool.install(|| {
        requests
            .par_iter()
            .map(|request| build_one(catalog, request))
            .collect()
    });

    let mut report = BatchReport::default();
    for (request, result) in requests.iter().zip(results) {
        match result {
            Ok(project) => report.successes.push(BatchSuccess {
                name: request.name.clone(),
                project,
            }),
            Err(error) => {
                warn!(project = %request.name, error = %error, "project failed");
                if policy == FailurePolicy::StopOnFirst {
                    return Err(BatchError::Failed {
                        name: request.name.clone(),
                        source: error,
                    });
                }
                report.failures.push(BatchFailure {
                    name: request.name.clone(),
                    error,
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Environment;

    fn requests() -> Vec<BatchRequest> {
        vec![
            BatchRequest::new("web", &["security", "web"], "staging"),
            BatchRequest::new("bad-env", &["web"], "qa"),
            BatchRequest::new("cluster", &["managed_cluster", "kubernetes"], "production"),
            BatchRequest::new("ghost", &["mainframe"], "staging"),
        ]
    }

    #[test]
    fn test_continue_collects_failures_in_order() {
        let catalog = RoleCatalog::builtin();
        let report = run(&catalog, &requests(), 3, FailurePolicy::ContinueIndependent).unwrap();
        let ok: Vec<&str> = report.successes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(ok, vec!["web", "cluster"]);
        assert_eq!(
            report.failures,
            vec![
                BatchFailure {
                    name: "bad-env".to_string(),
                    error: CompositionError::InvalidEnvironment("qa".to_string()),
                },
                BatchFailure {
                    name: "ghost".to_string(),
                    error: CompositionError::UnknownRoleId("mainframe".to_string()),
                },
            ]
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_stop_on_first_reports_earliest_failure() {
        let catalog = RoleCatalog::builtin();
        let err = run(&catalog, &requests(), 4, FailurePolicy::StopOnFirst).unwrap_err();
        match err {
            BatchError::Failed { name, source } => {
                assert_eq!(name, "bad-env");
                assert!(matches!(source, CompositionError::InvalidEnvironment(_)));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let catalog = RoleCatalog::builtin();
        let reqs: Vec<BatchRequest> = (0..8)
            .map(|i| BatchRequest::new(format!("p{i}"), &["web", "database", "helm"], "production"))
            .collect();
        let serial = run(&catalog, &reqs, 1, FailurePolicy::StopOnFirst).unwrap();
        let parallel = run(&catalog, &reqs, 4, FailurePolicy::StopOnFirst).unwrap();
        for (a, b) in serial.successes.iter().zip(&parallel.successes) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.project, b.project);
            assert_eq!(a.project.environment, Environment::Production);
        }
        assert!(parallel.is_clean());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let catalog = RoleCatalog::builtin();
        assert!(matches!(
            run(&catalog, &requests(), 0, FailurePolicy::StopOnFirst),
            Err(BatchError::NoWorkers)
        ));
    }

    #[test]
    fn test_requests_from_config_keep_order() {
        let config = crate::core::config::parse_config(
            "version: \"1.0\"\nname: x\nprojects:\n  b:\n    environment: staging\n    roles: [web]\n  a:\n    environment: production\n    roles: [db]\n",
        )
        .unwrap();
        let reqs = requests_from_config(&config);
        assert_eq!(reqs[0].name, "b");
        assert_eq!(reqs[1], BatchRequest::new("a", &["db"], "production"));
    }
}
