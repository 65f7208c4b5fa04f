//! Generation ledger: per-user quota checks and an append-only JSONL record
//! of every generated artifact.
//!
//! The composition core never touches a ledger. The CLI consults one before
//! generating and records the result afterwards.

use crate::export::hasher;
use crate::export::manifest::now_iso8601;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Ledger file name inside an output directory.
pub const LEDGER_FILE: &str = "generations.jsonl";

/// Form an artifact was delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Tree,
    Zip,
    TarGz,
}

/// Result of recording a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl RecordOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }
}

/// Quota and persistence for generated artifacts.
pub trait GenerationLedger {
    /// Whether `user` may generate another artifact.
    fn can_generate(&self, user: &str) -> bool;

    /// Record one generated artifact.
    fn record_generation(
        &self,
        user: &str,
        summary: &str,
        artifact: &[u8],
        kind: ArtifactKind,
    ) -> RecordOutcome;
}

/// Allows everything and records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmetered;

impl GenerationLedger for Unmetered {
    fn can_generate(&self, _user: &str) -> bool {
        true
    }

    fn record_generation(&self, _: &str, _: &str, _: &[u8], _: ArtifactKind) -> RecordOutcome {
        RecordOutcome::ok()
    }
}

/// One line of the JSONL ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub ts: String,
    pub user: String,
    pub summary: String,
    pub kind: ArtifactKind,
    pub digest: String,
    pub size: usize,
}

/// Append-only JSONL ledger with an optional per-user quota.
#[derive(Debug, Clone)]
pub struct JsonlLedger {
    path: PathBuf,
    quota: Option<u32>,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>, quota: Option<u32>) -> Self {
        Self {
            path: path.into(),
            quota,
        }
    }

    /// Ledger stored as `generations.jsonl` under `dir`.
    pub fn in_dir(dir: &Path, quota: Option<u32>) -> Self {
        Self::new(dir.join(LEDGER_FILE), quota)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the ledger. Malformed lines are skipped.
    pub fn records(&self) -> Result<Vec<GenerationRecord>, String> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("cannot read ledger {}: {}", self.path.display(), e))?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str(l) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping malformed ledger line");
                    None
                }
            })
            .collect())
    }

    /// Number of recorded generations for `user`.
    pub fn count_for(&self, user: &str) -> Result<usize, String> {
        Ok(self.records()?.iter().filter(|r| r.user == user).count())
    }

    fn append(&self, record: &GenerationRecord) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create ledger dir: {}", e))?;
        }
        let json =
            serde_json::to_string(record).map_err(|e| format!("JSON serialize error: {}", e))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| format!("cannot open ledger {}: {}", self.path.display(), e))?;
        writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))
    }
}

impl GenerationLedger for JsonlLedger {
    fn can_generate(&self, user: &str) -> bool {
        let Some(quota) = self.quota else {
            return true;
        };
        match self.count_for(user) {
            Ok(n) => n < quota as usize,
            Err(e) => {
                warn!(error = %e, "ledger unreadable, refusing generation");
                false
            }
        }
    }

    fn record_generation(
        &self,
        user: &str,
        summary: &str,
        artifact: &[u8],
        kind: ArtifactKind,
    ) -> RecordOutcome {
        let record = GenerationRecord {
            ts: now_iso8601(),
            user: user.to_string(),
            summary: summary.to_string(),
            kind,
            digest: hasher::hash_bytes(artifact),
            size: artifact.len(),
        };
        match self.append(&record) {
            Ok(()) => RecordOutcome::ok(),
            Err(e) => RecordOutcome::failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmetered() {
        let ledger = Unmetered;
        assert!(ledger.can_generate("anyone"));
        let outcome = ledger.record_generation("anyone", "x", b"bytes", ArtifactKind::Zip);
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_jsonl_records() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::in_dir(dir.path(), None);
        let outcome =
            ledger.record_generation("ops", "web-stack (production)", b"archive", ArtifactKind::TarGz);
        assert!(outcome.success);

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "ops");
        assert_eq!(records[0].kind, ArtifactKind::TarGz);
        assert_eq!(records[0].size, 7);
        assert_eq!(records[0].digest, hasher::hash_bytes(b"archive"));

        let content = std::fs::read_to_string(dir.path().join(LEDGER_FILE)).unwrap();
        assert!(content.contains("\"tar_gz\""));
    }

    #[test]
    fn test_jsonl_quota_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::in_dir(dir.path(), Some(2));
        assert!(ledger.can_generate("a"));
        ledger.record_generation("a", "1", b"x", ArtifactKind::Tree);
        ledger.record_generation("a", "2", b"x", ArtifactKind::Tree);
        assert!(!ledger.can_generate("a"));
        assert!(ledger.can_generate("b"));
        assert_eq!(ledger.count_for("a").unwrap(), 2);
    }

    #[test]
    fn test_jsonl_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::in_dir(dir.path(), None);
        ledger.record_generation("a", "1", b"x", ArtifactKind::Zip);
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(ledger.path())
            .unwrap();
        writeln!(file, "not json").unwrap();
        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_jsonl_record_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let ledger = JsonlLedger::new(blocker.join("generations.jsonl"), None);
        let outcome = ledger.record_generation("a", "1", b"x", ArtifactKind::Zip);
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
