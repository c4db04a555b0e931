use crate::error::{AnalysisError, AnalysisResult};
use chrono::{NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tubesense_core::config::ModelConfig;

const BACKUP_PREFIX: &str = "version_";
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const BACKUP_STAMP_LEN: usize = 15;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS model_versions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        version_tag TEXT UNIQUE NOT NULL,
        model_files TEXT NOT NULL,
        checksums TEXT NOT NULL,
        performance_metrics TEXT,
        created_at TEXT NOT NULL,
        deployed_at TEXT,
        is_active INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT ''
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_model_versions_single_active
        ON model_versions(is_active) WHERE is_active = 1;
"#;

const VERSION_COLUMNS: &str = "id, version_tag, model_files, checksums, performance_metrics, \
     created_at, deployed_at, is_active, description";

/// Metadata recorded for one artifact file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactFile {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, RFC 3339.
    pub modified: String,
    /// Absolute path at snapshot time.
    pub path: String,
}

/// An artifact present in the artifact directory, with its checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSnapshot {
    /// Artifact file name.
    pub name: String,
    /// File metadata.
    pub file: ArtifactFile,
    /// Lowercase hex SHA-256.
    pub checksum: String,
}

/// A registered model version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelVersion {
    /// Row id.
    pub id: i64,
    /// Unique version tag.
    pub version_tag: String,
    /// Artifact metadata by file name.
    pub model_files: BTreeMap<String, ArtifactFile>,
    /// SHA-256 checksums by file name.
    pub checksums: BTreeMap<String, String>,
    /// Last recorded performance report.
    pub performance_metrics: Option<serde_json::Value>,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Last deployment time, RFC 3339.
    pub deployed_at: Option<String>,
    /// Whether this is the active version.
    pub is_active: bool,
    /// Free-form description.
    pub description: String,
}

/// Result of comparing one file against its recorded checksum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileIntegrity {
    /// Checksum matches.
    Ok,
    /// File exists but differs.
    Mismatch,
    /// File is gone.
    Missing,
}

/// Integrity status of one artifact file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileCheck {
    /// Artifact file name.
    pub file: String,
    /// Checksum recorded at version creation.
    pub expected: String,
    /// Checksum of the file on disk, when present.
    pub actual: Option<String>,
    /// Comparison outcome.
    pub status: FileIntegrity,
}

/// Integrity report for a version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Checked version tag.
    pub version_tag: String,
    /// Per-file results.
    pub files: Vec<FileCheck>,
    /// True when every file matched.
    pub ok: bool,
}

struct VersionRow {
    id: i64,
    version_tag: String,
    model_files: String,
    checksums: String,
    performance_metrics: Option<String>,
    created_at: String,
    deployed_at: Option<String>,
    is_active: bool,
    description: String,
}

impl VersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version_tag: row.get(1)?,
            model_files: row.get(2)?,
            checksums: row.get(3)?,
            performance_metrics: row.get(4)?,
            created_at: row.get(5)?,
            deployed_at: row.get(6)?,
            is_active: row.get::<_, i64>(7)? != 0,
            description: row.get(8)?,
        })
    }

    fn into_version(self) -> AnalysisResult<ModelVersion> {
        Ok(ModelVersion {
            id: self.id,
            version_tag: self.version_tag,
            model_files: serde_json::from_str(&self.model_files)?,
            checksums: serde_json::from_str(&self.checksums)?,
            performance_metrics: self
                .performance_metrics
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: self.created_at,
            deployed_at: self.deployed_at,
            is_active: self.is_active,
            description: self.description,
        })
    }
}

/// Registry of model artifact snapshots with a single active version.
pub struct ModelVersionManager {
    config: ModelConfig,
    conn: Connection,
}

impl ModelVersionManager {
    /// Open the registry database and backup directory named by the configuration.
    pub fn open(config: ModelConfig) -> AnalysisResult<Self> {
        std::fs::create_dir_all(&config.backup_dir)?;
        if let Some(parent) = config.registry_db.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.registry_db)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { config, conn })
    }

    /// Configuration the manager was opened with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Artifacts currently present in the artifact directory.
    pub fn current_artifacts(&self) -> AnalysisResult<Vec<ArtifactSnapshot>> {
        let mut snapshots = Vec::new();
        for name in self.config.tracked_files() {
            let path = self.config.artifact_dir.join(&name);
            if !path.is_file() {
                continue;
            }
            let metadata = std::fs::metadata(&path)?;
            let modified = metadata
                .modified()
                .map(|t| chrono::DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default();
            let absolute = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            snapshots.push(ArtifactSnapshot {
                checksum: checksum_file(&path)?,
                file: ArtifactFile {
                    size: metadata.len(),
                    modified,
                    path: absolute.to_string_lossy().into_owned(),
                },
                name,
            });
        }
        Ok(snapshots)
    }

    /// Snapshot the current artifacts as a new version.
    pub fn create_version(&self, tag: &str, description: &str) -> AnalysisResult<ModelVersion> {
        validate_tag(tag)?;
        if self.get_version(tag)?.is_some() {
            return Err(AnalysisError::AlreadyExists(format!("version {}", tag)));
        }
        let artifacts = self.current_artifacts()?;
        if artifacts.is_empty() {
            return Err(AnalysisError::InvalidInput(format!(
                "no model artifacts found in {}",
                self.config.artifact_dir.display()
            )));
        }

        let model_files: BTreeMap<_, _> = artifacts
            .iter()
            .map(|a| (a.name.clone(), a.file.clone()))
            .collect();
        let checksums: BTreeMap<_, _> = artifacts
            .iter()
            .map(|a| (a.name.clone(), a.checksum.clone()))
            .collect();
        let model_files = serde_json::to_string(&model_files)?;
        let checksums = serde_json::to_string(&checksums)?;

        let now = Utc::now();
        let created_at = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let backup = self.config.backup_dir.join(format!(
            "{}{}_{}",
            BACKUP_PREFIX,
            tag,
            now.format(BACKUP_STAMP_FORMAT)
        ));
        if let Err(e) = copy_artifacts(&artifacts, &backup) {
            let _ = std::fs::remove_dir_all(&backup);
            return Err(e);
        }

        if let Err(e) = self.conn.execute(
            "INSERT INTO model_versions (version_tag, model_files, checksums, created_at, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tag, model_files, checksums, created_at, description],
        ) {
            warn!("Registering version {} failed, removing backup: {}", tag, e);
            let _ = std::fs::remove_dir_all(&backup);
            return Err(e.into());
        }

        info!(
            "Created model version {} with {} files at {}",
            tag,
            artifacts.len(),
            backup.display()
        );
        self.get_version(tag)?
            .ok_or_else(|| AnalysisError::Registry(format!("version {} vanished after insert", tag)))
    }

    /// Look up a version by tag.
    pub fn get_version(&self, tag: &str) -> AnalysisResult<Option<ModelVersion>> {
        let sql = format!(
            "SELECT {} FROM model_versions WHERE version_tag = ?1",
            VERSION_COLUMNS
        );
        self.conn
            .query_row(&sql, [tag], VersionRow::from_row)
            .optional()?
            .map(VersionRow::into_version)
            .transpose()
    }

    /// Mark a version active. Artifact files are left untouched.
    pub fn deploy_version(&mut self, tag: &str) -> AnalysisResult<()> {
        self.activate(tag)?;
        info!("Deployed model version {}", tag);
        Ok(())
    }

    fn activate(&mut self, tag: &str) -> AnalysisResult<()> {
        let deployed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: bool = tx
            .query_row(
                "SELECT COUNT(*) FROM model_versions WHERE version_tag = ?1",
                [tag],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)?;
        if !exists {
            return Err(AnalysisError::NotFound(format!("version {}", tag)));
        }
        tx.execute("UPDATE model_versions SET is_active = 0 WHERE is_active = 1", [])?;
        tx.execute(
            "UPDATE model_versions SET is_active = 1, deployed_at = ?1 WHERE version_tag = ?2",
            params![deployed_at, tag],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Restore a version's backed-up files into the artifact directory and activate it.
    pub fn rollback_to_version(&mut self, tag: &str) -> AnalysisResult<()> {
        if self.get_version(tag)?.is_none() {
            return Err(AnalysisError::NotFound(format!("version {}", tag)));
        }
        let backup = self
            .latest_backup(tag)?
            .ok_or_else(|| AnalysisError::NotFound(format!("backup for version {}", tag)))?;

        std::fs::create_dir_all(&self.config.artifact_dir)?;
        let mut restored = 0usize;
        for entry in std::fs::read_dir(&backup)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            std::fs::copy(&path, self.config.artifact_dir.join(entry.file_name()))?;
            restored += 1;
        }

        self.activate(tag)?;
        info!(
            "Rolled back to model version {} ({} files from {})",
            tag,
            restored,
            backup.display()
        );
        Ok(())
    }

    /// Every backup directory belonging to exactly `tag`, with its timestamp suffix.
    fn backups_for(&self, tag: &str) -> AnalysisResult<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        if !self.config.backup_dir.exists() {
            return Ok(found);
        }
        for entry in std::fs::read_dir(&self.config.backup_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some((backup_tag, stamp)) = parse_backup_name(&name) {
                if backup_tag == tag {
                    found.push((stamp.to_string(), entry.path()));
                }
            }
        }
        Ok(found)
    }

    fn latest_backup(&self, tag: &str) -> AnalysisResult<Option<PathBuf>> {
        Ok(self
            .backups_for(tag)?
            .into_iter()
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, path)| path))
    }

    /// All versions, newest first.
    pub fn list_versions(&self) -> AnalysisResult<Vec<ModelVersion>> {
        let sql = format!(
            "SELECT {} FROM model_versions ORDER BY created_at DESC, id DESC",
            VERSION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], VersionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(VersionRow::into_version).collect()
    }

    /// Tag of the active version.
    pub fn current_version(&self) -> AnalysisResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT version_tag FROM model_versions WHERE is_active = 1",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Compare the live artifact files against the checksums recorded for `tag`.
    pub fn validate_version_integrity(&self, tag: &str) -> AnalysisResult<IntegrityReport> {
        let version = self
            .get_version(tag)?
            .ok_or_else(|| AnalysisError::NotFound(format!("version {}", tag)))?;

        let mut files = Vec::with_capacity(version.checksums.len());
        for (name, expected) in &version.checksums {
            let path = self.config.artifact_dir.join(name);
            let check = if path.is_file() {
                let actual = checksum_file(&path)?;
                let status = if &actual == expected {
                    FileIntegrity::Ok
                } else {
                    warn!("Checksum mismatch for {}", name);
                    FileIntegrity::Mismatch
                };
                FileCheck {
                    file: name.clone(),
                    expected: expected.clone(),
                    actual: Some(actual),
                    status,
                }
            } else {
                warn!("Artifact {} not found", name);
                FileCheck {
                    file: name.clone(),
                    expected: expected.clone(),
                    actual: None,
                    status: FileIntegrity::Missing,
                }
            };
            files.push(check);
        }

        let ok = files.iter().all(|f| f.status == FileIntegrity::Ok);
        Ok(IntegrityReport {
            version_tag: version.version_tag,
            files,
            ok,
        })
    }

    /// Delete inactive versions beyond the newest `keep`, returning the removed tags.
    ///
    /// Registry rows are deleted in one transaction before any backup directory is
    /// touched, so a failed cleanup never leaves rows without their backups.
    pub fn cleanup_old_versions(&mut self, keep: usize) -> AnalysisResult<Vec<String>> {
        let inactive = {
            let mut stmt = self.conn.prepare(
                "SELECT version_tag FROM model_versions WHERE is_active = 0
                 ORDER BY created_at DESC, id DESC",
            )?;
            let tags = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tags
        };
        let stale: Vec<String> = inactive.into_iter().skip(keep).collect();
        if stale.is_empty() {
            return Ok(stale);
        }

        let mut backups = Vec::new();
        for tag in &stale {
            backups.extend(self.backups_for(tag)?.into_iter().map(|(_, path)| path));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for tag in &stale {
            tx.execute(
                "DELETE FROM model_versions WHERE version_tag = ?1 AND is_active = 0",
                [tag],
            )?;
        }
        tx.commit()?;

        for path in backups {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!("Failed to remove backup {}: {}", path.display(), e);
            }
        }
        for tag in &stale {
            info!("Removed model version {}", tag);
        }
        Ok(stale)
    }

    /// Store a performance report on a version.
    pub fn record_metrics(&self, tag: &str, metrics: &serde_json::Value) -> AnalysisResult<()> {
        let updated = self.conn.execute(
            "UPDATE model_versions SET performance_metrics = ?1 WHERE version_tag = ?2",
            params![serde_json::to_string(metrics)?, tag],
        )?;
        if updated == 0 {
            return Err(AnalysisError::NotFound(format!("version {}", tag)));
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of a file, read in 4 KiB chunks.
pub fn checksum_file(path: &Path) -> AnalysisResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn validate_tag(tag: &str) -> AnalysisResult<()> {
    if tag.is_empty() {
        return Err(AnalysisError::InvalidInput("version tag must not be empty".to_string()));
    }
    if let Some(c) = tag
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-')))
    {
        return Err(AnalysisError::InvalidInput(format!(
            "version tag '{}' contains invalid character '{}'",
            tag, c
        )));
    }
    Ok(())
}

fn copy_artifacts(artifacts: &[ArtifactSnapshot], dest: &Path) -> AnalysisResult<()> {
    std::fs::create_dir_all(dest)?;
    for artifact in artifacts {
        std::fs::copy(&artifact.file.path, dest.join(&artifact.name))?;
    }
    Ok(())
}

/// Split `version_<tag>_<YYYYmmdd_HHMMSS>` into tag and timestamp.
fn parse_backup_name(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix(BACKUP_PREFIX)?;
    if rest.len() < BACKUP_STAMP_LEN + 2 || !rest.is_char_boundary(rest.len() - BACKUP_STAMP_LEN) {
        return None;
    }
    let (head, stamp) = rest.split_at(rest.len() - BACKUP_STAMP_LEN);
    let tag = head.strip_suffix('_')?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP_FORMAT).ok()?;
    Some((tag, stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        config: ModelConfig,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ModelConfig::default();
        config.artifact_dir = dir.path().join("models");
        config.backup_dir = dir.path().join("backups");
        config.registry_db = dir.path().join("registry.db");
        std::fs::create_dir_all(&config.artifact_dir).expect("artifact dir");
        std::fs::write(config.pipeline_path(), b"pipeline v1").expect("write pipeline");
        Fixture { _dir: dir, config }
    }

    #[test]
    fn checksum_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            checksum_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn create_version_snapshots_present_artifacts() {
        let fx = fixture();
        let manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        let version = manager.create_version("v1.0", "first").unwrap();

        assert_eq!(version.version_tag, "v1.0");
        assert!(!version.is_active);
        assert_eq!(version.model_files.len(), 1);
        assert!(version.checksums.contains_key(&fx.config.pipeline_file));
        assert_eq!(manager.backups_for("v1.0").unwrap().len(), 1);
    }

    #[test]
    fn create_version_rejects_bad_tags_and_duplicates() {
        let fx = fixture();
        let manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        assert!(matches!(
            manager.create_version("", "x"),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            manager.create_version("../evil", "x"),
            Err(AnalysisError::InvalidInput(_))
        ));
        manager.create_version("v1", "x").unwrap();
        assert!(matches!(
            manager.create_version("v1", "again"),
            Err(AnalysisError::AlreadyExists(_))
        ));
    }

    #[test]
    fn create_version_requires_artifacts() {
        let fx = fixture();
        std::fs::remove_file(fx.config.pipeline_path()).unwrap();
        let manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        assert!(manager.create_version("v1", "").is_err());
        assert!(manager.list_versions().unwrap().is_empty());
    }

    #[test]
    fn deploy_keeps_a_single_active_version() {
        let fx = fixture();
        let mut manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        manager.create_version("v1", "").unwrap();
        manager.create_version("v2", "").unwrap();

        manager.deploy_version("v1").unwrap();
        manager.deploy_version("v2").unwrap();

        assert_eq!(manager.current_version().unwrap().as_deref(), Some("v2"));
        let active: Vec<_> = manager
            .list_versions()
            .unwrap()
            .into_iter()
            .filter(|v| v.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert!(active[0].deployed_at.is_some());
        assert!(matches!(
            manager.deploy_version("missing"),
            Err(AnalysisError::NotFound(_))
        ));
    }

    #[test]
    fn list_versions_is_newest_first() {
        let fx = fixture();
        let manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        for tag in ["a", "b", "c"] {
            manager.create_version(tag, "").unwrap();
        }
        let tags: Vec<_> = manager
            .list_versions()
            .unwrap()
            .into_iter()
            .map(|v| v.version_tag)
            .collect();
        assert_eq!(tags, vec!["c", "b", "a"]);
    }

    #[test]
    fn rollback_restores_files_and_activates() {
        let fx = fixture();
        let mut manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        manager.create_version("v1", "").unwrap();
        std::fs::write(fx.config.pipeline_path(), b"pipeline v2").unwrap();
        manager.create_version("v2", "").unwrap();
        manager.deploy_version("v2").unwrap();

        manager.rollback_to_version("v1").unwrap();

        assert_eq!(std::fs::read(fx.config.pipeline_path()).unwrap(), b"pipeline v1");
        assert_eq!(manager.current_version().unwrap().as_deref(), Some("v1"));
        assert!(manager.validate_version_integrity("v1").unwrap().ok);
    }

    #[test]
    fn rollback_does_not_match_tag_prefixes() {
        let fx = fixture();
        let mut manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        manager.create_version("v1", "").unwrap();
        manager.create_version("v1_2", "").unwrap();
        for (_, path) in manager.backups_for("v1").unwrap() {
            std::fs::remove_dir_all(path).unwrap();
        }

        assert!(matches!(
            manager.rollback_to_version("v1"),
            Err(AnalysisError::NotFound(_))
        ));
        assert_eq!(manager.backups_for("v1_2").unwrap().len(), 1);
    }

    #[test]
    fn parse_backup_name_splits_tag_and_stamp() {
        assert_eq!(
            parse_backup_name("version_v1_2_20240102_030405"),
            Some(("v1_2", "20240102_030405"))
        );
        assert_eq!(parse_backup_name("version_v1_notastamp0000"), None);
        assert_eq!(parse_backup_name("backup_v1_20240102_030405"), None);
    }

    #[test]
    fn integrity_reports_mismatch_and_missing() {
        let fx = fixture();
        let mut config = fx.config.clone();
        config.optional_files = vec!["tokenizer.json".to_string()];
        std::fs::write(config.artifact_dir.join("tokenizer.json"), b"{}").unwrap();
        let manager = ModelVersionManager::open(config.clone()).unwrap();
        manager.create_version("v1", "").unwrap();

        std::fs::write(config.pipeline_path(), b"tampered").unwrap();
        std::fs::remove_file(config.artifact_dir.join("tokenizer.json")).unwrap();

        let report = manager.validate_version_integrity("v1").unwrap();
        assert!(!report.ok);
        let status: BTreeMap<_, _> = report
            .files
            .iter()
            .map(|f| (f.file.as_str(), f.status))
            .collect();
        assert_eq!(status[config.pipeline_file.as_str()], FileIntegrity::Mismatch);
        assert_eq!(status["tokenizer.json"], FileIntegrity::Missing);
        assert!(manager.validate_version_integrity("nope").is_err());
    }

    #[test]
    fn cleanup_keeps_active_and_newest_inactive() {
        let fx = fixture();
        let mut manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        for tag in ["v1", "v2", "v3", "v4"] {
            manager.create_version(tag, "").unwrap();
        }
        manager.deploy_version("v1").unwrap();

        let removed = manager.cleanup_old_versions(1).unwrap();

        assert_eq!(removed, vec!["v3".to_string(), "v2".to_string()]);
        let remaining: Vec<_> = manager
            .list_versions()
            .unwrap()
            .into_iter()
            .map(|v| v.version_tag)
            .collect();
        assert_eq!(remaining, vec!["v4", "v1"]);
        assert!(manager.backups_for("v2").unwrap().is_empty());
    }

    #[test]
    fn failed_cleanup_keeps_rows_and_backups() {
        let fx = fixture();
        let mut manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        for tag in ["v1", "v2", "v3"] {
            manager.create_version(tag, "").unwrap();
        }
        manager
            .conn
            .execute_batch(
                "CREATE TRIGGER block_delete BEFORE DELETE ON model_versions
                 BEGIN SELECT RAISE(ABORT, 'registry locked'); END;",
            )
            .unwrap();

        assert!(manager.cleanup_old_versions(1).is_err());
        assert_eq!(manager.list_versions().unwrap().len(), 3);
        for tag in ["v1", "v2", "v3"] {
            assert_eq!(manager.backups_for(tag).unwrap().len(), 1);
        }
    }

    #[test]
    fn failed_registration_removes_backup() {
        let fx = fixture();
        let manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        manager
            .conn
            .execute_batch(
                "CREATE TRIGGER block_insert BEFORE INSERT ON model_versions
                 BEGIN SELECT RAISE(ABORT, 'registry locked'); END;",
            )
            .unwrap();

        assert!(manager.create_version("v1", "").is_err());
        assert!(manager.backups_for("v1").unwrap().is_empty());
        let leftover = std::fs::read_dir(&fx.config.backup_dir).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn registry_rejects_a_second_active_row() {
        let fx = fixture();
        let mut manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        manager.create_version("v1", "").unwrap();
        manager.create_version("v2", "").unwrap();
        manager.deploy_version("v1").unwrap();

        let second = manager.conn.execute(
            "UPDATE model_versions SET is_active = 1 WHERE version_tag = 'v2'",
            [],
        );
        assert!(second.is_err());
        assert_eq!(manager.current_version().unwrap().as_deref(), Some("v1"));
    }

    #[test]
    fn record_metrics_round_trips_json() {
        let fx = fixture();
        let manager = ModelVersionManager::open(fx.config.clone()).unwrap();
        manager.create_version("v1", "").unwrap();
        let metrics = serde_json::json!({"accuracy": {"value": 0.9}});
        manager.record_metrics("v1", &metrics).unwrap();
        let version = manager.get_version("v1").unwrap().unwrap();
        assert_eq!(version.performance_metrics, Some(metrics));
        assert!(manager.record_metrics("v9", &serde_json::json!({})).is_err());
    }
}
