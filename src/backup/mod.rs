//! Backup and restore of plugin state
//!
//! One backup unit is a database snapshot (JSON) plus an optional plugin
//! files archive (tar.gz), sharing a single timestamp stamp so a restore
//! always reunites a consistent files+data pair.
//!
//! Writes are all-or-nothing: the snapshot is assembled in memory, written
//! to a temp file, and renamed into place. If exporting any category fails,
//! no file appears on disk. Restores validate the recorded plugin slug
//! before touching anything and fail fast on a mismatch.

pub mod snapshot;

pub use snapshot::{ManifestEntry, Snapshot};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{OptionStore, StoreError};
use crate::plugin::{files, OPTION_PREFIX, POSTMETA_PREFIX};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Files(#[from] files::FilesError),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot belongs to a different plugin; nothing was restored
    #[error("snapshot is for plugin '{snapshot_slug}' but the target is '{target_slug}'")]
    SlugMismatch {
        snapshot_slug: String,
        target_slug: String,
    },

    #[error("no snapshots found under {0}")]
    NoSnapshots(PathBuf),
}

/// Paths making up one backup unit
#[derive(Debug, Clone)]
pub struct BackupUnit {
    pub snapshot: PathBuf,
    pub archive: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub options_applied: u64,
    pub postmeta_applied: u64,
    pub files_unpacked: bool,
}

/// Creates and applies backup units for one plugin
pub struct BackupManager {
    backup_dir: PathBuf,
    slug: String,
}

/// Default backup root under the user's local data directory
pub fn default_backup_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("webp-migrator")
        .join("backups")
}

impl BackupManager {
    pub fn new(backup_dir: PathBuf, slug: String) -> Self {
        Self { backup_dir, slug }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Exports all namespaced options and postmeta (and, when a local plugin
    /// tree is given, its files) into a new backup unit.
    pub async fn backup(
        &self,
        store: &dyn OptionStore,
        plugin_files: Option<&Path>,
    ) -> Result<BackupUnit, BackupError> {
        // Export both categories before writing anything
        let options = store.list_options(OPTION_PREFIX).await?;
        let postmeta = store.list_postmeta(POSTMETA_PREFIX).await?;
        let mut snap = Snapshot::new(self.slug.clone(), options, postmeta);

        fs::create_dir_all(&self.backup_dir).map_err(|source| BackupError::Io {
            path: self.backup_dir.clone(),
            source,
        })?;

        let archive = match plugin_files {
            Some(dir) => {
                snap.files = self.build_manifest(dir)?;
                Some(self.write_archive(dir, &snap.stamp)?)
            }
            None => None,
        };

        let snapshot_path = self.write_snapshot(&snap)?;

        info!(
            snapshot = %snapshot_path.display(),
            options = snap.options.len(),
            postmeta = snap.postmeta.len(),
            files = snap.files.len(),
            "Backup written"
        );

        Ok(BackupUnit {
            snapshot: snapshot_path,
            archive,
        })
    }

    fn build_manifest(&self, dir: &Path) -> Result<Vec<ManifestEntry>, BackupError> {
        let mut manifest = Vec::new();
        for rel in files::list_files(dir)? {
            let full = dir.join(&rel);
            let sha256 = snapshot::file_sha256(&full).map_err(|source| BackupError::Io {
                path: full.clone(),
                source,
            })?;
            manifest.push(ManifestEntry {
                path: rel.to_string_lossy().replace('\\', "/"),
                sha256,
            });
        }
        Ok(manifest)
    }

    fn write_archive(&self, dir: &Path, stamp: &str) -> Result<PathBuf, BackupError> {
        let path = self
            .backup_dir
            .join(format!("files-{}-{}.tar.gz", self.slug, stamp));
        let tmp = path.with_extension("gz.tmp");
        let file = File::create(&tmp).map_err(|source| BackupError::Io {
            path: tmp.clone(),
            source,
        })?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let io_err = |source| BackupError::Io {
            path: tmp.clone(),
            source,
        };
        builder.append_dir_all(&self.slug, dir).map_err(io_err)?;
        let encoder = builder.into_inner().map_err(io_err)?;
        encoder.finish().map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn write_snapshot(&self, snap: &Snapshot) -> Result<PathBuf, BackupError> {
        let path = self
            .backup_dir
            .join(format!("snapshot-{}-{}.json", self.slug, snap.stamp));
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(snap).map_err(|source| BackupError::Malformed {
            path: path.clone(),
            source,
        })?;
        fs::write(&tmp, json).map_err(|source| BackupError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Most recent snapshot for this plugin, by the sortable stamp in its name
    pub fn latest_snapshot(&self) -> Result<PathBuf, BackupError> {
        let prefix = format!("snapshot-{}-", self.slug);
        let mut snapshots: Vec<PathBuf> = fs::read_dir(&self.backup_dir)
            .map_err(|source| BackupError::Io {
                path: self.backup_dir.clone(),
                source,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&prefix) && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect();

        snapshots.sort();
        snapshots
            .pop()
            .ok_or_else(|| BackupError::NoSnapshots(self.backup_dir.clone()))
    }

    pub fn read_snapshot(path: &Path) -> Result<Snapshot, BackupError> {
        let contents = fs::read_to_string(path).map_err(|source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| BackupError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Re-applies a snapshot's options and postmeta, and unpacks the paired
    /// files archive when it exists. The slug check happens before any
    /// mutation; a mismatch restores nothing.
    pub async fn restore(
        &self,
        snapshot_path: &Path,
        store: &dyn OptionStore,
        files_dest: Option<&Path>,
    ) -> Result<RestoreReport, BackupError> {
        let snap = Self::read_snapshot(snapshot_path)?;

        if snap.plugin_slug != self.slug {
            return Err(BackupError::SlugMismatch {
                snapshot_slug: snap.plugin_slug,
                target_slug: self.slug.clone(),
            });
        }

        let mut report = RestoreReport::default();

        for (name, value) in &snap.options {
            store.set_option(name, value).await?;
            report.options_applied += 1;
        }
        for row in &snap.postmeta {
            store
                .set_postmeta(row.post_id, &row.meta_key, &row.meta_value)
                .await?;
            report.postmeta_applied += 1;
        }

        if let Some(dest) = files_dest {
            let archive = self
                .backup_dir
                .join(format!("files-{}-{}.tar.gz", self.slug, snap.stamp));
            if archive.exists() {
                self.unpack_archive(&archive, dest)?;
                report.files_unpacked = true;
            } else {
                warn!(
                    archive = %archive.display(),
                    "Snapshot has no paired files archive; database restored only"
                );
            }
        }

        info!(
            snapshot = %snapshot_path.display(),
            options = report.options_applied,
            postmeta = report.postmeta_applied,
            "Restore applied"
        );
        Ok(report)
    }

    fn unpack_archive(&self, archive: &Path, dest: &Path) -> Result<(), BackupError> {
        let file = File::open(archive).map_err(|source| BackupError::Io {
            path: archive.to_path_buf(),
            source,
        })?;
        let mut tar = tar::Archive::new(GzDecoder::new(file));
        tar.unpack(dest).map_err(|source| BackupError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}
