//! Backup/restore and cleanup behavior against an in-memory store
//!
//! Exercises the whole unit without a live WordPress: export, atomic
//! snapshot files, slug validation, restore, and the setup-db/cleanup
//! inverse pair.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use webp_migrator::backup::{BackupError, BackupManager};
use webp_migrator::db::{OptionStore, PostmetaRow, StoreError, StoreKind};
use webp_migrator::exec::CommandRunner;
use webp_migrator::plugin::{PluginManager, OPTION_PREFIX, POSTMETA_PREFIX};

/// Option/postmeta store backed by in-process maps
#[derive(Default)]
struct MemoryStore {
    options: Mutex<BTreeMap<String, String>>,
    postmeta: Mutex<Vec<PostmetaRow>>,
}

#[async_trait]
impl OptionStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::WpCli
    }

    async fn get_option(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.options.lock().unwrap().get(name).cloned())
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.options
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn list_options(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .options
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn delete_options(&self, prefix: &str) -> Result<u64, StoreError> {
        let mut options = self.options.lock().unwrap();
        let before = options.len();
        options.retain(|k, _| !k.starts_with(prefix));
        Ok((before - options.len()) as u64)
    }

    async fn list_postmeta(&self, prefix: &str) -> Result<Vec<PostmetaRow>, StoreError> {
        Ok(self
            .postmeta
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.meta_key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn set_postmeta(
        &self,
        post_id: u64,
        meta_key: &str,
        meta_value: &str,
    ) -> Result<(), StoreError> {
        let mut rows = self.postmeta.lock().unwrap();
        rows.retain(|r| !(r.post_id == post_id && r.meta_key == meta_key));
        rows.push(PostmetaRow {
            post_id,
            meta_key: meta_key.to_string(),
            meta_value: meta_value.to_string(),
        });
        Ok(())
    }

    async fn delete_postmeta(&self, prefix: &str) -> Result<u64, StoreError> {
        let mut rows = self.postmeta.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !r.meta_key.starts_with(prefix));
        Ok((before - rows.len()) as u64)
    }

    async fn clear_cron_events(&self, _hook_prefix: &str) -> Result<u64, StoreError> {
        Ok(0)
    }
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::default();
    {
        let mut options = store.options.lock().unwrap();
        options.insert(
            "webp_migrator_settings".to_string(),
            r#"{"quality":59,"batch_size":10,"validation":"enabled"}"#.to_string(),
        );
        options.insert("webp_migrator_db_version".to_string(), "1.0.0".to_string());
        // Foreign option that must never appear in a backup
        options.insert("siteurl".to_string(), "http://localhost:8080".to_string());
    }
    store.postmeta.lock().unwrap().push(PostmetaRow {
        post_id: 7,
        meta_key: "_webp_migrator_status".to_string(),
        meta_value: "converted".to_string(),
    });
    store
}

#[tokio::test]
async fn test_backup_then_restore_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let manager = BackupManager::new(dir.path().to_path_buf(), "webp-safe-migrator".to_string());

    let unit = manager.backup(&store, None).await.unwrap();
    assert!(unit.snapshot.exists());
    assert!(unit.archive.is_none());

    // Wipe the namespace, then restore from the snapshot.
    store.delete_options(OPTION_PREFIX).await.unwrap();
    store.delete_postmeta(POSTMETA_PREFIX).await.unwrap();
    assert!(store.list_options(OPTION_PREFIX).await.unwrap().is_empty());

    let report = manager.restore(&unit.snapshot, &store, None).await.unwrap();
    assert_eq!(report.options_applied, 2);
    assert_eq!(report.postmeta_applied, 1);
    assert!(!report.files_unpacked);

    let settings = store.get_option("webp_migrator_settings").await.unwrap();
    assert!(settings.unwrap().contains("\"quality\":59"));
    // Foreign option untouched throughout
    assert_eq!(
        store.get_option("siteurl").await.unwrap().as_deref(),
        Some("http://localhost:8080")
    );
}

#[tokio::test]
async fn test_backup_scopes_to_plugin_namespace() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let manager = BackupManager::new(dir.path().to_path_buf(), "webp-safe-migrator".to_string());

    let unit = manager.backup(&store, None).await.unwrap();
    let snap = BackupManager::read_snapshot(&unit.snapshot).unwrap();
    assert_eq!(snap.plugin_slug, "webp-safe-migrator");
    assert_eq!(snap.options.len(), 2);
    assert!(!snap.options.contains_key("siteurl"));
}

/// Store whose postmeta export always fails, as a broken WP-CLI would
struct FailingExportStore {
    inner: MemoryStore,
}

#[async_trait]
impl OptionStore for FailingExportStore {
    fn kind(&self) -> StoreKind {
        self.inner.kind()
    }

    async fn get_option(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_option(name).await
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set_option(name, value).await
    }

    async fn list_options(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.inner.list_options(prefix).await
    }

    async fn delete_options(&self, prefix: &str) -> Result<u64, StoreError> {
        self.inner.delete_options(prefix).await
    }

    async fn list_postmeta(&self, _prefix: &str) -> Result<Vec<PostmetaRow>, StoreError> {
        Err(StoreError::CommandFailed {
            context: "wp db query".to_string(),
            code: 1,
            message: "Error establishing a database connection".to_string(),
        })
    }

    async fn set_postmeta(
        &self,
        post_id: u64,
        meta_key: &str,
        meta_value: &str,
    ) -> Result<(), StoreError> {
        self.inner.set_postmeta(post_id, meta_key, meta_value).await
    }

    async fn delete_postmeta(&self, prefix: &str) -> Result<u64, StoreError> {
        self.inner.delete_postmeta(prefix).await
    }

    async fn clear_cron_events(&self, hook_prefix: &str) -> Result<u64, StoreError> {
        self.inner.clear_cron_events(hook_prefix).await
    }
}

#[tokio::test]
async fn test_failed_export_writes_no_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = FailingExportStore {
        inner: seeded_store(),
    };
    let manager = BackupManager::new(dir.path().to_path_buf(), "webp-safe-migrator".to_string());

    let err = manager.backup(&store, None).await.unwrap_err();
    assert!(matches!(err, BackupError::Store(_)));

    // All-or-nothing: the option export succeeded, but the postmeta failure
    // must leave no partial snapshot behind.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(leftovers.is_empty(), "partial backup left behind: {:?}", leftovers);
}

#[tokio::test]
async fn test_restore_refuses_foreign_slug() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();

    let writer = BackupManager::new(dir.path().to_path_buf(), "webp-safe-migrator".to_string());
    let unit = writer.backup(&store, None).await.unwrap();

    store.delete_options(OPTION_PREFIX).await.unwrap();

    let other = BackupManager::new(dir.path().to_path_buf(), "some-other-plugin".to_string());
    let err = other.restore(&unit.snapshot, &store, None).await.unwrap_err();
    assert!(matches!(err, BackupError::SlugMismatch { .. }));

    // Fail-fast: nothing was applied
    assert!(store.list_options(OPTION_PREFIX).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_backup_with_files_pairs_archive_and_manifest() {
    let dir = TempDir::new().unwrap();
    let plugin_src = TempDir::new().unwrap();
    std::fs::write(plugin_src.path().join("webp-safe-migrator.php"), "<?php").unwrap();
    std::fs::create_dir_all(plugin_src.path().join("includes")).unwrap();
    std::fs::write(plugin_src.path().join("includes/converter.php"), "<?php //").unwrap();

    let store = seeded_store();
    let manager = BackupManager::new(dir.path().to_path_buf(), "webp-safe-migrator".to_string());

    let unit = manager.backup(&store, Some(plugin_src.path())).await.unwrap();
    let archive = unit.archive.expect("archive written");
    assert!(archive.exists());

    // Both unit files are staged and renamed; no .tmp intermediates remain
    let tmp_leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
        .count();
    assert_eq!(tmp_leftovers, 0);

    let snap = BackupManager::read_snapshot(&unit.snapshot).unwrap();
    assert_eq!(snap.files.len(), 2);
    assert!(snap.files.iter().all(|f| !f.sha256.is_empty()));

    // Restore unpacks the paired archive under the plugin slug.
    let dest = TempDir::new().unwrap();
    let report = manager
        .restore(&unit.snapshot, &store, Some(dest.path()))
        .await
        .unwrap();
    assert!(report.files_unpacked);
    assert!(dest
        .path()
        .join("webp-safe-migrator/includes/converter.php")
        .exists());
}

#[tokio::test]
async fn test_latest_snapshot_picks_newest_stamp() {
    let dir = TempDir::new().unwrap();
    for stamp in ["20250101-080000", "20260301-120000", "20251231-235959"] {
        std::fs::write(
            dir.path().join(format!("snapshot-webp-safe-migrator-{}.json", stamp)),
            "{}",
        )
        .unwrap();
    }
    // Different slug must not win even with a later stamp
    std::fs::write(
        dir.path().join("snapshot-other-plugin-20270101-000000.json"),
        "{}",
    )
    .unwrap();

    let manager = BackupManager::new(dir.path().to_path_buf(), "webp-safe-migrator".to_string());
    let latest = manager.latest_snapshot().unwrap();
    assert!(latest
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .contains("20260301-120000"));
}

#[tokio::test]
async fn test_setup_db_and_cleanup_are_inverse() {
    let wp = TempDir::new().unwrap();
    let manager = PluginManager::new(
        CommandRunner::host(),
        wp.path().to_str().unwrap().to_string(),
    );
    let store = MemoryStore::default();

    let seeded = manager.setup_db(&store).await.unwrap();
    assert_eq!(seeded, store.options.lock().unwrap().len());

    // setup-db twice is idempotent
    manager.setup_db(&store).await.unwrap();
    assert_eq!(seeded, store.options.lock().unwrap().len());

    let report = manager.cleanup(&store).await.unwrap();
    assert_eq!(report.options_removed as usize, seeded);
    assert!(store.options.lock().unwrap().is_empty());

    // cleanup twice is a no-op
    let again = manager.cleanup(&store).await.unwrap();
    assert_eq!(again.options_removed, 0);
}
