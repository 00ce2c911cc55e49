//! The session facade driven by the presentation layer or the CLI.
//!
//! [`ModManager`] owns one registry, one queue, the ingestor and the
//! installer, all built from an explicit [`Settings`] value.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigFileError, Settings, SettingsSink};
use crate::descriptor::Normalizer;
use crate::ingest::{
    GitSource, IngestError, IngestReport, Ingestor, MetadataSource, RegistryStore, StoreError,
};
use crate::installer::{InstallError, Installer};
use crate::package::Package;
use crate::queue::{Queue, QueueWarning, ResolveError};
use crate::registry::{scan_installed_artifacts, IndexEntry, Registry, SortField, SortOrder};

/// Errors surfaced by the session facade.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("failed to scan installed mods in {path}: {source}")]
    Scan { path: PathBuf, source: io::Error },

    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// What one apply cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Identifiers removed.
    pub removed: Vec<String>,
    /// Identifiers installed.
    pub installed: Vec<String>,
    /// Root-relative paths deleted by removals.
    pub deleted_paths: Vec<String>,
    /// Root-relative files written by more than one installed package.
    pub overwritten_paths: Vec<String>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.installed.is_empty()
    }
}

/// A mod manager session.
pub struct ModManager {
    settings: Settings,
    registry: Registry,
    queue: Queue,
    ingestor: Ingestor,
    installer: Arc<Installer>,
    sink: Box<dyn SettingsSink>,
    cancel: CancellationToken,
}

impl ModManager {
    /// Open a session against the configured git repository and store.
    pub fn open(settings: Settings, sink: Box<dyn SettingsSink>) -> SessionResult<Self> {
        let source = Arc::new(GitSource::new(
            settings.metadata_repo_url.clone(),
            settings.metadata_branch.clone(),
        ));
        let store = Arc::new(RegistryStore::open(&settings.store_path)?);
        Self::with_parts(settings, source, store, sink)
    }

    /// Build a session from explicit collaborators.
    pub fn with_parts(
        settings: Settings,
        source: Arc<dyn MetadataSource>,
        store: Arc<RegistryStore>,
        sink: Box<dyn SettingsSink>,
    ) -> SessionResult<Self> {
        let normalizer = Normalizer::new(settings.game_version.clone());
        let ingestor = Ingestor::new(source, Arc::clone(&store), normalizer)
            .with_timeout(settings.network_timeout())
            .with_max_parse_workers(settings.max_parse_workers);
        let installer = Arc::new(Installer::new(settings.installer_config())?);

        let mut registry = Registry::load(&store, settings.index_options())?;
        registry.recompute_compatibility(&settings.game_version);

        let mut manager = Self {
            settings,
            registry,
            queue: Queue::new(),
            ingestor,
            installer,
            sink,
            cancel: CancellationToken::new(),
        };
        manager.refresh()?;
        info!(
            packages = manager.registry.len(),
            install_root = %manager.settings.install_root.display(),
            "Session opened"
        );
        Ok(manager)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The current (searched, sorted) index.
    pub fn index(&self) -> &[IndexEntry] {
        self.registry.index()
    }

    /// Latest version of a package.
    pub fn package(&self, identifier: &str) -> Option<&Package> {
        self.registry.package(identifier)
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Queue a package for install (or removal when installed).
    ///
    /// Warnings are logged and returned; errors leave the queue unchanged.
    pub fn enqueue(&mut self, identifier: &str) -> SessionResult<Vec<QueueWarning>> {
        let warnings = self.queue.enqueue(identifier, self.registry.packages())?;
        for warning in &warnings {
            warn!(identifier, warning = %warning, "Queued with warning");
        }
        Ok(warnings)
    }

    /// Drop a package (and dependencies only it required) from the queue.
    pub fn dequeue(&mut self, identifier: &str) -> bool {
        self.queue.dequeue(identifier)
    }

    pub fn search(&mut self, query: &str) -> &[IndexEntry] {
        self.registry.search(query)
    }

    pub fn set_sort_order(&mut self, field: SortField, order: SortOrder) {
        self.registry.set_sort_order(field, order);
    }

    pub fn set_hide_incompatible(&mut self, hide: bool) {
        self.registry.set_hide_incompatible(hide);
    }

    /// Token that cancels in-flight downloads and extractions.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Rescan the install root and recompute installed state.
    ///
    /// Returns the number of installed packages.
    pub fn refresh(&mut self) -> SessionResult<usize> {
        let root = &self.settings.install_root;
        let artifacts = scan_installed_artifacts(root).map_err(|source| SessionError::Scan {
            path: root.clone(),
            source,
        })?;
        self.registry.refresh_installed_state(&artifacts);
        Ok(self.registry.installed().count())
    }

    /// Re-ingest the metadata repository when it changed (or when forced).
    ///
    /// After a successful ingestion the new head is persisted through the
    /// settings sink and the registry is reloaded from the store. Returns
    /// `None` when nothing changed.
    pub async fn update_registry(&mut self, force: bool) -> SessionResult<Option<IngestReport>> {
        let known = self.settings.last_known_commit_hash.clone();
        let Some(report) = self
            .ingestor
            .update_registry(known.as_deref(), force)
            .await?
        else {
            return Ok(None);
        };

        self.sink.persist_commit_hash(&report.commit_hash)?;
        self.settings.last_known_commit_hash = Some(report.commit_hash.clone());

        let options = self.registry.options();
        let query = self.registry.query().to_string();
        self.registry = Registry::load(self.ingestor.store(), options)?;
        self.registry.recompute_compatibility(&self.settings.game_version);
        if !query.is_empty() {
            self.registry.search(&query);
        }
        if !self.queue.is_empty() {
            debug!(queued = self.queue.len(), "Clearing queue after registry update");
            self.queue.clear();
        }
        self.refresh()?;

        Ok(Some(report))
    }

    /// Apply the queue: remove, download, install.
    ///
    /// Conflicts are checked once over the whole batch before any network
    /// activity. The queue is cleared afterwards whether the batch
    /// succeeded or failed, and installed state is rescanned from disk.
    pub async fn apply_batch(&mut self) -> SessionResult<ApplyReport> {
        if self.queue.is_empty() {
            return Ok(ApplyReport::default());
        }

        let result = self.run_batch().await;

        for identifier in self.queue.install_batch().iter().map(|p| &p.identifier) {
            self.registry.set_downloaded(identifier, false);
        }
        self.queue.clear();
        self.refresh()?;

        match &result {
            Ok(report) => info!(
                installed = report.installed.len(),
                removed = report.removed.len(),
                "Batch applied"
            ),
            Err(e) => warn!(error = %e, "Batch failed"),
        }
        result
    }

    async fn run_batch(&mut self) -> SessionResult<ApplyReport> {
        self.queue.check_conflicts(self.registry.packages())?;

        let token = self.cancel.child_token();
        let mut report = ApplyReport::default();

        let removals = self.queue.removal_batch();
        if !removals.is_empty() {
            let remaining: Vec<Package> = self.registry.installed().cloned().collect();
            let installer = Arc::clone(&self.installer);
            let to_remove = removals.clone();
            report.deleted_paths = tokio::task::spawn_blocking(move || {
                let remaining: Vec<&Package> = remaining.iter().collect();
                installer.remove_packages(&to_remove, &remaining)
            })
            .await
            .map_err(|e| SessionError::Task(e.to_string()))??;

            for package in &removals {
                self.registry.set_installed(&package.identifier, false);
                report.removed.push(package.identifier.clone());
            }
        }

        let installs = self.queue.install_batch();
        if !installs.is_empty() {
            let batch = self.installer.download_batch(&installs, &token).await?;
            for package in &installs {
                self.registry.set_downloaded(&package.identifier, true);
            }

            let installed = self
                .installer
                .install_batch(batch, &installs, &token)
                .await?;
            report.installed = installed.installed;
            report.overwritten_paths = installed.overwritten;
            for identifier in &report.installed {
                self.registry.set_installed(identifier, true);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IngestResult;
    use crate::package::{InstallMatcher, InstallRule};
    use crate::version::parse_version;
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoSource;

    impl MetadataSource for NoSource {
        fn location(&self) -> &str {
            "none"
        }

        fn remote_head(&self) -> IngestResult<String> {
            Ok("unchanged".to_string())
        }

        fn checkout(&self, _dest: &Path) -> IngestResult<String> {
            panic!("no checkout expected");
        }
    }

    #[derive(Clone, Default)]
    struct MemorySink(Arc<Mutex<Vec<String>>>);

    impl SettingsSink for MemorySink {
        fn persist_commit_hash(&mut self, hash: &str) -> Result<(), ConfigFileError> {
            self.0.lock().push(hash.to_string());
            Ok(())
        }
    }

    fn pkg(id: &str, depends: &[&str]) -> Package {
        let mut p = Package::new(id);
        p.name = id.to_string();
        p.version = parse_version("1.0").unwrap();
        p.depends = depends.iter().map(|s| s.to_string()).collect();
        p.install = Some(InstallRule::new(InstallMatcher::Find(id.into()), "GameData"));
        p.window = crate::version::CompatibilityWindow::new(
            "1.0".parse().unwrap(),
            "1.12".parse().unwrap(),
        );
        p.search_space = id.to_lowercase();
        p.valid = true;
        p
    }

    fn manager(temp: &TempDir, packages: &[Package]) -> ModManager {
        let store = Arc::new(RegistryStore::open_in_memory().unwrap());
        store.replace_all(packages).unwrap();
        let settings = Settings::new(temp.path().join("ksp"), "1.8".parse().unwrap())
            .with_staging_dir(temp.path().join("staging"))
            .with_last_known_commit_hash(Some("unchanged".into()));
        ModManager::with_parts(
            settings,
            Arc::new(NoSource),
            store,
            Box::new(MemorySink::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_enqueue_expands_dependencies() {
        let temp = TempDir::new().unwrap();
        let mut mm = manager(&temp, &[pkg("A", &["B"]), pkg("B", &[])]);

        mm.enqueue("A").unwrap();

        let counts = mm.queue().counts();
        assert_eq!(counts.install, 1);
        assert_eq!(counts.dependency, 1);
        assert!(mm.dequeue("A"));
        assert!(mm.queue().is_empty());
    }

    #[test]
    fn test_installed_package_is_queued_for_removal() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("ksp/GameData/A")).unwrap();
        let mut mm = manager(&temp, &[pkg("A", &[])]);

        assert!(mm.package("A").unwrap().installed);
        mm.enqueue("A").unwrap();
        assert_eq!(mm.queue().counts().remove, 1);
    }

    #[test]
    fn test_compatibility_recomputed_on_open() {
        let temp = TempDir::new().unwrap();
        let mm = manager(&temp, &[pkg("A", &[])]);
        assert!(mm.package("A").unwrap().compatible);
        assert_eq!(mm.index().len(), 1);
    }

    #[tokio::test]
    async fn test_update_registry_skips_when_unchanged() {
        let temp = TempDir::new().unwrap();
        let mut mm = manager(&temp, &[pkg("A", &[])]);

        let report = mm.update_registry(false).await.unwrap();
        assert!(report.is_none());
        assert_eq!(mm.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_removal_cycle() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("ksp/GameData/A/Plugins")).unwrap();
        let mut mm = manager(&temp, &[pkg("A", &[])]);

        mm.enqueue("A").unwrap();
        let report = mm.apply_batch().await.unwrap();

        assert_eq!(report.removed, vec!["A".to_string()]);
        assert_eq!(report.deleted_paths, vec!["GameData/A".to_string()]);
        assert!(!mm.package("A").unwrap().installed);
        assert!(mm.queue().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_fails_before_network_and_clears_queue() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("ksp/GameData/B")).unwrap();
        let mut a = pkg("A", &[]);
        a.conflicts = vec!["B".into()];
        // Unroutable URL: any network attempt would fail with a different error.
        a.download.url = "http://127.0.0.1:9/a.zip".into();
        let mut mm = manager(&temp, &[a, pkg("B", &[])]);

        mm.enqueue("A").unwrap();
        let err = mm.apply_batch().await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::Resolve(ResolveError::ConflictDetected { .. })
        ));
        assert!(mm.queue().is_empty());
    }
}
