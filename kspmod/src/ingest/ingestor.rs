//! The ingestion pipeline: change detection, shallow checkout, parallel
//! normalization and store replacement.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::error::{IngestError, IngestResult};
use super::source::MetadataSource;
use super::store::RegistryStore;
use crate::descriptor::{Normalizer, Outcome, DESCRIPTOR_EXTENSION};
use crate::package::{Field, FieldError, Package};

/// Default deadline for each git network call.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of descriptor parse workers.
pub const DEFAULT_PARSE_WORKERS: usize = 4;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Head commit of the ingested tree.
    pub commit_hash: String,
    /// Valid packages written to the store.
    pub parsed: usize,
    /// Malformed descriptors.
    pub failed: usize,
    /// Descriptors skipped for ignorable reasons.
    pub ignored: usize,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parsed, {} failed, {} ignored at {}",
            self.parsed, self.failed, self.ignored, self.commit_hash
        )
    }
}

/// Turns a metadata source into a populated registry store.
pub struct Ingestor {
    source: Arc<dyn MetadataSource>,
    store: Arc<RegistryStore>,
    normalizer: Normalizer,
    timeout: Duration,
    max_parse_workers: usize,
}

impl Ingestor {
    /// Create an ingestor with default deadline and worker count.
    pub fn new(
        source: Arc<dyn MetadataSource>,
        store: Arc<RegistryStore>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            source,
            store,
            normalizer,
            timeout: DEFAULT_GIT_TIMEOUT,
            max_parse_workers: DEFAULT_PARSE_WORKERS,
        }
    }

    /// Set the deadline applied to each git network call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of parse worker threads (at least one).
    pub fn with_max_parse_workers(mut self, workers: usize) -> Self {
        self.max_parse_workers = workers.max(1);
        self
    }

    /// The registry store this ingestor writes to.
    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    /// Check whether the remote head differs from `last_known_hash`.
    ///
    /// Lists remote refs only; nothing is cloned.
    pub async fn check_remote_changed(&self, last_known_hash: Option<&str>) -> IngestResult<bool> {
        let source = Arc::clone(&self.source);
        let head = self
            .run_blocking("ls-remote", move || source.remote_head())
            .await?;

        let changed = last_known_hash.map_or(true, |known| known != head);
        debug!(
            location = %self.source.location(),
            head = %head,
            known = ?last_known_hash,
            changed,
            "Checked remote head"
        );
        Ok(changed)
    }

    /// Clone, parse and persist the whole metadata repository.
    pub async fn ingest(&self) -> IngestResult<IngestReport> {
        info!(location = %self.source.location(), "Ingesting metadata repository");

        let workdir = TempDir::new().map_err(|source| IngestError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        // The clone task owns the temporary directory so that a timed-out
        // clone still cleans up once it finishes.
        let source = Arc::clone(&self.source);
        let (workdir, commit_hash) = self
            .run_blocking("clone", move || {
                let head = source.checkout(&checkout_dir(workdir.path()))?;
                Ok((workdir, head))
            })
            .await?;

        let normalizer = self.normalizer.clone();
        let workers = self.max_parse_workers;
        let packages = tokio::task::spawn_blocking(move || {
            let root = checkout_dir(workdir.path());
            let files = enumerate_descriptors(&root)?;
            normalize_files(&normalizer, &files, workers)
        })
        .await
        .map_err(|e| IngestError::WorkerPool(e.to_string()))??;

        let mut report = IngestReport {
            commit_hash,
            ..Default::default()
        };
        let mut valid = Vec::with_capacity(packages.len());
        for (path, package) in packages {
            match Outcome::of(&package) {
                Outcome::Valid => {
                    report.parsed += 1;
                    valid.push(package);
                }
                Outcome::Malformed => {
                    report.failed += 1;
                    debug!(
                        path = %path.display(),
                        identifier = %package.identifier,
                        errors = ?package.errors,
                        "Malformed descriptor"
                    );
                }
                Outcome::Ignorable => report.ignored += 1,
            }
        }

        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.replace_all(&valid))
            .await
            .map_err(|e| IngestError::WorkerPool(e.to_string()))??;

        info!(
            commit = %report.commit_hash,
            parsed = report.parsed,
            failed = report.failed,
            ignored = report.ignored,
            "Ingestion complete"
        );
        Ok(report)
    }

    /// Ingest only when forced or when the remote head moved.
    ///
    /// Returns `None` when the registry is already current.
    pub async fn update_registry(
        &self,
        last_known_hash: Option<&str>,
        force: bool,
    ) -> IngestResult<Option<IngestReport>> {
        if !force && !self.check_remote_changed(last_known_hash).await? {
            info!("Metadata repository unchanged, skipping ingestion");
            return Ok(None);
        }
        self.ingest().await.map(Some)
    }

    /// Run a blocking git call on the blocking pool under the deadline.
    async fn run_blocking<T, F>(&self, operation: &'static str, f: F) -> IngestResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> IngestResult<T> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(IngestError::WorkerPool(join_error.to_string())),
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.timeout.as_secs(),
                    "Git operation timed out"
                );
                Err(IngestError::Timeout {
                    operation,
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

fn checkout_dir(workdir: &Path) -> PathBuf {
    workdir.join("metadata")
}

/// List descriptor files below `root`, recursively, in path order.
pub fn enumerate_descriptors(root: &Path) -> IngestResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        DESCRIPTOR_EXTENSION
    );

    let entries = glob::glob(&pattern).map_err(|e| IngestError::Io {
        path: root.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(IngestError::Io {
                    path,
                    source: e.into_error(),
                });
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Normalize descriptor files on a bounded rayon pool.
///
/// Results are gathered by the parallel collect; the returned order matches
/// `files`.
pub fn normalize_files(
    normalizer: &Normalizer,
    files: &[PathBuf],
    workers: usize,
) -> IngestResult<Vec<(PathBuf, Package)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("kspmod-parse-{}", i))
        .build()
        .map_err(|e| IngestError::WorkerPool(e.to_string()))?;

    debug!(files = files.len(), workers, "Normalizing descriptors");

    Ok(pool.install(|| {
        files
            .par_iter()
            .map(|path| (path.clone(), normalize_file(normalizer, path)))
            .collect()
    }))
}

fn normalize_file(normalizer: &Normalizer, path: &Path) -> Package {
    match std::fs::read_to_string(path) {
        Ok(text) => normalizer.normalize_str(&text),
        Err(e) => {
            let mut package = Package::default();
            package.errors.insert(
                Field::Document,
                FieldError::error(format!("unreadable: {}", e)),
            );
            package
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VALID: &str = r#"{
        "identifier": "Foo", "name": "Foo", "abstract": "A mod",
        "author": "Val", "license": "MIT", "version": "1.0",
        "ksp_version": "1.8", "download": "https://example.com/foo.zip",
        "install": [{ "find": "Foo", "install_to": "GameData" }]
    }"#;

    const IGNORABLE: &str = r#"{
        "identifier": "Meta", "name": "Meta", "abstract": "A metapackage",
        "author": "Val", "license": "MIT", "version": "1.0",
        "ksp_version": "1.8", "download": "https://example.com/meta.zip"
    }"#;

    /// Writes a fixed set of descriptors and counts calls.
    struct FakeSource {
        head: String,
        files: Vec<(&'static str, &'static str)>,
        head_calls: AtomicUsize,
        checkouts: AtomicUsize,
    }

    impl FakeSource {
        fn new(head: &str) -> Self {
            Self {
                head: head.to_string(),
                files: vec![
                    ("Foo/Foo-1.0.ckan", VALID),
                    ("Meta/Meta-1.0.ckan", IGNORABLE),
                    ("Bad/Bad-1.0.ckan", "[not an object]"),
                    ("README.md", "not a descriptor"),
                ],
                head_calls: AtomicUsize::new(0),
                checkouts: AtomicUsize::new(0),
            }
        }
    }

    impl MetadataSource for FakeSource {
        fn location(&self) -> &str {
            "fake://metadata"
        }

        fn remote_head(&self) -> IngestResult<String> {
            self.head_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.head.clone())
        }

        fn checkout(&self, dest: &Path) -> IngestResult<String> {
            self.checkouts.fetch_add(1, Ordering::SeqCst);
            for (rel, body) in &self.files {
                let path = dest.join(rel);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, body).unwrap();
            }
            Ok(self.head.clone())
        }
    }

    fn ingestor(source: Arc<FakeSource>) -> Ingestor {
        Ingestor::new(
            source,
            Arc::new(RegistryStore::open_in_memory().unwrap()),
            Normalizer::new("1.8".parse().unwrap()),
        )
        .with_max_parse_workers(2)
    }

    #[tokio::test]
    async fn test_ingest_counts_and_stores_valid_only() {
        let source = Arc::new(FakeSource::new("abc123"));
        let ingestor = ingestor(Arc::clone(&source));

        let report = ingestor.ingest().await.unwrap();

        assert_eq!(report.commit_hash, "abc123");
        assert_eq!(report.parsed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.ignored, 1);

        let stored = ingestor.store().load_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].identifier, "Foo");
    }

    #[tokio::test]
    async fn test_update_registry_skips_when_unchanged() {
        let source = Arc::new(FakeSource::new("abc123"));
        let ingestor = ingestor(Arc::clone(&source));

        let first = ingestor.update_registry(None, false).await.unwrap();
        let hash = first.unwrap().commit_hash;
        let second = ingestor.update_registry(Some(&hash), false).await.unwrap();

        assert!(second.is_none());
        assert_eq!(source.checkouts.load(Ordering::SeqCst), 1);
        assert_eq!(source.head_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_ingests_even_when_unchanged() {
        let source = Arc::new(FakeSource::new("abc123"));
        let ingestor = ingestor(Arc::clone(&source));

        let report = ingestor.update_registry(Some("abc123"), true).await.unwrap();

        assert!(report.is_some());
        assert_eq!(source.head_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.checkouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_remote_changed() {
        let ingestor = ingestor(Arc::new(FakeSource::new("abc123")));
        assert!(ingestor.check_remote_changed(None).await.unwrap());
        assert!(ingestor.check_remote_changed(Some("old")).await.unwrap());
        assert!(!ingestor.check_remote_changed(Some("abc123")).await.unwrap());
    }

    struct SlowSource;

    impl MetadataSource for SlowSource {
        fn location(&self) -> &str {
            "slow://metadata"
        }

        fn remote_head(&self) -> IngestResult<String> {
            std::thread::sleep(Duration::from_millis(500));
            Ok("late".to_string())
        }

        fn checkout(&self, _dest: &Path) -> IngestResult<String> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_git_call_deadline() {
        let ingestor = Ingestor::new(
            Arc::new(SlowSource),
            Arc::new(RegistryStore::open_in_memory().unwrap()),
            Normalizer::new("1.8".parse().unwrap()),
        )
        .with_timeout(Duration::from_millis(50));

        let err = ingestor.check_remote_changed(None).await.unwrap_err();
        assert!(matches!(err, IngestError::Timeout { operation: "ls-remote", .. }));
    }

    #[test]
    fn test_enumerate_descriptors_is_recursive_and_sorted() {
        let temp = TempDir::new().unwrap();
        for rel in ["b/B.ckan", "a/A.ckan", "a/deep/C.ckan", "a/notes.txt"] {
            let path = temp.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "{}").unwrap();
        }

        let files = enumerate_descriptors(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a/A.ckan", "a/deep/C.ckan", "b/B.ckan"]);
    }
}
