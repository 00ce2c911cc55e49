//! Remote metadata repository access.

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{Direction, FetchOptions, Remote};
use tracing::debug;

use super::error::{IngestError, IngestResult};

/// Branch tracked when none is configured.
pub const DEFAULT_BRANCH: &str = "master";

/// A repository of descriptor files.
///
/// Both calls are blocking; the ingestor runs them on the blocking pool
/// under a deadline.
pub trait MetadataSource: Send + Sync {
    /// Human-readable location, for logs.
    fn location(&self) -> &str;

    /// Head commit hash of the tracked branch, without fetching objects.
    fn remote_head(&self) -> IngestResult<String>;

    /// Materialize the tracked branch's head into `dest` (an empty directory)
    /// and return its commit hash.
    fn checkout(&self, dest: &Path) -> IngestResult<String>;
}

/// Git-backed metadata source.
#[derive(Debug, Clone)]
pub struct GitSource {
    url: String,
    branch: String,
}

impl GitSource {
    /// Track `branch` of the repository at `url`.
    pub fn new(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: branch.into(),
        }
    }

    /// The repository URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The tracked branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }
}

impl MetadataSource for GitSource {
    fn location(&self) -> &str {
        &self.url
    }

    fn remote_head(&self) -> IngestResult<String> {
        let mut remote = Remote::create_detached(self.url.as_str())?;
        remote.connect(Direction::Fetch)?;

        let wanted = self.branch_ref();
        let head = remote
            .list()?
            .iter()
            .find(|head| head.name() == wanted)
            .map(|head| head.oid().to_string());

        remote.disconnect()?;

        let head = head.ok_or_else(|| IngestError::BranchNotFound {
            url: self.url.clone(),
            branch: self.branch.clone(),
        })?;
        debug!(url = %self.url, branch = %self.branch, head = %head, "Listed remote head");
        Ok(head)
    }

    fn checkout(&self, dest: &Path) -> IngestResult<String> {
        let mut fetch = FetchOptions::new();
        fetch.depth(1);

        let repo = RepoBuilder::new()
            .branch(&self.branch)
            .fetch_options(fetch)
            .clone(&self.url, dest)?;

        let head = repo.head()?.peel_to_commit()?.id().to_string();
        debug!(url = %self.url, dest = %dest.display(), head = %head, "Shallow clone complete");
        Ok(head)
    }
}
