//! Metadata ingestion.
//!
//! Pulls the community metadata repository, normalizes every descriptor in
//! it and rewrites the registry store with the packages that came out valid.
//!
//! # Flow
//!
//! ```text
//! MetadataSource ──remote_head──► changed? ──no──► done
//!        │                            │
//!        └──────checkout (depth 1)◄───┘ yes
//!                   │
//!        enumerate *.ckan ─► rayon normalize ─► RegistryStore::replace_all
//! ```
//!
//! Git calls are blocking and run on tokio's blocking pool under a deadline.
//! The checkout lives in a temporary directory that is removed when the run
//! ends, whether it succeeded or not.

mod error;
mod ingestor;
mod source;
mod store;

pub use error::{IngestError, IngestResult};
pub use ingestor::{
    enumerate_descriptors, normalize_files, IngestReport, Ingestor, DEFAULT_GIT_TIMEOUT,
    DEFAULT_PARSE_WORKERS,
};
pub use source::{GitSource, MetadataSource, DEFAULT_BRANCH};
pub use store::{RegistryStore, StoreError, StoreResult};
