//! Registry index.
//!
//! The [`Registry`] holds the latest version of every known package and the
//! sorted, optionally filtered index the presentation layer iterates. It is
//! loaded from the [`RegistryStore`] and rebuilt after every ingestion.
//!
//! # Example
//!
//! ```
//! use kspmod::package::Package;
//! use kspmod::registry::{IndexOptions, Registry};
//!
//! let mut foo = Package::new("Foo");
//! foo.name = "Foo".into();
//! foo.search_space = "foo laser".into();
//! foo.compatible = true;
//!
//! let mut registry = Registry::from_packages(vec![foo], IndexOptions::default());
//! assert_eq!(registry.index().len(), 1);
//! assert_eq!(registry.search("laser").len(), 1);
//! assert!(registry.search("nothing").is_empty());
//! ```

mod index;
mod installed;

pub use index::{
    build_index, filter_compatible, latest_per_identifier, IndexEntry, SearchQuery, SortField,
    SortOrder,
};
pub use installed::{is_installed, scan_installed_artifacts};

use std::collections::HashMap;

use tracing::debug;

use crate::ingest::{RegistryStore, StoreResult};
use crate::package::Package;
use crate::version::Version;

/// How the index is derived from the package map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    /// Leave incompatible packages out of the index.
    pub hide_incompatible: bool,
}

impl IndexOptions {
    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    pub fn with_hide_incompatible(mut self, hide: bool) -> Self {
        self.hide_incompatible = hide;
        self
    }
}

/// Latest-version package map plus its sorted, searchable index.
#[derive(Debug, Default)]
pub struct Registry {
    packages: HashMap<String, Package>,
    options: IndexOptions,
    /// Every indexed package, sorted.
    full: Vec<IndexEntry>,
    /// `full` narrowed by the active query.
    view: Vec<IndexEntry>,
    query: String,
}

impl Registry {
    /// Build a registry from every stored version.
    pub fn from_packages<I>(all: I, options: IndexOptions) -> Self
    where
        I: IntoIterator<Item = Package>,
    {
        let mut registry = Self {
            packages: latest_per_identifier(all),
            options,
            ..Default::default()
        };
        registry.rebuild();
        registry
    }

    /// Load from the registry store.
    pub fn load(store: &RegistryStore, options: IndexOptions) -> StoreResult<Self> {
        let all = store.load_all()?;
        debug!(versions = all.len(), "Loading registry");
        Ok(Self::from_packages(all, options))
    }

    /// Number of distinct identifiers known.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Latest version of `identifier`, indexed or not.
    pub fn package(&self, identifier: &str) -> Option<&Package> {
        self.packages.get(identifier)
    }

    /// The unfiltered latest-version map.
    pub fn packages(&self) -> &HashMap<String, Package> {
        &self.packages
    }

    /// The current view: the sorted index narrowed by the last search.
    pub fn index(&self) -> &[IndexEntry] {
        &self.view
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// The active search text (empty when none).
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Narrow the view to packages whose search text matches `query`.
    ///
    /// An empty query restores the full index. Repeating a search yields
    /// the same view.
    pub fn search(&mut self, query: &str) -> &[IndexEntry] {
        self.query = query.trim().to_string();
        self.apply_query();
        &self.view
    }

    /// Change sort field and direction; the active search is kept.
    pub fn set_sort_order(&mut self, field: SortField, order: SortOrder) {
        self.options.sort_field = field;
        self.options.sort_order = order;
        self.rebuild();
    }

    /// Show or hide incompatible packages.
    pub fn set_hide_incompatible(&mut self, hide: bool) {
        self.options.hide_incompatible = hide;
        self.rebuild();
    }

    /// Recompute `installed` for every package from on-disk artifacts.
    pub fn refresh_installed_state(&mut self, artifacts: &[String]) {
        let mut installed = 0usize;
        for package in self.packages.values_mut() {
            package.installed = is_installed(package, artifacts);
            installed += usize::from(package.installed);
        }
        debug!(
            artifacts = artifacts.len(),
            installed, "Refreshed installed state"
        );
    }

    /// Re-derive `compatible` from each stored window.
    pub fn recompute_compatibility(&mut self, game_version: &Version) {
        for package in self.packages.values_mut() {
            package.refresh_compatibility(game_version);
        }
        self.rebuild();
    }

    /// Set the `installed` flag of one package.
    pub fn set_installed(&mut self, identifier: &str, installed: bool) {
        if let Some(package) = self.packages.get_mut(identifier) {
            package.installed = installed;
        }
    }

    /// Set the `downloaded` flag of one package.
    pub fn set_downloaded(&mut self, identifier: &str, downloaded: bool) {
        if let Some(package) = self.packages.get_mut(identifier) {
            package.downloaded = downloaded;
        }
    }

    /// Installed packages, in no particular order.
    pub fn installed(&self) -> impl Iterator<Item = &Package> {
        self.packages.values().filter(|p| p.installed)
    }

    fn rebuild(&mut self) {
        self.full = if self.options.hide_incompatible {
            let visible: HashMap<String, Package> = self
                .packages
                .iter()
                .filter(|(_, p)| p.compatible)
                .map(|(k, p)| (k.clone(), p.clone()))
                .collect();
            build_index(&visible, self.options.sort_field, self.options.sort_order)
        } else {
            build_index(
                &self.packages,
                self.options.sort_field,
                self.options.sort_order,
            )
        };
        self.apply_query();
    }

    fn apply_query(&mut self) {
        if self.query.is_empty() {
            self.view = self.full.clone();
            return;
        }

        let query = SearchQuery::new(&self.query);
        let packages = &self.packages;
        self.view = self
            .full
            .iter()
            .filter(|entry| {
                packages
                    .get(&entry.identifier)
                    .is_some_and(|p| query.matches(p))
            })
            .cloned()
            .collect();
    }
}
