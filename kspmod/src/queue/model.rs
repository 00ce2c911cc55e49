//! Queue model and dependency expansion.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, info, warn};

use super::conflicts::check_conflicts;
use super::error::{ResolveError, ResolveResult};
use crate::package::Package;

/// What will happen to one identifier when the queue is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState {
    /// Uninstall.
    Remove,
    /// Install, requested directly. Queued packages that also depend on it
    /// are kept in `required_by`.
    Install { required_by: BTreeSet<String> },
    /// Install, pulled in by the listed packages.
    Dependency { required_by: BTreeSet<String> },
}

impl QueueState {
    /// The bucket this state belongs to.
    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Remove => Bucket::Remove,
            Self::Install { .. } => Bucket::Install,
            Self::Dependency { .. } => Bucket::Dependency,
        }
    }

    /// Queued packages that depend on this one.
    pub fn required_by(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Remove => None,
            Self::Install { required_by } | Self::Dependency { required_by } => Some(required_by),
        }
    }

    fn required_by_mut(&mut self) -> Option<&mut BTreeSet<String>> {
        match self {
            Self::Remove => None,
            Self::Install { required_by } | Self::Dependency { required_by } => Some(required_by),
        }
    }
}

/// Bucket views over the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Remove,
    Install,
    Dependency,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove => write!(f, "remove"),
            Self::Install => write!(f, "install"),
            Self::Dependency => write!(f, "dependency"),
        }
    }
}

/// A queued identifier: its state and the package as seen at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub state: QueueState,
    pub package: Package,
}

/// Non-fatal findings of an enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueWarning {
    /// The requested package does not support the installed game version.
    Incompatible { identifier: String },
    /// A pulled-in dependency does not support the installed game version.
    DependencyIncompatible {
        identifier: String,
        required_by: String,
    },
    /// A dependency is currently queued for removal.
    DependencyQueuedForRemoval {
        identifier: String,
        required_by: String,
    },
}

impl fmt::Display for QueueWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incompatible { identifier } => {
                write!(f, "{} is not compatible with the installed game version", identifier)
            }
            Self::DependencyIncompatible {
                identifier,
                required_by,
            } => write!(
                f,
                "{} (required by {}) is not compatible with the installed game version",
                identifier, required_by
            ),
            Self::DependencyQueuedForRemoval {
                identifier,
                required_by,
            } => write!(
                f,
                "{} is required by {} but is queued for removal",
                identifier, required_by
            ),
        }
    }
}

/// Per-bucket counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub remove: usize,
    pub install: usize,
    pub dependency: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.remove + self.install + self.dependency
    }
}

/// Pending install/remove requests, one state per identifier.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    items: BTreeMap<String, QueueItem>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, identifier: &str) -> Option<&QueueItem> {
        self.items.get(identifier)
    }

    pub fn state(&self, identifier: &str) -> Option<&QueueState> {
        self.items.get(identifier).map(|item| &item.state)
    }

    /// All items, ordered by identifier.
    pub fn items(&self) -> impl Iterator<Item = (&str, &QueueItem)> {
        self.items.iter().map(|(id, item)| (id.as_str(), item))
    }

    /// Packages in one bucket, ordered by identifier.
    pub fn bucket(&self, bucket: Bucket) -> Vec<&Package> {
        self.items
            .values()
            .filter(|item| item.state.bucket() == bucket)
            .map(|item| &item.package)
            .collect()
    }

    pub fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for item in self.items.values() {
            match item.state.bucket() {
                Bucket::Remove => counts.remove += 1,
                Bucket::Install => counts.install += 1,
                Bucket::Dependency => counts.dependency += 1,
            }
        }
        counts
    }

    /// Everything that will be installed: direct requests and dependencies.
    pub fn install_batch(&self) -> Vec<Package> {
        self.items
            .values()
            .filter(|item| !matches!(item.state, QueueState::Remove))
            .map(|item| item.package.clone())
            .collect()
    }

    /// Everything that will be removed.
    pub fn removal_batch(&self) -> Vec<Package> {
        self.bucket(Bucket::Remove).into_iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Queue `identifier` for install or removal.
    ///
    /// Installed packages are queued for removal. Anything else is queued for
    /// install and its dependencies are expanded transitively against
    /// `packages` (the latest-version map). On error the queue is unchanged.
    pub fn enqueue(
        &mut self,
        identifier: &str,
        packages: &HashMap<String, Package>,
    ) -> ResolveResult<Vec<QueueWarning>> {
        let package = packages
            .get(identifier)
            .ok_or_else(|| ResolveError::UnknownPackage {
                identifier: identifier.to_string(),
            })?;

        if package.installed {
            self.items.insert(
                identifier.to_string(),
                QueueItem {
                    state: QueueState::Remove,
                    package: package.clone(),
                },
            );
            info!(identifier, "Queued for removal");
            return Ok(Vec::new());
        }

        let mut staged = self.items.clone();
        let mut warnings = Vec::new();

        if !package.compatible {
            warnings.push(QueueWarning::Incompatible {
                identifier: identifier.to_string(),
            });
        }

        // A promoted dependency keeps its requesters.
        let required_by = staged
            .get(identifier)
            .and_then(|item| item.state.required_by())
            .cloned()
            .unwrap_or_default();
        staged.insert(
            identifier.to_string(),
            QueueItem {
                state: QueueState::Install { required_by },
                package: package.clone(),
            },
        );

        let mut pending: Vec<(String, String)> = package
            .depends
            .iter()
            .map(|dep| (dep.clone(), identifier.to_string()))
            .collect();
        let mut expanded: BTreeSet<String> = BTreeSet::from([identifier.to_string()]);

        while let Some((dep_id, parent)) = pending.pop() {
            let dep = packages
                .get(&dep_id)
                .ok_or_else(|| ResolveError::UnresolvedDependency {
                    identifier: dep_id.clone(),
                    required_by: parent.clone(),
                })?;

            if dep.installed {
                continue;
            }

            match staged.get_mut(&dep_id).map(|item| &mut item.state) {
                Some(QueueState::Remove) => {
                    warnings.push(QueueWarning::DependencyQueuedForRemoval {
                        identifier: dep_id.clone(),
                        required_by: parent.clone(),
                    });
                    continue;
                }
                Some(QueueState::Install { required_by })
                | Some(QueueState::Dependency { required_by }) => {
                    required_by.insert(parent.clone());
                }
                None => {
                    staged.insert(
                        dep_id.clone(),
                        QueueItem {
                            state: QueueState::Dependency {
                                required_by: BTreeSet::from([parent.clone()]),
                            },
                            package: dep.clone(),
                        },
                    );
                }
            }

            if !expanded.insert(dep_id.clone()) {
                continue;
            }

            if !dep.compatible {
                warnings.push(QueueWarning::DependencyIncompatible {
                    identifier: dep_id.clone(),
                    required_by: parent.clone(),
                });
            }

            pending.extend(
                dep.depends
                    .iter()
                    .map(|next| (next.clone(), dep_id.clone())),
            );
        }

        self.items = staged;

        for warning in &warnings {
            warn!(identifier, warning = %warning, "Queue warning");
        }
        info!(
            identifier,
            dependencies = expanded.len() - 1,
            "Queued for install"
        );
        Ok(warnings)
    }

    /// Drop `identifier` from the queue.
    ///
    /// A direct request that other queued packages still depend on is
    /// demoted to a dependency; a dependency that is still required stays.
    /// Dependencies no longer reachable from any direct request are dropped.
    /// Returns whether the queue changed.
    pub fn dequeue(&mut self, identifier: &str) -> bool {
        let Some(state) = self.state(identifier) else {
            return false;
        };

        match state {
            QueueState::Install { required_by } if !required_by.is_empty() => {
                let required_by = required_by.clone();
                debug!(identifier, required_by = ?required_by, "Demoted to dependency");
                if let Some(item) = self.items.get_mut(identifier) {
                    item.state = QueueState::Dependency { required_by };
                }
            }
            QueueState::Dependency { required_by } => {
                debug!(identifier, required_by = ?required_by, "Still required, kept in queue");
                return false;
            }
            _ => {
                self.items.remove(identifier);
            }
        }

        self.drop_unreachable();
        info!(identifier, "Dequeued");
        true
    }

    /// Drop dependencies that no direct request reaches and prune requester
    /// sets down to packages still queued for install.
    fn drop_unreachable(&mut self) {
        let mut reachable: BTreeSet<String> = BTreeSet::new();
        let mut pending: Vec<String> = self
            .items
            .iter()
            .filter(|(_, item)| matches!(item.state, QueueState::Install { .. }))
            .map(|(id, _)| id.clone())
            .collect();

        while let Some(id) = pending.pop() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(item) = self.items.get(&id) {
                pending.extend(
                    item.package
                        .depends
                        .iter()
                        .filter(|dep| {
                            self.items
                                .get(*dep)
                                .is_some_and(|d| !matches!(d.state, QueueState::Remove))
                        })
                        .cloned(),
                );
            }
        }

        let orphans: Vec<String> = self
            .items
            .iter()
            .filter(|(id, item)| {
                matches!(item.state, QueueState::Dependency { .. }) && !reachable.contains(*id)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for orphan in &orphans {
            self.items.remove(orphan);
            debug!(identifier = %orphan, "Dropped orphaned dependency");
        }

        for item in self.items.values_mut() {
            if let Some(required_by) = item.state.required_by_mut() {
                required_by.retain(|r| reachable.contains(r));
            }
        }
    }

    /// Check the install batch against installed packages that stay installed.
    pub fn check_conflicts(&self, packages: &HashMap<String, Package>) -> ResolveResult<()> {
        let staying: Vec<&Package> = packages
            .values()
            .filter(|p| p.installed)
            .filter(|p| !matches!(self.state(&p.identifier), Some(QueueState::Remove)))
            .collect();
        check_conflicts(&self.install_batch(), &staying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(id: &str, depends: &[&str]) -> Package {
        let mut p = Package::new(id);
        p.depends = depends.iter().map(|s| s.to_string()).collect();
        p.compatible = true;
        p.valid = true;
        p
    }

    fn registry(packages: Vec<Package>) -> HashMap<String, Package> {
        packages
            .into_iter()
            .map(|p| (p.identifier.clone(), p))
            .collect()
    }

    fn ids(packages: Vec<&Package>) -> Vec<&str> {
        packages.iter().map(|p| p.identifier.as_str()).collect()
    }

    fn install(required_by: &[&str]) -> QueueState {
        QueueState::Install {
            required_by: required_by.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn batch_ids(queue: &Queue) -> Vec<String> {
        queue
            .install_batch()
            .into_iter()
            .map(|p| p.identifier)
            .collect()
    }

    #[test]
    fn test_enqueue_expands_dependencies() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let mut queue = Queue::new();

        let warnings = queue.enqueue("A", &packages).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(ids(queue.bucket(Bucket::Install)), vec!["A"]);
        assert_eq!(ids(queue.bucket(Bucket::Dependency)), vec!["B"]);
        assert_eq!(
            queue.state("B"),
            Some(&QueueState::Dependency {
                required_by: BTreeSet::from(["A".to_string()])
            })
        );
    }

    #[test]
    fn test_installed_dependency_not_queued() {
        let mut b = pkg("B", &[]);
        b.installed = true;
        let packages = registry(vec![pkg("A", &["B"]), b]);
        let mut queue = Queue::new();

        queue.enqueue("A", &packages).unwrap();
        assert!(queue.bucket(Bucket::Dependency).is_empty());
    }

    #[test]
    fn test_transitive_expansion() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &["C"]), pkg("C", &[])]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();

        assert_eq!(ids(queue.bucket(Bucket::Dependency)), vec!["B", "C"]);
        assert_eq!(
            queue.state("C"),
            Some(&QueueState::Dependency {
                required_by: BTreeSet::from(["B".to_string()])
            })
        );
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &["A"])]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();
        assert_eq!(queue.state("A"), Some(&install(&["B"])));
        assert_eq!(queue.counts().dependency, 1);
    }

    #[test]
    fn test_unknown_package() {
        let mut queue = Queue::new();
        let err = queue.enqueue("Nope", &HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownPackage {
                identifier: "Nope".into()
            }
        );
    }

    #[test]
    fn test_unresolved_dependency_leaves_queue_untouched() {
        let packages = registry(vec![pkg("A", &["B", "Missing"]), pkg("B", &[]), pkg("X", &[])]);
        let mut queue = Queue::new();
        queue.enqueue("X", &packages).unwrap();

        let err = queue.enqueue("A", &packages).unwrap_err();

        assert!(matches!(err, ResolveError::UnresolvedDependency { ref identifier, .. } if identifier == "Missing"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.state("X"), Some(&install(&[])));
    }

    #[test]
    fn test_installed_package_queued_for_removal() {
        let mut a = pkg("A", &[]);
        a.installed = true;
        let packages = registry(vec![a]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();
        assert_eq!(queue.state("A"), Some(&QueueState::Remove));
        assert_eq!(queue.removal_batch().len(), 1);
    }

    #[test]
    fn test_warnings() {
        let mut b = pkg("B", &[]);
        b.installed = true;
        let mut a = pkg("A", &["B", "C"]);
        a.compatible = false;
        let mut c = pkg("C", &[]);
        c.compatible = false;
        let packages = registry(vec![a, b, c]);

        let mut queue = Queue::new();
        queue.enqueue("B", &packages).unwrap();
        // B is installed, so it is queued for removal; force the A -> B edge
        // to hit the removal state by pretending B is not installed.
        let mut packages = packages;
        packages.get_mut("B").unwrap().installed = false;

        let warnings = queue.enqueue("A", &packages).unwrap();
        assert!(warnings.contains(&QueueWarning::Incompatible {
            identifier: "A".into()
        }));
        assert!(warnings.contains(&QueueWarning::DependencyQueuedForRemoval {
            identifier: "B".into(),
            required_by: "A".into()
        }));
        assert!(warnings.contains(&QueueWarning::DependencyIncompatible {
            identifier: "C".into(),
            required_by: "A".into()
        }));
        assert_eq!(queue.state("B"), Some(&QueueState::Remove));
    }

    #[test]
    fn test_dequeue_drops_orphaned_dependencies() {
        let packages = registry(vec![
            pkg("A", &["B"]),
            pkg("B", &["C"]),
            pkg("C", &[]),
            pkg("D", &["C"]),
        ]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();
        queue.enqueue("D", &packages).unwrap();

        assert!(queue.dequeue("A"));

        assert!(queue.get("A").is_none());
        assert!(queue.get("B").is_none());
        // C is still required by D.
        assert_eq!(
            queue.state("C"),
            Some(&QueueState::Dependency {
                required_by: BTreeSet::from(["D".to_string()])
            })
        );
        assert!(!queue.dequeue("A"));
    }

    #[test]
    fn test_explicit_enqueue_promotes_dependency() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();
        queue.enqueue("B", &packages).unwrap();

        assert_eq!(queue.state("B"), Some(&install(&["A"])));
        assert_eq!(queue.counts(), QueueCounts { remove: 0, install: 2, dependency: 0 });
    }

    #[test]
    fn test_dequeue_promoted_dependency_keeps_it_queued() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();
        queue.enqueue("B", &packages).unwrap();

        assert!(queue.dequeue("B"));

        assert_eq!(
            queue.state("B"),
            Some(&QueueState::Dependency {
                required_by: BTreeSet::from(["A".to_string()])
            })
        );
        assert_eq!(batch_ids(&queue), vec!["A", "B"]);
    }

    #[test]
    fn test_dequeue_direct_request_still_required_by_later_enqueue() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let mut queue = Queue::new();
        queue.enqueue("B", &packages).unwrap();
        queue.enqueue("A", &packages).unwrap();
        assert_eq!(queue.state("B"), Some(&install(&["A"])));

        assert!(queue.dequeue("B"));

        assert_eq!(queue.counts().dependency, 1);
        assert_eq!(batch_ids(&queue), vec!["A", "B"]);

        // Dropping the requester releases the demoted dependency too.
        assert!(queue.dequeue("A"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_required_dependency_is_refused() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &[])]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();

        assert!(!queue.dequeue("B"));
        assert_eq!(batch_ids(&queue), vec!["A", "B"]);
    }

    #[test]
    fn test_dequeue_cycle_releases_both() {
        let packages = registry(vec![pkg("A", &["B"]), pkg("B", &["A"])]);
        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();

        assert!(queue.dequeue("A"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_check_conflicts_ignores_packages_being_removed() {
        let mut installed = pkg("C", &[]);
        installed.installed = true;
        let mut a = pkg("A", &[]);
        a.conflicts = vec!["C".into()];
        let packages = registry(vec![a, installed]);

        let mut queue = Queue::new();
        queue.enqueue("A", &packages).unwrap();
        assert!(queue.check_conflicts(&packages).is_err());

        queue.enqueue("C", &packages).unwrap();
        assert!(queue.check_conflicts(&packages).is_ok());
    }
}
