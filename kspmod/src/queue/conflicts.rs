//! Batch-wide conflict detection.

use tracing::debug;

use super::error::{ConflictSide, ResolveError, ResolveResult};
use crate::package::Package;

/// Check a whole install batch for conflicts before anything is fetched.
///
/// `installed` must already exclude packages being removed in the same
/// apply. Conflicts are checked in both directions: a batch package naming
/// an installed one, and an installed package naming a batch one. A package
/// listing its own identifier is ignored.
pub fn check_conflicts(batch: &[Package], installed: &[&Package]) -> ResolveResult<()> {
    for package in batch {
        for conflict in &package.conflicts {
            if conflict == &package.identifier {
                continue;
            }

            if installed.iter().any(|p| &p.identifier == conflict) {
                return Err(ResolveError::ConflictDetected {
                    identifier: package.identifier.clone(),
                    conflicting: conflict.clone(),
                    side: ConflictSide::Installed,
                });
            }

            if batch.iter().any(|p| &p.identifier == conflict) {
                return Err(ResolveError::ConflictDetected {
                    identifier: package.identifier.clone(),
                    conflicting: conflict.clone(),
                    side: ConflictSide::Batch,
                });
            }
        }

        if let Some(other) = installed
            .iter()
            .find(|p| p.identifier != package.identifier && p.conflicts_with(&package.identifier))
        {
            return Err(ResolveError::ConflictDetected {
                identifier: package.identifier.clone(),
                conflicting: other.identifier.clone(),
                side: ConflictSide::Installed,
            });
        }
    }

    debug!(
        batch = batch.len(),
        installed = installed.len(),
        "No conflicts in batch"
    );
    Ok(())
}
