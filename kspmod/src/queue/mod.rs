//! Dependency/conflict resolver and the install queue.
//!
//! Every queued identifier carries exactly one [`QueueState`]; the remove,
//! install and dependency buckets are views derived from those states, so an
//! identifier can never sit in two buckets at once.
//!
//! # State machine
//!
//! ```text
//! Unqueued ──enqueue (not installed)──► Install ──download──► Downloaded ──extract──► Installed
//!     │                                    └─ expansion ─► Dependency (same path)
//!     └──────enqueue (installed)────────► Remove ──apply──► Removed
//! ```
//!
//! Resolution is not a general solver: each package's dependency list is
//! followed as declared, and anything missing is a hard error.

mod conflicts;
mod error;
mod model;

pub use conflicts::check_conflicts;
pub use error::{ConflictSide, ResolveError, ResolveResult};
pub use model::{Bucket, Queue, QueueCounts, QueueItem, QueueState, QueueWarning};
