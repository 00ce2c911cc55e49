//! Descriptor normalization.
//!
//! Converts raw, community-maintained descriptor documents into validated
//! [`Package`](crate::package::Package) records. Normalization never panics
//! on bad input: each field is cleaned independently and failures are
//! recorded on the package under the field that caused them.
//!
//! # Example
//!
//! ```
//! use kspmod::descriptor::{Normalizer, Outcome};
//!
//! let normalizer = Normalizer::new("1.8".parse().unwrap());
//! let package = normalizer.normalize_str(r#"{
//!     "identifier": "Foo",
//!     "name": "Foo",
//!     "abstract": "A mod",
//!     "author": "Val",
//!     "license": "MIT",
//!     "version": "1.0",
//!     "ksp_version": "1.8",
//!     "download": "https://example.com/foo.zip",
//!     "install": [{ "find": "Foo", "install_to": "GameData" }]
//! }"#);
//! assert_eq!(Outcome::of(&package), Outcome::Valid);
//! ```

mod normalize;
mod raw;

pub use normalize::{Normalizer, Outcome};
pub use raw::{
    OneOrMany, RawDescriptor, RawDownloadHash, RawInstallStanza, RawRelationship, TextValue,
};

/// File extension of descriptor documents in the metadata repository.
pub const DESCRIPTOR_EXTENSION: &str = "ckan";
