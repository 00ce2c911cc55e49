//! Descriptor normalization.
//!
//! Every step below owns one field of the [`Package`] and either fills it in
//! or reports a [`FieldError`]. Steps never see each other's failures, except
//! the final search-space step which works from whatever text the earlier
//! steps managed to clean.

use std::collections::BTreeMap;

use regex::Regex;
use reqwest::Url;

use super::raw::{
    OneOrMany, RawDescriptor, RawDownloadHash, RawInstallStanza, RawRelationship, TextValue,
};
use crate::package::{Download, Field, FieldError, InstallMatcher, InstallRule, Package};
use crate::version::{parse_version, resolve_compatibility_window, Version};

type StepResult = Result<(), FieldError>;

/// Classification of a normalized descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every step succeeded; the package belongs in the registry.
    Valid,
    /// At least one step failed with a real error.
    Malformed,
    /// Only ignorable gaps; the package is skipped without being counted.
    Ignorable,
}

impl Outcome {
    /// Classify a normalized package.
    pub fn of(package: &Package) -> Self {
        if package.valid {
            Self::Valid
        } else if package.is_malformed() {
            Self::Malformed
        } else {
            Self::Ignorable
        }
    }
}

/// Converts raw descriptors into validated [`Package`] records.
///
/// The installed game version is read-only input to the compatibility step.
#[derive(Debug, Clone)]
pub struct Normalizer {
    game_version: Version,
}

impl Normalizer {
    /// Create a normalizer for the given installed game version.
    pub fn new(game_version: Version) -> Self {
        Self { game_version }
    }

    /// The game version used for compatibility.
    pub fn game_version(&self) -> &Version {
        &self.game_version
    }

    /// Normalize descriptor text.
    ///
    /// Text that is not a JSON object yields an invalid package with a
    /// single `document` error.
    pub fn normalize_str(&self, text: &str) -> Package {
        match RawDescriptor::from_json(text) {
            Ok(raw) => self.normalize(&raw),
            Err(message) => {
                let mut package = Package::default();
                package
                    .errors
                    .insert(Field::Document, FieldError::error(message));
                package
            }
        }
    }

    /// Normalize one descriptor, running every step.
    pub fn normalize(&self, raw: &RawDescriptor) -> Package {
        let mut package = Package::default();
        let mut errors = BTreeMap::new();

        let steps: [(Field, fn(&Self, &RawDescriptor, &mut Package) -> StepResult); 12] = [
            (Field::Name, Self::clean_name),
            (Field::Identifier, Self::clean_identifier),
            (Field::Author, Self::clean_author),
            (Field::Version, Self::clean_version),
            (Field::KspVersion, Self::clean_window),
            (Field::Abstract, Self::clean_abstract),
            (Field::Description, Self::clean_description),
            (Field::License, Self::clean_license),
            (Field::Install, Self::clean_install),
            (Field::Download, Self::clean_download),
            (Field::Depends, Self::clean_depends),
            (Field::Conflicts, Self::clean_conflicts),
        ];

        for (field, step) in steps {
            if let Err(error) = step(self, raw, &mut package) {
                errors.insert(field, error);
            }
        }

        if let Err(error) = build_search_space(&mut package) {
            errors.insert(Field::SearchSpace, error);
        }

        package.valid = errors.is_empty();
        package.errors = errors;
        package
    }

    fn clean_name(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        package.name = required_text(raw, "name")?;
        Ok(())
    }

    fn clean_identifier(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        let identifier = required_text(raw, "identifier")?;
        if identifier.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(FieldError::error(format!(
                "identifier {:?} contains whitespace or path separators",
                identifier
            )));
        }
        package.identifier = identifier;
        Ok(())
    }

    fn clean_author(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        package.authors = required_list(raw, "author")?;
        Ok(())
    }

    fn clean_version(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        let text = raw
            .field::<TextValue>("version")
            .map_err(FieldError::error)?
            .map(TextValue::into_string)
            .ok_or_else(|| FieldError::error("missing version"))?;
        package.version = parse_version(&text).map_err(|e| FieldError::error(e.to_string()))?;
        Ok(())
    }

    fn clean_window(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        let min = optional_version_text(raw, "ksp_version_min")?;
        let max = optional_version_text(raw, "ksp_version_max")?;
        let exact = optional_version_text(raw, "ksp_version")?;

        let window = resolve_compatibility_window(&min, &max, &exact, &self.game_version)
            .map_err(|e| FieldError::error(e.to_string()))?;

        package.compatible = window.is_compatible(&self.game_version);
        package.window = window;
        Ok(())
    }

    fn clean_abstract(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        package.summary = required_text(raw, "abstract")?;
        Ok(())
    }

    fn clean_description(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        let Some(text) = raw
            .field::<String>("description")
            .map_err(FieldError::error)?
        else {
            return Ok(());
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FieldError::error("description is empty"));
        }
        package.description = Some(trimmed.to_string());
        Ok(())
    }

    fn clean_license(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        package.licenses = required_list(raw, "license")?;
        Ok(())
    }

    fn clean_install(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        let stanzas = raw
            .field::<OneOrMany<RawInstallStanza>>("install")
            .map_err(FieldError::error)?
            .map(OneOrMany::into_vec)
            .unwrap_or_default();

        if stanzas.is_empty() {
            return Err(FieldError::ignorable("no install stanza"));
        }

        let mut last_error = None;
        for stanza in stanzas {
            match install_rule_from(stanza) {
                Ok(rule) => {
                    package.install = Some(rule);
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| FieldError::error("no usable install stanza")))
    }

    fn clean_download(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        let urls = raw
            .field::<OneOrMany<String>>("download")
            .map_err(FieldError::error)?
            .map(OneOrMany::into_vec)
            .unwrap_or_default();

        let url = urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .find(|u| !u.is_empty())
            .ok_or_else(|| FieldError::error("missing or empty download URL"))?;

        Url::parse(&url)
            .map_err(|e| FieldError::error(format!("invalid download URL {:?}: {}", url, e)))?;

        let sha256 = raw
            .field::<RawDownloadHash>("download_hash")
            .map_err(FieldError::error)?
            .and_then(|hash| hash.sha256)
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty());

        // Size is informational; a malformed value is dropped rather than failing the step.
        let size = raw.field::<u64>("download_size").ok().flatten();

        package.download = Download { url, sha256, size };
        Ok(())
    }

    fn clean_depends(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        package.depends = relationship_ids(raw, "depends")?;
        Ok(())
    }

    fn clean_conflicts(&self, raw: &RawDescriptor, package: &mut Package) -> StepResult {
        package.conflicts = relationship_ids(raw, "conflicts")?;
        Ok(())
    }
}

/// A required, non-empty, trimmed string field.
fn required_text(raw: &RawDescriptor, key: &str) -> Result<String, FieldError> {
    let text = raw
        .field::<String>(key)
        .map_err(FieldError::error)?
        .ok_or_else(|| FieldError::error(format!("missing {}", key)))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FieldError::error(format!("{} is empty", key)));
    }
    Ok(trimmed.to_string())
}

/// A required string-or-list field with at least one non-empty entry.
fn required_list(raw: &RawDescriptor, key: &str) -> Result<Vec<String>, FieldError> {
    let items: Vec<String> = raw
        .field::<OneOrMany<String>>(key)
        .map_err(FieldError::error)?
        .ok_or_else(|| FieldError::error(format!("missing {}", key)))?
        .into_vec()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return Err(FieldError::error(format!("{} is empty", key)));
    }
    Ok(items)
}

/// An optional version field as text; absent becomes the empty string.
fn optional_version_text(raw: &RawDescriptor, key: &str) -> Result<String, FieldError> {
    Ok(raw
        .field::<TextValue>(key)
        .map_err(FieldError::error)?
        .map(TextValue::into_string)
        .unwrap_or_default())
}

fn install_rule_from(stanza: RawInstallStanza) -> Result<InstallRule, FieldError> {
    let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let matchers: Vec<InstallMatcher> = [
        non_empty(stanza.find).map(InstallMatcher::Find),
        non_empty(stanza.file).map(InstallMatcher::File),
        non_empty(stanza.find_regexp).map(InstallMatcher::FindRegex),
    ]
    .into_iter()
    .flatten()
    .collect();

    let matcher = match matchers.len() {
        1 => matchers.into_iter().next().ok_or_else(|| {
            FieldError::error("install stanza needs exactly one of find, file, find_regexp")
        })?,
        0 => {
            return Err(FieldError::error(
                "install stanza has none of find, file, find_regexp",
            ))
        }
        _ => {
            return Err(FieldError::error(
                "install stanza has more than one of find, file, find_regexp",
            ))
        }
    };

    if let InstallMatcher::FindRegex(pattern) = &matcher {
        Regex::new(pattern)
            .map_err(|e| FieldError::error(format!("invalid find_regexp {:?}: {}", pattern, e)))?;
    }

    let install_to = non_empty(stanza.install_to)
        .ok_or_else(|| FieldError::error("install stanza is missing install_to"))?;

    Ok(InstallRule::new(matcher, install_to))
}

fn relationship_ids(raw: &RawDescriptor, key: &str) -> Result<Vec<String>, FieldError> {
    let Some(relationships) = raw
        .field::<Vec<RawRelationship>>(key)
        .map_err(FieldError::error)?
    else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::with_capacity(relationships.len());
    for relationship in &relationships {
        let id = relationship
            .identifier()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FieldError::error(format!("{} entry without an identifier", key)))?;
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Reduce text to lower-cased letters and spaces.
fn letters_only(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the search text from name, identifier, authors and abstract.
fn build_search_space(package: &mut Package) -> StepResult {
    let authors = package.authors.join(" ");
    let parts: Vec<String> = [
        package.name.as_str(),
        package.identifier.as_str(),
        authors.as_str(),
        package.summary.as_str(),
    ]
    .iter()
    .map(|part| letters_only(part))
    .filter(|part| !part.is_empty())
    .collect();

    if parts.is_empty() {
        return Err(FieldError::error("no searchable text"));
    }

    package.search_space = parts.join(" ");
    Ok(())
}
