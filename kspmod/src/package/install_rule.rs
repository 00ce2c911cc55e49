//! Install rules: on-disk detection and archive entry placement.

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a package recognises its own installed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "pattern")]
pub enum InstallMatcher {
    /// Substring of an installed directory or file name.
    Find(String),
    /// Substring of an installed path.
    File(String),
    /// Regular expression over installed paths.
    FindRegex(String),
}

impl InstallMatcher {
    /// The raw pattern text.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Find(p) | Self::File(p) | Self::FindRegex(p) => p,
        }
    }
}

/// Install stanza of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRule {
    /// Artifact matcher.
    pub matcher: InstallMatcher,
    /// Root-relative directory that archive entries are anchored on.
    pub install_to: String,
}

impl InstallRule {
    /// Create a new install rule.
    pub fn new(matcher: InstallMatcher, install_to: impl Into<String>) -> Self {
        Self {
            matcher,
            install_to: install_to.into(),
        }
    }

    /// Compile the matcher once for testing many artifacts.
    ///
    /// An invalid `FindRegex` pattern yields a matcher that never matches.
    pub fn artifact_matcher(&self) -> ArtifactMatcher<'_> {
        match &self.matcher {
            InstallMatcher::Find(needle) | InstallMatcher::File(needle) => {
                ArtifactMatcher::Substring(needle)
            }
            InstallMatcher::FindRegex(pattern) => ArtifactMatcher::Pattern(Regex::new(pattern).ok()),
        }
    }

    /// Check whether an on-disk artifact (relative to `GameData`,
    /// `/`-separated) denotes this package as installed.
    pub fn matches_artifact(&self, artifact: &str) -> bool {
        self.artifact_matcher().matches(artifact)
    }

    /// Anchor an archive entry on `install_to`.
    ///
    /// Returns the root-relative path starting at the first occurrence of the
    /// `install_to` components inside the entry path (case-insensitive), or
    /// `None` when the entry does not contain them. The returned path is not
    /// yet containment-checked.
    pub fn anchor_entry(&self, entry_path: &str) -> Option<PathBuf> {
        let anchor = split_components(&self.install_to);
        if anchor.is_empty() {
            return None;
        }

        let entry = split_components(entry_path);
        if entry.len() < anchor.len() {
            return None;
        }

        (0..=entry.len() - anchor.len())
            .find(|&start| {
                entry[start..start + anchor.len()]
                    .iter()
                    .zip(anchor.iter())
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
            })
            .map(|start| entry[start..].iter().collect())
    }
}

/// A compiled [`InstallMatcher`].
#[derive(Debug)]
pub enum ArtifactMatcher<'a> {
    Substring(&'a str),
    Pattern(Option<Regex>),
}

impl ArtifactMatcher<'_> {
    pub fn matches(&self, artifact: &str) -> bool {
        match self {
            Self::Substring(needle) => !needle.is_empty() && artifact.contains(*needle),
            Self::Pattern(re) => re.as_ref().is_some_and(|re| re.is_match(artifact)),
        }
    }
}

/// Split a `/`- or `\`-separated archive path into its raw segments.
///
/// `.` and empty segments are dropped; `..` is kept so that the containment
/// check downstream sees it.
fn split_components(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_matches_substring() {
        let rule = InstallRule::new(InstallMatcher::Find("MechJeb2".into()), "GameData");
        assert!(rule.matches_artifact("MechJeb2"));
        assert!(rule.matches_artifact("MechJeb2/Parts/x.cfg"));
        assert!(!rule.matches_artifact("Kopernicus"));
    }

    #[test]
    fn test_empty_find_never_matches() {
        let rule = InstallRule::new(InstallMatcher::Find(String::new()), "GameData");
        assert!(!rule.matches_artifact("anything"));
    }

    #[test]
    fn test_find_regex_matches() {
        let rule = InstallRule::new(
            InstallMatcher::FindRegex(r"^Kerbal.*Engineer".into()),
            "GameData",
        );
        assert!(rule.matches_artifact("KerbalEngineer"));
        assert!(!rule.matches_artifact("Plugins/KerbalEngineer"));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let rule = InstallRule::new(InstallMatcher::FindRegex("(".into()), "GameData");
        assert!(!rule.matches_artifact("("));
    }

    #[test]
    fn test_anchor_entry_strips_leading_folders() {
        let rule = InstallRule::new(InstallMatcher::Find("Foo".into()), "GameData");
        assert_eq!(
            rule.anchor_entry("Foo-1.0/GameData/Foo/Foo.dll"),
            Some(PathBuf::from("GameData/Foo/Foo.dll"))
        );
        assert_eq!(
            rule.anchor_entry("gamedata\\Foo\\x.cfg"),
            Some(PathBuf::from("gamedata/Foo/x.cfg"))
        );
    }

    #[test]
    fn test_anchor_entry_multi_component() {
        let rule = InstallRule::new(InstallMatcher::Find("VAB".into()), "Ships/VAB");
        assert_eq!(
            rule.anchor_entry("craft/Ships/VAB/rocket.craft"),
            Some(PathBuf::from("Ships/VAB/rocket.craft"))
        );
        assert_eq!(rule.anchor_entry("craft/Ships/SPH/plane.craft"), None);
    }

    #[test]
    fn test_anchor_entry_unmatched() {
        let rule = InstallRule::new(InstallMatcher::Find("Foo".into()), "GameData");
        assert_eq!(rule.anchor_entry("Foo/readme.txt"), None);
    }

    #[test]
    fn test_compiled_matcher_reused_across_artifacts() {
        let rule = InstallRule::new(InstallMatcher::FindRegex(r"^Kopernicus$".into()), "GameData");
        let matcher = rule.artifact_matcher();
        let hits: Vec<&str> = ["Kopernicus", "KopernicusExpansion", "Squad"]
            .into_iter()
            .filter(|a| matcher.matches(a))
            .collect();
        assert_eq!(hits, vec!["Kopernicus"]);
    }
}
