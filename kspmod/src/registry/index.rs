//! Latest-version selection, compatibility filtering and sorted index.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::package::Package;

/// Package attribute the index is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Display name.
    #[default]
    Name,
    /// Stable identifier.
    Identifier,
}

impl SortField {
    /// Sort key of a package for this field, lower-cased.
    pub fn key_of(&self, package: &Package) -> String {
        match self {
            Self::Name => package.name.to_lowercase(),
            Self::Identifier => package.identifier.to_lowercase(),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Identifier => write!(f, "identifier"),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "identifier" | "id" => Ok(Self::Identifier),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

/// Index sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// One row of the registry index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub identifier: String,
    pub sort_key: String,
}

/// Keep the greatest own version of each identifier.
///
/// Versions that compare equal keep whichever was seen first.
pub fn latest_per_identifier<I>(all: I) -> HashMap<String, Package>
where
    I: IntoIterator<Item = Package>,
{
    let mut latest: HashMap<String, Package> = HashMap::new();
    for package in all {
        match latest.get(&package.identifier) {
            Some(current) if package.own_version() <= current.own_version() => {}
            _ => {
                latest.insert(package.identifier.clone(), package);
            }
        }
    }
    latest
}

/// Drop packages whose window excludes the installed game version.
pub fn filter_compatible(map: HashMap<String, Package>) -> HashMap<String, Package> {
    map.into_iter().filter(|(_, p)| p.compatible).collect()
}

/// Build the sorted index over `map`.
///
/// Ties on the sort key fall back to the identifier so the order never
/// depends on hash iteration order.
pub fn build_index(
    map: &HashMap<String, Package>,
    field: SortField,
    order: SortOrder,
) -> Vec<IndexEntry> {
    let mut entries: Vec<IndexEntry> = map
        .values()
        .map(|package| IndexEntry {
            identifier: package.identifier.clone(),
            sort_key: field.key_of(package),
        })
        .collect();

    entries.sort_by(|a, b| compare_entries(a, b, order));
    entries
}

/// A compiled search query.
///
/// Queries are case-insensitive regular expressions; text that does not
/// compile is matched as a literal substring instead.
#[derive(Debug, Clone)]
pub enum SearchQuery {
    Pattern(regex::Regex),
    Literal(String),
}

impl SearchQuery {
    /// Compile `query`.
    pub fn new(query: &str) -> Self {
        match RegexBuilder::new(query).case_insensitive(true).build() {
            Ok(re) => Self::Pattern(re),
            Err(_) => Self::Literal(query.to_lowercase()),
        }
    }

    /// Whether a package's search text matches.
    pub fn matches(&self, package: &Package) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(&package.search_space),
            Self::Literal(needle) => package.search_space.contains(needle.as_str()),
        }
    }
}

fn compare_entries(a: &IndexEntry, b: &IndexEntry, order: SortOrder) -> Ordering {
    let ord = a
        .sort_key
        .cmp(&b.sort_key)
        .then_with(|| a.identifier.cmp(&b.identifier));
    match order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    fn pkg(id: &str, name: &str, version: &str) -> Package {
        let mut p = Package::new(id);
        p.name = name.to_string();
        p.version = parse_version(version).unwrap();
        p.compatible = true;
        p.valid = true;
        p
    }

    #[test]
    fn test_latest_keeps_greatest_version() {
        let latest = latest_per_identifier(vec![
            pkg("X", "X", "1.0"),
            pkg("X", "X", "2.0"),
            pkg("Y", "Y", "0.1"),
        ]);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["X"].own_version().to_string(), "2.0");
    }

    #[test]
    fn test_latest_tie_keeps_first_seen() {
        let mut first = pkg("X", "First", "1.0");
        first.summary = "first".into();
        let mut second = pkg("X", "Second", "1.0.0");
        second.summary = "second".into();

        let latest = latest_per_identifier(vec![first, second]);
        assert_eq!(latest["X"].summary, "first");
    }

    #[test]
    fn test_filter_compatible() {
        let mut old = pkg("Old", "Old", "1.0");
        old.compatible = false;
        let latest = latest_per_identifier(vec![old, pkg("New", "New", "1.0")]);
        let filtered = filter_compatible(latest);
        assert!(filtered.contains_key("New"));
        assert!(!filtered.contains_key("Old"));
    }

    #[test]
    fn test_build_index_sorted_case_insensitive() {
        let latest = latest_per_identifier(vec![
            pkg("b", "beta", "1.0"),
            pkg("a", "Alpha", "1.0"),
            pkg("c", "charlie", "1.0"),
        ]);

        let asc = build_index(&latest, SortField::Name, SortOrder::Ascending);
        let ids: Vec<_> = asc.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(asc[0].sort_key, "alpha");

        let desc = build_index(&latest, SortField::Name, SortOrder::Descending);
        let ids: Vec<_> = desc.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_build_index_ties_broken_by_identifier() {
        let latest = latest_per_identifier(vec![
            pkg("Z", "Same", "1.0"),
            pkg("A", "same", "1.0"),
        ]);
        let index = build_index(&latest, SortField::Name, SortOrder::Ascending);
        let ids: Vec<_> = index.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["A", "Z"]);
    }

    #[test]
    fn test_search_query_falls_back_to_literal() {
        let mut p = pkg("X", "X", "1.0");
        p.search_space = "a (weird mod".into();
        let query = SearchQuery::new("(weird");
        assert!(matches!(query, SearchQuery::Literal(_)));
        assert!(query.matches(&p));
    }

    #[test]
    fn test_search_query_case_insensitive() {
        let mut p = pkg("X", "X", "1.0");
        p.search_space = "laser drill".into();
        assert!(SearchQuery::new("LASER").matches(&p));
        assert!(!SearchQuery::new("^drill").matches(&p));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("Name".parse::<SortField>().unwrap(), SortField::Name);
        assert_eq!("id".parse::<SortField>().unwrap(), SortField::Identifier);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("size".parse::<SortField>().is_err());
    }
}
