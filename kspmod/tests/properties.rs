//! Behavioral properties of the version engine, the registry index and
//! path containment.
//!
//! Run with: `cargo test --test properties`

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use kspmod::installer::resolve_lexically;
use kspmod::package::{InstallMatcher, InstallRule, Package};
use kspmod::registry::{latest_per_identifier, IndexOptions, Registry};
use kspmod::version::{compare, parse_version, resolve_compatibility_window, Version};

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn package(id: &str, version: &str) -> Package {
    let mut p = Package::new(id);
    p.version = parse_version(version).unwrap();
    p.name = id.to_string();
    p.search_space = id.to_lowercase();
    p.compatible = true;
    p.valid = true;
    p
}

// ============================================================================
// Version Parsing
// ============================================================================

#[test]
fn test_parse_examples() {
    let plain = parse_version("1.2.3").unwrap();
    assert_eq!(plain.version, v("1.2.3"));
    assert_eq!(plain.epoch, "");

    let epoch = parse_version("2:1.0").unwrap();
    assert_eq!(epoch.version, v("1.0"));
    assert_eq!(epoch.epoch, "2");

    let dirty = parse_version("v1.2.3-beta [KSP 1.8]").unwrap();
    assert_eq!(dirty.version, v("1.2.3"));
    assert_eq!(dirty.epoch, "");
}

#[test]
fn test_unparseable_version_is_an_error() {
    assert!(parse_version("no digits here").is_err());
}

// ============================================================================
// Compatibility Windows
// ============================================================================

#[test]
fn test_window_defaults() {
    let game = v("1.8");

    let min_only = resolve_compatibility_window("1.0", "", "", &game).unwrap();
    assert_eq!((min_only.min, min_only.max), (v("1.0"), v("1.8")));

    let any = resolve_compatibility_window("", "", "any", &game).unwrap();
    assert_eq!(any.min, Version::zero());
    assert_eq!(any.max, v("1.8"));
    assert!(any.is_compatible(&game));

    assert!(resolve_compatibility_window("", "", "", &game).is_err());
}

#[test]
fn test_exact_window_excludes_other_versions() {
    let game = v("1.12.5");
    let window = resolve_compatibility_window("", "", "1.8", &game).unwrap();

    assert!(window.is_compatible(&v("1.8")));
    assert!(!window.is_compatible(&game));
}

// ============================================================================
// Registry Index
// ============================================================================

#[test]
fn test_latest_per_identifier_keeps_highest() {
    let latest = latest_per_identifier(vec![
        package("X", "1.0"),
        package("X", "2.0"),
        package("Y", "0.1"),
    ]);

    assert_eq!(latest.len(), 2);
    assert_eq!(latest["X"].own_version(), &v("2.0"));
}

#[test]
fn test_latest_per_identifier_ignores_input_order() {
    let latest = latest_per_identifier(vec![package("X", "2.0"), package("X", "1.0")]);
    assert_eq!(latest["X"].own_version(), &v("2.0"));
}

#[test]
fn test_search_is_case_insensitive_and_idempotent() {
    let mut registry = Registry::from_packages(
        vec![
            package("LaserDrill", "1.0"),
            package("BigLASER", "1.0"),
            package("Parachutes", "1.0"),
        ],
        IndexOptions::default(),
    );

    let first: Vec<String> = registry
        .search("Laser")
        .iter()
        .map(|e| e.identifier.clone())
        .collect();
    let second: Vec<String> = registry
        .search("Laser")
        .iter()
        .map(|e| e.identifier.clone())
        .collect();

    assert_eq!(first.len(), 2);
    assert!(!first.contains(&"Parachutes".to_string()));
    assert_eq!(first, second);
}

// ============================================================================
// Install Rules
// ============================================================================

#[test]
fn test_find_rule_anchors_on_directory_name() {
    let rule = InstallRule::new(InstallMatcher::Find("Drill".into()), "GameData");
    assert_eq!(
        rule.anchor_entry("Release/GameData/Drill/part.cfg"),
        Some(PathBuf::from("GameData/Drill/part.cfg"))
    );
}

// ============================================================================
// Property Tests
// ============================================================================

fn segments() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..50, 1..5)
}

proptest! {
    #[test]
    fn prop_compare_is_antisymmetric(a in segments(), b in segments()) {
        let (a, b) = (Version::new(a), Version::new(b));
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn prop_compare_is_transitive(a in segments(), b in segments(), c in segments()) {
        let (a, b, c) = (Version::new(a), Version::new(b), Version::new(c));
        if compare(&a, &b) != Ordering::Greater && compare(&b, &c) != Ordering::Greater {
            prop_assert_ne!(compare(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn prop_parse_version_never_panics(raw in ".{0,40}") {
        let _ = parse_version(&raw);
    }

    #[test]
    fn prop_latest_is_maximum(versions in prop::collection::vec(segments(), 1..8)) {
        let packages: Vec<Package> = versions
            .iter()
            .map(|s| {
                let mut p = Package::new("X");
                p.version.version = Version::new(s.clone());
                p
            })
            .collect();
        let expected = packages.iter().map(|p| p.own_version().clone()).max().unwrap();

        let latest = latest_per_identifier(packages);
        prop_assert_eq!(latest["X"].own_version(), &expected);
    }

    #[test]
    fn prop_lexical_resolution_stays_under_root(
        parts in prop::collection::vec(prop_oneof![
            Just("..".to_string()),
            Just(".".to_string()),
            "[a-z]{1,6}",
        ], 1..8)
    ) {
        let root = Path::new("/srv/ksp");
        let relative: PathBuf = parts.iter().collect();
        if let Some(resolved) = resolve_lexically(root, &relative) {
            prop_assert!(resolved.starts_with(root));
            prop_assert!(resolved != root);
        }
    }
}
