//! Game-version compatibility windows.

use serde::{Deserialize, Serialize};

use super::{parse_version, Version, VersionError, VersionResult};

/// Marker used by descriptors for "no bound".
const ANY: &str = "any";

/// The inclusive `[min, max]` range of game versions a package supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityWindow {
    /// Lowest supported game version.
    pub min: Version,
    /// Highest supported game version.
    pub max: Version,
}

impl CompatibilityWindow {
    /// Create a window from explicit bounds.
    pub fn new(min: Version, max: Version) -> Self {
        Self { min, max }
    }

    /// Whether `game` lies inside the window (both ends inclusive).
    pub fn is_compatible(&self, game: &Version) -> bool {
        self.min <= *game && *game <= self.max
    }
}

/// Field state after trimming: absent, the `any` marker, or a concrete value.
enum Bound<'a> {
    Absent,
    Any,
    Value(&'a str),
}

impl<'a> Bound<'a> {
    fn from_raw(raw: &'a str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Bound::Absent
        } else if raw.eq_ignore_ascii_case(ANY) {
            Bound::Any
        } else {
            Bound::Value(raw)
        }
    }

    fn is_present(&self) -> bool {
        !matches!(self, Bound::Absent)
    }
}

fn parse_bound(raw: &str) -> VersionResult<Version> {
    parse_version(raw).map(|parsed| parsed.version)
}

/// Derive a compatibility window from partially specified descriptor fields.
///
/// Empty strings count as absent. Defaulting rules:
///
/// - `exact == "any"`: `[0.0, game]`
/// - `exact` given: both ends default to `exact`; `min`/`max` override
/// - only `min`: `max` defaults to `game`
/// - only `max`: `min` defaults to `0.0`
/// - nothing given: [`VersionError::MissingVersionInfo`]
///
/// An explicit `any` for `min` or `max` leaves that side open.
///
/// # Example
///
/// ```
/// use kspmod::version::{resolve_compatibility_window, Version};
///
/// let game: Version = "1.8".parse().unwrap();
/// let window = resolve_compatibility_window("1.0", "", "", &game).unwrap();
/// assert_eq!(window.min.to_string(), "1.0");
/// assert_eq!(window.max.to_string(), "1.8");
/// ```
pub fn resolve_compatibility_window(
    raw_min: &str,
    raw_max: &str,
    raw_exact: &str,
    game: &Version,
) -> VersionResult<CompatibilityWindow> {
    let min = Bound::from_raw(raw_min);
    let max = Bound::from_raw(raw_max);
    let exact = Bound::from_raw(raw_exact);

    if !min.is_present() && !max.is_present() && !exact.is_present() {
        return Err(VersionError::MissingVersionInfo);
    }

    let (default_min, default_max) = match exact {
        Bound::Any => (Version::zero(), game.clone()),
        Bound::Value(raw) => {
            let exact = parse_bound(raw)?;
            (exact.clone(), exact)
        }
        Bound::Absent => (Version::zero(), game.clone()),
    };

    let min = match min {
        Bound::Value(raw) => parse_bound(raw)?,
        Bound::Any => Version::zero(),
        Bound::Absent => default_min,
    };

    let max = match max {
        Bound::Value(raw) => parse_bound(raw)?,
        Bound::Any => game.clone(),
        Bound::Absent => default_max,
    };

    Ok(CompatibilityWindow { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_min_only_defaults_max_to_game() {
        let window = resolve_compatibility_window("1.0", "", "", &v("1.8")).unwrap();
        assert_eq!(window, CompatibilityWindow::new(v("1.0"), v("1.8")));
    }

    #[test]
    fn test_any_spans_zero_to_game() {
        let window = resolve_compatibility_window("", "", "any", &v("1.8")).unwrap();
        assert_eq!(window.min, v("0.0"));
        assert_eq!(window.max, v("1.8"));
    }

    #[test]
    fn test_max_only_defaults_min_to_zero() {
        let window = resolve_compatibility_window("", "1.7.3", "", &v("1.8")).unwrap();
        assert_eq!(window.min, v("0.0"));
        assert_eq!(window.max, v("1.7.3"));
    }

    #[test]
    fn test_exact_sets_both_ends() {
        let window = resolve_compatibility_window("", "", "1.7", &v("1.12")).unwrap();
        assert_eq!(window.min, v("1.7"));
        assert_eq!(window.max, v("1.7"));
    }

    #[test]
    fn test_explicit_bounds_override_exact() {
        let window = resolve_compatibility_window("1.6", "", "1.7", &v("1.12")).unwrap();
        assert_eq!(window.min, v("1.6"));
        assert_eq!(window.max, v("1.7"));
    }

    #[test]
    fn test_nothing_given_is_missing_info() {
        let err = resolve_compatibility_window("", "  ", "", &v("1.8")).unwrap_err();
        assert_eq!(err, VersionError::MissingVersionInfo);
    }

    #[test]
    fn test_unparseable_bound_is_parse_error() {
        let err = resolve_compatibility_window("soon", "", "", &v("1.8")).unwrap_err();
        assert!(matches!(err, VersionError::Parse { .. }));
    }

    #[test]
    fn test_is_compatible_inclusive() {
        let window = CompatibilityWindow::new(v("1.0"), v("1.8"));
        assert!(window.is_compatible(&v("1.0")));
        assert!(window.is_compatible(&v("1.8")));
        assert!(window.is_compatible(&v("1.4.5")));
        assert!(!window.is_compatible(&v("1.9")));
        assert!(!window.is_compatible(&v("0.9")));
    }
}
