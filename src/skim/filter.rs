// src/skim/filter.rs
// Glob-pattern filtering of skimmed items

use glob::Pattern;

use crate::error::{DevToolsError, Result};

/// A compiled filter: ordered glob patterns where a `!` prefix marks an
/// exclusion. Exclusions win and stop evaluation immediately.
#[derive(Debug)]
pub struct FilterSet {
    patterns: Vec<(Pattern, bool)>, // (pattern, is_exclusion)
    has_inclusion: bool,
    raw: Vec<String>,
}

impl FilterSet {
    /// Compile the pattern list. An empty list matches everything.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        let mut has_inclusion = false;
        for raw in patterns {
            let (body, exclude) = match raw.strip_prefix('!') {
                Some(rest) => (rest, true),
                None => (raw.as_str(), false),
            };
            if body.is_empty() {
                return Err(DevToolsError::InvalidInput(format!(
                    "empty filter pattern: {raw:?}"
                )));
            }
            let pattern = Pattern::new(body).map_err(|e| {
                DevToolsError::InvalidInput(format!("invalid filter pattern {raw:?}: {e}"))
            })?;
            has_inclusion |= !exclude;
            compiled.push((pattern, exclude));
        }
        Ok(Self {
            patterns: compiled,
            has_inclusion,
            raw: patterns.to_vec(),
        })
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            has_inclusion: false,
            raw: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Decide whether an item name survives the filter.
    ///
    /// With at least one inclusion pattern the item starts unmatched;
    /// with only exclusions it starts matched. Patterns apply in order:
    /// an inclusion hit sets matched, an exclusion hit clears it and
    /// short-circuits.
    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let mut matched = !self.has_inclusion;
        for (pattern, exclude) in &self.patterns {
            if pattern.matches(name) {
                if *exclude {
                    return false;
                }
                matched = true;
            }
        }
        matched
    }

    /// Canonical form used in cache keys.
    pub fn cache_key(&self) -> Option<String> {
        if self.raw.is_empty() {
            None
        } else {
            Some(self.raw.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> FilterSet {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        FilterSet::new(&owned).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let f = FilterSet::empty();
        assert!(f.matches("anything"));
        assert!(f.is_empty());
        assert_eq!(f.cache_key(), None);
    }

    #[test]
    fn test_inclusion_starts_unmatched() {
        let f = filter(&["handle_*"]);
        assert!(f.matches("handle_request"));
        assert!(!f.matches("main"));
    }

    #[test]
    fn test_only_exclusions_start_matched() {
        let f = filter(&["!test_*"]);
        assert!(f.matches("main"));
        assert!(!f.matches("test_main"));
    }

    #[test]
    fn test_exclusion_short_circuits() {
        // Exclusion wins at iteration time even when a later inclusion
        // would re-match the candidate.
        let f = filter(&["x_*", "!x_y"]);
        assert!(!f.matches("x_y"));
        assert!(f.matches("x_z"));

        let f = filter(&["x_*", "!x_y", "x_y"]);
        assert!(!f.matches("x_y"), "exclusion must win immediately");
    }

    #[test]
    fn test_s6_shape() {
        let f = filter(&["!b", "*"]);
        assert!(f.matches("a"));
        assert!(!f.matches("b"));
        assert!(f.matches("c"));
    }

    #[test]
    fn test_invalid_pattern_is_input_error() {
        let err = FilterSet::new(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, DevToolsError::InvalidInput(_)));
    }

    #[test]
    fn test_cache_key_joins_raw_patterns() {
        let f = filter(&["a*", "!b"]);
        assert_eq!(f.cache_key().as_deref(), Some("a*,!b"));
    }
}
