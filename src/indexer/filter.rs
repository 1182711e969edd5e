// Path eligibility for indexing

use std::collections::HashSet;
use std::path::{Component as PathComponent, Path};

use glob::Pattern;

/// Directory names whose contents are never indexed.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".venv",
    "venv",
    "__pycache__",
    ".git",
    ".pytest_cache",
    "node_modules",
    ".ipynb_checkpoints",
    "instance",
    ".data_versions",
];

/// Glob patterns for compiled artifacts, OS metadata and packaging metadata.
pub const EXCLUDED_PATTERNS: &[&str] = &["*.pyc", "*.pyo", "*.so", "*.dylib", ".DS_Store", "*.egg-info"];

/// Decides whether a root-relative path may be indexed.
#[derive(Debug, Clone)]
pub struct PathFilter {
    dirs: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self {
            dirs: EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
            patterns: EXCLUDED_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }
}

impl PathFilter {
    /// Default exclusions extended with extra directory names and glob patterns.
    pub fn with_extra(dirs: &[String], patterns: &[String]) -> Result<Self, glob::PatternError> {
        let mut filter = Self::default();
        filter.dirs.extend(dirs.iter().cloned());
        for pattern in patterns {
            filter.patterns.push(Pattern::new(pattern)?);
        }
        Ok(filter)
    }

    /// True unless a directory component is excluded or any component matches
    /// an exclusion pattern. Only the given path is consulted, never anything
    /// above it.
    pub fn eligible(&self, rel_path: &Path) -> bool {
        let names: Vec<&str> = rel_path
            .components()
            .filter_map(|c| match c {
                PathComponent::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();

        let Some((_, dirs)) = names.split_last() else {
            return false;
        };

        if dirs.iter().any(|d| self.dirs.contains(*d)) {
            return false;
        }

        !names.iter().any(|name| self.matches_pattern(name))
    }

    /// Whether traversal should descend into a directory with this name.
    pub fn allows_dir(&self, name: &str) -> bool {
        !self.dirs.contains(name) && !self.matches_pattern(name)
    }

    fn matches_pattern(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_exclusions() {
        let filter = PathFilter::default();

        assert!(filter.eligible(Path::new("app/views.py")));
        assert!(filter.eligible(Path::new("README.md")));

        assert!(!filter.eligible(Path::new(".venv/lib/site.py")));
        assert!(!filter.eligible(Path::new("src/__pycache__/mod.py")));
        assert!(!filter.eligible(Path::new("web/node_modules/pkg/readme.md")));
        assert!(!filter.eligible(Path::new("instance/config.py")));
        assert!(!filter.eligible(Path::new("app/views.pyc")));
        assert!(!filter.eligible(Path::new("docs/.DS_Store")));
        assert!(!filter.eligible(Path::new("pkg.egg-info/PKG-INFO.md")));
    }

    #[test]
    fn test_file_named_like_excluded_dir_is_kept() {
        let filter = PathFilter::default();
        assert!(filter.eligible(Path::new("docs/instance")));
    }

    #[test]
    fn test_extra_exclusions() {
        let filter = PathFilter::with_extra(&["build".to_string()], &["*_test.py".to_string()]).unwrap();

        assert!(!filter.eligible(Path::new("build/gen.py")));
        assert!(!filter.eligible(Path::new("app/views_test.py")));
        assert!(filter.eligible(Path::new("app/views.py")));
        assert!(!filter.allows_dir("build"));
        assert!(filter.allows_dir("app"));
    }

    #[test]
    fn test_invalid_extra_pattern() {
        assert!(PathFilter::with_extra(&[], &["[".to_string()]).is_err());
    }

    proptest! {
        #[test]
        fn prop_excluded_dir_anywhere_is_ineligible(
            prefix in prop::collection::vec("[a-z]{1,8}", 0..4),
            dir in prop::sample::select(EXCLUDED_DIRS.to_vec()),
            file in "[a-z]{1,8}\\.(py|sql|md)",
        ) {
            let filter = PathFilter::default();
            let mut parts = prefix.clone();
            parts.push(dir.to_string());
            parts.push(file);
            prop_assert!(!filter.eligible(Path::new(&parts.join("/"))));
        }

        #[test]
        fn prop_plain_source_paths_are_eligible(
            parts in prop::collection::vec("[a-z]{1,8}", 0..4),
            file in "[a-z]{1,8}\\.(py|sql|md)",
        ) {
            let filter = PathFilter::default();
            prop_assume!(!parts.iter().any(|p| EXCLUDED_DIRS.contains(&p.as_str())));
            let mut parts = parts;
            parts.push(file);
            prop_assert!(filter.eligible(Path::new(&parts.join("/"))));
        }
    }
}
