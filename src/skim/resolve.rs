// src/skim/resolve.rs
// Source resolution: file paths, directory walks, and glob expansion

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::language::Language;
use crate::error::{DevToolsError, Result};

/// Caps preventing pathological glob expansion.
pub const MAX_PATTERN_LEN: usize = 500;
pub const MAX_RECURSIVE_WILDCARDS: usize = 5;

/// Expand a list of file paths, directory paths, and glob patterns into a
/// deduplicated file list preserving first-seen order.
pub fn resolve_sources(sources: &[String]) -> Result<Vec<PathBuf>> {
    if sources.is_empty() {
        return Err(DevToolsError::InvalidInput(
            "source must contain at least one path or pattern".to_string(),
        ));
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut resolved: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf, seen: &mut HashSet<PathBuf>| {
        if seen.insert(path.clone()) {
            resolved.push(path);
        }
    };

    for source in sources {
        validate_pattern(source)?;
        let path = Path::new(source);
        if path.is_file() {
            // Explicit files bypass the extension gate; unsupported types
            // surface later as a per-file language-detection error.
            push(path.to_path_buf(), &mut seen);
        } else if path.is_dir() {
            for file in walk_directory(path) {
                push(file, &mut seen);
            }
        } else {
            for file in expand_glob(source)? {
                push(file, &mut seen);
            }
        }
    }

    if resolved.is_empty() {
        return Err(DevToolsError::InvalidInput(format!(
            "no supported source files matched: {}",
            sources.join(", ")
        )));
    }
    Ok(resolved)
}

/// Reject over-long patterns and excessive `**` use before expansion.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(DevToolsError::InvalidInput(format!(
            "source pattern exceeds {MAX_PATTERN_LEN} characters"
        )));
    }
    let recursive = pattern.matches("**").count();
    if recursive > MAX_RECURSIVE_WILDCARDS {
        return Err(DevToolsError::InvalidInput(format!(
            "source pattern uses {recursive} recursive wildcards (max {MAX_RECURSIVE_WILDCARDS})"
        )));
    }
    Ok(())
}

/// Recursive walk skipping dot-entries (except the walk root itself),
/// keeping only files with supported extensions.
fn walk_directory(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_supported_extension(path))
        .collect()
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| DevToolsError::InvalidInput(format!("invalid glob {pattern:?}: {e}")))?;
    Ok(paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter(|path| has_supported_extension(path))
        .collect())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn has_supported_extension(path: &Path) -> bool {
    Language::from_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x = 1\n").unwrap();
    }

    #[test]
    fn test_explicit_file_and_dedup_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        touch(&a);
        touch(&b);

        let sources = vec![
            b.display().to_string(),
            a.display().to_string(),
            b.display().to_string(), // duplicate
        ];
        let resolved = resolve_sources(&sources).unwrap();
        assert_eq!(resolved, vec![b, a], "first-seen order, duplicates dropped");
    }

    #[test]
    fn test_directory_walk_skips_hidden_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.py"));
        touch(&dir.path().join("notes.txt"));
        fs::create_dir(dir.path().join(".git")).unwrap();
        touch(&dir.path().join(".git/config.py"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub/b.go"));

        let resolved = resolve_sources(&[dir.path().display().to_string()]).unwrap();
        let names: Vec<String> = resolved
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"a.py".to_string()));
        assert!(names.contains(&"b.go".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
        assert!(!names.contains(&"config.py".to_string()), "hidden dir skipped");
    }

    #[test]
    fn test_hidden_root_is_walked() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".work");
        fs::create_dir(&hidden).unwrap();
        touch(&hidden.join("a.py"));

        let resolved = resolve_sources(&[hidden.display().to_string()]).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_glob_expansion() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.py"));
        touch(&dir.path().join("b.py"));
        touch(&dir.path().join("c.txt"));

        let pattern = format!("{}/*.py", dir.path().display());
        let resolved = resolve_sources(&[pattern]).unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_directory_equals_glob_of_directory() {
        // Law: resolve([dir]) == resolve([glob of all supported files under dir])
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.py"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub/b.py"));

        let by_dir: HashSet<PathBuf> = resolve_sources(&[dir.path().display().to_string()])
            .unwrap()
            .into_iter()
            .collect();
        let by_glob: HashSet<PathBuf> =
            resolve_sources(&[format!("{}/**/*.py", dir.path().display())])
                .unwrap()
                .into_iter()
                .collect();
        assert_eq!(by_dir, by_glob);
    }

    #[test]
    fn test_pattern_length_cap() {
        let long = "x".repeat(MAX_PATTERN_LEN + 1);
        assert!(matches!(
            resolve_sources(&[long]),
            Err(DevToolsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_recursive_wildcard_cap() {
        let pattern = "/a/**/b/**/c/**/d/**/e/**/f/**/*.py".to_string();
        assert!(matches!(
            validate_pattern(&pattern),
            Err(DevToolsError::InvalidInput(_))
        ));
        assert!(validate_pattern("/a/**/b/**/*.py").is_ok());
    }

    #[test]
    fn test_nothing_matched_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.py", dir.path().display());
        assert!(matches!(
            resolve_sources(&[pattern]),
            Err(DevToolsError::InvalidInput(_))
        ));
    }
}
