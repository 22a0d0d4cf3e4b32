//! Input file discovery
//!
//! Expands a pattern such as `/data/appsinstalled/*.tsv.gz` into the sorted
//! list of matching files. Wildcards (`*`, `?`) are only allowed in the file
//! name part. Names starting with a dot are files a previous run already
//! marked as processed and never match a pattern that does not itself start
//! with a dot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

fn wildcard_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    Regex::new(&expr).with_context(|| format!("Invalid file pattern: {pattern}"))
}

/// List files matching `pattern`, sorted by path
pub fn discover(pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern_path = Path::new(pattern);
    let name_pattern = pattern_path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Pattern has no file name part: {pattern}"))?;

    let dir = match pattern_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if dir.to_string_lossy().contains(['*', '?']) {
        anyhow::bail!("Wildcards are only supported in the file name: {pattern}");
    }

    let matcher = wildcard_to_regex(name_pattern)?;
    let include_hidden = name_pattern.starts_with('.');

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with('.') && !include_hidden {
            continue;
        }
        if matcher.is_match(name) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_wildcards() {
        let re = wildcard_to_regex("*.tsv.gz").unwrap();
        assert!(re.is_match("20170929000000.tsv.gz"));
        assert!(!re.is_match("20170929000000.tsv"));
        assert!(!re.is_match("a.tsvxgz"));

        let re = wildcard_to_regex("part-?.gz").unwrap();
        assert!(re.is_match("part-1.gz"));
        assert!(!re.is_match("part-12.gz"));
    }

    #[test]
    fn test_discover_skips_processed_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.tsv.gz");
        touch(dir.path(), "a.tsv.gz");
        touch(dir.path(), ".c.tsv.gz");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("d.tsv.gz")).unwrap();

        let pattern = format!("{}/*.tsv.gz", dir.path().display());
        let files = discover(&pattern).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.tsv.gz"), dir.path().join("b.tsv.gz")]
        );
    }

    #[test]
    fn test_discover_rejects_wildcard_directory() {
        assert!(discover("/data/*/x.tsv.gz").is_err());
    }

    #[test]
    fn test_discover_missing_directory() {
        assert!(discover("/definitely/not/here/*.tsv.gz").is_err());
    }
}
