use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Matched documents in sorted path order.
    pub documents: Vec<SourceDocument>,
}

impl ScanResult {
    pub fn files_scanned(&self) -> usize {
        self.documents.len()
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("at least one path or glob pattern is required")]
    NoPatterns,
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("failed to build glob set: {0}")]
    GlobSet(#[source] globset::Error),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Root that relative patterns are matched against.
    pub base_path: PathBuf,
    pub respect_gitignore: bool,
    pub include_node_modules: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            respect_gitignore: true,
            include_node_modules: false,
        }
    }
}

pub fn scan_globs(patterns: &[String], ignore_patterns: &[String]) -> Result<ScanResult, ScanError> {
    scan_globs_with_options(patterns, ignore_patterns, &ScanOptions::default())
}

pub fn scan_globs_with_options(
    patterns: &[String],
    ignore_patterns: &[String],
    options: &ScanOptions,
) -> Result<ScanResult, ScanError> {
    if patterns.is_empty() {
        return Err(ScanError::NoPatterns);
    }

    let globset = build_globset(patterns)?;
    let ignore_set = build_globset(ignore_patterns)?;
    let mut paths = BTreeSet::new();

    for root in walk_roots(patterns, &options.base_path) {
        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(false)
            .git_ignore(options.respect_gitignore)
            .git_global(options.respect_gitignore)
            .git_exclude(options.respect_gitignore);

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(%err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            let relative_path = path.strip_prefix(&options.base_path).unwrap_or(path);
            if !globset.is_match(relative_path) && !globset.is_match(path) {
                continue;
            }
            if ignore_set.is_match(relative_path) || ignore_set.is_match(path) {
                continue;
            }
            if !options.include_node_modules && is_in_node_modules(path) {
                continue;
            }
            paths.insert(path.to_path_buf());
        }
    }

    let documents = paths
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path).map_err(|source| ScanError::Read {
                path: path.clone(),
                source,
            })?;
            Ok(SourceDocument { path, text })
        })
        .collect::<Result<Vec<_>, ScanError>>()?;

    tracing::debug!(files = documents.len(), "scanned documents");
    Ok(ScanResult { documents })
}

/// Longest literal directory prefix of a glob pattern.
pub fn glob_root(pattern: &str) -> PathBuf {
    let Some(first_meta) = pattern.find(['*', '?', '[', '{']) else {
        if pattern.ends_with('/') || pattern.ends_with('\\') {
            return PathBuf::from(pattern);
        }
        let path = Path::new(pattern);
        if path.extension().is_some() {
            return path.parent().unwrap_or(Path::new(".")).to_path_buf();
        }
        return path.to_path_buf();
    };

    let prefix = &pattern[..first_meta];
    match prefix.rfind(['/', '\\']) {
        Some(idx) => PathBuf::from(&prefix[..=idx]),
        None => PathBuf::from("."),
    }
}

fn walk_roots(patterns: &[String], base_path: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let root = if Path::new(pattern).is_absolute() {
            glob_root(pattern)
        } else {
            base_path.to_path_buf()
        };
        if root.exists() && !roots.contains(&root) {
            roots.push(root);
        }
    }
    roots
}

fn is_in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|component| component.as_os_str() == "node_modules")
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(ScanError::GlobSet)
}
