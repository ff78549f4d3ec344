//! Discovery of raw device records.
//!
//! The loader only sees [`RawRecord`]s, so tests can feed it synthetic
//! input through [`MemorySource`] while real runs use [`DirectorySource`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

const RECORD_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// One input file as text, or the reason it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub origin: String,
    pub contents: Result<String, String>,
}

impl RawRecord {
    pub fn text(origin: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            contents: Ok(contents.into()),
        }
    }

    pub fn unreadable(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            contents: Err(reason.into()),
        }
    }
}

/// A finite, restartable sequence of raw records.
///
/// Every call to `records` starts from the beginning and yields records in
/// ascending origin order.
pub trait RecordSource {
    fn records(&self) -> Box<dyn Iterator<Item = RawRecord> + '_>;
}

/// Device files under a directory tree (`*.yml` / `*.yaml`).
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn discover(&self) -> Vec<Discovered> {
        if !self.root.is_dir() {
            warn!(
                "input directory '{}' not found; reporting on an empty device set",
                self.root.display()
            );
            return Vec::new();
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() || !has_record_extension(entry.path()) {
                        continue;
                    }
                    let origin = self.origin_for(entry.path());
                    found.push(Discovered::File {
                        origin,
                        path: entry.into_path(),
                    });
                }
                Err(err) => {
                    let origin = err
                        .path()
                        .map(|path| self.origin_for(path))
                        .unwrap_or_else(|| self.root.display().to_string());
                    found.push(Discovered::Failed {
                        origin,
                        reason: err.to_string(),
                    });
                }
            }
        }
        found.sort_by(|a, b| a.origin().cmp(b.origin()));
        debug!(
            "discovered {} device files under '{}'",
            found.len(),
            self.root.display()
        );
        found
    }

    fn origin_for(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

impl RecordSource for DirectorySource {
    fn records(&self) -> Box<dyn Iterator<Item = RawRecord> + '_> {
        Box::new(self.discover().into_iter().map(|found| match found {
            Discovered::File { origin, path } => match fs::read_to_string(&path) {
                Ok(text) => RawRecord::text(origin, text),
                Err(err) => {
                    RawRecord::unreadable(origin, format!("reading '{}': {err}", path.display()))
                }
            },
            Discovered::Failed { origin, reason } => RawRecord::unreadable(origin, reason),
        }))
    }
}

enum Discovered {
    File { origin: String, path: PathBuf },
    Failed { origin: String, reason: String },
}

impl Discovered {
    fn origin(&self) -> &str {
        match self {
            Discovered::File { origin, .. } | Discovered::Failed { origin, .. } => origin,
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}

fn has_record_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RECORD_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Records held in memory, yielded in origin order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(mut records: Vec<RawRecord>) -> Self {
        records.sort_by(|a, b| a.origin.cmp(&b.origin));
        Self { records }
    }

    pub fn with_record(mut self, origin: &str, contents: &str) -> Self {
        self.records.push(RawRecord::text(origin, contents));
        self.records.sort_by(|a, b| a.origin.cmp(&b.origin));
        self
    }
}

impl RecordSource for MemorySource {
    fn records(&self) -> Box<dyn Iterator<Item = RawRecord> + '_> {
        Box::new(self.records.iter().cloned())
    }
}
