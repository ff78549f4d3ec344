//! Per-file load failures.
//!
//! A `LoadError` never aborts a run: the loader collects them and the report
//! emitter writes them to `load-errors.log`, separate from filter skips.
//! Configuration problems are fatal and surface as `anyhow::Error` instead.

use thiserror::Error;

/// A single input file that could not be turned into a device record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{origin}: {kind}")]
pub struct LoadError {
    /// Source-relative name of the input (e.g. `cheeseburger.yml`).
    pub origin: String,
    pub kind: LoadErrorKind,
}

impl LoadError {
    pub fn new(origin: impl Into<String>, kind: LoadErrorKind) -> Self {
        Self {
            origin: origin.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadErrorKind {
    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("unparseable: {0}")]
    Unparseable(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("malformed '{field}': {detail}")]
    Malformed { field: &'static str, detail: String },

    #[error("duplicate codename '{codename}' (first seen in {first_origin})")]
    DuplicateCodename {
        codename: String,
        first_origin: String,
    },
}

impl LoadErrorKind {
    /// Short tag used in the load error log.
    pub fn tag(&self) -> &'static str {
        match self {
            LoadErrorKind::Unreadable(_) => "unreadable",
            LoadErrorKind::Unparseable(_) => "unparseable",
            LoadErrorKind::MissingField(_) => "missing-field",
            LoadErrorKind::Malformed { .. } => "malformed",
            LoadErrorKind::DuplicateCodename { .. } => "duplicate-codename",
        }
    }

    /// Human-readable detail without the tag.
    pub fn detail(&self) -> String {
        match self {
            LoadErrorKind::Unreadable(detail) | LoadErrorKind::Unparseable(detail) => {
                detail.clone()
            }
            LoadErrorKind::MissingField(field) => format!("missing required field '{field}'"),
            LoadErrorKind::Malformed { field, detail } => format!("'{field}': {detail}"),
            LoadErrorKind::DuplicateCodename {
                codename,
                first_origin,
            } => format!("codename '{codename}' already loaded from {first_origin}"),
        }
    }
}
