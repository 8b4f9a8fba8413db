use std::collections::HashSet;

use crate::error::QueryError;
use crate::index::PathIndex;
use crate::path::normalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keep only the listed paths.
    Inclusive,
    /// Keep everything except the listed paths.
    Exclusive,
}

/// Immutable projection: a mode plus a set of normalized paths.
#[derive(Debug, Clone)]
pub struct Projection {
    mode: Mode,
    paths: Vec<String>,
    index: PathIndex,
}

impl Projection {
    /// Normalize and index `paths`. Duplicates (including the same path in
    /// both spellings) collapse to their first occurrence.
    pub fn new<I, P>(mode: Mode, paths: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            let path = normalize_path(path.as_ref())?;
            if seen.insert(path.clone()) {
                normalized.push(path);
            }
        }
        if mode == Mode::Inclusive && normalized.is_empty() {
            return Err(QueryError::EmptyInclusive);
        }
        let index = PathIndex::new(&normalized);
        Ok(Self {
            mode,
            paths: normalized,
            index,
        })
    }

    pub fn inclusive<I, P>(paths: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::new(Mode::Inclusive, paths)
    }

    pub fn exclusive<I, P>(paths: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::new(Mode::Exclusive, paths)
    }

    /// An exclusive projection with no paths: copies everything.
    pub fn passthrough() -> Self {
        Self {
            mode: Mode::Exclusive,
            paths: Vec::new(),
            index: PathIndex::new(Vec::<String>::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }
}
