//! Source registration for `require`
//!
//! The resolver turns a reduced `require` path into an [`ImportRequest`] and
//! hands it to the session's [`SourceLoader`]. Loading, parsing and ordering
//! the imported units is the loader's business.

use crate::config::SessionConfig;
use serde::Serialize;
use source_map::SourceSpan;
use std::path::{Path, PathBuf};

/// Handle returned by a loader for a registered source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceHandle(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRequest {
    pub path: PathBuf,
    /// Backend-language source included verbatim
    pub foreign: bool,
    #[serde(skip)]
    pub span: SourceSpan,
}

pub trait SourceLoader {
    /// Register a source; requesting the same path twice yields the same handle
    fn register(&mut self, request: ImportRequest) -> SourceHandle;
}

/// Loader that only records what was requested
#[derive(Debug, Default)]
pub struct ImportCollector {
    requests: Vec<ImportRequest>,
}

impl ImportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[ImportRequest] {
        &self.requests
    }
}

impl SourceLoader for ImportCollector {
    fn register(&mut self, request: ImportRequest) -> SourceHandle {
        if let Some(index) = self.requests.iter().position(|r| r.path == request.path) {
            return SourceHandle(index as u32);
        }
        self.requests.push(request);
        SourceHandle((self.requests.len() - 1) as u32)
    }
}

/// Map a `require` string to the path of the source it names.
///
/// Separators are normalised to `/`. Relative paths are joined to the
/// requesting unit's directory; absolute ones are re-rooted under the
/// configured import root. The native or foreign extension is appended
/// unless the path already carries one of the two.
pub fn resolve_require_path(raw: &str, unit_dir: &Path, foreign: bool, config: &SessionConfig) -> PathBuf {
    let normalized = raw.replace('\\', "/");
    let base = if let Some(stripped) = normalized.strip_prefix('/') {
        config.import_root.join(stripped)
    } else {
        unit_dir.join(&normalized)
    };

    let known = [config.extension.as_str(), config.foreign_extension.as_str()];
    let has_extension = base
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| known.contains(&ext));
    if has_extension {
        return base;
    }

    let ext = if foreign {
        &config.foreign_extension
    } else {
        &config.extension
    };
    let mut with_ext = base.into_os_string();
    with_ext.push(".");
    with_ext.push(ext);
    PathBuf::from(with_ext)
}
