//! TOML session configuration (`phsc.toml`).
//!
//! ```toml
//! [session]
//! root-object = "Obj"
//! intrinsics = ["print", "len"]
//!
//! [imports]
//! root = "lib"
//! extension = "phs"
//! foreign-extension = "php"
//!
//! [log]
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fully defaulted configuration of one analysis session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Class every root-less class implicitly extends
    pub root_object: Option<String>,
    /// Managed functions registered in the global scope
    pub intrinsics: Vec<String>,
    /// Directory absolute `require` paths are re-rooted under
    pub import_root: PathBuf,
    /// Extension appended to native requires
    pub extension: String,
    /// Extension appended to foreign requires
    pub foreign_extension: String,
    /// `log` level name used by the CLI
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root_object: None,
            intrinsics: Vec::new(),
            import_root: PathBuf::new(),
            extension: "phs".to_string(),
            foreign_extension: "php".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// The raw TOML structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    session: Option<SessionSection>,
    imports: Option<ImportsSection>,
    log: Option<LogSection>,
}

/// `[session]` section.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SessionSection {
    root_object: Option<String>,
    #[serde(default)]
    intrinsics: Vec<String>,
}

/// `[imports]` section.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ImportsSection {
    root: Option<String>,
    extension: Option<String>,
    foreign_extension: Option<String>,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
struct LogSection {
    level: Option<String>,
}

/// Parse a `phsc.toml` document.
pub fn parse_config(content: &str) -> Result<SessionConfig, String> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| format!("Failed to parse phsc.toml: {}", e))?;

    let mut config = SessionConfig::default();

    if let Some(session) = raw.session {
        config.root_object = session.root_object.filter(|name| !name.is_empty());
        config.intrinsics = session.intrinsics;
    }

    if let Some(imports) = raw.imports {
        if let Some(root) = imports.root {
            config.import_root = PathBuf::from(root);
        }
        if let Some(ext) = imports.extension {
            config.extension = normalize_extension(&ext)?;
        }
        if let Some(ext) = imports.foreign_extension {
            config.foreign_extension = normalize_extension(&ext)?;
        }
    }

    if let Some(level) = raw.log.and_then(|log| log.level) {
        if crate::logging::parse_level(&level).is_none() {
            return Err(format!("Unknown log level '{}'", level));
        }
        config.log_level = level;
    }

    Ok(config)
}

/// Read and parse a `phsc.toml` file.
pub fn load_config(path: &Path) -> Result<SessionConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

fn normalize_extension(ext: &str) -> Result<String, String> {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return Err(format!("Invalid source extension '{}'", ext));
    }
    Ok(ext.to_string())
}
