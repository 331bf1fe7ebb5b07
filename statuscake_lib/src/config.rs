//! Layered configuration lookup for StatusCake credentials.
//!
//! Values are read from INI files, in order, with later files overriding earlier ones
//! for the same section/key. Two environment variables override every file:
//! - `STATUSCAKE_ENDPOINT` answers any lookup of the `endpoint` key
//! - `STATUSCAKE_API_KEY` answers any lookup of the `api_key` key
//!
//! Default search path (general to specific):
//! `/etc/statuscake.conf`, `~/.statuscake.conf`, `./statuscake.conf`.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/statuscake.conf";
/// Dotfile looked up in the user's home directory.
pub const USER_CONFIG_FILE: &str = ".statuscake.conf";
/// File looked up in the current working directory.
pub const LOCAL_CONFIG_FILE: &str = "statuscake.conf";

pub const ENDPOINT_ENV: &str = "STATUSCAKE_ENDPOINT";
pub const API_KEY_ENV: &str = "STATUSCAKE_API_KEY";

type Section = HashMap<String, String>;

/// Ordered default lookup path. Locations that cannot be determined are left out.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(USER_CONFIG_FILE));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(LOCAL_CONFIG_FILE));
    }
    paths
}

/// Environment variable that overrides `key`, if any.
fn env_override_for(key: &str) -> Option<&'static str> {
    match key {
        "endpoint" => Some(ENDPOINT_ENV),
        "api_key" => Some(API_KEY_ENV),
        _ => None,
    }
}

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
fn env_var_or_none(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Merged view over an ordered list of INI files plus environment overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationManager {
    paths: Vec<PathBuf>,
    sections: HashMap<String, Section>,
}

impl ConfigurationManager {
    /// Load the default search path, quietly skipping files that do not exist.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_paths(default_config_paths())
    }

    /// Load an explicit ordered list of files; later files win. Missing or unreadable files are skipped.
    pub fn with_paths<I, P>(paths: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut manager = Self {
            paths: paths.into_iter().map(Into::into).collect(),
            sections: HashMap::new(),
        };
        for path in manager.paths.clone() {
            manager.read(&path)?;
        }
        Ok(manager)
    }

    /// Load a single custom file in place of the default search path.
    ///
    /// Unlike the layered lookup, a missing or unreadable file here is an error.
    pub fn with_config_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.is_file() {
            return Err(ConfigError::NotFound { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut manager = Self {
            paths: vec![path.clone()],
            sections: HashMap::new(),
        };
        manager.merge(&path, &content)?;
        Ok(manager)
    }

    /// Files this manager was built from, in lookup order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Merge the INI file at `path` over the current state.
    ///
    /// Returns `Ok(false)` when the file does not exist or cannot be read; only a
    /// malformed file is an error.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<bool, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "config file not present, skipping");
                return Ok(false);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "config file unreadable, skipping");
                return Ok(false);
            }
        };
        self.merge(path, &content)?;
        Ok(true)
    }

    fn merge(&mut self, path: &Path, content: &str) -> Result<(), ConfigError> {
        let parsed = parse_ini(content).map_err(|(line, message)| ConfigError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        })?;
        for (name, values) in parsed {
            self.sections.entry(name).or_default().extend(values);
        }
        debug!(path = %path.display(), "loaded config file");
        Ok(())
    }

    /// Look up `section.key`.
    ///
    /// `endpoint` and `api_key` are answered from the environment first, whatever the section.
    /// `None` means no source provides a value.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        let key = key.to_lowercase();
        if let Some(value) = env_override_for(&key).and_then(env_var_or_none) {
            return Some(value);
        }
        self.sections
            .get(section)
            .and_then(|s| s.get(&key))
            .cloned()
    }
}

/// Parse an INI document into sections. Errors carry the 1-based line number.
fn parse_ini(content: &str) -> Result<Vec<(String, Section)>, (usize, String)> {
    let mut sections: Vec<(String, Section)> = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| (line_no, format!("malformed section header: {}", line)))?;
            sections.push((name.to_string(), Section::new()));
            continue;
        }
        let sep = line
            .find(['=', ':'])
            .ok_or_else(|| (line_no, format!("expected `key = value`, got: {}", line)))?;
        let key = line[..sep].trim().to_lowercase();
        if key.is_empty() {
            return Err((line_no, "empty key".to_string()));
        }
        let value = line[sep + 1..].trim().to_string();
        let (_, current) = sections
            .last_mut()
            .ok_or_else(|| (line_no, "key/value pair before any section header".to_string()))?;
        current.insert(key, value);
    }
    Ok(sections)
}
