//! INI-backed application configuration
//!
//! The store is loaded on first lookup and is read-only afterwards. The file
//! location is resolved in this order:
//!
//! 1. the `CONFIGURATION_PATH` environment variable
//! 2. the path injected at construction (`--config`)
//! 3. `resources/configuration/prod-app.ini`

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{RunnerError, RunnerResult};

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "CONFIGURATION_PATH";

/// Section used by the UI actions
pub const UI_SECTION: &str = "UI";

const DEFAULT_CONFIG_PATH: &str = "resources/configuration/prod-app.ini";

/// Parsed `section -> key -> value` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniTable {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniTable {
    /// Parse INI text.
    ///
    /// Blank lines and `#` comments are skipped. `key = value` lines that
    /// appear before the first `[Section]` header are ignored.
    pub fn parse(content: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].to_string();
                // A repeated header starts the section over.
                sections.insert(name.clone(), HashMap::new());
                current = Some(name);
                continue;
            }

            let Some(section) = current.as_ref() else {
                continue;
            };
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                if let Some(entries) = sections.get_mut(section) {
                    entries.insert(key.to_string(), value.trim().to_string());
                }
            }
        }

        Self { sections }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

/// Process-scoped configuration service
#[derive(Debug, Default)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    table: RwLock<OnceCell<IniTable>>,
}

impl ConfigStore {
    /// Create an unloaded store; `path` is the injected fallback location.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            table: RwLock::new(OnceCell::new()),
        }
    }

    /// Create a store that is already loaded from in-memory text.
    pub fn from_ini(content: &str) -> Self {
        let table = OnceCell::new();
        let _ = table.set(IniTable::parse(content));
        Self {
            path: None,
            table: RwLock::new(table),
        }
    }

    /// Resolve the configuration file location.
    pub fn resolve_path(env_override: Option<OsString>, injected: Option<&Path>) -> PathBuf {
        match env_override.filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => injected
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }

    /// Look up `section.key`, loading the file on first use.
    pub fn get(&self, section: &str, key: &str) -> RunnerResult<String> {
        let cell = self.table.read();
        let table = cell.get_or_try_init(|| self.load())?;
        table.get(section, key).map(str::to_string).ok_or_else(|| {
            RunnerError::ConfigMissing(format!("no key '{}' in section [{}]", key, section))
        })
    }

    /// Shorthand for a key in the `[UI]` section.
    pub fn get_ui(&self, key: &str) -> RunnerResult<String> {
        self.get(UI_SECTION, key)
    }

    pub fn is_loaded(&self) -> bool {
        self.table.read().get().is_some()
    }

    /// Drop the loaded table; the next lookup reads the file again.
    pub fn reset(&self) {
        *self.table.write() = OnceCell::new();
        debug!("Configuration reset");
    }

    fn load(&self) -> RunnerResult<IniTable> {
        let path = Self::resolve_path(std::env::var_os(CONFIG_PATH_ENV), self.path.as_deref());
        if !path.exists() {
            return Err(RunnerError::ConfigMissing(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let table = IniTable::parse(&content);
        info!("Loaded configuration from {}", path.display());
        debug!(sections = table.sections.len(), "Configuration parsed");
        Ok(table)
    }
}
