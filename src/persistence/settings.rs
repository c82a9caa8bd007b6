use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const PASSWORD_ENV: &str = "GRAPH_EXPLORER_PASSWORD";
// Password used when running against the built-in debug graph
pub const DEBUG_PASSWORD: &str = "test";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // Bolt connection parameters; the password is never stored
    #[serde(default = "AppSettings::default_uri")]
    pub uri: String,
    #[serde(default = "AppSettings::default_user")]
    pub user: String,
    #[serde(default = "AppSettings::default_database")]
    pub database: String,
    // Use the in-memory sample graph instead of connecting
    #[serde(default)]
    pub debug_mode: bool,
    // Style document for the graph view, edited in the configuration window
    #[serde(default)]
    pub configuration: String,
    // If None, query logs go to the OS temp dir
    #[serde(default)]
    pub query_log_override: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            user: Self::default_user(),
            database: Self::default_database(),
            debug_mode: false,
            configuration: String::new(),
            query_log_override: None,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Graph-Explorer
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Graph-Explorer");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Graph-Explorer
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Graph-Explorer");
            }
            return PathBuf::from("Graph-Explorer");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Graph-Explorer or ~/.config/Graph-Explorer
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Graph-Explorer");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Graph-Explorer");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir().join("settings.json"))
    }

    /// Read settings from `path`, or defaults if there is no such file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_dir())
    }

    pub fn save_to(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Replace the style document with the contents of a file named on the
    /// command line.
    ///
    /// An unreadable file is logged and skipped; the stored document stays.
    pub fn apply_configuration_file(&mut self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(content) => {
                log::info!("using configuration from {}", path.display());
                self.configuration = content;
                true
            }
            Err(e) => {
                log::warn!("ignoring configuration file {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Password for the store connection: the debug password in debug mode,
    /// otherwise taken from the environment.
    pub fn password(&self) -> Option<String> {
        if self.debug_mode {
            return Some(DEBUG_PASSWORD.to_string());
        }
        std::env::var(PASSWORD_ENV).ok()
    }

    pub(crate) fn default_uri() -> String { "bolt://localhost:7687".to_string() }
    pub(crate) fn default_user() -> String { "neo4j".to_string() }
    pub(crate) fn default_database() -> String { "neo4j".to_string() }

    /// Default query log directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Graph-Explorer/query-logs
    pub fn query_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Explorer");
        p.push("query-logs");
        p
    }

    /// Effective query log directory honoring user override or falling back to OS temp.
    pub fn query_log_dir(&self) -> PathBuf {
        if let Some(p) = &self.query_log_override { return p.clone(); }
        Self::query_log_default_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("graph-explorer-settings-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"debug_mode": true}"#).unwrap();
        assert!(s.debug_mode);
        assert_eq!(s.uri, "bolt://localhost:7687");
        assert_eq!(s.password().as_deref(), Some(DEBUG_PASSWORD));
    }

    #[test]
    fn save_then_load_keeps_style_document() {
        let dir = scratch_dir("roundtrip");
        let mut s = AppSettings::default();
        s.configuration = "{ \"node\": { \"color\": \"red\" } }".to_string();
        s.save_to(&dir).unwrap();
        let loaded = AppSettings::load_from(&dir.join("settings.json")).unwrap();
        assert_eq!(loaded, s);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_configuration_file_keeps_current_document() {
        let dir = scratch_dir("config-arg");
        fs::create_dir_all(&dir).unwrap();
        let mut s = AppSettings { configuration: "old".into(), ..Default::default() };
        assert!(!s.apply_configuration_file(&dir.join("missing.js")));
        assert_eq!(s.configuration, "old");

        let file = dir.join("style.js");
        fs::write(&file, "new").unwrap();
        assert!(s.apply_configuration_file(&file));
        assert_eq!(s.configuration, "new");
        let _ = fs::remove_dir_all(&dir);
    }
}
