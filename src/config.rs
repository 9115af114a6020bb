// Configuration management module
// Bridges the plugin's settings slice in the host settings store

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use toml::{Table, Value};

/// Identifier the host scopes this plugin's settings under
pub const PLUGIN_IDENTIFIER: &str = "ch.lqvp.listenbrainz";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Base URL of the ListenBrainz-compatible API
    pub url: String,

    /// User token sent as `Authorization: Token <key>`
    pub api_key: String,

    /// Report "Apple Music" instead of "Cider" as the player and client
    pub use_apple_music_client_name: bool,

    /// Master switch for both event handlers
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "https://api.listenbrainz.org".to_string(),
            api_key: String::new(),
            use_apple_music_client_name: true,
            enabled: false,
        }
    }
}

/// Host settings storage, addressed by plugin identifier
pub trait SettingsStore: Send + Sync {
    /// Read the plugin's section, `None` when nothing was persisted yet
    fn load_section(&self, identifier: &str) -> Result<Option<Table>>;

    /// Replace the plugin's section, leaving every other section untouched
    fn save_section(&self, identifier: &str, section: &Table) -> Result<()>;
}

/// Settings document stored as TOML on disk, sections under `[plugins."<identifier>"]`
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the default settings file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;

        Ok(config_dir.join("cider_listenbrainz.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Table> {
        if !self.path.exists() {
            return Ok(Table::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file {:?}", self.path))?;

        content
            .parse::<Table>()
            .with_context(|| format!("Failed to parse settings file {:?}", self.path))
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_section(&self, identifier: &str) -> Result<Option<Table>> {
        let document = self.read_document()?;

        let section = document
            .get("plugins")
            .and_then(Value::as_table)
            .and_then(|plugins| plugins.get(identifier))
            .and_then(Value::as_table)
            .cloned();

        Ok(section)
    }

    fn save_section(&self, identifier: &str, section: &Table) -> Result<()> {
        let mut document = self.read_document()?;

        let plugins = document
            .entry("plugins")
            .or_insert(Value::Table(Table::new()));
        if !plugins.is_table() {
            *plugins = Value::Table(Table::new());
        }
        if let Value::Table(plugins) = plugins {
            plugins.insert(identifier.to_string(), Value::Table(section.clone()));
        }

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let content = toml::to_string_pretty(&document).context("Failed to serialize settings")?;

        fs::write(&self.path, content).context("Failed to write settings file")?;

        log::debug!("Settings saved to {:?}", self.path);

        Ok(())
    }
}

/// In-memory settings store, for embedding and tests
#[derive(Default)]
pub struct MemorySettingsStore {
    sections: Mutex<Table>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a section as if a previous session had persisted it
    pub fn with_section(identifier: &str, section: Table) -> Self {
        let mut sections = Table::new();
        sections.insert(identifier.to_string(), Value::Table(section));
        Self {
            sections: Mutex::new(sections),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_section(&self, identifier: &str) -> Result<Option<Table>> {
        let sections = self.sections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(sections
            .get(identifier)
            .and_then(Value::as_table)
            .cloned())
    }

    fn save_section(&self, identifier: &str, section: &Table) -> Result<()> {
        let mut sections = self.sections.lock().unwrap_or_else(PoisonError::into_inner);
        sections.insert(identifier.to_string(), Value::Table(section.clone()));
        Ok(())
    }
}

/// Recursively overlay `overlay` onto `base`; overlay wins on conflicting leaves
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => merge_tables(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn config_to_table(config: &Config) -> Result<Table> {
    match Value::try_from(config).context("Failed to serialize config")? {
        Value::Table(table) => Ok(table),
        other => anyhow::bail!("Config serialized to a non-table value: {}", other.type_str()),
    }
}

struct BridgeState {
    config: Config,
    /// Full persisted section, including keys this version does not know
    section: Table,
}

/// Live view of the plugin's configuration; every accepted mutation is saved
pub struct ConfigBridge {
    identifier: String,
    store: Box<dyn SettingsStore>,
    state: RwLock<BridgeState>,
}

impl ConfigBridge {
    /// Merge the defaults with whatever the store already holds and persist the result
    pub fn setup(store: Box<dyn SettingsStore>, identifier: &str) -> Result<Self> {
        let mut section = config_to_table(&Config::default())?;

        let persisted = store
            .load_section(identifier)
            .with_context(|| format!("Failed to load settings for {}", identifier))?;
        match persisted {
            Some(persisted) => merge_tables(&mut section, persisted),
            None => log::info!("No saved settings for {}, using defaults", identifier),
        }

        let config = Value::Table(section.clone())
            .try_into::<Config>()
            .with_context(|| format!("Invalid settings for {}", identifier))?;

        store
            .save_section(identifier, &section)
            .with_context(|| format!("Failed to save settings for {}", identifier))?;

        Ok(Self {
            identifier: identifier.to_string(),
            store,
            state: RwLock::new(BridgeState { config, section }),
        })
    }

    /// Snapshot of the current configuration
    pub fn get(&self) -> Config {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config
            .clone()
    }

    /// Apply a mutation and persist it; on a failed save nothing changes
    pub fn update<F>(&self, mutate: F) -> Result<Config>
    where
        F: FnOnce(&mut Config),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let mut config = state.config.clone();
        mutate(&mut config);

        let mut section = state.section.clone();
        merge_tables(&mut section, config_to_table(&config)?);
        self.save(&section)?;

        state.config = config.clone();
        state.section = section;

        Ok(config)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    fn save(&self, section: &Table) -> Result<()> {
        self.store
            .save_section(&self.identifier, section)
            .with_context(|| format!("Failed to save settings for {}", self.identifier))?;
        log::info!("Settings for {} saved", self.identifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Store wrapper that lets a test inspect what was persisted after handing it to the bridge
    struct SharedStore(Arc<MemorySettingsStore>);

    impl SettingsStore for SharedStore {
        fn load_section(&self, identifier: &str) -> Result<Option<Table>> {
            self.0.load_section(identifier)
        }

        fn save_section(&self, identifier: &str, section: &Table) -> Result<()> {
            self.0.save_section(identifier, section)
        }
    }

    fn table(source: &str) -> Table {
        source.parse().unwrap()
    }

    #[test]
    fn defaults_when_nothing_persisted() {
        let bridge = ConfigBridge::setup(Box::new(MemorySettingsStore::new()), PLUGIN_IDENTIFIER).unwrap();

        let config = bridge.get();
        assert_eq!(config, Config::default());
        assert_eq!(config.url, "https://api.listenbrainz.org");
        assert!(config.use_apple_music_client_name);
        assert!(!config.enabled);
    }

    #[test]
    fn persisted_values_win_over_defaults() {
        let store = MemorySettingsStore::with_section(
            PLUGIN_IDENTIFIER,
            table("apiKey = \"secret\"\nenabled = true\n"),
        );
        let bridge = ConfigBridge::setup(Box::new(store), PLUGIN_IDENTIFIER).unwrap();

        let config = bridge.get();
        assert_eq!(config.api_key, "secret");
        assert!(config.enabled);
        assert_eq!(config.url, "https://api.listenbrainz.org");
        assert!(config.use_apple_music_client_name);
    }

    #[test]
    fn setup_writes_merged_section_back() {
        let store = Arc::new(MemorySettingsStore::with_section(
            PLUGIN_IDENTIFIER,
            table("enabled = true\nlegacy = \"kept\"\n"),
        ));
        ConfigBridge::setup(Box::new(SharedStore(store.clone())), PLUGIN_IDENTIFIER).unwrap();

        let saved = store.load_section(PLUGIN_IDENTIFIER).unwrap().unwrap();
        assert_eq!(saved.get("enabled"), Some(&Value::Boolean(true)));
        assert_eq!(saved.get("apiKey"), Some(&Value::String(String::new())));
        assert_eq!(saved.get("legacy"), Some(&Value::String("kept".to_string())));
    }

    #[test]
    fn update_persists_every_change() {
        let store = Arc::new(MemorySettingsStore::new());
        let bridge = ConfigBridge::setup(Box::new(SharedStore(store.clone())), PLUGIN_IDENTIFIER).unwrap();

        bridge.update(|cfg| cfg.api_key = "token-1".to_string()).unwrap();
        bridge.update(|cfg| cfg.enabled = true).unwrap();

        let saved = store.load_section(PLUGIN_IDENTIFIER).unwrap().unwrap();
        assert_eq!(saved.get("apiKey"), Some(&Value::String("token-1".to_string())));
        assert_eq!(saved.get("enabled"), Some(&Value::Boolean(true)));
        assert_eq!(bridge.get().api_key, "token-1");
    }

    #[test]
    fn malformed_values_are_not_validated() {
        let bridge = ConfigBridge::setup(Box::new(MemorySettingsStore::new()), PLUGIN_IDENTIFIER).unwrap();
        let config = bridge.update(|cfg| cfg.url = "not a url".to_string()).unwrap();
        assert_eq!(config.url, "not a url");
    }

    #[test]
    fn wrongly_typed_setting_is_an_error() {
        let store = MemorySettingsStore::with_section(PLUGIN_IDENTIFIER, table("enabled = \"yes\"\n"));
        assert!(ConfigBridge::setup(Box::new(store), PLUGIN_IDENTIFIER).is_err());
    }

    #[test]
    fn nested_tables_merge_recursively() {
        let mut base = table("[a]\nx = 1\ny = 2\n");
        merge_tables(&mut base, table("[a]\ny = 3\nz = 4\n"));

        let a = base.get("a").and_then(Value::as_table).unwrap();
        assert_eq!(a.get("x"), Some(&Value::Integer(1)));
        assert_eq!(a.get("y"), Some(&Value::Integer(3)));
        assert_eq!(a.get("z"), Some(&Value::Integer(4)));
    }

    #[test]
    fn file_store_keeps_other_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[plugins.\"other.plugin\"]\ntheme = \"dark\"\n").unwrap();

        let bridge = ConfigBridge::setup(Box::new(FileSettingsStore::new(&path)), PLUGIN_IDENTIFIER).unwrap();
        bridge.update(|cfg| cfg.enabled = true).unwrap();

        let store = FileSettingsStore::new(&path);
        let other = store.load_section("other.plugin").unwrap().unwrap();
        assert_eq!(other.get("theme"), Some(&Value::String("dark".to_string())));

        let reopened = ConfigBridge::setup(Box::new(store), PLUGIN_IDENTIFIER).unwrap();
        assert!(reopened.get().enabled);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("absent.toml"));
        assert!(store.load_section(PLUGIN_IDENTIFIER).unwrap().is_none());
    }
}
