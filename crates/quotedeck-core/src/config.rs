use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{SortField, SortSpec};

/// Root application configuration, loaded from `~/.config/quotedeck/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub list: ListConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token_env: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub page_size: usize,
    pub sort_field: String,
    pub sort_ascending: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.quote-me.anystupididea.com".to_string(),
            token_env: "QUOTEDECK_TOKEN".to_string(),
            api_key_env: "QUOTEDECK_API_KEY".to_string(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            sort_field: "created_at".to_string(),
            sort_ascending: false,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/quotedeck/config.toml`
    pub fn config_path() -> PathBuf {
        // Allow override via env var
        if let Ok(path) = std::env::var("QUOTEDECK_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("quotedeck")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Sort preference ───────────────────────────────────

    /// The persisted sort order. Unknown field names are an error rather
    /// than a silent fallback, so a typo in the file is caught early.
    pub fn sort_spec(&self) -> Result<SortSpec> {
        let field: SortField = self.list.sort_field.parse()?;
        Ok(SortSpec::new(field, self.list.sort_ascending))
    }

    /// Record a new sort order for the next session.
    pub fn set_sort_spec(&mut self, spec: SortSpec) {
        self.list.sort_field = spec.field.as_param().to_string();
        self.list.sort_ascending = spec.ascending;
    }
}
