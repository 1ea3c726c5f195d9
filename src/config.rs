use crate::error::{CatalogMatchError, Result};
use crate::matcher::{EmptyPolicy, MatchOptions, PipelineMode, StageSpec};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Header names for the catalog sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogColumns {
    pub item_code: String,
    pub category_code: String,
    pub manufacturer: String,
    pub brand: String,
    pub pack_type: String,
    pub quantity: String,
    pub unit: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            item_code: "itemcode".into(),
            category_code: "catcode".into(),
            manufacturer: "company".into(),
            brand: "brand".into(),
            pack_type: "packtype".into(),
            quantity: "qty".into(),
            unit: "uom".into(),
        }
    }
}

/// Header names for the transaction sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionColumns {
    pub item_code: String,
    pub category: String,
    pub manufacturer: String,
    pub brand: String,
    pub pack_type: String,
    pub pack_size: String,
    pub description: String,
}

impl Default for TransactionColumns {
    fn default() -> Self {
        Self {
            item_code: "ITEMCODE".into(),
            category: "CATEGORY".into(),
            manufacturer: "MANUFACTURE".into(),
            brand: "BRAND".into(),
            pack_type: "PACKTYPE".into(),
            pack_size: "PACKSIZE".into(),
            description: "ITEMDESC".into(),
        }
    }
}

/// Decision service (Ollama-compatible chat endpoint)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub retry_backoff_ms: u64,
    pub max_concurrent: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2:3b".into(),
            timeout_seconds: 30,
            retry_backoff_ms: 500,
            max_concurrent: 4,
            temperature: 0.2,
            top_p: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: PipelineMode,
    /// Overrides `mode` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StageSpec>>,
    pub top_k: usize,
    pub top_n: usize,
    pub on_empty: EmptyPolicy,
    /// 0 = every available core
    pub workers: usize,
    pub transaction_sheet: Option<String>,
    pub catalog_columns: CatalogColumns,
    pub transaction_columns: TransactionColumns,
    /// Built-in synonym preset (`retail` or `none`)
    pub synonym_preset: String,
    /// JSON file merged over the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms_path: Option<PathBuf>,
    pub service: ServiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CatalogMatchError::Config("Home directory not found".into()))?;
        Ok(home.join(".config").join("catalog-match").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            mode: PipelineMode::Fuzzy,
            stages: None,
            top_k: 5,
            top_n: 3,
            on_empty: EmptyPolicy::NoMatch,
            workers: 0,
            transaction_sheet: None,
            catalog_columns: CatalogColumns::default(),
            transaction_columns: TransactionColumns::default(),
            synonym_preset: "retail".into(),
            synonyms_path: None,
            service: ServiceConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(CatalogMatchError::Config("top_k must be at least 1".into()));
        }
        if self.top_n == 0 {
            return Err(CatalogMatchError::Config("top_n must be at least 1".into()));
        }
        if self.service.max_concurrent == 0 {
            return Err(CatalogMatchError::Config(
                "service.max_concurrent must be at least 1".into(),
            ));
        }
        if matches!(&self.stages, Some(stages) if stages.is_empty()) {
            return Err(CatalogMatchError::Config("stages must not be empty".into()));
        }
        Ok(())
    }

    /// Stage list in effect: explicit stages, else the mode preset.
    pub fn stage_specs(&self) -> Vec<StageSpec> {
        self.stages.clone().unwrap_or_else(|| self.mode.stages())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            top_k: self.top_k,
            top_n: self.top_n,
            on_empty: self.on_empty,
        }
    }
}
