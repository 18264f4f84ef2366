//! Demo settings.
//!
//! Resolution order (later wins):
//!   1. built-in defaults
//!   2. `config.toml` in the user config dir (or `--config`)
//!   3. environment variables (a `.env` file is loaded first if present)
//!   4. command-line overrides applied by the binary through `with_*`

use crate::agent::TransitionMode;
use crate::{DemoError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_KEYOKU_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_AGENT_ID: &str = "demo-assistant";
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const DEFAULT_SEARCH_MODE: &str = "hybrid";

/// Immutable demo settings. Built once per process and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Keyoku API key (required)
    pub keyoku_api_key: String,

    /// Keyoku service root, without the `/v1` suffix
    pub keyoku_base_url: String,

    /// Chat-completions API key (required)
    pub openai_api_key: String,

    /// Chat-completions base URL
    pub llm_base_url: String,

    pub llm_model: String,
    pub llm_temperature: f32,

    /// Agent id used to scope plain memory chat
    pub agent_id: String,

    /// Fixed session id instead of a generated one
    pub session_id: Option<String>,

    pub search_limit: usize,
    pub search_mode: String,

    /// How the service treats state transitions outside the declared rules
    pub transition_mode: TransitionMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keyoku_api_key: String::new(),
            keyoku_base_url: DEFAULT_KEYOKU_BASE_URL.to_string(),
            openai_api_key: String::new(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_temperature: DEFAULT_LLM_TEMPERATURE,
            agent_id: DEFAULT_AGENT_ID.to_string(),
            session_id: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
            search_mode: DEFAULT_SEARCH_MODE.to_string(),
            transition_mode: TransitionMode::default(),
        }
    }
}

/// On-disk config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub keyoku: KeyokuSection,
    pub llm: LlmSection,
    pub demo: DemoSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeyokuSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub search_limit: Option<usize>,
    pub search_mode: Option<String>,
    pub transition_mode: Option<TransitionMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DemoSection {
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DemoError::Config(e.to_string()))
    }

    /// Read a config file. A missing file is not an error.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No config file at {:?}", path);
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map(Some)
    }
}

impl Settings {
    /// Load settings from `.env`, the config file and the process environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!(".env not loaded: {}", e);
        }

        let path = config_path
            .map(Path::to_path_buf)
            .or_else(default_config_path);
        let file = match path {
            Some(path) => ConfigFile::read(&path)?,
            None => None,
        };

        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge defaults, an optional config file and an environment lookup.
    pub fn resolve(file: Option<ConfigFile>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(file) = file {
            set_opt(&mut settings.keyoku_api_key, file.keyoku.api_key);
            set_opt(&mut settings.keyoku_base_url, file.keyoku.base_url);
            set_opt(&mut settings.search_limit, file.keyoku.search_limit);
            set_opt(&mut settings.search_mode, file.keyoku.search_mode);
            set_opt(&mut settings.transition_mode, file.keyoku.transition_mode);
            set_opt(&mut settings.openai_api_key, file.llm.api_key);
            set_opt(&mut settings.llm_base_url, file.llm.base_url);
            set_opt(&mut settings.llm_model, file.llm.model);
            set_opt(&mut settings.llm_temperature, file.llm.temperature);
            set_opt(&mut settings.agent_id, file.demo.agent_id);
            settings.session_id = file.demo.session_id;
        }

        set_opt(&mut settings.keyoku_api_key, env("KEYOKU_API_KEY"));
        set_opt(&mut settings.keyoku_base_url, env("KEYOKU_BASE_URL"));
        set_opt(&mut settings.openai_api_key, env("OPENAI_API_KEY"));
        set_opt(&mut settings.llm_base_url, env("OPENAI_BASE_URL"));
        set_opt(&mut settings.llm_model, env("LLM_MODEL"));
        set_opt(&mut settings.agent_id, env("AGENT_ID"));

        settings
    }

    /// Validate configuration, returning human-readable errors.
    /// An empty list means the settings are usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.keyoku_api_key.is_empty() {
            errors.push("KEYOKU_API_KEY is required".to_string());
        }
        if self.openai_api_key.is_empty() {
            errors.push("OPENAI_API_KEY is required".to_string());
        }
        errors
    }

    /// Like `validate` but as a single error, for callers that want `?`.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DemoError::Config(errors.join("; ")))
        }
    }

    pub fn with_keyoku_base_url(mut self, url: impl Into<String>) -> Self {
        self.keyoku_base_url = url.into();
        self
    }

    pub fn with_llm_base_url(mut self, url: impl Into<String>) -> Self {
        self.llm_base_url = url.into();
        self
    }

    pub fn with_llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = model.into();
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_transition_mode(mut self, mode: TransitionMode) -> Self {
        self.transition_mode = mode;
        self
    }
}

/// `$CONFIG_DIR/keyoku-demo/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir().map(|d| d.join("keyoku-demo").join("config.toml"));
    if path.is_none() {
        warn!("Could not resolve the user config directory");
    }
    path
}

/// Overwrite `slot` with a non-empty value.
fn set_opt<T: IsBlank>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        if !value.is_blank() {
            *slot = value;
        }
    }
}

trait IsBlank {
    fn is_blank(&self) -> bool {
        false
    }
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl IsBlank for usize {}
impl IsBlank for f32 {}
impl IsBlank for TransitionMode {}
