//! Configuration for Promptlab
//!
//! Read from `<config dir>/promptlab/config.toml` when present. Every key is
//! optional; missing keys fall back to the built-in defaults. The model can
//! also be picked with `PROMPTLAB_MODEL`.

use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::lab::{VariantId, DEFAULT_SESSION_MINUTES};
use crate::{LabError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_USER_NAME: &str = "Alice";
const MODEL_ENV: &str = "PROMPTLAB_MODEL";

/// Partial config.toml parsing.
#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    #[serde(default)]
    user: UserToml,
    #[serde(default)]
    templates: TemplatesToml,
}

#[derive(Debug, Default, Deserialize)]
struct UserToml {
    name: Option<String>,
    session_minutes: Option<u32>,
    summaries: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplatesToml {
    prompt_a: Option<String>,
    prompt_b: Option<String>,
}

/// Configuration for a lab session
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// Gemini model id, e.g. `models/gemini-2.0-flash-exp`
    pub model: String,

    /// API root the model path is appended to
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Initial user name
    pub user_name: String,

    /// Initial session length in minutes
    pub session_minutes: u32,

    /// Initial previous-session summaries
    pub summaries: String,

    /// Seed templates for Prompt-A and Prompt-B
    pub templates: [String; 2],

    /// Where the config was (or would be) read from; templates are saved here
    pub config_file: PathBuf,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            session_minutes: DEFAULT_SESSION_MINUTES,
            summaries: String::new(),
            templates: [
                VariantId::A.default_template().to_string(),
                VariantId::B.default_template().to_string(),
            ],
            config_file: default_config_file(),
        }
    }
}

/// `<config dir>/promptlab/config.toml`
pub fn default_config_file() -> PathBuf {
    config_home().join("config.toml")
}

/// Directory holding the config file and the TUI log
pub fn config_home() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptlab")
}

impl LabConfig {
    /// Load config from `path` (or the default location). A missing file is
    /// not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = path.map(Path::to_path_buf).unwrap_or_else(default_config_file);

        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let config = Self::from_toml_str(&content)
                .map_err(|e| LabError::Config(format!("{}: {e}", config_file.display())))?;
            info!("Loaded config from {}", config_file.display());
            config
        } else {
            debug!("No config at {}, using defaults", config_file.display());
            Self::default()
        };
        config.config_file = config_file;

        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                debug!("{MODEL_ENV} overrides model: {model}");
                config.model = model.trim().to_string();
            }
        }

        Ok(config)
    }

    /// Parse config file contents on top of the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: ConfigToml =
            toml::from_str(content).map_err(|e| LabError::Config(e.to_string()))?;
        let mut config = Self::default();

        if let Some(model) = parsed.model {
            config.model = model;
        }
        if let Some(base_url) = parsed.base_url {
            config.base_url = base_url;
        }
        if let Some(env) = parsed.api_key_env {
            config.api_key_env = env;
        }
        if let Some(name) = parsed.user.name {
            config.user_name = name;
        }
        if let Some(minutes) = parsed.user.session_minutes {
            config.session_minutes = minutes;
        }
        if let Some(summaries) = parsed.user.summaries {
            config.summaries = summaries;
        }
        if let Some(tpl) = parsed.templates.prompt_a {
            config.templates[VariantId::A.index()] = tpl;
        }
        if let Some(tpl) = parsed.templates.prompt_b {
            config.templates[VariantId::B.index()] = tpl;
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = env.into();
        self
    }

    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = path;
        self
    }

    /// The API key from the environment, if set and non-blank
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn template(&self, id: VariantId) -> &str {
        &self.templates[id.index()]
    }
}

/// Write a template to `[templates]` in the config file, keeping the rest
/// of the file (comments and ordering included) untouched.
pub fn save_template(config_file: &Path, id: VariantId, template: &str) -> Result<()> {
    if let Some(parent) = config_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let existing = if config_file.exists() {
        std::fs::read_to_string(config_file)?
    } else {
        String::new()
    };

    let mut doc: toml_edit::DocumentMut = existing
        .parse()
        .map_err(|e| LabError::Config(format!("{}: {e}", config_file.display())))?;

    {
        let root = doc.as_table_mut();
        let existing_templates = root.get("templates").cloned();
        if existing_templates.as_ref().is_none_or(|i| !i.is_table()) {
            let mut templates_tbl = toml_edit::Table::new();

            // Keep entries of an inline `templates = { ... }`
            if let Some(inline_tbl) =
                existing_templates.as_ref().and_then(|i| i.as_inline_table())
            {
                for (k, v) in inline_tbl.iter() {
                    templates_tbl.insert(k, toml_edit::Item::Value(v.clone()));
                }
            }
            root.insert("templates", toml_edit::Item::Table(templates_tbl));
        }
    }

    let templates_tbl = doc["templates"]
        .as_table_mut()
        .ok_or_else(|| LabError::Config("templates table missing after initialization".into()))?;
    templates_tbl[id.config_key()] = toml_edit::value(template);

    std::fs::write(config_file, doc.to_string())?;
    info!("Saved {} template to {}", id, config_file.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LabConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.user_name, "Alice");
        assert_eq!(config.session_minutes, 5);
        assert_eq!(config.template(VariantId::A), VariantId::A.default_template());
        assert_eq!(config.template(VariantId::B), VariantId::B.default_template());
    }

    #[test]
    fn test_partial_toml() {
        let config = LabConfig::from_toml_str(
            r#"
model = "models/gemini-1.5-flash"

[user]
name = "Sam"

[templates]
prompt_b = "<>Userinfo</>\nBe blunt."
"#,
        )
        .unwrap();
        assert_eq!(config.model, "models/gemini-1.5-flash");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.user_name, "Sam");
        assert_eq!(config.session_minutes, 5);
        assert_eq!(config.template(VariantId::A), VariantId::A.default_template());
        assert_eq!(config.template(VariantId::B), "<>Userinfo</>\nBe blunt.");
    }

    #[test]
    fn test_invalid_toml() {
        let err = LabConfig::from_toml_str("model = [").unwrap_err();
        assert!(matches!(err, LabError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        let config = LabConfig::load(Some(&path)).unwrap();
        assert_eq!(config.config_file, path);
        assert_eq!(config.user_name, DEFAULT_USER_NAME);
    }

    #[test]
    fn test_save_template_preserves_other_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "# my lab\nmodel = \"models/x\"\n\n[user]\nname = \"Sam\"\n",
        )
        .unwrap();

        save_template(&path, VariantId::A, "<>Userinfo</>\nNew A").unwrap();
        save_template(&path, VariantId::B, "B!").unwrap();
        save_template(&path, VariantId::A, "A again").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# my lab\n"));

        let config = LabConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.model, "models/x");
        assert_eq!(config.user_name, "Sam");
        assert_eq!(config.template(VariantId::A), "A again");
        assert_eq!(config.template(VariantId::B), "B!");
    }

    #[test]
    fn test_save_template_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        save_template(&path, VariantId::B, "line one\nline two").unwrap();
        let config = LabConfig::from_toml_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.template(VariantId::B), "line one\nline two");
    }
}
