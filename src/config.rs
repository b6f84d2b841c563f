//! Configuration management for doc-translate.
//!
//! Handles loading, saving, and validating the TOML configuration that
//! describes the docs layout, the chat-completion providers and the
//! category labels.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config filename, resolved against the working directory.
pub const CONFIG_FILENAME: &str = "translate.toml";

/// Placeholder value for unconfigured API keys.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

const DEFAULT_API_PATH: &str = "/v1/chat/completions";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source and output tree layout.
    pub paths: PathsConfig,

    /// Provider tried first.
    pub primary: ProviderConfig,

    /// Provider tried once the primary has exhausted its retries.
    pub fallback: Option<ProviderConfig>,

    /// Retry and pacing settings.
    pub translation: TranslationConfig,

    /// LLM prompts.
    pub prompts: PromptsConfig,

    /// Sidebar category descriptors.
    pub categories: CategoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            primary: ProviderConfig::default(),
            fallback: Some(ProviderConfig::openai()),
            translation: TranslationConfig::default(),
            prompts: PromptsConfig::default(),
            categories: CategoryConfig::default(),
        }
    }
}

/// Docs tree layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the English documents.
    pub source_dir: PathBuf,

    /// Root of the translated documents.
    pub output_dir: PathBuf,

    /// File extensions to translate, with the leading dot.
    pub extensions: Vec<String>,

    /// Directory names skipped anywhere in the source tree.
    pub exclude_dirs: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("docs"),
            output_dir: PathBuf::from("i18n/zh/docusaurus-plugin-content-docs/current"),
            extensions: vec![".md".to_string(), ".mdx".to_string()],
            exclude_dirs: vec!["zh".to_string()],
        }
    }
}

/// Connection settings for one OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Display name used in log output.
    pub name: String,

    /// Base URL for the API, without the request path.
    pub base_url: String,

    /// Request path appended to `base_url`.
    pub api_path: String,

    /// Model identifier.
    pub model: String,

    /// API key. Leave empty to read it from `key_env`.
    pub key: String,

    /// Environment variable holding the API key.
    pub key_env: Option<String>,

    /// Sampling temperature.
    pub temperature: f64,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "deepseek".to_string(),
            base_url: "https://api.deepseek.com".to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            model: "deepseek-chat".to_string(),
            key: API_KEY_PLACEHOLDER.to_string(),
            key_env: Some("DEEPSEEK_API_KEY".to_string()),
            temperature: 1.3,
            max_tokens: 8000,
        }
    }
}

impl ProviderConfig {
    /// Default fallback provider.
    pub fn openai() -> Self {
        Self {
            name: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            model: "gpt-4o-mini".to_string(),
            key: String::new(),
            key_env: Some("OPENAI_API_KEY".to_string()),
            temperature: 0.1,
            max_tokens: 8000,
        }
    }

    /// Full URL of the chat-completion endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.api_path)
    }

    /// Resolves the API key: the inline key wins, then `key_env`.
    pub fn credential(&self) -> Option<String> {
        if !self.key.is_empty() && self.key != API_KEY_PLACEHOLDER {
            return Some(self.key.clone());
        }

        self.key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Checks if a usable API key is available.
    pub fn is_configured(&self) -> bool {
        self.credential().is_some()
    }
}

/// Retry and pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Attempts per provider before moving on.
    pub max_retries: u32,

    /// Delay between attempts against the same provider, in seconds.
    pub retry_delay_sec: f64,

    /// Delay between consecutive files, in seconds.
    pub delay_between_files_sec: f64,

    /// Documents longer than this many characters trigger a warning.
    pub size_warning_chars: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_sec: 5.0,
            delay_between_files_sec: 5.0,
            size_warning_chars: 30_000,
        }
    }
}

impl TranslationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_sec)
    }

    pub fn delay_between_files(&self) -> Duration {
        Duration::from_secs_f64(self.delay_between_files_sec)
    }
}

/// LLM system prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// System instruction sent with every document.
    pub system: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: r#"You are a professional Chinese native translator specialized in video encoding and multimedia technology content who needs to fluently translate text into Chinese.

## Translation Rules
1. Output only the translated content, without explanations or additional content
2. Maintain all technical terminology, programming language syntax, and code snippets exactly as in the original
3. If the text contains HTML tags or MDX components, preserve their structure and placement while maintaining fluency
4. Preserve product names, company names, and technology abbreviations in their original form (e.g., AV1, HEVC, x264, FFmpeg)
5. Keep all UI elements, button names, and menu items as they appear in localized software when available
6. Translate technical concepts accurately while preserving their technical meaning
7. For video encoding terminology, use established Chinese translations:
   - "编码器" for encoder
   - "解码器" for decoder
   - "编解码器" for codec
   - "比特率" for bitrate
   - "帧率" for framerate
   - "分辨率" for resolution
   - "质量" for quality
   - "压缩" for compression
   - "无损" for lossless
   - "有损" for lossy
   - "滤镜" for filter
   - "预设" for preset
   - "参数" for parameter
   - "算法" for algorithm
   - "硬件加速" for hardware acceleration
8. Maintain the original formatting, including frontmatter, code blocks, and markdown syntax
9. Do not translate file paths, URLs, or command-line parameters
10. Keep mathematical formulas and technical specifications in their original form"#
                .to_string(),
        }
    }
}

/// Sidebar category descriptor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Sidebar position written into every descriptor.
    pub position: u32,

    /// Directory name to display label. Unknown names are used as-is.
    pub labels: BTreeMap<String, String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        let labels = [
            ("audio", "音频编解码器"),
            ("colorimetry", "色彩学"),
            ("data", "数据压缩"),
            ("encoders", "编码器"),
            ("encoders_hw", "硬件编码器"),
            ("filtering", "滤镜处理"),
            ("images", "图像格式"),
            ("introduction", "介绍"),
            ("metrics", "质量评估指标"),
            ("subtitles", "字幕"),
            ("utilities", "实用工具"),
            ("video", "视频编解码器"),
        ]
        .into_iter()
        .map(|(dir, label)| (dir.to_string(), label.to_string()))
        .collect();

        Self {
            position: 1,
            labels,
        }
    }
}

impl CategoryConfig {
    /// Returns the display label for a directory name.
    pub fn label_for<'a>(&'a self, dir_name: &'a str) -> &'a str {
        self.labels
            .get(dir_name)
            .map(String::as_str)
            .unwrap_or(dir_name)
    }
}

impl Config {
    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the defaults; nothing is written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates structural settings. Credentials are checked by [`Config::providers`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.translation.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "translation.max_retries".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        for (key, value) in [
            ("translation.retry_delay_sec", self.translation.retry_delay_sec),
            (
                "translation.delay_between_files_sec",
                self.translation.delay_between_files_sec,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be a non-negative number of seconds".to_string(),
                });
            }
        }

        if self.paths.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "paths.extensions".to_string(),
                message: "must list at least one extension".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the providers to try, in order.
    ///
    /// The primary must have a credential. The fallback is included only
    /// when it has one.
    pub fn providers(&self) -> Result<Vec<ProviderConfig>, ConfigError> {
        if !self.primary.is_configured() {
            let hint = match &self.primary.key_env {
                Some(var) => format!("primary.key (or set {})", var),
                None => "primary.key".to_string(),
            };
            return Err(ConfigError::MissingValue(hint));
        }

        let mut providers = vec![self.primary.clone()];
        if let Some(fallback) = self.fallback.as_ref().filter(|p| p.is_configured()) {
            providers.push(fallback.clone());
        }

        Ok(providers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, tempdir};

    fn unconfigured(mut provider: ProviderConfig) -> ProviderConfig {
        provider.key = String::new();
        provider.key_env = None;
        provider
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.source_dir, PathBuf::from("docs"));
        assert_eq!(config.paths.extensions, vec![".md", ".mdx"]);
        assert_eq!(config.translation.max_retries, 3);
        assert_eq!(config.translation.size_warning_chars, 30_000);
        assert_eq!(config.categories.position, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let mut provider = ProviderConfig::default();
        assert_eq!(
            provider.endpoint(),
            "https://api.deepseek.com/v1/chat/completions"
        );

        provider.base_url = "http://localhost:8080/".to_string();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_inline_key_wins() {
        let mut provider = unconfigured(ProviderConfig::default());
        assert!(!provider.is_configured());

        provider.key = "sk-real-key".to_string();
        assert_eq!(provider.credential().as_deref(), Some("sk-real-key"));
    }

    #[test]
    fn test_placeholder_key_is_not_a_credential() {
        let mut provider = unconfigured(ProviderConfig::default());
        provider.key = API_KEY_PLACEHOLDER.to_string();
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_missing_primary_credential_is_fatal() {
        let mut config = Config::default();
        config.primary = unconfigured(config.primary);
        assert!(matches!(
            config.providers(),
            Err(ConfigError::MissingValue(_))
        ));
    }

    #[test]
    fn test_unconfigured_fallback_is_skipped() {
        let mut config = Config::default();
        config.primary.key = "primary-key".to_string();
        config.fallback = Some(unconfigured(ProviderConfig::openai()));

        let providers = config.providers().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "deepseek");
    }

    #[test]
    fn test_configured_fallback_comes_second() {
        let mut config = Config::default();
        config.primary.key = "primary-key".to_string();
        let mut fallback = ProviderConfig::openai();
        fallback.key = "fallback-key".to_string();
        config.fallback = Some(fallback);

        let names: Vec<_> = config
            .providers()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["deepseek", "openai"]);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let file = NamedTempFile::new().unwrap();

        config.save_to(file.path()).unwrap();

        let loaded = Config::load_from(file.path()).unwrap();
        assert_eq!(loaded.primary.model, config.primary.model);
        assert_eq!(loaded.categories.labels, config.categories.labels);
        assert_eq!(loaded.prompts.system, config.prompts.system);
    }

    #[test]
    fn test_missing_file_uses_defaults_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.primary.name, "deepseek");
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[paths]\nsource_dir = \"content\"\n\n[categories.labels]\nguides = \"指南\"\n",
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.paths.source_dir, PathBuf::from("content"));
        assert_eq!(config.paths.exclude_dirs, vec!["zh"]);
        assert_eq!(config.categories.label_for("guides"), "指南");
        assert_eq!(config.categories.label_for("audio"), "audio");
    }

    #[test]
    fn test_validation_rejects_zero_retries() {
        let mut config = Config::default();
        config.translation.max_retries = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_negative_delay() {
        let mut config = Config::default();
        config.translation.delay_between_files_sec = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_label_lookup() {
        let categories = CategoryConfig::default();
        assert_eq!(categories.label_for("encoders_hw"), "硬件编码器");
        assert_eq!(categories.label_for("misc"), "misc");
    }
}
