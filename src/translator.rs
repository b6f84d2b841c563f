//! Document translation through chat-completion providers.
//!
//! Providers are tried in order. Each one gets the same bounded retry
//! loop; the first reply wins and the last error is reported when every
//! provider has been exhausted.

use crate::config::{ProviderConfig, TranslationConfig};
use crate::console::Console;
use crate::error::{FsError, TranslationError};
use crate::provider::{ChatBackend, HttpBackend};
use crate::scanner::FileTask;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Translates documents with retry and provider fallback.
pub struct Translator<B = HttpBackend> {
    /// Backend performing the requests.
    backend: B,
    /// Providers in the order they are tried.
    providers: Vec<ProviderConfig>,
    /// Attempts per provider.
    max_retries: u32,
    /// Pause between attempts against the same provider.
    retry_delay: Duration,
    /// Character count above which a document triggers a warning.
    size_warning_chars: usize,
    /// System prompt sent with every document.
    system_prompt: String,
    /// Console for output.
    console: Console,
}

impl<B: ChatBackend> Translator<B> {
    /// Create a new Translator.
    pub fn new(
        backend: B,
        providers: Vec<ProviderConfig>,
        config: &TranslationConfig,
        system_prompt: String,
    ) -> Self {
        Self {
            backend,
            providers,
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
            size_warning_chars: config.size_warning_chars,
            system_prompt,
            console: Console::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Translate raw document text.
    pub async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let mut last_error = None;

        for (i, provider) in self.providers.iter().enumerate() {
            if i > 0 {
                self.console
                    .info(&format!("Trying fallback provider {}...", provider.model));
            }

            match self.translate_with(provider, text).await {
                Ok(translated) => {
                    if i > 0 {
                        self.console.warning(&format!(
                            "Translated by fallback provider {}",
                            provider.model
                        ));
                    }
                    return Ok(translated);
                }
                Err(e) => last_error = Some(e),
            }
        }

        if self.providers.len() < 2 {
            self.console
                .warning("No fallback provider configured, giving up on this document");
        }

        Err(last_error.unwrap_or(TranslationError::RetriesExhausted { attempts: 0 }))
    }

    /// Retry loop against a single provider.
    async fn translate_with(
        &self,
        provider: &ProviderConfig,
        text: &str,
    ) -> Result<String, TranslationError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            self.console.info(&format!(
                "Calling {} (attempt {}/{})",
                provider.model, attempt, self.max_retries
            ));

            match self
                .backend
                .complete(provider, &self.system_prompt, text)
                .await
            {
                Ok(translated) => return Ok(translated),
                Err(e) => {
                    self.console.warning(&format!(
                        "{} failed (attempt {}/{}): {}",
                        provider.model, attempt, self.max_retries, e
                    ));
                    last_error = Some(e);

                    if attempt < self.max_retries && !self.retry_delay.is_zero() {
                        self.console
                            .info(&format!("Retrying in {:?}...", self.retry_delay));
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(TranslationError::RetriesExhausted {
            attempts: self.max_retries,
        }))
    }

    /// Translate one document and write the result to its mirrored path.
    ///
    /// Returns `Ok(false)` when every provider failed; the destination is
    /// left untouched in that case. Filesystem failures are returned as errors.
    pub async fn translate_file(&self, task: &FileTask) -> Result<bool, FsError> {
        let bytes = fs::read(&task.source_path).map_err(|source| FsError::Read {
            path: task.source_path.clone(),
            source,
        })?;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                self.console.warning(&format!(
                    "{} is not valid UTF-8, invalid bytes replaced with U+FFFD",
                    task.source_path.display()
                ));
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let chars = content.chars().count();
        self.console.info(&format!(
            "Document size: {} chars",
            self.console.count(chars)
        ));
        if chars > self.size_warning_chars {
            self.console.warning(&format!(
                "Document exceeds {} chars, output may be truncated by the model's token limit",
                self.size_warning_chars
            ));
        }

        let translated = match self.translate(&content).await {
            Ok(translated) => translated,
            Err(e) => {
                self.console.error(&format!(
                    "Translation failed for {}: {}",
                    task.source_path.display(),
                    e
                ));
                return Ok(false);
            }
        };

        write_atomic(&task.dest_path, &translated)?;
        Ok(true)
    }
}

/// Writes `content` to a sibling temp file, then renames it over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<(), FsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FsError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = partial_path(path);
    let write_err = |source| FsError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Err(e) = fs::write(&tmp, content) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        write_err(e)
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".partial");
    path.with_file_name(name)
}
