//! doc-translate - keeps a Docusaurus Chinese translation in sync with its source docs.
//!
//! This library provides functionality for:
//! - Finding documents whose translation is missing or out of date
//! - Translating them through OpenAI-compatible chat APIs with retry and fallback
//! - Regenerating sidebar category descriptors for the translated tree

pub mod categories;
pub mod config;
pub mod console;
pub mod error;
pub mod provider;
pub mod runner;
pub mod scanner;
pub mod translator;

// Re-export commonly used types
pub use config::{Config, ProviderConfig};
pub use console::Console;
pub use error::{ConfigError, FsError, TranslationError};
pub use provider::{ChatBackend, HttpBackend, MockBackend, MockReply};
pub use runner::{RunStats, Runner};
pub use scanner::{FileTask, Scanner};
pub use translator::Translator;
