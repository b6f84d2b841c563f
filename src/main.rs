//! doc-translate CLI - batch-translates Markdown docs into Chinese.

use anyhow::{Context, Result};
use clap::Parser;
use doc_translate::config::{CONFIG_FILENAME, Config};
use doc_translate::console::Console;
use doc_translate::provider::HttpBackend;
use doc_translate::runner::Runner;
use doc_translate::scanner::Scanner;
use doc_translate::translator::Translator;
use std::path::PathBuf;
use std::process::ExitCode;

/// Translate Docusaurus Markdown documents into Chinese.
#[derive(Parser, Debug)]
#[command(name = "doc-translate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only list the files that need translation.
    #[arg(long)]
    dry_run: bool,

    /// Re-translate every file, ignoring timestamps.
    #[arg(long)]
    force: bool,

    /// Path to the configuration file.
    #[arg(long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Write a default configuration file and exit.
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let console = Console::new();

    if args.init_config {
        if args.config.exists() {
            anyhow::bail!("{} already exists", args.config.display());
        }
        Config::default()
            .save_to(&args.config)
            .context("Failed to write default configuration")?;
        console.success(&format!("Wrote {}", args.config.display()));
        return Ok(ExitCode::SUCCESS);
    }

    console.step("Loading configuration...");
    let config = Config::load_from(&args.config).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let scanner = Scanner::new(&config.paths).force(args.force);
    if args.force {
        console.info("Force mode: every document will be re-translated");
    }

    // A dry run never calls a provider, so it needs no credentials.
    let providers = if args.dry_run {
        Vec::new()
    } else {
        let providers = config.providers().context("API credentials are not configured")?;
        console.success(&format!(
            "Using {} ({} provider(s) configured)",
            providers[0].model,
            providers.len()
        ));
        providers
    };

    let translator = Translator::new(
        HttpBackend::new(),
        providers,
        &config.translation,
        config.prompts.system.clone(),
    );
    let runner = Runner::new(
        scanner,
        translator,
        config.categories.clone(),
        config.translation.delay_between_files(),
    );

    if args.dry_run {
        console.section("Dry run - nothing will be translated");
        runner.dry_run().context("Failed to scan source tree")?;
        return Ok(ExitCode::SUCCESS);
    }

    console.section("Translating documents");
    let stats = runner.run().await.context("Translation run aborted")?;

    console.summary(&stats);

    if stats.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
