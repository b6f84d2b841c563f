//! Batch runner tying scanning, translation and category generation together.

use crate::categories::write_category_files;
use crate::config::CategoryConfig;
use crate::console::Console;
use crate::error::FsError;
use crate::provider::ChatBackend;
use crate::scanner::{FileTask, Scanner};
use crate::translator::Translator;
use std::time::Duration;

/// Outcome of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Files written successfully.
    pub translated: usize,
    /// Files whose translation failed on every provider.
    pub failed: usize,
    /// Files whose translation was already up to date.
    pub skipped: usize,
}

impl RunStats {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Sequential batch translator.
pub struct Runner<B> {
    scanner: Scanner,
    translator: Translator<B>,
    categories: CategoryConfig,
    delay_between_files: Duration,
    console: Console,
}

impl<B: ChatBackend> Runner<B> {
    pub fn new(
        scanner: Scanner,
        translator: Translator<B>,
        categories: CategoryConfig,
        delay_between_files: Duration,
    ) -> Self {
        Self {
            scanner,
            translator,
            categories,
            delay_between_files,
            console: Console::new(),
        }
    }

    pub fn translator(&self) -> &Translator<B> {
        &self.translator
    }

    /// Lists the stale files without translating or writing anything.
    pub fn dry_run(&self) -> Result<Vec<FileTask>, FsError> {
        let stale = self.scanner.stale_files()?;

        self.console.info(&format!(
            "{} files need translation:",
            self.console.count(stale.len())
        ));
        for (i, task) in stale.iter().enumerate() {
            println!(
                "{}",
                self.console
                    .task_line(i + 1, &task.source_path, &task.dest_path)
            );
        }

        Ok(stale)
    }

    /// Translates every stale file, then regenerates category descriptors.
    ///
    /// A file that fails to translate is counted and the batch continues.
    /// Filesystem errors abort the run.
    pub async fn run(&self) -> Result<RunStats, FsError> {
        self.console.info(&format!(
            "Source: {}",
            self.scanner.source_root().display()
        ));
        self.console.info(&format!(
            "Output: {}",
            self.scanner.output_root().display()
        ));

        let candidates = self.scanner.list_candidates()?;
        self.console.info(&format!(
            "Found {} documents",
            self.console.count(candidates.len())
        ));

        let (stale, fresh) = self.scanner.partition(candidates)?;
        let mut stats = RunStats {
            skipped: fresh.len(),
            ..RunStats::default()
        };
        self.console.info(&format!(
            "{} need translation",
            self.console.count(stale.len())
        ));

        if stale.is_empty() {
            self.console.success("All translations are up to date");
            return Ok(stats);
        }

        let total = stale.len();
        for (i, task) in stale.iter().enumerate() {
            self.console.step(&format!(
                "{} Translating {}",
                self.console.position(i + 1, total),
                task.source_path.display()
            ));

            if self.translator.translate_file(task).await? {
                self.console
                    .success(&format!("Wrote {}", task.dest_path.display()));
                stats.translated += 1;
            } else {
                stats.failed += 1;
            }

            if i + 1 < total && !self.delay_between_files.is_zero() {
                self.console.info(&self.console.muted(&format!(
                    "Waiting {:?} before the next file...",
                    self.delay_between_files
                )));
                tokio::time::sleep(self.delay_between_files).await;
            }
        }

        self.console.step("Writing category files...");
        let categories = write_category_files(self.scanner.output_root(), &self.categories)?;
        self.console.success(&format!(
            "Wrote {} category files: {}",
            categories.len(),
            categories.join(", ")
        ));

        Ok(stats)
    }
}
