//! Source tree scanning and change detection.
//!
//! Walks the docs tree, mirrors every translatable document onto the
//! output tree and decides which translations are out of date.

use crate::config::PathsConfig;
use crate::error::FsError;
use std::fs;
use std::path::{Path, PathBuf};

/// One document to translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// English document.
    pub source_path: PathBuf,
    /// Mirrored location of the translation.
    pub dest_path: PathBuf,
    /// Path relative to both roots.
    pub relative_path: PathBuf,
}

/// Enumerates documents and compares them against existing translations.
#[derive(Debug, Clone)]
pub struct Scanner {
    source_root: PathBuf,
    output_root: PathBuf,
    exclude_dirs: Vec<String>,
    extensions: Vec<String>,
    force: bool,
}

impl Scanner {
    /// Creates a scanner from the configured layout.
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            source_root: paths.source_dir.clone(),
            output_root: paths.output_dir.clone(),
            exclude_dirs: paths.exclude_dirs.clone(),
            extensions: paths.extensions.clone(),
            force: false,
        }
    }

    /// Treat every candidate as stale.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Lists every translatable document under the source root.
    ///
    /// Directory entries are visited in file-name order.
    pub fn list_candidates(&self) -> Result<Vec<FileTask>, FsError> {
        let mut tasks = Vec::new();
        self.walk(&self.source_root, Path::new(""), &mut tasks)?;
        Ok(tasks)
    }

    fn walk(&self, dir: &Path, relative: &Path, tasks: &mut Vec<FileTask>) -> Result<(), FsError> {
        let read_dir = |source| FsError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir)
            .map_err(read_dir)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_dir)?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name();
            let relative_path = relative.join(&name);
            let file_type = fs::metadata(&path)
                .map_err(|source| FsError::Metadata {
                    path: path.clone(),
                    source,
                })?
                .file_type();

            if file_type.is_dir() {
                let excluded = self
                    .exclude_dirs
                    .iter()
                    .any(|skip| name.to_str() == Some(skip.as_str()));
                if !excluded {
                    self.walk(&path, &relative_path, tasks)?;
                }
            } else if file_type.is_file() && self.is_translatable(&path) {
                tasks.push(FileTask {
                    source_path: path,
                    dest_path: self.output_root.join(&relative_path),
                    relative_path,
                });
            }
        }

        Ok(())
    }

    fn is_translatable(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.') == ext)
    }

    /// Returns true if the translation is missing or older than its source.
    pub fn is_stale(&self, task: &FileTask) -> Result<bool, FsError> {
        if self.force {
            return Ok(true);
        }

        let dest_modified = match fs::metadata(&task.dest_path) {
            Ok(meta) => modified(&task.dest_path, &meta)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(source) => {
                return Err(FsError::Metadata {
                    path: task.dest_path.clone(),
                    source,
                });
            }
        };

        let source_meta = fs::metadata(&task.source_path).map_err(|source| FsError::Metadata {
            path: task.source_path.clone(),
            source,
        })?;

        Ok(modified(&task.source_path, &source_meta)? > dest_modified)
    }

    /// Splits candidates into `(stale, up_to_date)`, preserving order.
    pub fn partition(&self, tasks: Vec<FileTask>) -> Result<(Vec<FileTask>, Vec<FileTask>), FsError> {
        let mut stale = Vec::new();
        let mut fresh = Vec::new();

        for task in tasks {
            if self.is_stale(&task)? {
                stale.push(task);
            } else {
                fresh.push(task);
            }
        }

        Ok((stale, fresh))
    }

    /// Lists only the candidates that need translation.
    pub fn stale_files(&self) -> Result<Vec<FileTask>, FsError> {
        let (stale, _) = self.partition(self.list_candidates()?)?;
        Ok(stale)
    }
}

fn modified(path: &Path, meta: &fs::Metadata) -> Result<std::time::SystemTime, FsError> {
    meta.modified().map_err(|source| FsError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}
