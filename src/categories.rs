//! Docusaurus `_category_.json` generation for the translated tree.

use crate::config::CategoryConfig;
use crate::error::FsError;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// File name Docusaurus reads for sidebar category metadata.
pub const CATEGORY_FILENAME: &str = "_category_.json";

#[derive(Debug, Serialize)]
struct CategoryDescriptor<'a> {
    label: &'a str,
    position: u32,
    link: CategoryLink,
}

#[derive(Debug, Serialize)]
struct CategoryLink {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Renders the descriptor for one directory.
pub fn render_descriptor(dir_name: &str, config: &CategoryConfig) -> String {
    let descriptor = CategoryDescriptor {
        label: config.label_for(dir_name),
        position: config.position,
        link: CategoryLink {
            kind: "generated-index",
        },
    };

    // Serializing a struct of strings and integers cannot fail.
    serde_json::to_string_pretty(&descriptor).unwrap_or_default()
}

/// Writes a descriptor into every immediate subdirectory of `output_root`.
///
/// Returns the directory names, sorted. A missing output root yields an
/// empty list.
pub fn write_category_files(
    output_root: &Path,
    config: &CategoryConfig,
) -> Result<Vec<String>, FsError> {
    if !output_root.exists() {
        return Ok(Vec::new());
    }

    let read_dir = |source| FsError::ReadDir {
        path: output_root.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in fs::read_dir(output_root).map_err(read_dir)? {
        let path = entry.map_err(read_dir)?.path();
        if path.is_dir()
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            dirs.push(name.to_string());
        }
    }
    dirs.sort();

    for name in &dirs {
        let path = output_root.join(name).join(CATEGORY_FILENAME);
        fs::write(&path, render_descriptor(name, config))
            .map_err(|source| FsError::Write { path, source })?;
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_known_label() {
        let json = render_descriptor("audio", &CategoryConfig::default());
        assert_eq!(
            json,
            "{\n  \"label\": \"音频编解码器\",\n  \"position\": 1,\n  \"link\": {\n    \"type\": \"generated-index\"\n  }\n}"
        );
    }

    #[test]
    fn test_render_unknown_label_passes_through() {
        let json = render_descriptor("misc", &CategoryConfig::default());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["label"], "misc");
        assert_eq!(value["link"]["type"], "generated-index");
    }

    #[test]
    fn test_custom_labels_and_position() {
        let mut config = CategoryConfig::default();
        config.position = 3;
        config
            .labels
            .insert("guides".to_string(), "指南".to_string());

        let value: serde_json::Value =
            serde_json::from_str(&render_descriptor("guides", &config)).unwrap();
        assert_eq!(value["label"], "指南");
        assert_eq!(value["position"], 3);
    }

    #[test]
    fn test_writes_one_file_per_subdirectory() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("video")).unwrap();
        fs::create_dir_all(root.path().join("audio/opus")).unwrap();
        fs::write(root.path().join("intro.md"), "介绍").unwrap();

        let written = write_category_files(root.path(), &CategoryConfig::default()).unwrap();
        assert_eq!(written, vec!["audio", "video"]);
        assert!(root.path().join("audio").join(CATEGORY_FILENAME).exists());
        assert!(root.path().join("video").join(CATEGORY_FILENAME).exists());
        assert!(!root.path().join("audio/opus").join(CATEGORY_FILENAME).exists());
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("metrics")).unwrap();
        fs::create_dir_all(root.path().join("custom")).unwrap();
        let config = CategoryConfig::default();

        write_category_files(root.path(), &config).unwrap();
        let first_metrics = fs::read(root.path().join("metrics").join(CATEGORY_FILENAME)).unwrap();
        let first_custom = fs::read(root.path().join("custom").join(CATEGORY_FILENAME)).unwrap();

        write_category_files(root.path(), &config).unwrap();
        let second_metrics = fs::read(root.path().join("metrics").join(CATEGORY_FILENAME)).unwrap();
        let second_custom = fs::read(root.path().join("custom").join(CATEGORY_FILENAME)).unwrap();

        assert_eq!(first_metrics, second_metrics);
        assert_eq!(first_custom, second_custom);
    }

    #[test]
    fn test_missing_output_root() {
        let root = tempdir().unwrap();
        let written =
            write_category_files(&root.path().join("missing"), &CategoryConfig::default()).unwrap();
        assert!(written.is_empty());
    }
}
