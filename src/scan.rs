use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// A file under the content root, addressed by its logical object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Root-relative path with `/` separators, e.g. `official/Level1/Lesson1/A/dictation.json`.
    pub logical_path: String,
    pub path: PathBuf,
}

/// Directories never delivered as notifications.
const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/dictation_audio/**"];

/// Walk `content.root` and return matching files sorted by logical path.
pub fn scan_content(config: &Config) -> Result<Vec<ScannedFile>> {
    let content = &config.content;
    let root = &content.root;
    if !root.exists() {
        bail!("Content root does not exist: {}", root.display());
    }

    let include_set = build_globset(&content.include_globs)?;

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(content.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(content.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel_str = logical_path(root, path);

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(ScannedFile {
            logical_path: rel_str,
            path: path.to_path_buf(),
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));

    Ok(files)
}

/// Root-relative path of `path` joined with `/` on every platform.
pub fn logical_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AggregatorConfig, ContentConfig, DbConfig, DictationConfig, ServerConfig,
    };

    fn config_for(root: &Path, exclude_globs: Vec<String>) -> Config {
        Config {
            db: DbConfig {
                path: root.join("db.sqlite"),
            },
            content: ContentConfig {
                root: root.to_path_buf(),
                namespace: "official".into(),
                include_globs: vec!["official/**".into()],
                exclude_globs,
                follow_symlinks: false,
            },
            aggregator: AggregatorConfig::default(),
            dictation: DictationConfig::default(),
            server: ServerConfig::default(),
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "official/Level1/Lesson1/A/passage2/a_listening.mp3");
        touch(root, "official/Level1/Lesson1/A/passage1/a_subtitles.json");
        touch(root, "official/Level1/Lesson1/A/dictation_audio/A1.mp3");
        touch(root, "official/Level1/Lesson1/A/notes.bak");
        touch(root, "drafts/Level1/Lesson1/A/passage1/a_listening.mp3");

        let files = scan_content(&config_for(root, vec!["**/*.bak".into()])).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.logical_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "official/Level1/Lesson1/A/passage1/a_subtitles.json",
                "official/Level1/Lesson1/A/passage2/a_listening.mp3",
            ]
        );
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_for(&tmp.path().join("nope"), vec![]);
        assert!(scan_content(&config).is_err());
    }
}
