//! Input directory layouts and cube file discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::constants::DEFAULT_SCENE_SUBDIR;
use crate::format::CubeStore;
use crate::pipeline::CubeJob;

/// How cube files are arranged under the input root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputLayout {
    /// Every cube file anywhere below the root.
    #[default]
    Recursive,
    /// Only cubes in `<root>/<scene>/<input_subdir>` for each named scene.
    ///
    /// Outputs are mirrored under `<output root>/<scene>/`, without the
    /// input subdirectory.
    Scenes {
        /// Scene folder names
        scenes: Vec<String>,
        /// Folder inside each scene that holds the cubes
        #[serde(default = "default_scene_subdir")]
        input_subdir: String,
    },
}

fn default_scene_subdir() -> String {
    DEFAULT_SCENE_SUBDIR.to_string()
}

impl InputLayout {
    /// Scene layout with the default input subfolder.
    pub fn scenes<S: Into<String>>(scenes: impl IntoIterator<Item = S>) -> Self {
        Self::Scenes {
            scenes: scenes.into_iter().map(Into::into).collect(),
            input_subdir: default_scene_subdir(),
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

/// Absolute path with `.`, `..` and symlinks resolved, or the path as given
/// if it cannot be resolved.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_excluded(entry: &DirEntry, exclude: &[PathBuf]) -> bool {
    !exclude.is_empty()
        && entry.file_type().is_dir()
        && exclude.contains(&canonical(entry.path()))
}

/// Walk `dir` for cube files, tagging each with `prefix` joined to its
/// directory relative to `dir`.
fn walk(
    store: &CubeStore,
    dir: &Path,
    prefix: &Path,
    exclude: &[PathBuf],
    jobs: &mut Vec<CubeJob>,
) {
    let entries = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_excluded(e, exclude));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry below {:?}: {}", dir, e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !store.is_cube_file(entry.path()) {
            continue;
        }

        let relative = entry
            .path()
            .parent()
            .and_then(|parent| parent.strip_prefix(dir).ok())
            .unwrap_or(Path::new(""));
        log::trace!("Discovered {:?}", entry.path());
        jobs.push(CubeJob::new(entry.path(), prefix.join(relative)));
    }
}

/// Find every cube file under `root` for the given layout, in sorted order.
///
/// Directories listed in `exclude` (typically output roots nested inside the
/// input root) are not descended into.
pub fn discover(
    store: &CubeStore,
    root: &Path,
    layout: &InputLayout,
    exclude: &[&Path],
) -> Vec<CubeJob> {
    let exclude: Vec<PathBuf> = exclude.iter().map(|p| canonical(p)).collect();
    let mut jobs = Vec::new();
    match layout {
        InputLayout::Recursive => walk(store, root, Path::new(""), &exclude, &mut jobs),
        InputLayout::Scenes {
            scenes,
            input_subdir,
        } => {
            for scene in scenes {
                let dir: PathBuf = root.join(scene).join(input_subdir);
                if !dir.is_dir() {
                    log::warn!("Scene folder {:?} not found, skipping", dir);
                    continue;
                }
                walk(store, &dir, Path::new(scene), &exclude, &mut jobs);
            }
        }
    }
    log::debug!("Discovered {} cube files under {:?}", jobs.len(), root);
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_recursive_discovery_is_sorted() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("b/scene2.hdr"));
        touch(&root.join("b/scene2.img"));
        touch(&root.join("a/deep/scene1.HDR"));
        touch(&root.join("top.mat"));
        touch(&root.join("notes.txt"));
        touch(&root.join(".cache/hidden.hdr"));

        let jobs = discover(&CubeStore::default(), root, &InputLayout::Recursive, &[]);
        let found: Vec<(PathBuf, PathBuf)> = jobs
            .into_iter()
            .map(|j| (j.input.strip_prefix(root).unwrap().to_path_buf(), j.relative_dir))
            .collect();
        assert_eq!(
            found,
            vec![
                (PathBuf::from("a/deep/scene1.HDR"), PathBuf::from("a/deep")),
                (PathBuf::from("b/scene2.hdr"), PathBuf::from("b")),
                (PathBuf::from("top.mat"), PathBuf::from("")),
            ]
        );
    }

    #[test]
    fn test_excluded_output_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("in.hdr"));
        touch(&root.join("out/AMP_in.hdr"));

        let out = root.join("out");
        let jobs = discover(&CubeStore::default(), root, &InputLayout::Recursive, &[out.as_path()]);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].input, root.join("in.hdr"));
    }

    #[test]
    fn test_excluded_output_root_spelled_differently() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("in/a.hdr"));
        touch(&dir.path().join("in/out/AMP_a.hdr"));
        std::fs::create_dir(dir.path().join("other")).unwrap();

        // Same input directory reached through `other/..`.
        let root = dir.path().join("other/../in");
        let out = dir.path().join("in/out");
        let jobs = discover(&CubeStore::default(), &root, &InputLayout::Recursive, &[out.as_path()]);
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].input.ends_with("a.hdr"));
        assert_eq!(jobs[0].relative_dir, PathBuf::from(""));
    }

    #[test]
    fn test_scene_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("Scene1/Original images/a.hdr"));
        touch(&root.join("Scene1/Other/ignored.hdr"));
        touch(&root.join("Scene2/Original images/sub/b.hdr"));
        touch(&root.join("Unlisted/Original images/c.hdr"));

        let layout = InputLayout::scenes(["Scene1", "Scene2", "Missing"]);
        let jobs = discover(&CubeStore::default(), root, &layout, &[]);
        let relative: Vec<PathBuf> = jobs.iter().map(|j| j.relative_dir.clone()).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("Scene1"), PathBuf::from("Scene2/sub")]
        );
        assert!(jobs[0].input.ends_with("Scene1/Original images/a.hdr"));
    }

    #[test]
    fn test_layout_serde() {
        let layout: InputLayout =
            serde_json::from_str(r#"{ "kind": "scenes", "scenes": ["S1"] }"#).unwrap();
        assert_eq!(layout, InputLayout::scenes(["S1"]));
        let recursive: InputLayout = serde_json::from_str(r#"{ "kind": "recursive" }"#).unwrap();
        assert_eq!(recursive, InputLayout::Recursive);
    }
}
