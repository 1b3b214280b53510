//! Filesystem shape analysis: walks one folder and summarizes what's in it
//! without reading any file contents, so this module works identically on
//! zero-byte fixture files in tests and real audio files in production.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Extensions the pipeline considers music, matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 7] =
    ["mp3", "flac", "m4a", "mp4", "ogg", "opus", "wav"];

pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// One immediate subdirectory of a scanned folder, with recursive track
/// counts (needed by the disc-dominance heuristic, which compares track
/// counts across whole disc subtrees, not just their top level).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdirInfo {
    pub name: String,
    pub path: PathBuf,
    pub music_files: usize,
    pub music_basenames: Vec<String>,
}

/// A snapshot of one folder's contents, produced fresh for every scan or
/// analyze pass. Never persisted — `metadata_json` on the job row is a
/// serialized summary derived from this, not this struct itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderShape {
    pub name: String,
    pub path: PathBuf,
    pub total_music_files: usize,
    pub direct_music_files: usize,
    pub direct_music_basenames: Vec<String>,
    pub subdirectories: Vec<SubdirInfo>,
    pub max_depth: usize,
    pub tree_text: String,
}

impl FolderShape {
    /// True if this folder or any descendant contains a supported-extension
    /// file.
    pub fn has_any_audio(&self) -> bool {
        self.total_music_files > 0
    }
}

/// Disc-like subdirectory name prefixes, checked case-insensitively.
const DISC_PREFIXES: [&str; 5] = ["cd", "disc", "disk", "vol", "volume"];

pub fn is_disc_like(name: &str) -> bool {
    let lower = name.to_lowercase();
    DISC_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Walk `path` one level for its immediate subdirectories, and recursively
/// for file counts beneath each of those. Contents deeper than direct
/// children are folded into `total_music_files`/subdir counts only; this
/// function never enqueues anything and never mutates the job store.
pub fn analyze(path: &Path) -> CoreResult<FolderShape> {
    if !path.is_dir() {
        return Err(CoreError::InvalidFolder(path.display().to_string()));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut direct_music_files = 0usize;
    let mut direct_names = Vec::new();
    let mut subdirectories = Vec::new();
    let mut max_depth = 0usize;

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            let (count, basenames, depth) = count_recursive(&entry_path, 1)?;
            max_depth = max_depth.max(depth);
            subdirectories.push(SubdirInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry_path,
                music_files: count,
                music_basenames: basenames,
            });
        } else if is_supported_extension(&entry_path) {
            direct_music_files += 1;
            direct_names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    let subdir_total: usize = subdirectories.iter().map(|s| s.music_files).sum();
    let total_music_files = direct_music_files + subdir_total;

    let tree_text = render_tree(path, &name)?;

    Ok(FolderShape {
        name,
        path: path.to_path_buf(),
        total_music_files,
        direct_music_files,
        direct_music_basenames: direct_names,
        subdirectories,
        max_depth,
        tree_text,
    })
}

fn count_recursive(path: &Path, depth: usize) -> CoreResult<(usize, Vec<String>, usize)> {
    let mut count = 0usize;
    let mut basenames = Vec::new();
    let mut max_depth = depth;

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            let (sub_count, _, sub_depth) = count_recursive(&entry_path, depth + 1)?;
            count += sub_count;
            max_depth = max_depth.max(sub_depth);
        } else if is_supported_extension(&entry_path) {
            count += 1;
            basenames.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    Ok((count, basenames, max_depth))
}

/// A compact directory listing suitable for including in an oracle prompt:
/// top-level entries only, with a `+N more` summary per subdirectory.
fn render_tree(path: &Path, name: &str) -> CoreResult<String> {
    let mut lines = vec![format!("{name}/")];
    let mut entries: Vec<_> = std::fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let entry_path = entry.path();
        let display_name = entry.file_name().to_string_lossy().into_owned();
        if entry_path.is_dir() {
            let (count, _, _) = count_recursive(&entry_path, 1)?;
            lines.push(format!("  {display_name}/ ({count} tracks)"));
        } else if is_supported_extension(&entry_path) {
            lines.push(format!("  {display_name}"));
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let p = dir.join(rel);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(p, b"").unwrap();
    }

    #[test]
    fn test_is_supported_extension_case_insensitive() {
        assert!(is_supported_extension(Path::new("track.MP3")));
        assert!(is_supported_extension(Path::new("track.flac")));
        assert!(!is_supported_extension(Path::new("cover.jpg")));
    }

    #[test]
    fn test_is_disc_like() {
        assert!(is_disc_like("CD1"));
        assert!(is_disc_like("Disc 2"));
        assert!(is_disc_like("disk-1"));
        assert!(is_disc_like("Volume 3"));
        assert!(!is_disc_like("Bonus Tracks"));
    }

    #[test]
    fn test_analyze_single_album() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "track1.mp3");
        touch(dir.path(), "track2.flac");
        touch(dir.path(), "cover.jpg");

        let shape = analyze(dir.path()).unwrap();
        assert_eq!(shape.direct_music_files, 2);
        assert_eq!(shape.total_music_files, 2);
        assert!(shape.subdirectories.is_empty());
    }

    #[test]
    fn test_analyze_with_disc_subdirs() {
        let dir = TempDir::new().unwrap();
        for i in 1..=10 {
            touch(dir.path(), &format!("{i:02} - Track {i}.flac"));
        }
        touch(dir.path(), "CD1/Folder.jpg");
        for i in 1..=4 {
            touch(dir.path(), &format!("CD2/{i:02} - Disc2 {i}.flac"));
        }

        let shape = analyze(dir.path()).unwrap();
        assert_eq!(shape.direct_music_files, 10);
        assert_eq!(shape.total_music_files, 14);
        assert_eq!(shape.subdirectories.len(), 2);

        let cd1 = shape.subdirectories.iter().find(|s| s.name == "CD1").unwrap();
        assert_eq!(cd1.music_files, 0);
        let cd2 = shape.subdirectories.iter().find(|s| s.name == "CD2").unwrap();
        assert_eq!(cd2.music_files, 4);
    }

    #[test]
    fn test_analyze_rejects_non_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir.txt");
        std::fs::write(&file, b"").unwrap();

        let err = analyze(&file).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFolder(_)));
    }
}
