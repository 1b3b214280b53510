//! Process-local, not-persisted state for the confirmed source/target roots
//! and an optional staged candidate pair awaiting human confirmation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedPaths {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
}

/// Shared, mutable handle to the confirmed source/target roots. Cheap to
/// clone; every holder sees the same underlying state.
pub type SharedPaths = Arc<RwLock<PathsState>>;

#[derive(Debug, Clone)]
pub struct PathsState {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub staged: Option<StagedPaths>,
}

impl PathsState {
    pub fn new(source_dir: PathBuf, target_dir: PathBuf) -> Self {
        Self {
            source_dir,
            target_dir,
            staged: None,
        }
    }

    pub fn shared(source_dir: PathBuf, target_dir: PathBuf) -> SharedPaths {
        Arc::new(RwLock::new(Self::new(source_dir, target_dir)))
    }

    /// Stage a candidate source/target pair. The source must already exist;
    /// the target is created if missing, mirroring the CLI's own contract.
    pub fn stage(&mut self, source_dir: PathBuf, target_dir: PathBuf) -> CoreResult<()> {
        if !source_dir.is_dir() {
            return Err(CoreError::InvalidFolder(source_dir.display().to_string()));
        }
        std::fs::create_dir_all(&target_dir)?;
        self.staged = Some(StagedPaths {
            source_dir,
            target_dir,
        });
        Ok(())
    }

    pub fn cancel_staged(&mut self) {
        self.staged = None;
    }

    /// Promote the staged pair to the confirmed roots; errors if nothing is staged.
    pub fn confirm_staged(&mut self) -> CoreResult<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| CoreError::InvalidFolder("no staged paths to confirm".to_string()))?;
        self.source_dir = staged.source_dir;
        self.target_dir = staged.target_dir;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: String,
}

/// Immediate child directories of `path`, sorted case-insensitively, plus
/// the parent path for "up" navigation in a front-end directory browser.
pub fn list_directory(path: &Path) -> CoreResult<(Vec<DirEntryInfo>, Option<String>)> {
    if !path.is_dir() {
        return Err(CoreError::InvalidFolder(path.display().to_string()));
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry_path.display().to_string(),
            });
        }
    }
    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let parent = path.parent().map(|p| p.display().to_string());
    Ok((entries, parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_requires_existing_source() {
        let mut state = PathsState::new(PathBuf::from("/a"), PathBuf::from("/b"));
        let err = state.stage(PathBuf::from("/does/not/exist"), PathBuf::from("/b")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFolder(_)));
    }

    #[test]
    fn test_stage_then_confirm_round_trip() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut state = PathsState::new(PathBuf::from("/old/source"), PathBuf::from("/old/target"));

        state.stage(source.path().to_path_buf(), target.path().to_path_buf()).unwrap();
        assert!(state.staged.is_some());

        state.confirm_staged().unwrap();
        assert_eq!(state.source_dir, source.path());
        assert_eq!(state.target_dir, target.path());
        assert!(state.staged.is_none());
    }

    #[test]
    fn test_cancel_staged_discards_candidate() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut state = PathsState::new(PathBuf::from("/old/source"), PathBuf::from("/old/target"));
        state.stage(source.path().to_path_buf(), target.path().to_path_buf()).unwrap();

        state.cancel_staged();
        assert!(state.staged.is_none());
        assert_eq!(state.source_dir, PathBuf::from("/old/source"));
    }

    #[test]
    fn test_confirm_without_staged_errors() {
        let mut state = PathsState::new(PathBuf::from("/a"), PathBuf::from("/b"));
        assert!(state.confirm_staged().is_err());
    }

    #[test]
    fn test_list_directory_returns_only_subdirectories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("Albums")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let (entries, parent) = list_directory(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Albums");
        assert!(parent.is_some());
    }
}
