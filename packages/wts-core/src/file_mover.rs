//! Copies a source folder's supported-extension files into the canonical
//! `target_root/Artist/Album (Year)/…` layout and stamps the TrackerMark.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use wts_store::Proposal;

use crate::error::CoreResult;
use crate::folder_shape::is_supported_extension;
use crate::tracker_mark;

const FORBIDDEN_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_COMPONENT_LEN: usize = 120;

/// Replace filesystem-hostile characters and cap the length so a proposal's
/// free-form artist/album strings are always safe path components.
pub fn sanitize(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();
    replaced.trim().chars().take(MAX_COMPONENT_LEN).collect()
}

pub fn target_dir_for(target_root: &Path, proposal: &Proposal) -> PathBuf {
    let artist = sanitize(&proposal.artist);
    let album = sanitize(&proposal.album);
    let year = if proposal.year.trim().is_empty() {
        "Unknown".to_string()
    } else {
        proposal.year.clone()
    };
    target_root.join(artist).join(format!("{album} ({year})"))
}

/// Copy every supported-extension file under `source`, preserving its
/// relative path, into the proposal's target directory, then write the
/// TrackerMark. Returns the number of files successfully copied.
pub fn move_folder(source: &Path, proposal: &Proposal, target_root: &Path) -> CoreResult<usize> {
    let target_dir = target_dir_for(target_root, proposal);
    std::fs::create_dir_all(&target_dir)?;

    let mut copied = 0usize;
    for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || !is_supported_extension(path) {
            continue;
        }
        let relative = match path.strip_prefix(source) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let dest = target_dir.join(relative);
        if let Some(parent) = dest.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %path.display(), error = %e, "failed to create destination directory");
                continue;
            }
        }
        match std::fs::copy(path, &dest) {
            Ok(_) => copied += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to copy file during move")
            }
        }
    }

    tracker_mark::write_album_mark(source, proposal)?;
    Ok(copied)
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
        std::fs::write(p, b"data").unwrap();
    }

    fn proposal(artist: &str, album: &str, year: &str) -> Proposal {
        Proposal {
            artist: artist.to_string(),
            album: album.to_string(),
            year: year.to_string(),
            release_type: "Album".to_string(),
            confidence: "high".to_string(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_sanitize_replaces_forbidden_characters() {
        assert_eq!(sanitize("AC/DC"), "AC_DC");
        assert_eq!(sanitize("Sly & the Family: Stone"), "Sly & the Family_ Stone");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long = "A".repeat(200);
        assert_eq!(sanitize(&long).len(), MAX_COMPONENT_LEN);
    }

    #[test]
    fn test_target_dir_defaults_year_to_unknown() {
        let root = PathBuf::from("/music/organized");
        let p = proposal("Artist", "Album", "");
        assert_eq!(target_dir_for(&root, &p), root.join("Artist").join("Album (Unknown)"));
    }

    #[test]
    fn test_move_folder_single_album_round_trip() {
        let source = TempDir::new().unwrap();
        touch(source.path(), "track1.mp3");
        touch(source.path(), "track2.flac");
        touch(source.path(), "cover.jpg");

        let target_root = TempDir::new().unwrap();
        let proposal = proposal("Test Artist", "Test Album", "2023");
        let copied = move_folder(source.path(), &proposal, target_root.path()).unwrap();

        assert_eq!(copied, 2);
        let dest = target_root.path().join("Test Artist").join("Test Album (2023)");
        assert!(dest.join("track1.mp3").is_file());
        assert!(dest.join("track2.flac").is_file());
        assert!(!dest.join("cover.jpg").exists());
        assert!(tracker_mark::exists(source.path()));
    }

    #[test]
    fn test_move_folder_preserves_disc_subdirectories() {
        let source = TempDir::new().unwrap();
        touch(source.path(), "CD1/track1.mp3");
        touch(source.path(), "CD2/track1.mp3");

        let target_root = TempDir::new().unwrap();
        let proposal = proposal("Multi Artist", "Multi Album", "2024");
        let copied = move_folder(source.path(), &proposal, target_root.path()).unwrap();

        assert_eq!(copied, 2);
        let dest = target_root.path().join("Multi Artist").join("Multi Album (2024)");
        assert!(dest.join("CD1").join("track1.mp3").is_file());
        assert!(dest.join("CD2").join("track1.mp3").is_file());
    }

    #[test]
    fn test_move_folder_is_idempotent() {
        let source = TempDir::new().unwrap();
        touch(source.path(), "track1.mp3");
        let target_root = TempDir::new().unwrap();
        let proposal = proposal("Artist", "Album", "2023");

        move_folder(source.path(), &proposal, target_root.path()).unwrap();
        let copied_again = move_folder(source.path(), &proposal, target_root.path()).unwrap();
        assert_eq!(copied_again, 1);
    }
}
