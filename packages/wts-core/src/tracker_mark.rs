//! Reading and writing the `.whats-that-sound` hidden marker file that
//! records an accepted proposal (or, for an artist collection, every album
//! accepted under it) and marks the source folder as organized.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use wts_store::Proposal;

use crate::error::CoreResult;

pub const TRACKER_FILENAME: &str = ".whats-that-sound";

/// The two JSON shapes a tracker mark can take. `#[serde(untagged)]` picks
/// whichever variant parses; `ArtistCollection` is tried first since its
/// `collection_type` field is absent from `Album`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackerMark {
    ArtistCollection {
        collection_type: String,
        folder_name: String,
        albums: Vec<Proposal>,
        organized_timestamp: String,
    },
    Album {
        proposal: Proposal,
        folder_name: String,
        organized_timestamp: String,
    },
}

pub fn path_for(folder: &Path) -> PathBuf {
    folder.join(TRACKER_FILENAME)
}

pub fn exists(folder: &Path) -> bool {
    path_for(folder).is_file()
}

pub fn read(folder: &Path) -> CoreResult<Option<TrackerMark>> {
    let path = path_for(folder);
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.display().to_string())
}

/// Write the single-album tracker mark after a successful move.
pub fn write_album_mark(folder: &Path, proposal: &Proposal) -> CoreResult<()> {
    let mark = TrackerMark::Album {
        proposal: proposal.clone(),
        folder_name: folder_name(folder),
        organized_timestamp: Utc::now().to_rfc3339(),
    };
    write(folder, &mark)
}

/// Write (or overwrite) the artist-collection tracker mark once every album
/// beneath the folder has been accepted and moved.
pub fn write_collection_mark(folder: &Path, albums: Vec<Proposal>) -> CoreResult<()> {
    let mark = TrackerMark::ArtistCollection {
        collection_type: "artist_collection".to_string(),
        folder_name: folder_name(folder),
        albums,
        organized_timestamp: Utc::now().to_rfc3339(),
    };
    write(folder, &mark)
}

fn write(folder: &Path, mark: &TrackerMark) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(mark)?;
    std::fs::write(path_for(folder), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn proposal() -> Proposal {
        Proposal {
            artist: "Test Artist".to_string(),
            album: "Test Album".to_string(),
            year: "2023".to_string(),
            release_type: "Album".to_string(),
            confidence: "high".to_string(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_album_mark_round_trip() {
        let dir = TempDir::new().unwrap();
        assert!(!exists(dir.path()));

        write_album_mark(dir.path(), &proposal()).unwrap();
        assert!(exists(dir.path()));

        let mark = read(dir.path()).unwrap().unwrap();
        match mark {
            TrackerMark::Album { proposal, .. } => assert_eq!(proposal.artist, "Test Artist"),
            TrackerMark::ArtistCollection { .. } => panic!("expected Album variant"),
        }
    }

    #[test]
    fn test_collection_mark_round_trip() {
        let dir = TempDir::new().unwrap();
        write_collection_mark(dir.path(), vec![proposal(), proposal()]).unwrap();

        let mark = read(dir.path()).unwrap().unwrap();
        match mark {
            TrackerMark::ArtistCollection {
                collection_type,
                albums,
                ..
            } => {
                assert_eq!(collection_type, "artist_collection");
                assert_eq!(albums.len(), 2);
            }
            TrackerMark::Album { .. } => panic!("expected ArtistCollection variant"),
        }
    }

    #[test]
    fn test_organized_timestamp_is_rfc3339_not_a_path() {
        let dir = TempDir::new().unwrap();
        write_album_mark(dir.path(), &proposal()).unwrap();
        let raw = std::fs::read_to_string(path_for(dir.path())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let stamp = value["organized_timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
