//! Walks a root directory one level and enqueues `analyze` jobs for every
//! album-like, multi-disc, or artist-collection folder it finds beneath it.

use std::path::{Path, PathBuf};

use wts_store::{JobStore, JobType};

use crate::error::CoreResult;
use crate::folder_shape::{self, is_disc_like, is_supported_extension};
use crate::tracker_mark;

/// Folder names ignored when enumerating subdirectories: scanner/log output
/// and artwork directories the oracle has no use for.
const IGNORED_SUBDIR_NAMES: [&str; 9] = [
    "scans", "scan", "artwork", "covers", "cover", "booklet", "extras", "logs", "log",
];

fn is_ignored(name: &str) -> bool {
    IGNORED_SUBDIR_NAMES.iter().any(|i| i.eq_ignore_ascii_case(name))
}

/// Walk `root` one level and enqueue zero or more `analyze` jobs. Returns
/// the number of jobs enqueued. Errors walking one child are logged and
/// that child is skipped; the scan continues over the remaining children.
pub async fn scan(store: &JobStore, root: &Path) -> CoreResult<usize> {
    let mut enqueued = 0usize;

    let read_dir = match std::fs::read_dir(root) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "scan root unreadable");
            return Err(e.into());
        }
    };

    for entry in read_dir {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let child_path = entry.path();
        if !child_path.is_dir() {
            continue;
        }

        match scan_child(store, &child_path).await {
            Ok(n) => enqueued += n,
            Err(e) => {
                tracing::warn!(child = %child_path.display(), error = %e, "skipping subtree after scan error");
            }
        }
    }

    Ok(enqueued)
}

async fn scan_child(store: &JobStore, child_path: &Path) -> CoreResult<usize> {
    let path_str = child_path.display().to_string();

    if store.has_any_for_folder(&path_str, None).await? {
        return Ok(0);
    }
    if tracker_mark::exists(child_path) {
        return Ok(0);
    }

    let direct_music = has_direct_music(child_path)?;
    let subdirs = immediate_subdirs(child_path)?;
    let disc_like: Vec<PathBuf> = subdirs
        .iter()
        .filter(|s| is_disc_like(subdir_name(s)))
        .cloned()
        .collect();

    let child_name = child_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.clone());

    if direct_music && !disc_like.is_empty() {
        if disc_dominates(child_path, &disc_like, subdirs.len())? {
            let mut n = 0;
            for disc in &disc_like {
                enqueue_album(store, disc, Some(&child_name)).await?;
                n += 1;
            }
            return Ok(n);
        }
        enqueue_album(store, child_path, None).await?;
        return Ok(1);
    }

    if !direct_music && disc_like.len() >= disc_threshold(subdirs.len()) && disc_like.len() >= 2 {
        enqueue_album(store, child_path, None).await?;
        return Ok(1);
    }

    if direct_music && disc_like.is_empty() {
        enqueue_album(store, child_path, None).await?;
        return Ok(1);
    }

    // Artist collection: one analyze job per subdir that has audio anywhere
    // beneath it, falling back to the child itself if none qualify.
    let mut n = 0;
    for subdir in &subdirs {
        if count_recursive_music(subdir)? > 0 {
            enqueue_album(store, subdir, Some(&child_name)).await?;
            n += 1;
        }
    }
    if n == 0 && count_recursive_music(child_path)? > 0 {
        enqueue_album(store, child_path, None).await?;
        n = 1;
    }
    Ok(n)
}

/// `disc_like.len() ≥ 2 && D > R && disc_like.len() ≥ max(2, ceil(0.5 * |subdirs|))`.
fn disc_dominates(child_path: &Path, disc_like: &[PathBuf], subdir_count: usize) -> CoreResult<bool> {
    if disc_like.len() < 2 {
        return Ok(false);
    }
    let r = count_direct_music(child_path)?;
    let mut d = 0usize;
    for disc in disc_like {
        d += count_recursive_music(disc)?;
    }
    Ok(d > r && disc_like.len() >= disc_threshold(subdir_count))
}

fn disc_threshold(subdir_count: usize) -> usize {
    2.max((subdir_count + 1) / 2)
}

fn subdir_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

async fn enqueue_album(store: &JobStore, folder: &Path, artist_hint: Option<&str>) -> CoreResult<()> {
    let shape = folder_shape::analyze(folder)?;
    let metadata_json = serde_json::to_string(&shape)?;
    let path_str = folder.display().to_string();
    store
        .enqueue(&path_str, JobType::Analyze, Some(&metadata_json), None, artist_hint)
        .await?;
    Ok(())
}

fn has_direct_music(path: &Path) -> CoreResult<bool> {
    Ok(count_direct_music(path)? > 0)
}

fn count_direct_music(path: &Path) -> CoreResult<usize> {
    let mut count = 0usize;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_file() && is_supported_extension(&entry_path) {
            count += 1;
        }
    }
    Ok(count)
}

fn count_recursive_music(path: &Path) -> CoreResult<usize> {
    let mut count = 0usize;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            count += count_recursive_music(&entry_path)?;
        } else if is_supported_extension(&entry_path) {
            count += 1;
        }
    }
    Ok(count)
}

fn immediate_subdirs(path: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            let name = subdir_name(&entry_path);
            if !is_ignored(name) {
                subdirs.push(entry_path);
            }
        }
    }
    Ok(subdirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;
    use wts_store::JobStatus;

    async fn test_store() -> JobStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = JobStore::from_pool(pool);
        store.run_migrations().await.unwrap();
        store
    }

    fn touch(dir: &Path, rel: &str) {
        let p = dir.join(rel);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(p, b"").unwrap();
    }

    #[tokio::test]
    async fn test_weezer_raditude_cover_only_cd1_enqueues_parent_only() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let album = root.path().join("2009 - Raditude");
        for i in 1..=10 {
            touch(&album, &format!("{i:02} - Track {i}.flac"));
        }
        touch(&album, "CD1/Folder.jpg");
        for i in 1..=4 {
            touch(&album, &format!("CD2/{i:02} - Disc2 {i}.flac"));
        }

        let enqueued = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued, 1);

        let jobs = store.recent_jobs(10, Some(&[JobStatus::Queued])).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].folder_path, album.display().to_string());
        assert!(jobs[0].artist_hint.is_none());
    }

    #[tokio::test]
    async fn test_identical_discs_enqueue_each_disc_separately() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let album = root.path().join("Album With Discs");
        for i in 1..=10 {
            touch(&album, &format!("{i:02} - Track {i}.flac"));
        }
        for i in 1..=10 {
            touch(&album, &format!("CD1/{i:02} - Track {i}.flac"));
        }
        for i in 1..=9 {
            touch(&album, &format!("CD2/{i:02} - Track {i}.flac"));
        }

        let enqueued = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued, 2);

        let jobs = store.recent_jobs(10, Some(&[JobStatus::Queued])).await.unwrap();
        assert_eq!(jobs.len(), 2);
        let paths: Vec<_> = jobs.iter().map(|j| j.folder_path.clone()).collect();
        assert!(paths.contains(&album.join("CD1").display().to_string()));
        assert!(paths.contains(&album.join("CD2").display().to_string()));
        assert!(!paths.contains(&album.display().to_string()));
        assert!(jobs.iter().all(|j| j.artist_hint.as_deref() == Some("Album With Discs")));
    }

    #[tokio::test]
    async fn test_single_album_with_no_subdirs_enqueues_once() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let album = root.path().join("Unknown Album");
        touch(&album, "track1.mp3");
        touch(&album, "track2.flac");

        let enqueued = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued, 1);
    }

    #[tokio::test]
    async fn test_artist_collection_enqueues_one_job_per_album_with_hint() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let artist = root.path().join("Test Artist");
        touch(&artist, "First Album/track1.mp3");
        touch(&artist, "Second Album/track1.mp3");

        let enqueued = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued, 2);

        let jobs = store.recent_jobs(10, Some(&[JobStatus::Queued])).await.unwrap();
        assert!(jobs.iter().all(|j| j.artist_hint.as_deref() == Some("Test Artist")));
    }

    #[tokio::test]
    async fn test_rescan_does_not_duplicate_jobs() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let album = root.path().join("Unknown Album");
        touch(&album, "track1.mp3");

        scan(&store, root.path()).await.unwrap();
        let enqueued_again = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued_again, 0);

        let jobs = store.recent_jobs(10, None).await.unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_tracker_mark_hard_skips_a_folder() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let album = root.path().join("Already Organized");
        touch(&album, "track1.mp3");
        tracker_mark::write_album_mark(
            &album,
            &wts_store::Proposal {
                artist: "A".to_string(),
                album: "B".to_string(),
                year: "2020".to_string(),
                release_type: "Album".to_string(),
                confidence: "high".to_string(),
                reasoning: String::new(),
            },
        )
        .unwrap();

        let enqueued = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued, 0);
    }

    #[tokio::test]
    async fn test_ignored_subdir_names_excluded_from_artist_collection() {
        let store = test_store().await;
        let root = TempDir::new().unwrap();
        let artist = root.path().join("Some Artist");
        touch(&artist, "Album One/track1.mp3");
        touch(&artist, "Scans/cover.jpg");

        let enqueued = scan(&store, root.path()).await.unwrap();
        assert_eq!(enqueued, 1);
    }
}
