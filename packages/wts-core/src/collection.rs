//! After a `move` job for an artist-collection member completes, checks
//! whether every sibling album under the same artist folder has also
//! completed, and if so writes the aggregate collection TrackerMark.

use std::path::Path;

use wts_store::{JobStatus, JobStore, Proposal};

use crate::error::CoreResult;
use crate::folder_shape;
use crate::tracker_mark;

/// Recompute which immediate subdirectories of `artist_folder` carry audio,
/// and if every one of them has a `completed` job, write the collection
/// TrackerMark listing all of their accepted proposals. Returns `true` if
/// the mark was written.
pub async fn maybe_write_collection_mark(store: &JobStore, artist_folder: &Path) -> CoreResult<bool> {
    let shape = folder_shape::analyze(artist_folder)?;
    let candidates: Vec<_> = shape.subdirectories.iter().filter(|s| s.music_files > 0).collect();
    if candidates.is_empty() {
        return Ok(false);
    }

    let mut proposals = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let path_str = candidate.path.display().to_string();
        let job = match store.latest_status_for_folder(&path_str).await? {
            Some(job) => job,
            None => return Ok(false),
        };
        if job.status != JobStatus::Completed {
            return Ok(false);
        }
        let proposal: Proposal = match job.result_json {
            Some(json) => serde_json::from_str(&json)?,
            None => return Ok(false),
        };
        proposals.push(proposal);
    }

    tracker_mark::write_collection_mark(artist_folder, proposals)?;
    Ok(true)
}
