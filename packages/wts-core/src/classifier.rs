//! Pure folder-shape classification, with an optional oracle-assisted pass
//! that always falls back to the same heuristic on any failure.

use std::time::Duration;

use wts_oracle::Oracle;

use crate::folder_shape::{is_disc_like, FolderShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderClassification {
    SingleAlbum,
    MultiDiscAlbum,
    ArtistCollection,
    Unknown,
}

const MULTI_DISC_TOKENS: [&str; 14] = [
    "cd1", "cd2", "disc1", "disc2", "disk1", "disk2", "vol1", "vol2", "volume1", "volume2",
    "part1", "part2", "set1", "set2",
];

/// A subdirectory named like `"1 - Side A"` or `"2. Side B"` carries a bare
/// numeric prefix: no disc/volume/part word, just a leading ordinal. Two or
/// more such siblings are as strong a multi-disc signal as the named tokens.
fn has_numeric_prefix(name: &str) -> bool {
    let trimmed = name.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    matches!(trimmed[digits.len()..].chars().next(), Some(' ' | '-' | '.' | '_'))
}

/// Deterministic, side-effect-free classification. This is both the
/// authoritative classifier when no oracle is available and the fallback
/// path when the oracle consult in [`classify`] doesn't yield a usable
/// answer.
pub fn classify_heuristic(shape: &FolderShape) -> FolderClassification {
    if shape.direct_music_files > 0 && shape.subdirectories.len() <= 1 {
        return FolderClassification::SingleAlbum;
    }

    let has_multi_disc_token = shape.subdirectories.iter().any(|s| {
        let collapsed: String = s.name.chars().filter(|c| !c.is_whitespace()).collect();
        let lowered = collapsed.to_lowercase();
        MULTI_DISC_TOKENS.iter().any(|t| lowered.contains(t))
    });
    if has_multi_disc_token {
        return FolderClassification::MultiDiscAlbum;
    }

    let numeric_prefixed_count = shape
        .subdirectories
        .iter()
        .filter(|s| has_numeric_prefix(&s.name))
        .count();
    if numeric_prefixed_count >= 2 && numeric_prefixed_count == shape.subdirectories.len() {
        return FolderClassification::MultiDiscAlbum;
    }

    if shape.subdirectories.len() >= 2 {
        return FolderClassification::ArtistCollection;
    }

    FolderClassification::Unknown
}

/// Oracle-consulting classification. Failure of any kind — timeout,
/// transport error, a response outside the three known labels (including
/// the literal string `unknown`) — is absorbed silently and the heuristic
/// decides instead. The caller never sees an oracle error from this
/// function.
pub async fn classify(shape: &FolderShape, oracle: &dyn Oracle) -> FolderClassification {
    let prompt = format!(
        "Classify this folder as exactly one word: single_album, multi_disc_album, or \
         artist_collection.\n\n{}",
        shape.tree_text
    );

    let oracle_opinion = tokio::time::timeout(Duration::from_secs(10), oracle.generate(&prompt))
        .await
        .ok()
        .and_then(|r| r.ok());

    match oracle_opinion.as_deref().map(str::trim) {
        Some("single_album") => FolderClassification::SingleAlbum,
        Some("multi_disc_album") => FolderClassification::MultiDiscAlbum,
        Some("artist_collection") => FolderClassification::ArtistCollection,
        _ => classify_heuristic(shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder_shape::SubdirInfo;
    use std::path::PathBuf;

    fn shape_with_subdirs(direct: usize, subdir_names: &[&str]) -> FolderShape {
        FolderShape {
            name: "Test".to_string(),
            path: PathBuf::from("/music/Test"),
            total_music_files: direct,
            direct_music_files: direct,
            direct_music_basenames: Vec::new(),
            subdirectories: subdir_names
                .iter()
                .map(|n| SubdirInfo {
                    name: n.to_string(),
                    path: PathBuf::from(format!("/music/Test/{n}")),
                    music_files: 5,
                    music_basenames: Vec::new(),
                })
                .collect(),
            max_depth: if subdir_names.is_empty() { 0 } else { 1 },
            tree_text: String::new(),
        }
    }

    #[test]
    fn test_single_album_with_no_subdirs() {
        let shape = shape_with_subdirs(5, &[]);
        assert_eq!(classify_heuristic(&shape), FolderClassification::SingleAlbum);
    }

    #[test]
    fn test_multi_disc_numeric_prefix() {
        let shape = shape_with_subdirs(0, &["1 - Disc One", "2 - Disc Two", "3 - Disc Three", "4 - Disc Four"]);
        assert_eq!(classify_heuristic(&shape), FolderClassification::MultiDiscAlbum);
    }

    #[test]
    fn test_multi_disc_cd_tokens() {
        let shape = shape_with_subdirs(0, &["CD1", "CD2"]);
        assert_eq!(classify_heuristic(&shape), FolderClassification::MultiDiscAlbum);
    }

    #[test]
    fn test_artist_collection() {
        let shape = shape_with_subdirs(
            0,
            &["2019 - First", "2020 - Second", "2021 - Third", "2022 - Fourth", "2023 - Fifth", "2024 - Sixth"],
        );
        assert_eq!(classify_heuristic(&shape), FolderClassification::ArtistCollection);
    }

    #[test]
    fn test_unknown_empty_folder() {
        let shape = shape_with_subdirs(0, &[]);
        assert_eq!(classify_heuristic(&shape), FolderClassification::Unknown);
    }

    #[test]
    fn test_is_disc_like_used_by_scanner_matches_prefixes() {
        assert!(is_disc_like("CD1"));
        assert!(!is_disc_like("Bonus"));
    }
}
