//! Asks the oracle for a structured proposal describing a folder's
//! artist/album/year/release type, and falls back to a low-confidence
//! metadata-only proposal whenever the response can't be parsed.

use wts_oracle::Oracle;
use wts_store::Proposal;

use crate::error::{CoreError, CoreResult};
use crate::folder_shape::FolderShape;

/// Call the oracle and return a validated proposal. Transport/credential
/// errors from the oracle propagate to the caller (a genuine transient
/// failure); a response that doesn't parse into a well-formed proposal is
/// logged and replaced by a fallback instead of failing the job, per the
/// ProposalParseError handling rule.
pub async fn generate_proposal(
    shape: &FolderShape,
    artist_hint: Option<&str>,
    user_feedback: Option<&str>,
    oracle: &dyn Oracle,
) -> CoreResult<Proposal> {
    let prompt = build_prompt(shape, artist_hint, user_feedback);
    let raw = oracle.generate(&prompt).await?;

    match parse_proposal(&raw) {
        Ok(proposal) => Ok(proposal),
        Err(parse_err) => {
            parse_err.log();
            Ok(fallback_proposal(shape, artist_hint))
        }
    }
}

fn build_prompt(shape: &FolderShape, artist_hint: Option<&str>, user_feedback: Option<&str>) -> String {
    let mut prompt = String::from(
        "Identify the artist, album, year, and release type for this music folder. \
         Respond with a single JSON object: \
         {\"artist\": string, \"album\": string, \"year\": string, \
         \"release_type\": one of Album|EP|Single|Compilation|Live|Remix|Bootleg, \
         \"confidence\": one of low|medium|high, \"reasoning\": string}.\n\n",
    );
    prompt.push_str(&shape.tree_text);

    if let Some(hint) = artist_hint {
        prompt.push_str(&format!(
            "\n\nThis folder is a subfolder of an artist-named directory: \"{hint}\". \
             Use it as the artist unless the folder contents clearly indicate otherwise."
        ));
    }

    if let Some(feedback) = user_feedback {
        prompt.push_str(&format!(
            "\n\nA human reviewer previously rejected an earlier proposal with this feedback: \"{feedback}\". \
             Take it into account."
        ));
    }

    prompt
}

/// Extract the first balanced `{...}` substring (oracles commonly wrap JSON
/// in markdown fences or commentary) and parse/validate it as a `Proposal`.
fn parse_proposal(raw: &str) -> CoreResult<Proposal> {
    let start = raw
        .find('{')
        .ok_or_else(|| CoreError::ProposalParse("no JSON object found in oracle response".to_string()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| CoreError::ProposalParse("no JSON object found in oracle response".to_string()))?;
    if end < start {
        return Err(CoreError::ProposalParse("malformed JSON object bounds".to_string()));
    }

    let candidate = &raw[start..=end];
    let proposal: Proposal = serde_json::from_str(candidate)
        .map_err(|e| CoreError::ProposalParse(format!("{e}")))?;

    if !proposal.validate() {
        return Err(CoreError::ProposalParse(
            "proposal missing one of artist/album/year/release_type".to_string(),
        ));
    }

    Ok(proposal)
}

/// A low-confidence proposal derived purely from folder metadata, used when
/// the oracle's response can't be parsed so the human still has something to
/// adjudicate rather than a hard failure.
fn fallback_proposal(shape: &FolderShape, artist_hint: Option<&str>) -> Proposal {
    Proposal {
        artist: artist_hint.map(str::to_string).unwrap_or_else(|| "Unknown Artist".to_string()),
        album: shape.name.clone(),
        year: "Unknown".to_string(),
        release_type: "Album".to_string(),
        confidence: "low".to_string(),
        reasoning: "metadata-only fallback: oracle response could not be parsed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use wts_oracle::OracleResult;

    fn shape() -> FolderShape {
        FolderShape {
            name: "Unknown Album".to_string(),
            path: PathBuf::from("/music/Unknown Album"),
            total_music_files: 3,
            direct_music_files: 3,
            direct_music_basenames: vec!["track1.mp3".to_string()],
            subdirectories: Vec::new(),
            max_depth: 0,
            tree_text: "Unknown Album/\n  track1.mp3".to_string(),
        }
    }

    #[derive(Debug)]
    struct StaticOracle(String);

    #[async_trait]
    impl Oracle for StaticOracle {
        async fn generate(&self, _prompt: &str) -> OracleResult<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_generate_proposal_parses_well_formed_json() {
        let oracle = StaticOracle(
            r#"{"artist":"Test Artist","album":"Test Album","year":"2023","release_type":"Album","confidence":"high","reasoning":"because"}"#
                .to_string(),
        );
        let proposal = generate_proposal(&shape(), None, None, &oracle).await.unwrap();
        assert_eq!(proposal.artist, "Test Artist");
        assert_eq!(proposal.confidence, "high");
    }

    #[tokio::test]
    async fn test_generate_proposal_extracts_json_from_markdown_fence() {
        let oracle = StaticOracle(format!(
            "Here you go:\n```json\n{}\n```",
            r#"{"artist":"A","album":"B","year":"2020","release_type":"EP"}"#
        ));
        let proposal = generate_proposal(&shape(), None, None, &oracle).await.unwrap();
        assert_eq!(proposal.artist, "A");
    }

    #[tokio::test]
    async fn test_generate_proposal_falls_back_on_unparseable_response() {
        let oracle = StaticOracle("I'm not sure, sorry.".to_string());
        let proposal = generate_proposal(&shape(), Some("Hint Artist"), None, &oracle).await.unwrap();
        assert_eq!(proposal.artist, "Hint Artist");
        assert_eq!(proposal.confidence, "low");
        assert_eq!(proposal.album, "Unknown Album");
    }

    #[tokio::test]
    async fn test_generate_proposal_falls_back_on_missing_required_field() {
        let oracle = StaticOracle(r#"{"artist":"","album":"B","year":"2020","release_type":"EP"}"#.to_string());
        let proposal = generate_proposal(&shape(), None, None, &oracle).await.unwrap();
        assert_eq!(proposal.confidence, "low");
    }
}
