//! Job, status, and proposal types

use serde::{Deserialize, Serialize};

/// The full state machine. No other value is ever stored for a job's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Analyzing,
    Ready,
    Accepted,
    Moving,
    Completed,
    Skipped,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Queued,
        JobStatus::Analyzing,
        JobStatus::Ready,
        JobStatus::Accepted,
        JobStatus::Moving,
        JobStatus::Completed,
        JobStatus::Skipped,
        JobStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Analyzing => "analyzing",
            Self::Ready => "ready",
            Self::Accepted => "accepted",
            Self::Moving => "moving",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }

    /// Parse a status string, accepting historical aliases on read but never
    /// producing them. Returns `None` for genuinely unrecognized values.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(Self::Queued),
            "analyzing" | "in_progress" => Some(Self::Analyzing),
            "ready" | "approved" => Some(Self::Ready),
            "accepted" => Some(Self::Accepted),
            "moving" => Some(Self::Moving),
            "completed" => Some(Self::Completed),
            "skipped" => Some(Self::Skipped),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `scan` processes a root; `analyze` processes one album folder; `move`
/// copies files for an accepted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Scan,
    Analyze,
    Move,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Analyze => "analyze",
            Self::Move => "move",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scan" => Some(Self::Scan),
            "analyze" => Some(Self::Analyze),
            "move" => Some(Self::Move),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The central persisted entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub folder_path: String,
    pub job_type: JobType,
    pub metadata_json: Option<String>,
    pub user_feedback: Option<String>,
    pub artist_hint: Option<String>,
    pub status: JobStatus,
    pub result_json: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// The release type a proposal may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ReleaseType {
    Album,
    Ep,
    Single,
    Compilation,
    Live,
    Remix,
    Bootleg,
}

/// The payload of `result_json` for `analyze` jobs: `{artist, album, year,
/// release_type, confidence, reasoning}`. All fields are strings per the
/// data model, with the exception of `release_type`/`confidence` which are
/// constrained enums serialized as their string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub artist: String,
    pub album: String,
    pub year: String,
    pub release_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: String,
    #[serde(default)]
    pub reasoning: String,
}

fn default_confidence() -> String {
    "medium".to_string()
}

impl Proposal {
    /// A job is only `ready` if its `result_json` parses and contains at
    /// least these four fields; this constructor enforces the non-empty
    /// variant used when we control construction (e.g. fallback proposals).
    pub fn validate(&self) -> bool {
        !self.artist.is_empty()
            && !self.album.is_empty()
            && !self.year.is_empty()
            && !self.release_type.is_empty()
    }
}
