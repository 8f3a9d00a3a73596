use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Normalized per-project inputs handed to the judges.
///
/// `transcript` and `readme` are `None` when the upstream collaborator could
/// not produce them; error-sentinel strings from collaborators must never be
/// stored here (see `evidence::assemble`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub description: String,
    pub transcript: Option<String>,
    pub readme: Option<String>,
    pub commit_count: Option<u64>,
    pub repo_url: Option<String>,
}

/// Outcome of a single judge call: success xor failure, never both
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JudgeRecord {
    Success {
        /// Per-criterion scores, keyed by criterion name
        scores: HashMap<String, f64>,
        /// Per-criterion rationale text, keyed by criterion name
        rationales: HashMap<String, String>,
        /// Free-text overall feedback
        feedback: String,
    },
    Failure {
        error: String,
    },
}

impl JudgeRecord {
    pub fn is_failure(&self) -> bool {
        matches!(self, JudgeRecord::Failure { .. })
    }
}

/// Where an aggregated judgment came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JudgmentOrigin {
    /// Both judges succeeded and were merged
    Consensus,
    /// One judge failed; the named judge's record was used verbatim
    Single(String),
}

/// Two judge records merged into one scored view, with the originals
/// retained for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedJudgment {
    pub scores: HashMap<String, f64>,
    pub rationales: HashMap<String, String>,
    pub feedback: String,
    pub origin: JudgmentOrigin,
    pub source_judgments: BTreeMap<String, JudgeRecord>,
}

/// Lifecycle state of a project within a judging run.
/// Pending transitions to exactly one of Judged or Error, then is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    Pending,
    Judged,
    Error,
}

/// Final record for one project, always fully formed: every rubric criterion
/// has a score and a rationale regardless of how judging went
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResult {
    pub project_name: String,
    pub description: String,
    pub total_score: f64,
    pub scores: HashMap<String, f64>,
    pub rationales: HashMap<String, String>,
    pub feedback: String,
    /// Transcript text, or a placeholder when unavailable
    pub transcript: String,
    /// README text, or a placeholder when unavailable
    pub readme: String,
    pub status: ProjectStatus,
}
