use crate::aggregate;
use crate::config::{Config, ProjectConfig};
use crate::evidence;
use crate::github::GithubClient;
use crate::judge::JudgeClient;
use crate::media::{self, TranscriptionClient};
use crate::models::{Evidence, ProjectResult, ProjectStatus};
use crate::score;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, warn};

const NOT_AVAILABLE: &str = "Not available";

/// Orchestrates a full judging run: evidence gathering, two-judge fan-out,
/// aggregation, scoring and ranking.
///
/// Projects are processed sequentially; the only concurrency is the
/// fork/join of the two judge calls within one project. No stage failure
/// escapes the per-project driver: every project always yields a fully
/// formed `ProjectResult`.
pub struct Runner {
    config: Config,
    judge_a: JudgeClient,
    judge_b: JudgeClient,
    github: GithubClient,
    transcriber: Option<TranscriptionClient>,
}

impl Runner {
    /// Build the runner, resolving all backend API keys up front so a
    /// missing key fails the run before any project is touched
    pub fn new(config: Config) -> Result<Self> {
        let judge_a = JudgeClient::new("primary", config.judges.primary.clone())
            .context("Failed to configure primary judge")?;
        let judge_b = JudgeClient::new("secondary", config.judges.secondary.clone())
            .context("Failed to configure secondary judge")?;

        let transcriber = match &config.transcription {
            Some(transcription) => Some(
                TranscriptionClient::new(transcription)
                    .context("Failed to configure transcription client")?,
            ),
            None => None,
        };

        Ok(Self {
            config,
            judge_a,
            judge_b,
            github: GithubClient::new(),
            transcriber,
        })
    }

    /// Judge every configured project, then rank the batch by total score
    pub async fn run(&self) -> Result<Vec<ProjectResult>> {
        // Parent scratch directory for all media downloads in this run;
        // removed on every exit path when dropped
        let scratch_root = tempfile::tempdir().context("Failed to create scratch directory")?;

        let total = self.config.projects.len();
        let mut results = Vec::with_capacity(total);

        for (index, project) in self.config.projects.iter().enumerate() {
            info!(project = %project.name, "Judging project {}/{}", index + 1, total);
            let result = self.process_project(project, scratch_root.path()).await;
            results.push(result);
        }

        score::rank(&mut results);
        Ok(results)
    }

    async fn process_project(&self, project: &ProjectConfig, scratch_root: &Path) -> ProjectResult {
        let evidence = self.gather_evidence(project, scratch_root).await;
        self.judge_project(project, &evidence).await
    }

    /// Collect transcript, README and commit count for one project.
    /// Collaborator failures degrade the corresponding evidence field to
    /// `None`; they never abort the project.
    async fn gather_evidence(&self, project: &ProjectConfig, scratch_root: &Path) -> Evidence {
        let transcript = self.gather_transcript(project, scratch_root).await;

        let (readme, commit_count) = match &project.repo_link {
            Some(repo_link) => (
                Some(self.github.fetch_readme(repo_link).await),
                self.github.count_commits(repo_link).await,
            ),
            None => (None, None),
        };

        evidence::assemble(
            &project.description,
            transcript,
            readme,
            commit_count,
            project.repo_link.clone(),
        )
    }

    /// Run the media chain: download, extract audio, transcribe. Returns
    /// the raw transcriber output (possibly a sentinel) or `None` when any
    /// earlier stage fails.
    async fn gather_transcript(&self, project: &ProjectConfig, scratch_root: &Path) -> Option<String> {
        let transcriber = self.transcriber.as_ref()?;
        let video_url = project.video_url.as_deref()?;

        // Per-project scratch directory inside the run's parent; dropped
        // (and deleted) as soon as transcription finishes
        let scratch = match tempfile::tempdir_in(scratch_root) {
            Ok(scratch) => scratch,
            Err(io_error) => {
                warn!(project = %project.name, %io_error, "Could not create project scratch directory");
                return None;
            }
        };

        let video_path = media::download_video(video_url, scratch.path()).await?;
        let audio_path = media::extract_audio(&video_path).await?;
        Some(transcriber.transcribe(&audio_path).await)
    }

    /// Fan out both judges over the evidence, join, aggregate and score.
    /// This is the pipeline's only fork/join point; each judge call is
    /// independently timeout-bounded and there is no shared mutable state
    /// between them.
    pub async fn judge_project(&self, project: &ProjectConfig, evidence: &Evidence) -> ProjectResult {
        let (record_a, record_b) = tokio::join!(
            self.judge_a.judge(evidence, &self.config.rubric),
            self.judge_b.judge(evidence, &self.config.rubric),
        );

        self.finalize(
            project,
            evidence,
            aggregate::aggregate(
                self.judge_a.id(),
                record_a,
                self.judge_b.id(),
                record_b,
                &self.config.rubric,
            ),
        )
    }

    /// Turn the aggregation outcome into a terminal result. Every rubric
    /// criterion is guaranteed a score and a rationale, so downstream
    /// ranking and display carry no null-handling burden.
    fn finalize(
        &self,
        project: &ProjectConfig,
        evidence: &Evidence,
        outcome: Result<crate::models::AggregatedJudgment>,
    ) -> ProjectResult {
        let rubric = &self.config.rubric;
        let mut result = self.pending_result(project, evidence);

        match outcome {
            Ok(judgment) => {
                let mut scores = HashMap::new();
                let mut rationales = HashMap::new();
                for criterion in &rubric.criteria {
                    scores.insert(
                        criterion.name.clone(),
                        judgment.scores.get(&criterion.name).copied().unwrap_or(0.0),
                    );
                    rationales.insert(
                        criterion.name.clone(),
                        judgment
                            .rationales
                            .get(&criterion.name)
                            .cloned()
                            .unwrap_or_else(|| "No rationale provided.".to_string()),
                    );
                }

                result.total_score = score::weighted_total(&scores, rubric);
                result.scores = scores;
                result.rationales = rationales;
                result.feedback = judgment.feedback;
                result.status = ProjectStatus::Judged;
            }
            Err(cause) => {
                let message = format!("{cause:#}");
                error!(project = %project.name, %message, "Project judgment failed");

                for criterion in &rubric.criteria {
                    result.scores.insert(criterion.name.clone(), 0.0);
                    result
                        .rationales
                        .insert(criterion.name.clone(), format!("Judging failed: {message}"));
                }
                result.total_score = 0.0;
                result.feedback = message;
                result.status = ProjectStatus::Error;
            }
        }

        result
    }

    /// A freshly registered result: Pending, empty maps, placeholders for
    /// missing evidence
    fn pending_result(&self, project: &ProjectConfig, evidence: &Evidence) -> ProjectResult {
        ProjectResult {
            project_name: project.name.clone(),
            description: project.description.clone(),
            total_score: 0.0,
            scores: HashMap::new(),
            rationales: HashMap::new(),
            feedback: String::new(),
            transcript: evidence
                .transcript
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            readme: evidence
                .readme
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            status: ProjectStatus::Pending,
        }
    }
}
