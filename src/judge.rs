use crate::config::JudgeBackendConfig;
use crate::models::{Evidence, JudgeRecord};
use crate::rubric::Rubric;
use anyhow::{Context, Result};
use async_openai::{Client, config::OpenAIConfig, types::CreateChatCompletionRequestArgs};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an AI Hackathon Judge evaluating projects based on a rubric. Output results in JSON format.";

/// Adapter around one reasoning backend.
///
/// The API key is resolved once at construction, not re-read per call.
/// Every failure mode of a judge call (transport error, timeout, malformed
/// response) normalizes to a `JudgeRecord::Failure`; nothing propagates past
/// `judge`.
pub struct JudgeClient {
    id: String,
    config: JudgeBackendConfig,
    api_key: String,
}

impl JudgeClient {
    pub fn new(id: &str, config: JudgeBackendConfig) -> Result<Self> {
        let api_key = std::env::var(&config.env_var_api_key)
            .with_context(|| format!("Environment variable {} not found", config.env_var_api_key))?;

        Ok(Self {
            id: id.to_string(),
            config,
            api_key,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Evaluate one project against the rubric, bounded by the configured
    /// timeout. No retries: a transient backend failure is this judge's
    /// failure and the aggregator decides what to do with it.
    pub async fn judge(&self, evidence: &Evidence, rubric: &Rubric) -> JudgeRecord {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        match tokio::time::timeout(timeout, self.try_judge(evidence, rubric)).await {
            Ok(Ok(record)) => record,
            Ok(Err(error)) => {
                warn!(judge = %self.id, error = %format!("{error:#}"), "Judge call failed");
                JudgeRecord::Failure {
                    error: format!("{error:#}"),
                }
            }
            Err(_) => {
                warn!(judge = %self.id, timeout_secs = self.config.timeout_secs, "Judge call timed out");
                JudgeRecord::Failure {
                    error: format!("Judge call timed out after {}s", self.config.timeout_secs),
                }
            }
        }
    }

    async fn try_judge(&self, evidence: &Evidence, rubric: &Rubric) -> Result<JudgeRecord> {
        let prompt = build_prompt(evidence, rubric);
        let client = self.create_client();
        let request = self.build_request(&prompt)?;

        debug!(judge = %self.id, model = %self.config.model, "Requesting judgment");
        let response = client
            .chat()
            .create(request)
            .await
            .context("Failed to get judgment from backend")?;

        let content = match response.choices.first() {
            Some(choice) => match &choice.message.content {
                Some(content) => content.clone(),
                None => String::new(),
            },
            None => String::new(),
        };

        if content.trim().is_empty() {
            anyhow::bail!("Empty response from judge backend");
        }

        self.parse_judgment(&content, rubric)
    }

    fn create_client(&self) -> Client<OpenAIConfig> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&self.config.api_endpoint);

        Client::with_config(openai_config)
    }

    fn build_request(&self, prompt: &str) -> Result<async_openai::types::CreateChatCompletionRequest> {
        let max_tokens = u16::try_from(self.config.max_tokens).unwrap_or_else(|_| {
            warn!(
                judge = %self.id,
                configured = self.config.max_tokens,
                "max_tokens exceeds the request limit; capping at {}",
                u16::MAX
            );
            u16::MAX
        });

        let system_message = async_openai::types::ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .context("Failed to build system message")?
            .into();

        let user_message = async_openai::types::ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .context("Failed to build user message")?
            .into();

        CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages([system_message, user_message])
            .temperature(self.config.temperature as f32)
            .max_tokens(max_tokens)
            .build()
            .context("Failed to build chat completion request")
    }

    /// Parse the backend's raw text into a judge record.
    ///
    /// Missing top-level keys are a hard failure. A score/rationale key set
    /// that does not match the rubric is logged and tolerated, so one badly
    /// keyed criterion does not discard an otherwise usable judgment.
    fn parse_judgment(&self, response: &str, rubric: &Rubric) -> Result<JudgeRecord> {
        let parsed = parse_json_response(response)?;

        let scores_obj = parsed
            .get("scores")
            .and_then(|s| s.as_object())
            .context("Judge response JSON missing 'scores' object")?;
        let rationales_obj = parsed
            .get("rationales")
            .and_then(|r| r.as_object())
            .context("Judge response JSON missing 'rationales' object")?;
        let feedback = parsed
            .get("feedback")
            .and_then(|f| f.as_str())
            .context("Judge response JSON missing 'feedback' string")?
            .to_string();

        let (min, max) = rubric.scale;
        let mut scores = HashMap::new();
        for (name, value) in scores_obj {
            let score = match value.as_f64() {
                Some(score) => score.clamp(min, max),
                None => {
                    warn!(judge = %self.id, criterion = %name, "Non-numeric score treated as 0");
                    0.0
                }
            };
            scores.insert(name.clone(), score);
        }

        let mut rationales = HashMap::new();
        for (name, value) in rationales_obj {
            let rationale = match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            };
            rationales.insert(name.clone(), rationale);
        }

        self.check_key_sets(&scores, &rationales, rubric);

        Ok(JudgeRecord::Success {
            scores,
            rationales,
            feedback,
        })
    }

    fn check_key_sets(
        &self,
        scores: &HashMap<String, f64>,
        rationales: &HashMap<String, String>,
        rubric: &Rubric,
    ) {
        let expected: HashSet<&str> = rubric.criterion_names().into_iter().collect();
        let score_keys: HashSet<&str> = scores.keys().map(String::as_str).collect();
        let rationale_keys: HashSet<&str> = rationales.keys().map(String::as_str).collect();

        if score_keys != expected || rationale_keys != expected {
            warn!(
                judge = %self.id,
                expected = ?expected,
                scores = ?score_keys,
                rationales = ?rationale_keys,
                "Judge response keys do not match rubric criteria; accepting anyway"
            );
        }
    }
}

/// Compose the evaluation prompt from evidence and rubric.
///
/// Unavailable transcript/README fields render as "Not available"; error
/// markers never appear here because the evidence assembler already scrubbed
/// them.
pub fn build_prompt(evidence: &Evidence, rubric: &Rubric) -> String {
    let criteria_block = rubric
        .criteria
        .iter()
        .map(|c| {
            format!(
                "- {} (Weight: {}%, Scale: {}-{}): {}",
                c.name, c.weight, rubric.scale.0, rubric.scale.1, c.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let transcript = evidence.transcript.as_deref().unwrap_or("Not available");
    let readme = evidence.readme.as_deref().unwrap_or("Not available");
    let commit_line = match evidence.commit_count {
        Some(count) => format!("\n4.  **Commit Count:** {count}"),
        None => String::new(),
    };
    let expected_keys = rubric.criterion_names().join("\", \"");

    format!(
        r#"You are an AI Hackathon Judge. Evaluate the following project based on the provided information and the judging rubric.

**Project Information:**
1.  **Project Description:** {description}
2.  **Pitch Transcript:** {transcript}
3.  **README Content:** {readme}{commit_line}

**Judging Rubric:**
{criteria_block}

**Instructions:**
1.  Provide a score between {min} and {max} for each criterion.
2.  For each criterion, provide a detailed rationale (3-5 sentences) explaining why the project received that specific score, referencing specific aspects of the project description, transcript, or README where applicable.
3.  Provide an overall feedback section (a paragraph or bullet points) summarizing the project's strengths and suggesting specific areas for improvement.
4.  Output the results strictly in JSON format with the following structure:
{{
  "scores": {{ "Criterion Name": score, ... }},
  "rationales": {{ "Criterion Name": "Detailed rationale text...", ... }},
  "feedback": "Overall feedback text..."
}}

Ensure the keys in "scores" and "rationales" exactly match the criterion names from the rubric: "{expected_keys}". Ensure the "feedback" key is present.

**JSON Output:**
"#,
        description = evidence.description,
        min = rubric.scale.0,
        max = rubric.scale.1,
    )
}

/// Parse JSON from the response, handling an object embedded in prose or
/// code fences
fn parse_json_response(response: &str) -> Result<Value> {
    match serde_json::from_str(response) {
        Ok(parsed) => Ok(parsed),
        Err(_) => try_extract_embedded_json(response),
    }
}

fn try_extract_embedded_json(response: &str) -> Result<Value> {
    match response.find('{') {
        // Search for the closing brace only after the opening one; a stray
        // '}' earlier in the text must not produce an inverted slice
        Some(start) => match response[start..].rfind('}') {
            Some(offset) => serde_json::from_str(&response[start..=start + offset])
                .context("Failed to parse extracted JSON"),
            None => anyhow::bail!("Found opening brace but no closing brace in response"),
        },
        None => anyhow::bail!("No JSON found in response"),
    }
}
