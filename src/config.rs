use crate::rubric::Rubric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one judge backend (an OpenAI-compatible chat endpoint)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JudgeBackendConfig {
    /// API endpoint base, e.g. https://api.openai.com/v1
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    pub env_var_api_key: String,
    /// Model to use for judging
    pub model: String,
    /// Temperature for the judging call
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens for the judgment response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on one judge call; a hung backend becomes a judge failure
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// The two independent judge backends merged by the aggregator
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JudgesConfig {
    pub primary: JudgeBackendConfig,
    pub secondary: JudgeBackendConfig,
}

/// Configuration for the speech transcription endpoint.
/// Optional: without it the pitch video is skipped and the transcript
/// evidence field stays empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionConfig {
    pub api_endpoint: String,
    pub env_var_api_key: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
}

/// One project submitted for judging
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub name: String,
    pub description: String,
    /// Pitch video URL (YouTube, Vimeo, direct link, etc.)
    #[serde(default)]
    pub video_url: Option<String>,
    /// GitHub repository link
    #[serde(default)]
    pub repo_link: Option<String>,
}

fn default_temperature() -> f64 {
    0.5
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

/// Root configuration for a judging run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub judges: JudgesConfig,
    #[serde(default)]
    pub transcription: Option<TranscriptionConfig>,
    #[serde(default)]
    pub rubric: Rubric,
    pub projects: Vec<ProjectConfig>,
}

impl Config {
    /// Load configuration from a TOML file and validate the rubric
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        config
            .rubric
            .validate()
            .with_context(|| format!("Invalid rubric in config: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JUDGES_TOML: &str = r#"
[judges.primary]
api_endpoint = "https://api.openai.com/v1"
env_var_api_key = "OPENAI_API_KEY"
model = "gpt-4o"

[judges.secondary]
api_endpoint = "https://api.anthropic.com/v1"
env_var_api_key = "SECOND_JUDGE_API_KEY"
model = "claude-sonnet"
temperature = 0.3
max_tokens = 1500
timeout_secs = 60
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_config_parsing() {
        let toml_content = format!(
            r#"{JUDGES_TOML}
[transcription]
api_endpoint = "https://api.openai.com/v1"
env_var_api_key = "OPENAI_API_KEY"

[rubric]
scale = [1.0, 10.0]

[[rubric.criteria]]
name = "Innovation"
weight = 60
description = "Novelty of the idea"

[[rubric.criteria]]
name = "Execution"
weight = 40
description = "Quality of the build"

[[projects]]
name = "DemoBot"
description = "A bot that demos itself"
video_url = "https://youtu.be/abc123"
repo_link = "https://github.com/demo/demobot"
"#
        );

        let temp_file = write_config(&toml_content);
        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.judges.primary.model, "gpt-4o");
        assert_eq!(config.judges.secondary.temperature, 0.3);
        assert_eq!(config.judges.secondary.timeout_secs, 60);
        assert_eq!(config.transcription.unwrap().model, "whisper-1");
        assert_eq!(config.rubric.criteria.len(), 2);
        assert_eq!(config.rubric.total_weight(), 100);
        assert_eq!(config.projects.len(), 1);
        assert_eq!(
            config.projects[0].repo_link.as_deref(),
            Some("https://github.com/demo/demobot")
        );
    }

    #[test]
    fn test_config_defaults() {
        let toml_content = format!(
            r#"{JUDGES_TOML}
[[projects]]
name = "MinimalProject"
description = "No links at all"
"#
        );

        let temp_file = write_config(&toml_content);
        let config = Config::from_file(temp_file.path()).unwrap();

        // Primary backend falls back to defaults
        assert_eq!(config.judges.primary.temperature, 0.5);
        assert_eq!(config.judges.primary.max_tokens, 2000);
        assert_eq!(config.judges.primary.timeout_secs, 120);
        // No transcription section means no media pipeline
        assert!(config.transcription.is_none());
        // Rubric falls back to the built-in four-criterion default
        assert_eq!(config.rubric.criteria.len(), 4);
        assert_eq!(config.rubric.scale, (1.0, 10.0));
        assert!(config.projects[0].video_url.is_none());
        assert!(config.projects[0].repo_link.is_none());
    }

    #[test]
    fn test_config_rejects_invalid_rubric() {
        let toml_content = format!(
            r#"{JUDGES_TOML}
[rubric]
scale = [1.0, 10.0]

[[rubric.criteria]]
name = "Same"
weight = 50
description = "first"

[[rubric.criteria]]
name = "Same"
weight = 50
description = "second"

[[projects]]
name = "P"
description = "d"
"#
        );

        let temp_file = write_config(&toml_content);
        let err = Config::from_file(temp_file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate criterion name"));
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/run.toml"));
        assert!(result.is_err());
    }
}
