use crate::config::TranscriptionConfig;
use anyhow::{Context, Result};
use reqwest::multipart;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Download a pitch video into `download_dir` with yt-dlp.
///
/// `download_dir` is expected to be a scoped scratch directory owned by the
/// caller (a `tempfile::TempDir`), so files left behind by a partial
/// download are reclaimed on every exit path. Returns `None` on any failure.
pub async fn download_video(url: &str, download_dir: &Path) -> Option<PathBuf> {
    let template = download_dir.join("%(title)s.%(ext)s");

    let status = Command::new("yt-dlp")
        .arg("--quiet")
        .arg("--format")
        .arg("bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best")
        .arg("--merge-output-format")
        .arg("mp4")
        .arg("--output")
        .arg(&template)
        .arg(url)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => {
            warn!(%url, %status, "yt-dlp exited with failure");
            return None;
        }
        Err(error) => {
            warn!(%url, %error, "Failed to launch yt-dlp");
            return None;
        }
    }

    // yt-dlp may adjust the extension while merging; take whatever single
    // file landed in the scratch directory
    find_downloaded_file(download_dir)
}

fn find_downloaded_file(dir: &Path) -> Option<PathBuf> {
    let entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    match entries.as_slice() {
        [single] => Some(single.clone()),
        [] => {
            warn!(dir = %dir.display(), "No downloaded file found");
            None
        }
        _ => {
            warn!(dir = %dir.display(), count = entries.len(), "Multiple files in download directory");
            None
        }
    }
}

/// Extract the audio track of a video as mp3, next to the video file.
/// Returns `None` on any failure.
pub async fn extract_audio(video_path: &Path) -> Option<PathBuf> {
    if !video_path.is_file() {
        warn!(video = %video_path.display(), "Video file not found");
        return None;
    }

    let audio_path = video_path.with_extension("mp3");

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("libmp3lame")
        .arg(&audio_path)
        .status()
        .await;

    match status {
        Ok(status) if status.success() && audio_path.is_file() => {
            debug!(audio = %audio_path.display(), "Audio extracted");
            Some(audio_path)
        }
        Ok(status) => {
            warn!(video = %video_path.display(), %status, "ffmpeg exited with failure");
            None
        }
        Err(error) => {
            warn!(%error, "Failed to launch ffmpeg");
            None
        }
    }
}

/// Speech-to-text collaborator over an OpenAI-compatible
/// `audio/transcriptions` endpoint.
///
/// Failure is reported in-band with an `"Error:"`-prefixed string, per the
/// collaborator contract; the evidence assembler scrubs it before judging.
pub struct TranscriptionClient {
    http: reqwest::Client,
    api_endpoint: String,
    api_key: String,
    model: String,
}

impl TranscriptionClient {
    /// Build the client, resolving the API key from the configured
    /// environment variable once
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.env_var_api_key)
            .with_context(|| format!("Environment variable {} not found", config.env_var_api_key))?;

        Ok(Self::with_endpoint(&config.api_endpoint, &api_key, &config.model))
    }

    pub fn with_endpoint(api_endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub async fn transcribe(&self, audio_path: &Path) -> String {
        match self.try_transcribe(audio_path).await {
            Ok(text) => text,
            Err(error) => {
                warn!(audio = %audio_path.display(), error = %format!("{error:#}"), "Transcription failed");
                format!("Error: Transcription failed: {error:#}")
            }
        }
    }

    async fn try_transcribe(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file: {}", audio_path.display()))?;

        let file_name = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part(
                "file",
                multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .context("Invalid audio mime type")?,
            );

        let url = format!("{}/audio/transcriptions", self.api_endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Transcription endpoint returned status {status}");
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        body.get("text")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
            .context("Transcription response missing 'text' field")
    }
}
