use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{error, info};

use crate::audio::wav_duration_seconds;
use crate::pipeline::Transcriber;
use crate::subtitle::{estimate_entries, write_srt};

/// Whisper over Groq's OpenAI-compatible transcription endpoint, asking for
/// SRT directly.
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            bail!("GROQ_API_KEY is not configured");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path, _script: &str, output: &Path) -> anyhow::Result<PathBuf> {
        let bytes = fs::read(audio)
            .with_context(|| format!("audio file not found at {}", audio.display()))?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        info!("Uploading {} to Whisper for transcription...", file_name);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name).mime_str("audio/wav")?)
            .text("model", self.model.clone())
            .text("response_format", "srt");

        let url = format!("{}/audio/transcriptions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("transcription request to {url} failed"))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Whisper returned {}: {}", status, body);
            bail!("transcription returned {status}");
        }
        if body.trim().is_empty() {
            bail!("transcription returned no captions");
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, body).with_context(|| format!("writing {}", output.display()))?;
        info!("Saved SRT captions to {}", output.display());
        Ok(output.to_path_buf())
    }
}

/// Offline captions: the script's words laid over the voiceover duration.
#[derive(Debug, Default)]
pub struct EstimatedTranscriber;

#[async_trait]
impl Transcriber for EstimatedTranscriber {
    async fn transcribe(&self, audio: &Path, script: &str, output: &Path) -> anyhow::Result<PathBuf> {
        let duration = wav_duration_seconds(audio)?;
        info!("Estimating word timings over {:.2} seconds of audio", duration);
        let entries = estimate_entries(script, duration);
        if entries.is_empty() {
            bail!("script has no words to caption");
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        write_srt(output, &entries)?;
        info!("Wrote {} cues to {}", entries.len(), output.display());
        Ok(output.to_path_buf())
    }
}
