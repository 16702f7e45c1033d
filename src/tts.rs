use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::audio::wav_duration_seconds;
use crate::pipeline::SpeechSynthesizer;
use crate::utils::chunk_text;

/// Piper TTS driven one sentence chunk at a time, stitched together with
/// ffmpeg's concat demuxer.
pub struct PiperSynthesizer {
    model: String,
    chunk_chars: usize,
}

impl PiperSynthesizer {
    pub fn new(model: impl Into<String>, chunk_chars: usize) -> Self {
        Self {
            model: model.into(),
            chunk_chars: chunk_chars.max(1),
        }
    }
}

async fn tts_generate_chunk(model: &str, text: &str, out_path: &Path) -> anyhow::Result<()> {
    let mut child = Command::new("piper")
        .arg("--model")
        .arg(model)
        .arg("--output_file")
        .arg(out_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .context("failed to spawn piper; is it installed and on PATH?")?;

    {
        let mut stdin = child.stdin.take().context("failed to open piper stdin")?;
        stdin.write_all(text.as_bytes()).await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        error!("Piper TTS command failed for chunk: {}", out_path.display());
        bail!("TTS engine failed for chunk, command returned {status}");
    }
    Ok(())
}

/// Concatenates WAV parts listed in `files.txt` inside `dir` into `output`.
async fn concat_wavs(dir: &Path, parts: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let list_path = dir.join("files.txt");
    let mut list = String::new();
    for part in parts {
        let name = part
            .file_name()
            .and_then(|n| n.to_str())
            .context("invalid chunk filename")?;
        list.push_str(&format!("file '{}'\n", name));
    }
    fs::write(&list_path, list)?;

    let output = std::path::absolute(output)?;
    let copy = Command::new("ffmpeg")
        .current_dir(dir)
        .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i", "files.txt", "-c", "copy"])
        .arg(&output)
        .status()
        .await
        .context("failed to run ffmpeg")?;
    if copy.success() {
        return Ok(());
    }

    warn!("ffmpeg concat with copy failed; retrying with re-encode");
    let reencode = Command::new("ffmpeg")
        .current_dir(dir)
        .args([
            "-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i", "files.txt", "-c:a",
            "pcm_s16le",
        ])
        .arg(&output)
        .status()
        .await
        .context("failed to run ffmpeg")?;
    if !reencode.success() {
        bail!("ffmpeg failed to concatenate WAV files");
    }
    Ok(())
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path, scratch: &Path) -> anyhow::Result<PathBuf> {
        let chunks = chunk_text(text, self.chunk_chars);
        if chunks.iter().all(|c| c.trim().is_empty()) {
            bail!("nothing to synthesize");
        }
        info!("Split script into {} chunks", chunks.len());

        fs::create_dir_all(scratch)
            .with_context(|| format!("creating {}", scratch.display()))?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut parts = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let part = scratch.join(format!("part_{:03}.wav", i));
            info!(
                "Generating TTS chunk {}/{} ({} chars)",
                i + 1,
                chunks.len(),
                chunk.len()
            );
            debug!("Chunk text: {}", chunk);
            tts_generate_chunk(&self.model, chunk, &part).await?;
            parts.push(part);
        }

        concat_wavs(scratch, &parts, output).await?;

        let duration = wav_duration_seconds(output)?;
        if duration <= 0.0 {
            bail!("synthesized audio {} is empty", output.display());
        }
        info!(
            "Voiceover written to {} ({:.2} seconds)",
            output.display(),
            duration
        );
        Ok(output.to_path_buf())
    }
}
