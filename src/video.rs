use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::config::VideoSettings;
use crate::pipeline::{Composition, Compositor};

/// Regular, non-hidden files directly inside `dir`, sorted by path.
pub fn list_assets(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("asset directory {} is missing", dir.display()))?;
    let mut assets = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if path.is_file() && !hidden {
            assets.push(path);
        }
    }
    assets.sort();
    Ok(assets)
}

/// Makes a path safe inside an ffmpeg filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

fn subtitle_style(settings: &VideoSettings) -> String {
    let font_name = settings
        .caption_font_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sans");
    let margin_v = settings.height * 15 / 100;
    format!(
        "FontName={},FontSize={},PrimaryColour=&H00FFFFFF,BorderStyle=1,Outline=2,Shadow=1,Alignment=2,MarginV={}",
        font_name, settings.caption_font_size, margin_v
    )
}

pub fn filter_graph(job: &Composition, settings: &VideoSettings) -> String {
    format!(
        "[0:v]crop=ih*9/16:ih,scale={w}:{h},setsar=1[v_scaled];\
         [v_scaled]subtitles='{subs}':force_style='{style}'[v];\
         [2:a]volume={vol}[bgm];\
         [1:a][bgm]amix=inputs=2:duration=first[a]",
        w = settings.width,
        h = settings.height,
        subs = escape_filter_path(&job.subtitles),
        style = subtitle_style(settings),
        vol = settings.music_volume,
    )
}

pub fn ffmpeg_args(job: &Composition, settings: &VideoSettings) -> Vec<String> {
    let path = |p: &Path| p.to_string_lossy().into_owned();
    let mut args: Vec<String> = ["-y", "-loglevel", "error", "-stream_loop", "-1", "-i"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(path(&job.background_video));
    args.push("-i".to_string());
    args.push(path(&job.voiceover));
    args.extend(["-stream_loop", "-1", "-i"].iter().map(|s| s.to_string()));
    args.push(path(&job.background_music));
    args.push("-filter_complex".to_string());
    args.push(filter_graph(job, settings));
    args.extend(
        [
            "-map", "[v]", "-map", "[a]", "-c:v", "libx264", "-preset", "veryfast", "-crf", "23",
            "-c:a", "aac", "-b:a", "192k", "-shortest",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(path(&job.output));
    args
}

pub struct FfmpegCompositor {
    settings: VideoSettings,
}

impl FfmpegCompositor {
    pub fn new(settings: VideoSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn compose(&self, job: &Composition) -> anyhow::Result<PathBuf> {
        for input in [
            &job.background_video,
            &job.background_music,
            &job.voiceover,
            &job.subtitles,
        ] {
            if !input.exists() {
                bail!("missing input file {}", input.display());
            }
        }
        info!(
            "Selected video: {}",
            job.background_video.file_name().unwrap_or_default().to_string_lossy()
        );
        info!(
            "Selected music: {}",
            job.background_music.file_name().unwrap_or_default().to_string_lossy()
        );
        if let Some(parent) = job.output.parent() {
            fs::create_dir_all(parent)?;
        }

        info!("Executing FFmpeg command...");
        let output = Command::new("ffmpeg")
            .args(ffmpeg_args(job, &self.settings))
            .stdin(Stdio::null())
            .output()
            .await
            .context("FFmpeg not found; ensure it is installed and on PATH")?;
        if !output.status.success() {
            error!("FFmpeg failed with {}", output.status);
            error!("FFmpeg stderr:\n{}", String::from_utf8_lossy(&output.stderr));
            bail!("ffmpeg failed to produce final video");
        }
        info!("Final video saved to {}", job.output.display());
        Ok(job.output.clone())
    }
}
