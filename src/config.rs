use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::args::{Args, CaptionMode};

/// Per-run artifact locations under the temp directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub audio_dir: PathBuf,
    pub subtitles_dir: PathBuf,
    pub videos_dir: PathBuf,
}

impl Workspace {
    pub fn new(temp_dir: &Path) -> Self {
        Self {
            audio_dir: temp_dir.join("audio"),
            subtitles_dir: temp_dir.join("subtitles"),
            videos_dir: temp_dir.join("videos"),
        }
    }

    pub fn audio_path(&self, run_id: &str) -> PathBuf {
        self.audio_dir.join(format!("audio_{run_id}.wav"))
    }

    /// Scratch directory for the per-chunk TTS output.
    pub fn tts_parts_dir(&self, run_id: &str) -> PathBuf {
        self.audio_dir.join(format!("tts_{run_id}"))
    }

    pub fn subtitles_path(&self, run_id: &str) -> PathBuf {
        self.subtitles_dir.join(format!("subtitles_{run_id}.srt"))
    }

    pub fn video_path(&self, run_id: &str) -> PathBuf {
        self.videos_dir.join(format!("final_video_{run_id}.mp4"))
    }

    pub fn dirs(&self) -> [&Path; 3] {
        [
            self.audio_dir.as_path(),
            self.subtitles_dir.as_path(),
            self.videos_dir.as_path(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub music_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub workspace: Workspace,
    pub history_file: PathBuf,
    pub log_file: PathBuf,
    pub catalog_file: Option<PathBuf>,

    pub groq_api_key: String,
    pub api_base: String,
    pub llm_model: String,
    pub whisper_model: String,
    pub facebook_page_id: String,
    pub facebook_page_access_token: String,

    pub piper_model: String,
    pub chunk_chars: usize,
    pub captions: CaptionMode,

    pub category_cooldown: usize,
    pub asset_cooldown: usize,

    pub video: VideoSettings,
}

/// Output geometry and caption styling for the compositor.
#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub music_volume: f32,
    pub caption_font_file: PathBuf,
    pub caption_font_size: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            music_volume: 0.08,
            caption_font_file: PathBuf::from(
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            ),
            caption_font_size: 60,
        }
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        let base_dir = args.base_dir.clone();
        let assets_dir = base_dir.join("assets");
        let temp_dir = base_dir.join("temp");
        Self {
            videos_dir: assets_dir.join("videos"),
            music_dir: assets_dir.join("music"),
            workspace: Workspace::new(&temp_dir),
            temp_dir,
            history_file: base_dir.join("run_history.json"),
            log_file: base_dir.join("app.log"),
            catalog_file: args.catalog.clone(),
            base_dir,
            groq_api_key: args.groq_api_key.clone(),
            api_base: args.api_base.trim_end_matches('/').to_string(),
            llm_model: args.llm_model.clone(),
            whisper_model: args.whisper_model.clone(),
            facebook_page_id: args.facebook_page_id.clone(),
            facebook_page_access_token: args.facebook_page_access_token.clone(),
            piper_model: args.piper_model.clone(),
            chunk_chars: args.chunk_chars,
            captions: args.captions,
            category_cooldown: args.category_cooldown,
            asset_cooldown: args.asset_cooldown,
            video: VideoSettings {
                width: args.width,
                height: args.height,
                music_volume: args.music_volume,
                caption_font_file: args.caption_font_file.clone(),
                caption_font_size: args.caption_font_size,
            },
        }
    }

    pub fn required_dirs(&self) -> Vec<&Path> {
        let mut dirs = vec![
            self.videos_dir.as_path(),
            self.music_dir.as_path(),
            self.temp_dir.as_path(),
        ];
        dirs.extend(self.workspace.dirs());
        dirs
    }

    /// Creates every directory the pipeline reads from or writes to.
    pub fn setup(&self) -> anyhow::Result<()> {
        info!("--- Initializing Setup ---");
        for dir in self.required_dirs() {
            fs::create_dir_all(dir)
                .with_context(|| format!("could not create required directory {}", dir.display()))?;
            info!("Directory ensured: {}", dir.display());
        }
        Ok(())
    }
}
