use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptionMode {
    /// Transcribe the voiceover with Whisper.
    Whisper,
    /// Spread the script's words over the voiceover duration, offline.
    Estimate,
}

#[derive(Parser, Debug)]
#[clap(name = "reelsmith", about = "Generate and publish one short vertical video")]
pub struct Args {
    #[clap(long, default_value = ".")]
    pub base_dir: PathBuf,

    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
    pub groq_api_key: String,

    #[clap(long, default_value = "https://api.groq.com/openai/v1")]
    pub api_base: String,

    #[clap(long, default_value = "llama-3.3-70b-versatile")]
    pub llm_model: String,

    #[clap(long, default_value = "whisper-large-v3")]
    pub whisper_model: String,

    #[clap(long, env = "FACEBOOK_PAGE_ID", default_value = "")]
    pub facebook_page_id: String,

    #[clap(
        long,
        env = "FACEBOOK_PAGE_ACCESS_TOKEN",
        hide_env_values = true,
        default_value = ""
    )]
    pub facebook_page_access_token: String,

    #[clap(long, default_value = "./tts/en_US-hfc_male-medium.onnx")]
    pub piper_model: String,

    #[clap(long, default_value_t = 250)]
    pub chunk_chars: usize,

    #[clap(long, value_enum, default_value_t = CaptionMode::Whisper)]
    pub captions: CaptionMode,

    /// JSON file mapping categories to sub-themes; built-in topics otherwise.
    #[clap(long)]
    pub catalog: Option<PathBuf>,

    #[clap(long, default_value_t = 5)]
    pub category_cooldown: usize,

    #[clap(long, default_value_t = 10)]
    pub asset_cooldown: usize,

    #[clap(long, default_value_t = 0.08)]
    pub music_volume: f32,

    #[clap(long, default_value = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf")]
    pub caption_font_file: PathBuf,

    #[clap(long, default_value_t = 60)]
    pub caption_font_size: u32,

    #[clap(long, default_value_t = 1080)]
    pub width: u32,

    #[clap(long, default_value_t = 1920)]
    pub height: u32,
}
