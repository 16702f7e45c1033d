use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use reelsmith::args::{Args, CaptionMode};
use reelsmith::captions::{EstimatedTranscriber, WhisperTranscriber};
use reelsmith::catalog::Catalog;
use reelsmith::config::Config;
use reelsmith::error::{PipelineError, PipelineResult};
use reelsmith::pipeline::{JobReport, Pipeline, PipelineSettings, Stages, Transcriber};
use reelsmith::publish::FacebookUploader;
use reelsmith::scheduler::{JsonFileStore, Scheduler};
use reelsmith::script::GroqScriptWriter;
use reelsmith::tts::PiperSynthesizer;
use reelsmith::video::FfmpegCompositor;

fn init_logging(config: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.base_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("opening {}", config.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)))
        .init();
    Ok(())
}

fn build_stages(config: &Config) -> PipelineResult<Stages> {
    let writer = GroqScriptWriter::new(&config.api_base, &config.groq_api_key, &config.llm_model)
        .map_err(PipelineError::Script)?;
    let transcriber: Box<dyn Transcriber> = match config.captions {
        CaptionMode::Whisper => Box::new(
            WhisperTranscriber::new(&config.api_base, &config.groq_api_key, &config.whisper_model)
                .map_err(PipelineError::Captions)?,
        ),
        CaptionMode::Estimate => Box::new(EstimatedTranscriber),
    };
    let publisher =
        FacebookUploader::new(&config.facebook_page_id, &config.facebook_page_access_token)
            .map_err(PipelineError::Publish)?;
    Ok(Stages {
        writer: Box::new(writer),
        speech: Box::new(PiperSynthesizer::new(&config.piper_model, config.chunk_chars)),
        transcriber,
        compositor: Box::new(FfmpegCompositor::new(config.video.clone())),
        publisher: Box::new(publisher),
    })
}

async fn run_job(config: &Config) -> PipelineResult<JobReport> {
    config.setup().map_err(PipelineError::Setup)?;

    let catalog = match &config.catalog_file {
        Some(path) => Catalog::from_file(path).map_err(PipelineError::Catalog)?,
        None => Catalog::default(),
    };
    let settings = PipelineSettings {
        catalog,
        workspace: config.workspace.clone(),
        videos_dir: config.videos_dir.clone(),
        music_dir: config.music_dir.clone(),
        category_cooldown: config.category_cooldown,
        asset_cooldown: config.asset_cooldown,
    };
    let scheduler = Scheduler::new(
        JsonFileStore::new(&config.history_file),
        StdRng::from_entropy(),
    );
    let stages = build_stages(config)?;
    let mut pipeline = Pipeline::new(settings, scheduler, StdRng::from_entropy(), stages);

    let run_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    pipeline.run(&run_id).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_args(&args);
    if let Err(e) = init_logging(&config) {
        eprintln!("Error: could not initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    info!("Starting content pipeline in {}", config.base_dir.display());

    match run_job(&config).await {
        Ok(report) => {
            info!(
                "Published post {} ({} / {}), cleaned {} artifact(s)",
                report.post_id, report.script.category, report.script.sub_theme, report.cleaned
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("An error occurred during the job execution ({}): {}", e.stage(), e);
            error!("========= JOB FAILED =========");
            ExitCode::FAILURE
        }
    }
}
