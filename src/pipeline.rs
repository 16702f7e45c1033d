//! One end-to-end job: pick a topic, write, voice, caption, render,
//! publish, clean up. Any failing stage ends the run and leaves the
//! artifacts on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::cleanup::perform_cleanup;
use crate::config::Workspace;
use crate::error::{PipelineError, PipelineResult};
use crate::scheduler::{HistoryStore, Scheduler};
use crate::utils::preview;
use crate::video::list_assets;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub category: String,
    pub sub_theme: String,
    pub hook: String,
    pub text: String,
}

/// Inputs for the final render.
#[derive(Debug, Clone)]
pub struct Composition {
    pub voiceover: PathBuf,
    pub subtitles: PathBuf,
    pub background_video: PathBuf,
    pub background_music: PathBuf,
    pub output: PathBuf,
}

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn write_script(&self, category: &str, sub_theme: &str) -> anyhow::Result<Script>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Writes `text` as speech to `output`, using `scratch` for
    /// intermediate files.
    async fn synthesize(&self, text: &str, output: &Path, scratch: &Path)
    -> anyhow::Result<PathBuf>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Produces an SRT file for `audio`. `script` is the text that was
    /// spoken, for transcribers that do not listen.
    async fn transcribe(&self, audio: &Path, script: &str, output: &Path)
    -> anyhow::Result<PathBuf>;
}

#[async_trait]
pub trait Compositor: Send + Sync {
    async fn compose(&self, job: &Composition) -> anyhow::Result<PathBuf>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the published post id.
    async fn publish(&self, video: &Path) -> anyhow::Result<String>;
}

pub struct Stages {
    pub writer: Box<dyn ScriptWriter>,
    pub speech: Box<dyn SpeechSynthesizer>,
    pub transcriber: Box<dyn Transcriber>,
    pub compositor: Box<dyn Compositor>,
    pub publisher: Box<dyn Publisher>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub catalog: Catalog,
    pub workspace: Workspace,
    pub videos_dir: PathBuf,
    pub music_dir: PathBuf,
    pub category_cooldown: usize,
    pub asset_cooldown: usize,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub run_id: String,
    pub script: Script,
    pub background_video: PathBuf,
    pub background_music: PathBuf,
    pub video: PathBuf,
    pub post_id: String,
    pub cleaned: usize,
}

pub struct Pipeline<S, R> {
    settings: PipelineSettings,
    scheduler: Scheduler<S, R>,
    rng: R,
    stages: Stages,
}

impl<S: HistoryStore, R: Rng> Pipeline<S, R> {
    /// `rng` drives the sub-theme pick; the scheduler keeps its own.
    pub fn new(settings: PipelineSettings, scheduler: Scheduler<S, R>, rng: R, stages: Stages) -> Self {
        Self {
            settings,
            scheduler,
            rng,
            stages,
        }
    }

    pub fn scheduler(&self) -> &Scheduler<S, R> {
        &self.scheduler
    }

    pub async fn run(&mut self, run_id: &str) -> PipelineResult<JobReport> {
        info!("========= STARTING NEW JOB | ID: {} =========", run_id);
        let workspace = self.settings.workspace.clone();

        info!("--- Step 1: Selecting Content ---");
        let category = self.scheduler.select_next(
            "category",
            &self.settings.catalog.categories(),
            self.settings.category_cooldown,
        )?;
        let sub_theme = self
            .settings
            .catalog
            .pick_sub_theme(&category, &mut self.rng)
            .map_err(PipelineError::Catalog)?;
        info!("Topic -> category: '{}', sub-theme: '{}'", category, sub_theme);

        info!("--- Step 2: Generating Script ---");
        let script = self
            .stages
            .writer
            .write_script(&category, &sub_theme)
            .await
            .map_err(PipelineError::Script)?;
        info!("Script preview: {}", preview(&script.text, 200));

        info!("--- Step 3: Generating TTS Audio ---");
        let audio = self
            .stages
            .speech
            .synthesize(
                &script.text,
                &workspace.audio_path(run_id),
                &workspace.tts_parts_dir(run_id),
            )
            .await
            .map_err(PipelineError::Speech)?;

        info!("--- Step 4: Generating Captions ---");
        let subtitles = self
            .stages
            .transcriber
            .transcribe(&audio, &script.text, &workspace.subtitles_path(run_id))
            .await
            .map_err(PipelineError::Captions)?;

        info!("--- Step 5: Building Final Video ---");
        let videos_dir = self.settings.videos_dir.clone();
        let music_dir = self.settings.music_dir.clone();
        let background_video = self.pick_asset("video", &videos_dir)?;
        let background_music = self.pick_asset("music", &music_dir)?;
        let composition = Composition {
            voiceover: audio,
            subtitles,
            background_video: background_video.clone(),
            background_music: background_music.clone(),
            output: workspace.video_path(run_id),
        };
        let video = self
            .stages
            .compositor
            .compose(&composition)
            .await
            .map_err(PipelineError::Video)?;

        info!("--- Step 6: Publishing ---");
        let post_id = match self.stages.publisher.publish(&video).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Upload failed. Skipping cleanup to allow for manual inspection of temp files.");
                return Err(PipelineError::Publish(e));
            }
        };

        info!("--- Step 7: Performing Cleanup for successful post ---");
        let cleaned = perform_cleanup(&workspace, run_id);

        info!("========= JOB COMPLETED SUCCESSFULLY =========");
        Ok(JobReport {
            run_id: run_id.to_string(),
            script,
            background_video,
            background_music,
            video,
            post_id,
            cleaned,
        })
    }

    fn pick_asset(&mut self, kind: &str, dir: &Path) -> PipelineResult<PathBuf> {
        let assets = list_assets(dir).map_err(PipelineError::Video)?;
        // History is keyed by file name so it survives a moved base dir.
        let candidates: Vec<String> = assets
            .iter()
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        let picked = self
            .scheduler
            .select_next(kind, &candidates, self.settings.asset_cooldown)?;
        Ok(dir.join(picked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::MemoryStore;
    use anyhow::bail;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeWriter;

    #[async_trait]
    impl ScriptWriter for FakeWriter {
        async fn write_script(&self, category: &str, sub_theme: &str) -> anyhow::Result<Script> {
            Ok(Script {
                category: category.to_string(),
                sub_theme: sub_theme.to_string(),
                hook: "Stop explaining.".to_string(),
                text: "Stop explaining. You decide.".to_string(),
            })
        }
    }

    struct FakeSpeech;

    #[async_trait]
    impl SpeechSynthesizer for FakeSpeech {
        async fn synthesize(
            &self,
            _text: &str,
            output: &Path,
            scratch: &Path,
        ) -> anyhow::Result<PathBuf> {
            fs::create_dir_all(scratch)?;
            fs::write(scratch.join("part_000.wav"), b"part")?;
            fs::write(output, b"wav")?;
            Ok(output.to_path_buf())
        }
    }

    struct FakeTranscriber {
        fail: bool,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(
            &self,
            _audio: &Path,
            _script: &str,
            output: &Path,
        ) -> anyhow::Result<PathBuf> {
            if self.fail {
                bail!("whisper unavailable");
            }
            fs::write(output, "1\n00:00:00,000 --> 00:00:01,000\nStop\n\n")?;
            Ok(output.to_path_buf())
        }
    }

    struct FakeCompositor {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Compositor for FakeCompositor {
        async fn compose(&self, job: &Composition) -> anyhow::Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(&job.output, b"mp4")?;
            Ok(job.output.clone())
        }
    }

    struct FakePublisher {
        fail: bool,
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, video: &Path) -> anyhow::Result<String> {
            assert!(video.exists());
            if self.fail {
                bail!("graph api returned 500");
            }
            Ok("12345".to_string())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        workspace: Workspace,
        unrelated: PathBuf,
        compositions: Arc<AtomicUsize>,
        pipeline: Pipeline<MemoryStore, StdRng>,
    }

    fn harness(fail_captions: bool, fail_publish: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(&dir.path().join("temp"));
        for d in workspace.dirs() {
            fs::create_dir_all(d).unwrap();
        }
        let videos_dir = dir.path().join("assets/videos");
        let music_dir = dir.path().join("assets/music");
        fs::create_dir_all(&videos_dir).unwrap();
        fs::create_dir_all(&music_dir).unwrap();
        fs::write(videos_dir.join("clip1.mp4"), b"v").unwrap();
        fs::write(videos_dir.join("clip2.mp4"), b"v").unwrap();
        fs::write(music_dir.join("calm.mp3"), b"m").unwrap();

        let unrelated = workspace.audio_dir.join("keep_me.wav");
        fs::write(&unrelated, b"keep").unwrap();

        let mut topics = BTreeMap::new();
        topics.insert("Focus".to_string(), vec!["Deep work".to_string()]);
        topics.insert("Calm".to_string(), vec!["Silence".to_string()]);

        let compositions = Arc::new(AtomicUsize::new(0));
        let settings = PipelineSettings {
            catalog: Catalog::new(topics).unwrap(),
            workspace: workspace.clone(),
            videos_dir,
            music_dir,
            category_cooldown: 5,
            asset_cooldown: 10,
        };
        let stages = Stages {
            writer: Box::new(FakeWriter),
            speech: Box::new(FakeSpeech),
            transcriber: Box::new(FakeTranscriber { fail: fail_captions }),
            compositor: Box::new(FakeCompositor {
                calls: compositions.clone(),
            }),
            publisher: Box::new(FakePublisher { fail: fail_publish }),
        };
        let scheduler = Scheduler::new(MemoryStore::default(), StdRng::seed_from_u64(1));
        let pipeline = Pipeline::new(settings, scheduler, StdRng::seed_from_u64(2), stages);
        Harness {
            _dir: dir,
            workspace,
            unrelated,
            compositions,
            pipeline,
        }
    }

    #[tokio::test]
    async fn successful_run_publishes_and_cleans_up() {
        let mut h = harness(false, false);
        let report = h.pipeline.run("run1").await.unwrap();

        assert_eq!(report.post_id, "12345");
        assert_eq!(report.cleaned, 4);
        assert_eq!(
            report.background_video.parent(),
            Some(h.pipeline.settings.videos_dir.as_path())
        );
        assert!(!h.workspace.audio_path("run1").exists());
        assert!(!h.workspace.tts_parts_dir("run1").exists());
        assert!(!h.workspace.subtitles_path("run1").exists());
        assert!(!h.workspace.video_path("run1").exists());
        assert!(h.unrelated.exists());

        let history = h.pipeline.scheduler().store().history();
        assert_eq!(history["categories"], vec![report.script.category.clone()]);
        assert_eq!(history["videos"].len(), 1);
        assert_eq!(history["music"].len(), 1);
    }

    #[tokio::test]
    async fn asset_history_is_keyed_by_file_name() {
        let mut h = harness(false, false);
        let first = h.pipeline.run("run5").await.unwrap();
        let second = h.pipeline.run("run6").await.unwrap();
        assert_ne!(first.background_video, second.background_video);

        let history = h.pipeline.scheduler().store().history();
        let names: Vec<String> = [&first, &second]
            .iter()
            .map(|r| r.background_video.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(history["videos"], names);
        assert_eq!(history["music"], vec!["calm.mp3".to_string(), "calm.mp3".to_string()]);
        assert_eq!(
            second.background_video,
            h.pipeline.settings.videos_dir.join(&history["videos"][1])
        );
    }

    #[tokio::test]
    async fn failing_stage_stops_the_run_and_keeps_artifacts() {
        let mut h = harness(true, false);
        let err = h.pipeline.run("run2").await.unwrap_err();

        assert!(matches!(err, PipelineError::Captions(_)));
        assert_eq!(err.stage(), "captions");
        assert_eq!(h.compositions.load(Ordering::SeqCst), 0);
        assert!(h.workspace.audio_path("run2").exists());
        // Assets are only chosen once the video stage is reached.
        assert!(!h.pipeline.scheduler().store().history().contains_key("videos"));
    }

    #[tokio::test]
    async fn failed_upload_skips_cleanup() {
        let mut h = harness(false, true);
        let err = h.pipeline.run("run3").await.unwrap_err();

        assert!(matches!(err, PipelineError::Publish(_)));
        assert!(h.workspace.video_path("run3").exists());
        assert!(h.workspace.subtitles_path("run3").exists());
    }

    #[tokio::test]
    async fn empty_asset_directory_is_a_selection_error() {
        let mut h = harness(false, false);
        fs::remove_file(h.pipeline.settings.music_dir.join("calm.mp3")).unwrap();
        let err = h.pipeline.run("run4").await.unwrap_err();
        assert!(matches!(err, PipelineError::Selection(_)));
    }
}
