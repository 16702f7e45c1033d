use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{error, info};

use crate::pipeline::Publisher;

const GRAPH_API_VERSION: &str = "v19.0";

pub const CAPTION_TEMPLATE: &str = "Most people lose control because they react. This shows you how to stay calm and keep your authority. Follow for more psychological control tactics.";

pub const HASHTAG_GROUPS: &[&[&str]] = &[
    &["#psychology", "#authority", "#workpower", "#leadership"],
    &["#socialskills", "#confidence", "#selfcontrol", "#respect"],
    &["#communication", "#assertiveness", "#mentalmodels", "#power"],
];

#[derive(Debug, Deserialize)]
struct StartResponse {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct FinishResponse {
    id: Option<String>,
    post_id: Option<String>,
    #[serde(default)]
    success: bool,
}

/// Post description: the fixed template followed by one hashtag group.
pub fn build_caption<R: rand::Rng>(rng: &mut R) -> String {
    let hashtags = HASHTAG_GROUPS
        .choose(rng)
        .map(|group| group.join(" "))
        .unwrap_or_default();
    format!("{CAPTION_TEMPLATE}\n\n{hashtags}")
}

/// Facebook Reels publishing through the three-phase Graph API upload.
pub struct FacebookUploader {
    client: reqwest::Client,
    graph_base: String,
    upload_base: String,
    page_id: String,
    access_token: String,
    rng: Mutex<StdRng>,
}

impl FacebookUploader {
    pub fn new(page_id: &str, access_token: &str) -> anyhow::Result<Self> {
        if page_id.trim().is_empty()
            || access_token.trim().is_empty()
            || page_id.contains("YOUR_FACEBOOK")
            || access_token.contains("YOUR_FACEBOOK")
        {
            bail!("Facebook Page ID or Access Token is not configured");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            graph_base: format!("https://graph.facebook.com/{GRAPH_API_VERSION}"),
            upload_base: format!("https://rupload.facebook.com/video-upload/{GRAPH_API_VERSION}"),
            page_id: page_id.to_string(),
            access_token: access_token.to_string(),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    fn reels_url(&self) -> String {
        format!("{}/{}/video_reels", self.graph_base, self.page_id)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        phase: &str,
    ) -> anyhow::Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("{} phase returned {}: {}", phase, status, body);
            bail!("{phase} phase returned {status}");
        }
        serde_json::from_str(&body).with_context(|| format!("unexpected {phase} response: {body}"))
    }

    async fn start_upload_session(&self) -> anyhow::Result<String> {
        info!("Step 1: Initializing Reels upload session...");
        let response = self
            .client
            .post(self.reels_url())
            .query(&[("upload_phase", "start"), ("access_token", self.access_token.as_str())])
            .send()
            .await
            .context("starting upload session")?;
        let start: StartResponse = Self::read_json(response, "start").await?;
        let video_id = start
            .video_id
            .ok_or_else(|| anyhow!("start phase did not return a video_id"))?;
        info!("Upload session started. Video ID: {}", video_id);
        Ok(video_id)
    }

    async fn upload_video(&self, video_id: &str, video: &Path) -> anyhow::Result<()> {
        info!("Step 2: Uploading video file '{}'...", video.display());
        let bytes = tokio::fs::read(video)
            .await
            .with_context(|| format!("reading {}", video.display()))?;
        let response = self
            .client
            .post(format!("{}/{}", self.upload_base, video_id))
            .header("Authorization", format!("OAuth {}", self.access_token))
            .header("offset", "0")
            .header("file_size", bytes.len().to_string())
            .body(bytes)
            .send()
            .await
            .context("uploading video bytes")?;
        let transfer: TransferResponse = Self::read_json(response, "transfer").await?;
        if !transfer.success {
            bail!("transfer phase did not report success");
        }
        info!("Video file uploaded successfully.");
        Ok(())
    }

    async fn publish_reel(&self, video_id: &str, caption: &str) -> anyhow::Result<String> {
        info!("Step 3: Publishing the Reel...");
        let response = self
            .client
            .post(self.reels_url())
            .query(&[
                ("video_id", video_id),
                ("upload_phase", "finish"),
                ("video_state", "PUBLISHED"),
                ("description", caption),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await
            .context("publishing reel")?;
        let finish: FinishResponse = Self::read_json(response, "finish").await?;
        match finish.post_id.or(finish.id) {
            Some(id) => Ok(id),
            // The finish call may only acknowledge; the video id then names the post.
            None if finish.success => Ok(video_id.to_string()),
            None => bail!("finish phase did not return a post id"),
        }
    }

    fn caption(&self) -> String {
        match self.rng.lock() {
            Ok(mut rng) => build_caption(&mut *rng),
            Err(poisoned) => build_caption(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl Publisher for FacebookUploader {
    async fn publish(&self, video: &Path) -> anyhow::Result<String> {
        info!("--- Starting Facebook Reel Upload for: {} ---", video.display());
        let video_id = self.start_upload_session().await?;
        self.upload_video(&video_id, video).await?;
        let caption = self.caption();
        info!("Using caption:\n{}", caption);
        let post_id = self.publish_reel(&video_id, &caption).await?;
        info!(
            "Reel published. Post URL: https://www.facebook.com/{}",
            post_id
        );
        Ok(post_id)
    }
}
