use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::pipeline::{Script, ScriptWriter};
use crate::utils::clean_script;

const HOOK_PROMPT: &str = "\
You write opening lines for short vertical videos.
Topic category: {category}
Sub-theme: {sub_theme}

Write one hook of one or two sentences. It must open a curiosity gap and promise a concrete tactic for a painful situation. Speak directly to the viewer. Do not use phrases like \"in this video\".
Reply with the hook text only, no quotes or labels.";

const SCRIPT_PROMPT: &str = "\
You are a calm, precise instructor on composure and communication at work.
Category: {category}
Sub-theme: {sub_theme}
Hook: {hook}

Write a spoken script of about 130 words that begins with the hook word for word and delivers on its promise.
Use \"you\" throughout. Keep sentences short. No stories, metaphors or hype.
Structure: the hook, one realistic high-pressure situation, the two usual weak reactions, then two or three tactics each with what to do and why it works, and a one-line close.
Reply with the script text only, no headings or stage directions.";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub fn render_prompt(template: &str, category: &str, sub_theme: &str, hook: &str) -> String {
    template
        .replace("{category}", category)
        .replace("{sub_theme}", sub_theme)
        .replace("{hook}", hook)
}

fn parse_completion(body: &str) -> anyhow::Result<String> {
    let completion: ChatCompletion =
        serde_json::from_str(body).context("unexpected chat completion payload")?;
    let text = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        bail!("LLM returned an empty response");
    }
    Ok(text)
}

/// Two-call script writer against an OpenAI-compatible chat API (Groq).
pub struct GroqScriptWriter {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GroqScriptWriter {
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

    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": max_tokens,
                "temperature": temperature,
            }))
            .send()
            .await
            .with_context(|| format!("chat completion request to {url} failed"))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Chat completion returned {}: {}", status, body);
            bail!("chat completion returned {status}");
        }
        parse_completion(&body)
    }
}

#[async_trait]
impl ScriptWriter for GroqScriptWriter {
    async fn write_script(&self, category: &str, sub_theme: &str) -> anyhow::Result<Script> {
        info!("Generating dynamic hook...");
        let hook_prompt = render_prompt(HOOK_PROMPT, category, sub_theme, "");
        let hook = clean_script(&self.complete(&hook_prompt, 150, 0.8).await?);
        info!("Generated hook: '{}'", hook);

        info!("Generating full script from hook...");
        let script_prompt = render_prompt(SCRIPT_PROMPT, category, sub_theme, &hook);
        let text = clean_script(&self.complete(&script_prompt, 2048, 0.7).await?);
        if text.is_empty() {
            bail!("script was empty after cleanup");
        }
        info!("Successfully generated final script ({} chars)", text.len());

        Ok(Script {
            category: category.to_string(),
            sub_theme: sub_theme.to_string(),
            hook,
            text,
        })
    }
}
