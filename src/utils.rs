use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)([^.!?]+[.!?]+)|([^.!?]+$)").expect("sentence regex")
});

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_#`~>\[\]]+").expect("markup regex"));

/// Groups sentences into chunks of at most `max_chars` bytes. A single
/// sentence longer than the limit becomes its own chunk.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let sentences: Vec<&str> = SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        warn!("No sentence breaks found; returning whole text as one chunk");
        return vec![text.trim().to_string()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    for s in sentences {
        if current.is_empty() {
            current.push_str(s);
        } else if current.len() + 1 + s.len() <= max_chars {
            current.push(' ');
            current.push_str(s);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(s);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Strips markdown the model sometimes emits and collapses the script into
/// plain spoken text.
pub fn clean_script(text: &str) -> String {
    let stripped = MARKUP.replace_all(text, "");
    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short single-line preview for logs.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.replace('\n', " ").chars().take(max_chars).collect()
}
