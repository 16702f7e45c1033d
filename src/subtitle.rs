use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

const COMMA_PAUSE: f64 = 0.2;
const SENTENCE_END_PAUSE: f64 = 0.4;
const WORD_WEIGHT_ALPHA: f64 = 0.75;

static WORD_OR_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w[\w'-]*)|([,.!?])").expect("word regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct SrtEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

fn pause_for(element: &str) -> Option<f64> {
    match element {
        "," => Some(COMMA_PAUSE),
        "." | "!" | "?" => Some(SENTENCE_END_PAUSE),
        _ => None,
    }
}

/// One cue per word, timed by spreading `duration` across the words in
/// proportion to `len^0.75` after reserving pauses for punctuation.
pub fn estimate_entries(text: &str, duration: f64) -> Vec<SrtEntry> {
    let duration = duration.max(0.0);
    let elements: Vec<&str> = WORD_OR_PUNCT.find_iter(text).map(|m| m.as_str()).collect();
    if elements.is_empty() {
        if text.trim().is_empty() {
            return Vec::new();
        }
        return vec![SrtEntry {
            start: 0.0,
            end: duration,
            text: text.trim().to_string(),
        }];
    }

    let total_pause: f64 = elements.iter().filter_map(|e| pause_for(e)).sum();
    // Squeeze the pauses if they alone would overrun the audio.
    let pause_scale = if total_pause > duration && total_pause > 0.0 {
        duration / total_pause
    } else {
        1.0
    };
    let word_time_available = (duration - total_pause * pause_scale).max(0.0);
    let total_weight: f64 = elements
        .iter()
        .filter(|e| pause_for(e).is_none())
        .map(|w| (w.chars().count() as f64).powf(WORD_WEIGHT_ALPHA))
        .sum();

    let mut entries = Vec::new();
    let mut clock = 0.0_f64;
    for element in elements {
        if let Some(pause) = pause_for(element) {
            clock += pause * pause_scale;
            continue;
        }
        let weight = (element.chars().count() as f64).powf(WORD_WEIGHT_ALPHA);
        let word_duration = if total_weight > 0.0 {
            word_time_available * weight / total_weight
        } else {
            0.0
        };
        let start = clock.min(duration);
        let end = (clock + word_duration).min(duration);
        entries.push(SrtEntry {
            start,
            end,
            text: element.to_string(),
        });
        clock += word_duration;
    }
    entries
}

pub fn render_srt(entries: &[SrtEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(entry.start),
            format_srt_time(entry.end)
        ));
        for line in wrap_text(&entry.text, 80) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub fn write_srt(path: &Path, entries: &[SrtEntry]) -> anyhow::Result<()> {
    fs::write(path, render_srt(entries)).with_context(|| format!("writing {}", path.display()))
}

pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current));
        } else if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
