use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::SelectionError;

/// Recent picks per history key, oldest first. Item ids are compared as
/// plain strings.
pub type History = BTreeMap<String, Vec<String>>;

/// Durable home of the selection history.
///
/// `load` never fails: anything unreadable is reported as an empty history.
pub trait HistoryStore {
    fn load(&self) -> History;
    fn save(&mut self, history: &History) -> anyhow::Result<()>;
}

/// History kept as a pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw document on disk, or `None` when it is missing or unusable.
    fn read_document(&self) -> Option<Map<String, Value>> {
        if !self.path.exists() {
            debug!("No history file at {}; starting fresh", self.path.display());
            return None;
        }
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    "Could not read history file {}: {}. Starting with a fresh history.",
                    self.path.display(),
                    e
                );
                return None;
            }
        };
        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(document)) => Some(document),
            Ok(_) => {
                warn!(
                    "History file {} is not a JSON object. Starting with a fresh history.",
                    self.path.display()
                );
                None
            }
            Err(e) => {
                warn!(
                    "History file {} is corrupt ({}). Starting with a fresh history.",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> History {
        let mut history = History::new();
        for (key, value) in self.read_document().unwrap_or_default() {
            match serde_json::from_value::<Vec<String>>(value) {
                Ok(items) => {
                    history.insert(key, items);
                }
                Err(_) => debug!("Key '{}' is not a selection history; leaving it alone", key),
            }
        }
        history
    }

    /// Keys that are not part of `history` are written back untouched.
    fn save(&mut self, history: &History) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut document = self.read_document().unwrap_or_default();
        for (key, items) in history {
            document.insert(key.clone(), Value::from(items.clone()));
        }
        let data = serde_json::to_string_pretty(&Value::Object(document))?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, data)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        match fs::rename(&temp_path, &self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                fs::remove_file(&self.path)?;
                if let Err(e) = fs::rename(&temp_path, &self.path) {
                    let _ = fs::remove_file(&temp_path);
                    return Err(e).context("replacing history file");
                }
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e).context("replacing history file");
            }
        }
        Ok(())
    }
}

/// In-process store for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    history: History,
    saves: usize,
}

impl MemoryStore {
    pub fn with_history(history: History) -> Self {
        Self { history, saves: 0 }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Number of times `save` has been called.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> History {
        self.history.clone()
    }

    fn save(&mut self, history: &History) -> anyhow::Result<()> {
        self.history = history.clone();
        self.saves += 1;
        Ok(())
    }
}

/// Maps an item-category label to the key it is stored under.
pub fn history_key(category: &str) -> String {
    match category {
        "music" => category.to_string(),
        c if c.ends_with('s') => c.to_string(),
        c if c.ends_with('y') => format!("{}ies", &c[..c.len() - 1]),
        c => format!("{c}s"),
    }
}

/// Round-robin-ish picker that avoids anything chosen in the last
/// `cooldown` selections of the same category.
pub struct Scheduler<S, R> {
    store: S,
    rng: R,
}

impl<S: HistoryStore, R: Rng> Scheduler<S, R> {
    pub fn new(store: S, rng: R) -> Self {
        Self { store, rng }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recent picks for `category`, oldest first.
    pub fn recent(&self, category: &str) -> Vec<String> {
        self.store
            .load()
            .remove(&history_key(category))
            .unwrap_or_default()
    }

    pub fn select_next<T: AsRef<str>>(
        &mut self,
        category: &str,
        candidates: &[T],
        cooldown: usize,
    ) -> Result<String, SelectionError> {
        if category.trim().is_empty() {
            return Err(SelectionError::InvalidArgument(
                "category label is empty".to_string(),
            ));
        }
        if candidates.is_empty() {
            return Err(SelectionError::InvalidArgument(format!(
                "the candidate list for '{category}' is empty"
            )));
        }
        if cooldown == 0 {
            return Err(SelectionError::InvalidArgument(format!(
                "cooldown for '{category}' must be positive"
            )));
        }

        let key = history_key(category);
        let mut history = self.store.load();
        let mut recent = history.remove(&key).unwrap_or_default();

        let all: Vec<&str> = candidates.iter().map(AsRef::as_ref).collect();
        let mut pool: Vec<&str> = all
            .iter()
            .copied()
            .filter(|c| !recent.iter().any(|r| r.as_str() == *c))
            .collect();
        if pool.is_empty() {
            warn!("All {} items are on cooldown. Picking from full list.", category);
            pool = all;
        }

        let picked = pool
            .choose(&mut self.rng)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                SelectionError::InvalidArgument(format!("no candidates for '{category}'"))
            })?;

        recent.push(picked.clone());
        if recent.len() > cooldown {
            let excess = recent.len() - cooldown;
            recent.drain(..excess);
        }
        history.insert(key, recent);

        if let Err(e) = self.store.save(&history) {
            error!("Failed to persist selection history: {:#}", e);
        }

        info!("Selected {}: {}", category, display_name(&picked));
        Ok(picked)
    }
}

fn display_name(item: &str) -> &str {
    Path::new(item)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scheduler(seed: u64) -> Scheduler<MemoryStore, StdRng> {
        Scheduler::new(MemoryStore::default(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn history_keys_match_document_schema() {
        assert_eq!(history_key("category"), "categories");
        assert_eq!(history_key("video"), "videos");
        assert_eq!(history_key("music"), "music");
        assert_eq!(history_key("videos"), "videos");
    }

    #[test]
    fn third_pick_is_forced_when_two_are_cooling_down() {
        for seed in 0..20 {
            let mut s = scheduler(seed);
            let pool = ["A", "B", "C"];
            let first = s.select_next("category", &pool, 2).unwrap();
            let second = s.select_next("category", &pool, 2).unwrap();
            assert_ne!(first, second);
            let third = s.select_next("category", &pool, 2).unwrap();
            let expected = pool
                .iter()
                .find(|c| **c != first && **c != second)
                .unwrap();
            assert_eq!(third, *expected);
            assert_eq!(s.recent("category"), vec![second, third]);
        }
    }

    #[test]
    fn small_pool_falls_back_to_everything() {
        let mut s = scheduler(7);
        let pool = ["X", "Y"];
        let a = s.select_next("category", &pool, 5).unwrap();
        let b = s.select_next("category", &pool, 5).unwrap();
        assert_ne!(a, b);
        let c = s.select_next("category", &pool, 5).unwrap();
        assert!(pool.contains(&c.as_str()));
        assert_eq!(s.recent("category").len(), 3);
    }

    #[test]
    fn exhausted_pool_logs_the_fallback() {
        use std::io;
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone)]
        struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

        impl io::Write for SharedBuffer {
            fn write(&mut self, data: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(data);
                Ok(data.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        impl<'a> MakeWriter<'a> for SharedBuffer {
            type Writer = SharedBuffer;

            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        let buf = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .without_time()
            .with_writer(SharedBuffer(Arc::clone(&buf)))
            .finish();

        let mut s = scheduler(7);
        let pool = ["X", "Y"];
        tracing::subscriber::with_default(subscriber, || {
            s.select_next("category", &pool, 5).unwrap();
            s.select_next("category", &pool, 5).unwrap();
        });
        let quiet = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(!quiet.contains("on cooldown"), "unexpected warning: {quiet}");

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .without_time()
            .with_writer(SharedBuffer(Arc::clone(&buf)))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            s.select_next("category", &pool, 5).unwrap();
        });
        let logs = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(
            logs.contains("All category items are on cooldown. Picking from full list."),
            "expected fallback warning, got: {logs}"
        );
    }

    #[test]
    fn picks_never_repeat_inside_the_window() {
        let pool: Vec<String> = (0..8).map(|i| format!("item-{i}")).collect();
        let cooldown = 4;
        let mut s = scheduler(42);
        let picks: Vec<String> = (0..60)
            .map(|_| s.select_next("video", &pool, cooldown).unwrap())
            .collect();
        for (i, pick) in picks.iter().enumerate() {
            assert!(pool.contains(pick));
            let window_end = (i + 1 + cooldown).min(picks.len());
            assert!(
                !picks[i + 1..window_end].contains(pick),
                "{pick} repeated within {cooldown} picks of index {i}"
            );
        }
        assert_eq!(s.recent("video").len(), cooldown);
    }

    #[test]
    fn empty_pool_is_rejected_without_touching_the_store() {
        let mut seeded = History::new();
        seeded.insert("categories".into(), vec!["A".into()]);
        let mut s = Scheduler::new(MemoryStore::with_history(seeded.clone()), StdRng::seed_from_u64(1));
        let empty: [&str; 0] = [];
        let err = s.select_next("category", &empty, 3).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidArgument(_)));
        assert_eq!(s.store().saves(), 0);
        assert_eq!(s.store().history(), &seeded);
    }

    #[test]
    fn zero_cooldown_and_blank_category_are_invalid() {
        let mut s = scheduler(3);
        assert!(matches!(
            s.select_next("music", &["a"], 0),
            Err(SelectionError::InvalidArgument(_))
        ));
        assert!(matches!(
            s.select_next("  ", &["a"], 2),
            Err(SelectionError::InvalidArgument(_))
        ));
        assert_eq!(s.store().saves(), 0);
    }

    #[test]
    fn categories_are_tracked_independently() {
        let mut s = scheduler(11);
        s.select_next("category", &["A", "B"], 5).unwrap();
        s.select_next("music", &["m1.mp3", "m2.mp3"], 10).unwrap();
        let history = s.store().history();
        assert_eq!(history["categories"].len(), 1);
        assert_eq!(history["music"].len(), 1);
    }

    #[test]
    fn oversized_stored_history_is_trimmed_on_next_pick() {
        let mut seeded = History::new();
        seeded.insert(
            "videos".into(),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        );
        let mut s = Scheduler::new(MemoryStore::with_history(seeded), StdRng::seed_from_u64(5));
        let pick = s.select_next("video", &["a", "b", "c", "d", "e"], 2).unwrap();
        assert_eq!(pick, "e");
        assert_eq!(s.recent("video"), vec!["d".to_string(), "e".to_string()]);
    }
}
