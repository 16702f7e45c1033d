use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use rand::Rng;
use rand::seq::SliceRandom;

/// Category name to the sub-themes a script can be written about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    topics: BTreeMap<String, Vec<String>>,
}

const DEFAULT_TOPICS: &[(&str, &[&str])] = &[
    (
        "Workplace Power Dynamics",
        &[
            "Handling a coworker who takes credit for your work",
            "Staying calm when a manager criticizes you in public",
            "Setting boundaries with a colleague who interrupts you",
            "Responding to passive-aggressive emails",
        ],
    ),
    (
        "Calm Authority",
        &[
            "Speaking slower to sound more certain",
            "Using silence after a hard question",
            "Refusing to over-explain your decisions",
        ],
    ),
    (
        "Manipulation Defense",
        &[
            "Spotting guilt-tripping before it works",
            "Answering loaded questions without taking the bait",
            "Resisting false urgency in negotiations",
        ],
    ),
    (
        "Difficult Conversations",
        &[
            "Disagreeing with your boss without losing status",
            "Delivering bad news to a team",
            "Asking for a raise without sounding needy",
        ],
    ),
    (
        "Social Composure",
        &[
            "Recovering after saying something awkward",
            "Holding your ground when a group turns on you",
            "The reframe tactic for public embarrassment",
        ],
    ),
];

impl Default for Catalog {
    fn default() -> Self {
        let topics = DEFAULT_TOPICS
            .iter()
            .map(|(name, themes)| {
                (
                    name.to_string(),
                    themes.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        Self { topics }
    }
}

impl Catalog {
    pub fn new(topics: BTreeMap<String, Vec<String>>) -> anyhow::Result<Self> {
        if topics.is_empty() {
            bail!("catalog has no categories");
        }
        if let Some((name, _)) = topics.iter().find(|(_, themes)| themes.is_empty()) {
            bail!("category '{}' has no sub-themes", name);
        }
        Ok(Self { topics })
    }

    /// Reads a `{ "category": ["sub theme", ...] }` JSON document.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let topics: BTreeMap<String, Vec<String>> = serde_json::from_str(&data)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        Self::new(topics)
    }

    pub fn categories(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    pub fn sub_themes(&self, category: &str) -> Option<&[String]> {
        self.topics.get(category).map(Vec::as_slice)
    }

    /// Uniform pick among the category's sub-themes.
    pub fn pick_sub_theme<R: Rng>(&self, category: &str, rng: &mut R) -> anyhow::Result<String> {
        self.sub_themes(category)
            .and_then(|themes| themes.choose(rng))
            .cloned()
            .with_context(|| format!("unknown category '{category}'"))
    }
}
