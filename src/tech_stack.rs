//! Tech-stack tags: matching keys, display labels and the filter vocabulary.

use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use crate::models::JobPosting;

/// First entry of every option list; selecting it means "no constraint".
pub const ALL_OPTION: &str = "All";

const SUGGESTION_THRESHOLD: f64 = 0.8;

static KEY_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s.\-]").expect("static pattern"));
static KEY_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d+x]*$").expect("static pattern"));
static LABEL_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?\d[\d.+x\-]*$").expect("static pattern"));

/// Matching key for a tag: "Java 17+" -> "java", "Vue.js" -> "vuejs". Never shown to users.
pub fn normalize(tag: &str) -> String {
    let lowered = tag.to_lowercase();
    let squashed = KEY_NOISE.replace_all(&lowered, "");
    KEY_VERSION.replace(&squashed, "").into_owned()
}

/// Display form of a tag with any trailing version removed.
///
/// Short tags like "S3" keep their digits: if stripping leaves fewer than two
/// characters the original is returned.
pub fn clean(tag: &str) -> String {
    let stripped = LABEL_VERSION.replace(tag, "");
    let stripped = stripped.trim_end();
    if stripped.chars().count() < 2 {
        tag.to_string()
    } else {
        stripped.to_string()
    }
}

/// Split a raw tag field ("Java, Spring, ") into trimmed non-empty tags.
pub fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn has_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase)
}

fn is_all_lower(s: &str) -> bool {
    !has_upper(s)
}

/// Shorter wins; on equal length a capitalised label replaces an all-lowercase one.
fn prefer(candidate: &str, incumbent: &str) -> bool {
    let (c, i) = (candidate.chars().count(), incumbent.chars().count());
    c < i || (c == i && has_upper(candidate) && is_all_lower(incumbent))
}

/// One display label per normalised key, rebuilt from the full collection each time.
#[derive(Debug, Clone, Default)]
pub struct TechStackVocabulary {
    labels: HashMap<String, String>,
}

impl TechStackVocabulary {
    pub fn build<'a>(jobs: impl IntoIterator<Item = &'a JobPosting>) -> Self {
        let mut labels: HashMap<String, String> = HashMap::new();

        for job in jobs {
            for raw in &job.tech_stacks {
                for tag in split_tags(raw) {
                    let key = normalize(tag);
                    if key.is_empty() {
                        continue;
                    }
                    let candidate = clean(tag);
                    match labels.get_mut(&key) {
                        Some(incumbent) => {
                            if prefer(&candidate, incumbent) {
                                *incumbent = candidate;
                            }
                        }
                        None => {
                            labels.insert(key, candidate);
                        }
                    }
                }
            }
        }

        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_for(&self, tag: &str) -> Option<&str> {
        self.labels.get(&normalize(tag)).map(String::as_str)
    }

    /// "All" followed by the unique labels, sorted case-insensitively.
    pub fn options(&self) -> Vec<String> {
        let unique: BTreeSet<&String> = self.labels.values().collect();
        let mut sorted: Vec<&String> = unique.into_iter().collect();
        sorted.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));

        std::iter::once(ALL_OPTION.to_string())
            .chain(sorted.into_iter().cloned())
            .collect()
    }

    /// Closest known label for something the user typed that is not in the vocabulary.
    pub fn suggest(&self, typed: &str) -> Option<&str> {
        let key = normalize(typed);
        if key.is_empty() || self.labels.contains_key(&key) {
            return None;
        }
        self.labels
            .iter()
            .map(|(k, label)| (strsim::jaro_winkler(&key, k), label))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .map(|(_, label)| label.as_str())
    }
}

/// OR-membership test of a posting's tags against a set of selected labels.
#[derive(Debug, Clone, Default)]
pub struct TechStackMatcher {
    keys: HashSet<String>,
}

impl TechStackMatcher {
    pub fn new<'a>(selected: impl IntoIterator<Item = &'a String>) -> Self {
        let keys = selected
            .into_iter()
            .filter(|label| label.as_str() != ALL_OPTION)
            .map(|label| normalize(label))
            .filter(|key| !key.is_empty())
            .collect();
        Self { keys }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        job.tech_stacks.iter().any(|raw| {
            self.keys.contains(&normalize(raw))
                || split_tags(raw).any(|tag| self.keys.contains(&normalize(tag)))
        })
    }
}
