//! Per-sender category learning.
//!
//! Every classification bumps a counter for the `(sender, category)` pair. The
//! counter drives a weight that feeds back into scoring, and once a pair has
//! been seen often enough the email body is mined for new category keywords.
//! Mined keywords are returned as a [`PatternLearned`] event; the caller owns
//! the pattern table and decides how to apply it.
//!
//! Weights never decay.

use crate::domain_utils::DomainUtils;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const WEIGHT_PER_OBSERVATION: f64 = 0.1;
const MINING_THRESHOLD: u32 = 5;
const MIN_TOKEN_LEN: usize = 5;
const MAX_MINED_KEYWORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserPattern {
    pub count: u32,
    pub weight: f64,
}

impl UserPattern {
    fn observe(&mut self) {
        self.count = self.count.saturating_add(1);
        self.weight = (self.count as f64 * WEIGHT_PER_OBSERVATION).min(1.0);
    }
}

/// Keywords mined for a category from a repeat sender's email body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternLearned {
    pub pattern_id: String,
    pub new_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningOutcome {
    pub count: u32,
    pub weight: f64,
    pub learned: Option<PatternLearned>,
}

#[derive(Debug, Clone)]
pub struct LearningStore {
    entries: BTreeMap<(String, String), UserPattern>,
    token_splitter: Regex,
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for LearningStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl LearningStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            token_splitter: Regex::new(r"[^\p{L}\p{N}]+").expect("static token regex"),
        }
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ((String, String), UserPattern)>,
    {
        let mut store = Self::new();
        store.entries = entries
            .into_iter()
            .map(|((sender, category), pattern)| {
                ((DomainUtils::normalize_sender(&sender), category), pattern)
            })
            .collect();
        store
    }

    /// Record one classification of `sender` into `category_id`.
    ///
    /// `existing_keywords` is the category's current keyword list, used to
    /// avoid re-mining words the pattern already knows.
    pub fn update(
        &mut self,
        sender: &str,
        category_id: &str,
        body: &str,
        existing_keywords: &[String],
    ) -> LearningOutcome {
        let key = (
            DomainUtils::normalize_sender(sender),
            category_id.to_string(),
        );
        let entry = self.entries.entry(key).or_insert(UserPattern {
            count: 0,
            weight: 0.0,
        });
        entry.observe();
        let UserPattern { count, weight } = *entry;

        log::debug!(
            "Learning: {} -> {} (count={}, weight={:.2})",
            sender,
            category_id,
            count,
            weight
        );

        let learned = if count > MINING_THRESHOLD {
            let new_keywords = self.mine_keywords(body, existing_keywords);
            if new_keywords.is_empty() {
                None
            } else {
                Some(PatternLearned {
                    pattern_id: category_id.to_string(),
                    new_keywords,
                })
            }
        } else {
            None
        };

        LearningOutcome {
            count,
            weight,
            learned,
        }
    }

    pub fn weight(&self, sender: &str, category_id: &str) -> f64 {
        self.get(sender, category_id)
            .map(|p| p.weight)
            .unwrap_or(0.0)
    }

    pub fn get(&self, sender: &str, category_id: &str) -> Option<&UserPattern> {
        self.entries.get(&(
            DomainUtils::normalize_sender(sender),
            category_id.to_string(),
        ))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&(String, String), &UserPattern)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most frequent long tokens in `body` the category does not know yet
    fn mine_keywords(&self, body: &str, existing_keywords: &[String]) -> Vec<String> {
        let lower = body.to_lowercase();
        let known: Vec<String> = existing_keywords.iter().map(|k| k.to_lowercase()).collect();

        // (frequency, first position) per token
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, token) in self
            .token_splitter
            .split(&lower)
            .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
            .enumerate()
        {
            if known.iter().any(|k| k == token) {
                continue;
            }
            counts.entry(token).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

        ranked
            .into_iter()
            .take(MAX_MINED_KEYWORDS)
            .map(|(token, _)| token.to_string())
            .collect()
    }
}
