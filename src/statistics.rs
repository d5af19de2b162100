use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category_id: String,
    pub matches: u64,
    pub auto_applied: u64,
    pub first_match: Option<DateTime<Utc>>,
    pub last_match: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_emails: u64,
    pub total_auto_applied: u64,
    pub general_fallbacks: u64, // Emails that matched no category
    pub keywords_learned: u64,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum StatEvent {
    Categorized {
        category_id: String,
        auto_applied: bool,
    },
    NoCategoryMatch,
    KeywordsLearned(usize),
}

/// In-memory classification counters owned by the engine
#[derive(Debug, Clone)]
pub struct StatisticsCollector {
    global: GlobalStats,
    categories: BTreeMap<String, CategoryStats>,
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsCollector {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            global: GlobalStats {
                total_emails: 0,
                total_auto_applied: 0,
                general_fallbacks: 0,
                keywords_learned: 0,
                start_time: now,
                last_updated: now,
            },
            categories: BTreeMap::new(),
        }
    }

    pub fn record_event(&mut self, event: StatEvent, at: DateTime<Utc>) {
        self.global.last_updated = at;
        match event {
            StatEvent::Categorized {
                category_id,
                auto_applied,
            } => {
                self.global.total_emails += 1;
                if auto_applied {
                    self.global.total_auto_applied += 1;
                }
                let stats = self
                    .categories
                    .entry(category_id.clone())
                    .or_insert_with(|| CategoryStats {
                        category_id,
                        matches: 0,
                        auto_applied: 0,
                        first_match: Some(at),
                        last_match: None,
                    });
                stats.matches += 1;
                if auto_applied {
                    stats.auto_applied += 1;
                }
                stats.last_match = Some(at);
            }
            StatEvent::NoCategoryMatch => {
                self.global.total_emails += 1;
                self.global.general_fallbacks += 1;
            }
            StatEvent::KeywordsLearned(count) => {
                self.global.keywords_learned += count as u64;
            }
        }
    }

    pub fn global(&self) -> &GlobalStats {
        &self.global
    }

    /// Per-category stats, most matched first
    pub fn category_stats(&self) -> Vec<CategoryStats> {
        let mut stats: Vec<CategoryStats> = self.categories.values().cloned().collect();
        stats.sort_by(|a, b| b.matches.cmp(&a.matches));
        stats
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
