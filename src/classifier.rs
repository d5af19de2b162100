//! Classifier Engine
//!
//! Owns the pattern and learned-weight tables, scores an email against every
//! category, ranks the matches and assembles the categorization result.
//! Mutation goes through `&mut self`; share across threads behind a mutex.

use crate::config::{ClassifierConfig, ClassifierSection};
use crate::email::EmailData;
use crate::labels::LabelDetector;
use crate::learning::{LearningStore, UserPattern};
use crate::patterns::{CategoryPattern, PatternStore, Priority};
use crate::rules::RulesSnapshot;
use crate::scoring::{ScoreBreakdown, ScoringEngine};
use crate::statistics::{StatEvent, StatisticsCollector};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const GENERAL_CATEGORY: &str = "general";
const MAX_RANKED: usize = 3;
const NO_SIGNALS_REASON: &str = "No strong category signals found";

/// (category, body trigger, extra action) checked after the pattern's own actions
const CONTENT_ACTIONS: &[(&str, &str, &str)] = &[
    ("meeting", "agenda", "reviewAgenda"),
    ("finance", "invoice", "schedulePayment"),
    ("project", "deadline", "setReminder"),
    ("customer", "refund", "escalateToSupport"),
    ("security", "password", "verifySender"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizationResult {
    pub email_id: String,
    pub primary_category: String,
    pub secondary_categories: Vec<String>,
    pub confidence: f64,
    pub priority: Priority,
    pub suggested_actions: Vec<String>,
    pub smart_labels: Vec<String>,
    pub auto_applied: bool,
    pub reasoning: String,
    pub scores: Vec<CategoryScore>,
}

pub struct ClassifierEngine {
    settings: ClassifierSection,
    patterns: PatternStore,
    learning: LearningStore,
    scorer: ScoringEngine,
    labels: LabelDetector,
    stats: StatisticsCollector,
}

impl Default for ClassifierEngine {
    fn default() -> Self {
        Self::with_patterns(&ClassifierConfig::default(), PatternStore::with_defaults())
    }
}

impl ClassifierEngine {
    /// Build an engine from config, loading the pattern and rules files it names
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let patterns = match &config.classifier.patterns_file {
            Some(path) => PatternStore::load_from_file(path)?,
            None => PatternStore::with_defaults(),
        };

        let mut engine = Self::with_patterns(config, patterns);

        if let Some(rules_file) = &config.classifier.rules_file {
            if Path::new(rules_file).exists() {
                engine.load_rules(rules_file)?;
            } else {
                log::warn!("Rules file not found: {}, starting fresh", rules_file);
            }
        }

        Ok(engine)
    }

    pub fn with_patterns(config: &ClassifierConfig, patterns: PatternStore) -> Self {
        log::debug!(
            "Classifier engine created with {} categories (learning_mode={})",
            patterns.len(),
            config.classifier.learning_mode
        );
        Self {
            settings: config.classifier.clone(),
            patterns,
            learning: LearningStore::new(),
            scorer: ScoringEngine::from_config(&config.scoring),
            labels: LabelDetector::from_config(&config.labels),
            stats: StatisticsCollector::new(),
        }
    }

    pub fn categorize_email(&mut self, email: &EmailData) -> CategorizationResult {
        self.categorize_email_at(email, Utc::now())
    }

    /// Categorize with an explicit clock for deadline labels and statistics
    pub fn categorize_email_at(
        &mut self,
        email: &EmailData,
        now: DateTime<Utc>,
    ) -> CategorizationResult {
        let ranked = self.rank(email);
        let smart_labels = self.labels.detect_labels(email, now);

        let primary = match ranked.first() {
            Some(primary) => primary.clone(),
            None => {
                log::debug!("Email {} matched no category", email.id);
                self.stats.record_event(StatEvent::NoCategoryMatch, now);
                return CategorizationResult {
                    email_id: email.id.clone(),
                    primary_category: GENERAL_CATEGORY.to_string(),
                    secondary_categories: Vec::new(),
                    confidence: 0.0,
                    priority: Priority::Low,
                    suggested_actions: Vec::new(),
                    smart_labels,
                    auto_applied: false,
                    reasoning: NO_SIGNALS_REASON.to_string(),
                    scores: Vec::new(),
                };
            }
        };

        let confidence = primary.score;
        let auto_applied = confidence > self.settings.auto_apply_threshold;

        if self.settings.learning_mode {
            self.learn(email, &primary.category_id, now);
        }

        let (priority, suggested_actions) = match self.patterns.get(&primary.category_id) {
            Some(pattern) => (pattern.priority, Self::suggested_actions(pattern, email)),
            None => (Priority::Low, Vec::new()),
        };

        self.stats.record_event(
            StatEvent::Categorized {
                category_id: primary.category_id.clone(),
                auto_applied,
            },
            now,
        );

        log::info!(
            "Email {} categorized as '{}' (confidence={:.2}, auto_applied={})",
            email.id,
            primary.category_id,
            confidence,
            auto_applied
        );

        CategorizationResult {
            email_id: email.id.clone(),
            primary_category: primary.category_id.clone(),
            secondary_categories: ranked
                .iter()
                .skip(1)
                .map(|s| s.category_id.clone())
                .collect(),
            confidence,
            priority,
            suggested_actions,
            smart_labels,
            auto_applied,
            reasoning: Self::build_reasoning(&primary),
            scores: ranked
                .iter()
                .map(|s| CategoryScore {
                    category_id: s.category_id.clone(),
                    score: s.score,
                })
                .collect(),
        }
    }

    /// Categorize emails in order; learning from earlier emails applies to later ones
    pub fn categorize_batch(&mut self, emails: &[EmailData]) -> Vec<CategorizationResult> {
        emails.iter().map(|e| self.categorize_email(e)).collect()
    }

    /// Non-zero scores, highest first, ties in pattern order, at most three
    fn rank(&self, email: &EmailData) -> Vec<ScoreBreakdown> {
        let mut scores: Vec<ScoreBreakdown> = self
            .patterns
            .categories()
            .iter()
            .map(|pattern| {
                let learned = self.learning.weight(&email.from, &pattern.id);
                self.scorer.score(email, pattern, learned)
            })
            .filter(|s| s.score > 0.0)
            .collect();

        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(MAX_RANKED);
        scores
    }

    fn learn(&mut self, email: &EmailData, category_id: &str, now: DateTime<Utc>) {
        if email.from.trim().is_empty() {
            return;
        }
        let existing = self
            .patterns
            .get(category_id)
            .map(|p| p.keywords.clone())
            .unwrap_or_default();

        let outcome = self
            .learning
            .update(&email.from, category_id, &email.body, &existing);

        if let Some(event) = outcome.learned {
            let added = self.patterns.apply_learned(&event);
            if added > 0 {
                self.stats.record_event(StatEvent::KeywordsLearned(added), now);
            }
        }
    }

    fn suggested_actions(pattern: &CategoryPattern, email: &EmailData) -> Vec<String> {
        let mut actions = pattern.auto_actions.clone();
        let body = email.body.to_lowercase();

        let extra = CONTENT_ACTIONS
            .iter()
            .find(|(category, trigger, _)| *category == pattern.id && body.contains(trigger))
            .map(|(_, _, action)| action.to_string());

        if let Some(action) = extra {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
        actions
    }

    fn build_reasoning(primary: &ScoreBreakdown) -> String {
        let mut reasons = Vec::new();

        if !primary.matched_keywords.is_empty() {
            reasons.push(format!(
                "matched keywords: {}",
                primary.matched_keywords.join(", ")
            ));
        }
        if primary.sender_match {
            reasons.push("sender pattern match".to_string());
        }
        if primary.subject_match {
            reasons.push("subject pattern match".to_string());
        }
        if primary.learned_score > 0.0 {
            reasons.push("frequent sender history".to_string());
        }

        if reasons.is_empty() {
            NO_SIGNALS_REASON.to_string()
        } else {
            reasons.join("; ")
        }
    }

    pub fn categories(&self) -> &[CategoryPattern] {
        self.patterns.categories()
    }

    pub fn add_pattern(&mut self, pattern: CategoryPattern) {
        self.patterns.add_pattern(pattern);
    }

    pub fn create_custom_category(&mut self, pattern: CategoryPattern) {
        self.patterns.create_custom_category(pattern);
    }

    pub fn update_category(&mut self, pattern: CategoryPattern) {
        self.patterns.update_category(pattern);
    }

    pub fn learned_weight(&self, sender: &str, category_id: &str) -> f64 {
        self.learning.weight(sender, category_id)
    }

    pub fn user_pattern(&self, sender: &str, category_id: &str) -> Option<&UserPattern> {
        self.learning.get(sender, category_id)
    }

    pub fn set_learning_mode(&mut self, enabled: bool) {
        self.settings.learning_mode = enabled;
    }

    pub fn learning_mode(&self) -> bool {
        self.settings.learning_mode
    }

    pub fn statistics(&self) -> &StatisticsCollector {
        &self.stats
    }

    pub fn export_rules(&self) -> RulesSnapshot {
        RulesSnapshot::capture(&self.patterns, &self.learning)
    }

    /// Replace both tables; on error the engine is left unchanged
    pub fn import_rules(&mut self, snapshot: &RulesSnapshot) -> Result<()> {
        let (patterns, learning) = snapshot.restore()?;
        log::info!(
            "Imported {} categories and {} learned sender weights",
            patterns.len(),
            learning.len()
        );
        self.patterns = patterns;
        self.learning = learning;
        Ok(())
    }

    pub fn export_rules_json(&self) -> Result<String> {
        self.export_rules().to_json()
    }

    pub fn import_rules_json(&mut self, json: &str) -> Result<()> {
        let snapshot = RulesSnapshot::from_json(json)?;
        self.import_rules(&snapshot)
    }

    pub fn save_rules<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.export_rules().save_to_file(path)
    }

    pub fn load_rules<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let snapshot = RulesSnapshot::load_from_file(path)?;
        self.import_rules(&snapshot)
    }
}
