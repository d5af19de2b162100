use crate::config::ScoringConfig;
use crate::domain_utils::DomainUtils;
use crate::email::EmailData;
use crate::patterns::CategoryPattern;
use serde::{Deserialize, Serialize};

/// How one email scored against one category pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub category_id: String,
    pub matched_keywords: Vec<String>,
    pub keyword_score: f64,
    pub sender_match: bool,
    pub subject_match: bool,
    pub learned_score: f64,
    pub time_multiplier: f64,
    pub relationship_multiplier: f64,
    pub score: f64,
}

impl ScoreBreakdown {
    pub fn raw_score(&self) -> f64 {
        self.score / (self.time_multiplier * self.relationship_multiplier)
    }
}

pub struct ScoringEngine {
    config: ScoringConfig,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::from_config(&ScoringConfig::default())
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Score `email` against `pattern` given the sender's learned weight for it
    pub fn score(
        &self,
        email: &EmailData,
        pattern: &CategoryPattern,
        learned_weight: f64,
    ) -> ScoreBreakdown {
        let text = email.searchable_text();
        let sender = email.from.to_lowercase();
        let subject = email.subject.to_lowercase();

        let matched_keywords: Vec<String> = pattern
            .keywords
            .iter()
            .filter(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
            .cloned()
            .collect();
        let keyword_score = if pattern.keywords.is_empty() {
            0.0
        } else {
            matched_keywords.len() as f64 / pattern.keywords.len() as f64
                * self.config.keyword_weight
        };

        let sender_match = Self::any_substring(&pattern.sender_patterns, &sender);
        let subject_match = Self::any_substring(&pattern.subject_patterns, &subject);

        let learned_score = learned_weight.clamp(0.0, 1.0) * self.config.learned_weight;

        let mut raw = keyword_score + learned_score;
        if sender_match {
            raw += self.config.sender_weight;
        }
        if subject_match {
            raw += self.config.subject_weight;
        }

        let time_multiplier = self.time_multiplier(email, &pattern.id);
        let relationship_multiplier = self.relationship_multiplier(email, &pattern.id);

        let mut score = raw * time_multiplier * relationship_multiplier;
        if self.config.clamp_scores {
            score = score.clamp(0.0, 1.0);
        }

        ScoreBreakdown {
            category_id: pattern.id.clone(),
            matched_keywords,
            keyword_score,
            sender_match,
            subject_match,
            learned_score,
            time_multiplier,
            relationship_multiplier,
            score,
        }
    }

    fn any_substring(patterns: &[String], haystack: &str) -> bool {
        !haystack.is_empty()
            && patterns
                .iter()
                .any(|p| !p.is_empty() && haystack.contains(&p.to_lowercase()))
    }

    fn is_business_hour(&self, hour: u32) -> bool {
        hour >= self.config.business_hours_start && hour <= self.config.business_hours_end
    }

    fn time_multiplier(&self, email: &EmailData, category_id: &str) -> f64 {
        let hour = match email.local_hour() {
            Some(hour) => hour,
            None => return 1.0,
        };
        let in_hours = self.is_business_hour(hour);

        if self.config.business_categories.iter().any(|c| c == category_id) {
            if in_hours {
                1.2
            } else {
                0.8
            }
        } else if self.config.personal_categories.iter().any(|c| c == category_id) {
            if in_hours {
                0.8
            } else {
                1.2
            }
        } else {
            1.0
        }
    }

    fn relationship_multiplier(&self, email: &EmailData, category_id: &str) -> f64 {
        let known = DomainUtils::is_known_sender(&email.from, &self.config.known_domains);

        if self.config.customer_categories.iter().any(|c| c == category_id) && !known {
            1.3
        } else if self.config.personal_categories.iter().any(|c| c == category_id) && known {
            1.2
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::Priority;
    use chrono::DateTime;

    fn pattern(id: &str, keywords: &[&str], senders: &[&str], subjects: &[&str]) -> CategoryPattern {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        CategoryPattern {
            id: id.to_string(),
            name: id.to_string(),
            color: String::new(),
            icon: String::new(),
            keywords: strings(keywords),
            sender_patterns: strings(senders),
            subject_patterns: strings(subjects),
            priority: Priority::Medium,
            auto_actions: Vec::new(),
        }
    }

    fn at(email: EmailData, rfc3339: &str) -> EmailData {
        email.with_timestamp(DateTime::parse_from_rfc3339(rfc3339).unwrap())
    }

    #[test]
    fn test_keyword_proportion() {
        let engine = ScoringEngine::new();
        let p = pattern("misc", &["alpha", "beta", "gamma", "delta"], &[], &[]);
        let email = EmailData::new("1", "x@y.com", "Alpha", "and BETA too");

        let result = engine.score(&email, &p, 0.0);
        assert_eq!(result.matched_keywords, vec!["alpha", "beta"]);
        assert!((result.score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_sender_and_subject_hits() {
        let engine = ScoringEngine::new();
        let p = pattern("misc", &[], &["newsletter"], &["weekly"]);
        let email = EmailData::new("1", "Newsletter@shop.com", "Your WEEKLY picks", "");

        let result = engine.score(&email, &p, 0.0);
        assert!(result.sender_match);
        assert!(result.subject_match);
        assert!((result.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_pattern_lists_contribute_nothing() {
        let engine = ScoringEngine::new();
        let p = pattern("misc", &[], &[], &[]);
        let email = EmailData::new("1", "a@b.com", "anything", "at all");
        assert_eq!(engine.score(&email, &p, 0.0).score, 0.0);
    }

    #[test]
    fn test_learned_weight_contribution() {
        let engine = ScoringEngine::new();
        let p = pattern("misc", &[], &[], &[]);
        let email = EmailData::new("1", "a@b.com", "", "");
        let result = engine.score(&email, &p, 0.5);
        assert!((result.learned_score - 0.1).abs() < 1e-9);
        assert!((result.score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_business_hours_multiplier() {
        let engine = ScoringEngine::new();
        let p = pattern("meeting", &[], &[], &["sync"]);
        let base = EmailData::new("1", "a@corp.com", "Team sync", "");

        let morning = engine.score(&at(base.clone(), "2024-05-06T10:00:00+00:00"), &p, 0.0);
        assert_eq!(morning.time_multiplier, 1.2);
        assert!((morning.score - 0.30).abs() < 1e-9);

        let late = engine.score(&at(base.clone(), "2024-05-06T22:00:00+00:00"), &p, 0.0);
        assert_eq!(late.time_multiplier, 0.8);
        assert!((late.score - 0.20).abs() < 1e-9);

        let boundary = engine.score(&at(base.clone(), "2024-05-06T17:59:00+00:00"), &p, 0.0);
        assert_eq!(boundary.time_multiplier, 1.2);

        let untimed = engine.score(&base, &p, 0.0);
        assert_eq!(untimed.time_multiplier, 1.0);
    }

    #[test]
    fn test_hour_uses_timestamp_offset() {
        let engine = ScoringEngine::new();
        let p = pattern("finance", &[], &[], &["invoice"]);
        let email = at(
            EmailData::new("1", "a@corp.com", "Invoice", ""),
            "2024-05-06T10:00:00-07:00",
        );
        assert_eq!(engine.score(&email, &p, 0.0).time_multiplier, 1.2);
    }

    #[test]
    fn test_personal_prefers_evenings_and_known_senders() {
        let engine = ScoringEngine::new();
        let p = pattern("personal", &[], &[], &["dinner"]);

        let evening = at(
            EmailData::new("1", "mom@gmail.com", "Dinner sunday?", ""),
            "2024-05-06T20:00:00+00:00",
        );
        let result = engine.score(&evening, &p, 0.0);
        assert_eq!(result.time_multiplier, 1.2);
        assert_eq!(result.relationship_multiplier, 1.2);
        assert!((result.score - 0.25 * 1.2 * 1.2).abs() < 1e-9);

        let daytime = at(
            EmailData::new("1", "someone@corp.com", "Dinner sunday?", ""),
            "2024-05-06T11:00:00+00:00",
        );
        let result = engine.score(&daytime, &p, 0.0);
        assert_eq!(result.time_multiplier, 0.8);
        assert_eq!(result.relationship_multiplier, 1.0);
    }

    #[test]
    fn test_customer_boost_for_unknown_domains() {
        let engine = ScoringEngine::new();
        let p = pattern("customer", &[], &["support"], &[]);

        let unknown = EmailData::new("1", "support@acme.io", "", "");
        assert_eq!(engine.score(&unknown, &p, 0.0).relationship_multiplier, 1.3);

        let known = EmailData::new("1", "support.fan@gmail.com", "", "");
        assert_eq!(engine.score(&known, &p, 0.0).relationship_multiplier, 1.0);
    }

    #[test]
    fn test_clamped_and_uncapped_scores() {
        let p = pattern("meeting", &["sync"], &["calendar"], &["sync"]);
        let email = at(
            EmailData::new("1", "calendar@corp.com", "sync", "sync"),
            "2024-05-06T10:00:00+00:00",
        );

        let clamped = ScoringEngine::new().score(&email, &p, 1.0);
        assert_eq!(clamped.score, 1.0);

        let config = ScoringConfig {
            clamp_scores: false,
            ..ScoringConfig::default()
        };
        let uncapped = ScoringEngine::from_config(&config).score(&email, &p, 1.0);
        assert!((uncapped.score - 1.2).abs() < 1e-9);
        assert!((uncapped.raw_score() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_more_keywords_never_lower_score() {
        let engine = ScoringEngine::new();
        let p = pattern("misc", &["one", "two", "three"], &[], &[]);
        let bodies = ["nothing", "one", "one two", "one two three"];
        let scores: Vec<f64> = bodies
            .iter()
            .map(|b| engine.score(&EmailData::new("1", "a@b.com", "", b), &p, 0.0).score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    }
}
