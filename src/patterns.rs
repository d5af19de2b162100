use crate::learning::PatternLearned;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        write!(f, "{}", name)
    }
}

/// A named rule bundle used to score an email against one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPattern {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sender_patterns: Vec<String>,
    #[serde(default)]
    pub subject_patterns: Vec<String>,
    pub priority: Priority,
    #[serde(default)]
    pub auto_actions: Vec<String>,
}

impl CategoryPattern {
    /// Append keywords that are not already present, keeping order
    pub fn add_keywords(&mut self, keywords: &[String]) -> usize {
        let mut added = 0;
        for keyword in keywords {
            let lower = keyword.to_lowercase();
            if !self.keywords.iter().any(|k| k.to_lowercase() == lower) {
                self.keywords.push(lower);
                added += 1;
            }
        }
        added
    }
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    patterns: Vec<CategoryPattern>,
}

/// Ordered collection of category patterns keyed by id.
///
/// Insertion order is kept because it breaks ties between equal scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternStore {
    patterns: Vec<CategoryPattern>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        for pattern in default_patterns() {
            store.add_pattern(pattern);
        }
        store
    }

    pub fn from_patterns(patterns: Vec<CategoryPattern>) -> Self {
        let mut store = Self::new();
        for pattern in patterns {
            store.add_pattern(pattern);
        }
        store
    }

    /// Load patterns from a YAML file with a top-level `patterns` list
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern file: {}", path.display()))?;
        let file: PatternFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse pattern file: {}", path.display()))?;
        log::info!(
            "Loaded {} category patterns from {}",
            file.patterns.len(),
            path.display()
        );
        Ok(Self::from_patterns(file.patterns))
    }

    /// Insert a pattern; an existing pattern with the same id is replaced in place
    pub fn add_pattern(&mut self, pattern: CategoryPattern) {
        match self.patterns.iter_mut().find(|p| p.id == pattern.id) {
            Some(existing) => {
                log::debug!("Overwriting category pattern '{}'", pattern.id);
                *existing = pattern;
            }
            None => self.patterns.push(pattern),
        }
    }

    pub fn create_custom_category(&mut self, pattern: CategoryPattern) {
        log::info!("Creating custom category '{}'", pattern.id);
        self.add_pattern(pattern);
    }

    pub fn update_category(&mut self, pattern: CategoryPattern) {
        self.add_pattern(pattern);
    }

    pub fn categories(&self) -> &[CategoryPattern] {
        &self.patterns
    }

    pub fn get(&self, id: &str) -> Option<&CategoryPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Merge keywords mined by the learning store into their pattern
    pub fn apply_learned(&mut self, event: &PatternLearned) -> usize {
        match self.patterns.iter_mut().find(|p| p.id == event.pattern_id) {
            Some(pattern) => {
                let added = pattern.add_keywords(&event.new_keywords);
                if added > 0 {
                    log::info!(
                        "Learned {} new keywords for '{}': {:?}",
                        added,
                        event.pattern_id,
                        event.new_keywords
                    );
                }
                added
            }
            None => {
                log::warn!(
                    "Learned keywords for unknown category '{}'",
                    event.pattern_id
                );
                0
            }
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Built-in category patterns seeded at startup
pub fn default_patterns() -> Vec<CategoryPattern> {
    vec![
        CategoryPattern {
            id: "meeting".to_string(),
            name: "Meetings".to_string(),
            color: "#3b82f6".to_string(),
            icon: "📅".to_string(),
            keywords: strings(&[
                "meeting",
                "agenda",
                "calendar",
                "schedule",
                "invite",
                "conference",
                "zoom",
                "standup",
            ]),
            sender_patterns: strings(&["calendar", "noreply@zoom", "teams"]),
            subject_patterns: strings(&["meeting", "invitation", "sync", "standup"]),
            priority: Priority::High,
            auto_actions: strings(&["addToCalendar", "setReminder"]),
        },
        CategoryPattern {
            id: "project".to_string(),
            name: "Projects".to_string(),
            color: "#8b5cf6".to_string(),
            icon: "📋".to_string(),
            keywords: strings(&[
                "project",
                "milestone",
                "sprint",
                "deliverable",
                "roadmap",
                "task",
                "release",
                "status update",
            ]),
            sender_patterns: strings(&["jira", "asana", "github", "trello"]),
            subject_patterns: strings(&["project", "sprint", "milestone", "status"]),
            priority: Priority::High,
            auto_actions: strings(&["addToProjectBoard"]),
        },
        CategoryPattern {
            id: "finance".to_string(),
            name: "Finance".to_string(),
            color: "#10b981".to_string(),
            icon: "💰".to_string(),
            keywords: strings(&[
                "invoice",
                "payment",
                "budget",
                "expense",
                "receipt",
                "billing",
                "tax",
                "payroll",
                "refund",
                "quarterly",
            ]),
            sender_patterns: strings(&["billing", "invoice", "accounting", "finance", "payroll"]),
            subject_patterns: strings(&["invoice", "payment", "budget", "receipt", "expense"]),
            priority: Priority::High,
            auto_actions: strings(&["flagForReview", "forwardToAccounting"]),
        },
        CategoryPattern {
            id: "security".to_string(),
            name: "Security".to_string(),
            color: "#ef4444".to_string(),
            icon: "🔒".to_string(),
            keywords: strings(&[
                "password",
                "security",
                "login",
                "breach",
                "verify",
                "two-factor",
                "suspicious",
                "unauthorized",
            ]),
            sender_patterns: strings(&["security", "no-reply@accounts", "alerts"]),
            subject_patterns: strings(&["security alert", "password", "sign-in", "verify"]),
            priority: Priority::Urgent,
            auto_actions: strings(&["markImportant", "notifyImmediately"]),
        },
        CategoryPattern {
            id: "customer".to_string(),
            name: "Customers".to_string(),
            color: "#f59e0b".to_string(),
            icon: "🤝".to_string(),
            keywords: strings(&[
                "customer",
                "support",
                "ticket",
                "complaint",
                "order",
                "refund",
                "feedback",
                "issue",
            ]),
            sender_patterns: strings(&["support", "help", "customer"]),
            subject_patterns: strings(&["ticket", "order", "support", "complaint"]),
            priority: Priority::High,
            auto_actions: strings(&["createTicket", "draftReply"]),
        },
        CategoryPattern {
            id: "newsletter".to_string(),
            name: "Newsletters".to_string(),
            color: "#6b7280".to_string(),
            icon: "📰".to_string(),
            keywords: strings(&[
                "newsletter",
                "unsubscribe",
                "digest",
                "subscription",
                "read more",
                "view in browser",
            ]),
            sender_patterns: strings(&["newsletter", "news@", "digest", "noreply", "no-reply"]),
            subject_patterns: strings(&["weekly", "newsletter", "digest", "edition"]),
            priority: Priority::Low,
            auto_actions: strings(&["moveToReadLater", "markAsRead"]),
        },
        CategoryPattern {
            id: "personal".to_string(),
            name: "Personal".to_string(),
            color: "#ec4899".to_string(),
            icon: "🏠".to_string(),
            keywords: strings(&[
                "family",
                "friend",
                "dinner",
                "weekend",
                "birthday",
                "vacation",
                "party",
                "holiday",
            ]),
            sender_patterns: Vec::new(),
            subject_patterns: strings(&["dinner", "weekend", "birthday", "catch up"]),
            priority: Priority::Medium,
            auto_actions: strings(&["starEmail"]),
        },
        CategoryPattern {
            id: "social".to_string(),
            name: "Social".to_string(),
            color: "#0ea5e9".to_string(),
            icon: "👥".to_string(),
            keywords: strings(&[
                "followed you",
                "connection",
                "mentioned you",
                "commented",
                "liked",
                "invitation to connect",
            ]),
            sender_patterns: strings(&["linkedin", "facebook", "twitter", "instagram"]),
            subject_patterns: strings(&["new follower", "mentioned you", "connection"]),
            priority: Priority::Low,
            auto_actions: strings(&["moveToSocial"]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> CategoryPattern {
        CategoryPattern {
            id: id.to_string(),
            name: format!("{} name", id),
            color: String::new(),
            icon: String::new(),
            keywords: vec!["alpha".to_string()],
            sender_patterns: Vec::new(),
            subject_patterns: Vec::new(),
            priority: Priority::Medium,
            auto_actions: Vec::new(),
        }
    }

    #[test]
    fn test_default_patterns_seeded() {
        let store = PatternStore::with_defaults();
        assert_eq!(store.len(), 8);
        for id in [
            "meeting",
            "project",
            "finance",
            "security",
            "customer",
            "newsletter",
            "personal",
            "social",
        ] {
            assert!(store.get(id).is_some(), "missing {}", id);
        }
    }

    #[test]
    fn test_duplicate_id_overwrites_in_place() {
        let mut store = PatternStore::new();
        store.add_pattern(sample("a"));
        store.add_pattern(sample("b"));

        let mut replacement = sample("a");
        replacement.name = "Replaced".to_string();
        store.create_custom_category(replacement);

        assert_eq!(store.len(), 2);
        assert_eq!(store.categories()[0].name, "Replaced");
        assert_eq!(store.categories()[1].id, "b");
    }

    #[test]
    fn test_apply_learned_skips_duplicates() {
        let mut store = PatternStore::new();
        store.add_pattern(sample("a"));

        let event = PatternLearned {
            pattern_id: "a".to_string(),
            new_keywords: vec!["Alpha".to_string(), "gamma".to_string()],
        };
        assert_eq!(store.apply_learned(&event), 1);
        assert_eq!(store.get("a").unwrap().keywords, vec!["alpha", "gamma"]);

        let unknown = PatternLearned {
            pattern_id: "missing".to_string(),
            new_keywords: vec!["delta".to_string()],
        };
        assert_eq!(store.apply_learned(&unknown), 0);
    }

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&Priority::Urgent).unwrap();
        assert_eq!(json, "\"urgent\"");
        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let path = std::env::temp_dir().join(format!(
            "mail-sorter-patterns-{}.yaml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
patterns:
  - id: travel
    name: Travel
    keywords: [flight, hotel, booking]
    senderPatterns: [airline]
    subjectPatterns: [itinerary]
    priority: medium
    autoActions: [addToCalendar]
"#,
        )
        .unwrap();

        let store = PatternStore::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(store.len(), 1);
        let travel = store.get("travel").unwrap();
        assert_eq!(travel.keywords.len(), 3);
        assert_eq!(travel.priority, Priority::Medium);
        assert!(travel.color.is_empty());
    }
}
