//! Rules snapshot: the serialized form of the pattern and learned-weight tables.
//!
//! JSON shape:
//! `{ "patterns": [[id, pattern], ...], "userPatterns": [["sender::category", {count, weight}], ...] }`

use crate::learning::{LearningStore, UserPattern};
use crate::patterns::{CategoryPattern, PatternStore};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const KEY_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesSnapshot {
    pub patterns: Vec<(String, CategoryPattern)>,
    #[serde(default)]
    pub user_patterns: Vec<(String, UserPattern)>,
}

impl RulesSnapshot {
    pub fn capture(patterns: &PatternStore, learning: &LearningStore) -> Self {
        Self {
            patterns: patterns
                .categories()
                .iter()
                .map(|p| (p.id.clone(), p.clone()))
                .collect(),
            user_patterns: learning
                .entries()
                .map(|((sender, category), pattern)| (user_pattern_key(sender, category), *pattern))
                .collect(),
        }
    }

    /// Rebuild both tables; fails without partial state on any bad entry
    pub fn restore(&self) -> Result<(PatternStore, LearningStore)> {
        let mut patterns = PatternStore::new();
        for (id, pattern) in &self.patterns {
            if id != &pattern.id {
                bail!(
                    "Pattern entry key '{}' does not match pattern id '{}'",
                    id,
                    pattern.id
                );
            }
            patterns.add_pattern(pattern.clone());
        }

        let category_ids: Vec<&str> = self.patterns.iter().map(|(id, _)| id.as_str()).collect();
        let mut entries = Vec::with_capacity(self.user_patterns.len());
        for (key, pattern) in &self.user_patterns {
            let (sender, category) = parse_user_pattern_key(key, &category_ids)?;
            if !(0.0..=1.0).contains(&pattern.weight) {
                bail!("Learned weight {} for '{}' is outside [0, 1]", pattern.weight, key);
            }
            entries.push(((sender, category), *pattern));
        }

        Ok((patterns, LearningStore::from_entries(entries)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize rules snapshot")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse rules snapshot")
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write rules file: {}", path.display()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid rules file: {}", path.display()))
    }
}

pub fn user_pattern_key(sender: &str, category_id: &str) -> String {
    format!("{}{}{}", sender, KEY_SEPARATOR, category_id)
}

/// Split `sender::category`.
///
/// The longest known category id that suffixes the key wins, so ids may
/// contain the separator. Unknown categories split at the last separator.
pub fn parse_user_pattern_key(key: &str, category_ids: &[&str]) -> Result<(String, String)> {
    let known = category_ids
        .iter()
        .filter(|id| !id.is_empty())
        .filter_map(|id| {
            key.strip_suffix(*id)
                .and_then(|rest| rest.strip_suffix(KEY_SEPARATOR))
                .filter(|sender| !sender.is_empty())
                .map(|sender| (sender, *id))
        })
        .max_by_key(|(_, id)| id.len());
    if let Some((sender, category)) = known {
        return Ok((sender.to_string(), category.to_string()));
    }

    match key.rsplit_once(KEY_SEPARATOR) {
        Some((sender, category)) if !sender.is_empty() && !category.is_empty() => {
            Ok((sender.to_string(), category.to_string()))
        }
        _ => bail!("Malformed user pattern key: '{}'", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parsing() {
        assert_eq!(
            parse_user_pattern_key("a@b.com::finance", &[]).unwrap(),
            ("a@b.com".to_string(), "finance".to_string())
        );
        assert_eq!(
            parse_user_pattern_key("odd::name@b.com::meeting", &["meeting"]).unwrap(),
            ("odd::name@b.com".to_string(), "meeting".to_string())
        );
        assert!(parse_user_pattern_key("no-separator", &[]).is_err());
        assert!(parse_user_pattern_key("::finance", &["finance"]).is_err());
        assert!(parse_user_pattern_key("a@b.com::", &[]).is_err());
    }

    #[test]
    fn test_key_parsing_with_separator_in_category_id() {
        let ids = ["urgent", "work::urgent"];
        assert_eq!(
            parse_user_pattern_key("a@b.com::work::urgent", &ids).unwrap(),
            ("a@b.com".to_string(), "work::urgent".to_string())
        );
        assert_eq!(
            parse_user_pattern_key("a@b.com::urgent", &ids).unwrap(),
            ("a@b.com".to_string(), "urgent".to_string())
        );
    }

    #[test]
    fn test_json_shape() {
        let mut learning = LearningStore::new();
        learning.update("a@b.com", "finance", "", &[]);
        let snapshot = RulesSnapshot::capture(&PatternStore::with_defaults(), &learning);

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        let first = &value["patterns"][0];
        assert_eq!(first[0], "meeting");
        assert_eq!(first[1]["id"], "meeting");
        assert!(first[1]["senderPatterns"].is_array());
        assert_eq!(first[1]["priority"], "high");

        let user = &value["userPatterns"][0];
        assert_eq!(user[0], "a@b.com::finance");
        assert_eq!(user[1]["count"], 1);
    }

    #[test]
    fn test_capture_restore_round_trip() {
        let mut learning = LearningStore::new();
        for _ in 0..3 {
            learning.update("x@y.com", "meeting", "", &[]);
        }
        let patterns = PatternStore::with_defaults();
        let snapshot = RulesSnapshot::capture(&patterns, &learning);

        let parsed = RulesSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        let (restored_patterns, restored_learning) = parsed.restore().unwrap();
        assert_eq!(restored_patterns, patterns);
        assert_eq!(restored_learning, learning);
        assert_eq!(RulesSnapshot::capture(&restored_patterns, &restored_learning), snapshot);
    }

    #[test]
    fn test_malformed_snapshots_fail() {
        assert!(RulesSnapshot::from_json("{ not json").is_err());
        assert!(RulesSnapshot::from_json(r#"{"userPatterns": []}"#).is_err());

        let bad_key = RulesSnapshot::from_json(
            r#"{"patterns": [], "userPatterns": [["nokey", {"count": 1, "weight": 0.1}]]}"#,
        )
        .unwrap();
        assert!(bad_key.restore().is_err());

        let bad_weight = RulesSnapshot::from_json(
            r#"{"patterns": [], "userPatterns": [["a@b.com::x", {"count": 1, "weight": 3.0}]]}"#,
        )
        .unwrap();
        assert!(bad_weight.restore().is_err());
    }
}
