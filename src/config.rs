use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    pub logging: Option<LoggingConfig>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierSection::default(),
            scoring: ScoringConfig::default(),
            labels: LabelConfig::default(),
            logging: Some(LoggingConfig {
                level: "info".to_string(),
            }),
        }
    }
}

impl ClassifierConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ClassifierConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierSection {
    #[serde(default = "default_learning_mode")]
    pub learning_mode: bool,
    #[serde(default = "default_auto_apply_threshold")]
    pub auto_apply_threshold: f64,
    /// YAML file replacing the built-in category patterns
    pub patterns_file: Option<String>,
    /// JSON rules snapshot imported at startup
    pub rules_file: Option<String>,
}

fn default_learning_mode() -> bool {
    true
}

fn default_auto_apply_threshold() -> f64 {
    0.8
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            learning_mode: default_learning_mode(),
            auto_apply_threshold: default_auto_apply_threshold(),
            patterns_file: None,
            rules_file: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub keyword_weight: f64,
    pub sender_weight: f64,
    pub subject_weight: f64,
    pub learned_weight: f64,
    /// Clamp final scores into [0, 1]; multipliers can push them above 1 otherwise
    pub clamp_scores: bool,
    pub business_hours_start: u32,
    pub business_hours_end: u32,
    pub business_categories: Vec<String>,
    pub personal_categories: Vec<String>,
    pub customer_categories: Vec<String>,
    pub known_domains: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.30,
            sender_weight: 0.25,
            subject_weight: 0.25,
            learned_weight: 0.20,
            clamp_scores: true,
            business_hours_start: 9,
            business_hours_end: 17,
            business_categories: vec![
                "meeting".to_string(),
                "project".to_string(),
                "finance".to_string(),
            ],
            personal_categories: vec!["personal".to_string()],
            customer_categories: vec!["customer".to_string()],
            known_domains: vec![
                "gmail.com".to_string(),
                "outlook.com".to_string(),
                "yahoo.com".to_string(),
                "icloud.com".to_string(),
                "hotmail.com".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LabelConfig {
    pub urgent_keywords: Vec<String>,
    pub important_keywords: Vec<String>,
    pub action_phrases: Vec<String>,
    pub vip_markers: Vec<String>,
    pub deadline_window_days: i64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let strings = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            urgent_keywords: strings(&["urgent", "asap", "immediately", "critical", "emergency"]),
            important_keywords: strings(&["important", "priority", "deadline", "eod", "cob"]),
            action_phrases: strings(&[
                "please review",
                "please approve",
                "action required",
                "waiting for your",
                "need your",
                "can you",
                "could you",
                "would you",
            ]),
            vip_markers: strings(&["ceo@", "cto@", "cfo@", "president@", "director@"]),
            deadline_window_days: 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}
