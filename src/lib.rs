pub mod classifier;
pub mod config;
pub mod domain_utils;
pub mod email;
pub mod labels;
pub mod learning;
pub mod patterns;
pub mod rules;
pub mod scoring;
pub mod statistics;

pub use classifier::{CategorizationResult, CategoryScore, ClassifierEngine, GENERAL_CATEGORY};
pub use config::ClassifierConfig;
pub use email::EmailData;
pub use labels::LabelDetector;
pub use learning::{LearningStore, PatternLearned, UserPattern};
pub use patterns::{CategoryPattern, PatternStore, Priority};
pub use rules::RulesSnapshot;
pub use scoring::{ScoreBreakdown, ScoringEngine};
pub use statistics::{StatEvent, StatisticsCollector};
