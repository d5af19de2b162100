use crate::config::LabelConfig;
use crate::email::EmailData;
use chrono::{DateTime, NaiveDate, Utc};
use regex::{Captures, Regex};

pub const URGENT_LABEL: &str = "🔴 Urgent";
pub const IMPORTANT_LABEL: &str = "🟡 Important";
pub const ACTION_REQUIRED_LABEL: &str = "✋ Action Required";
pub const ATTACHMENT_LABEL: &str = "📎 Has Attachment";
pub const VIP_LABEL: &str = "⭐ VIP";
pub const FOLLOW_UP_LABEL: &str = "🔄 Follow-up";

/// Derives presentation labels from an email, independent of its category.
pub struct LabelDetector {
    config: LabelConfig,
    deadline_pattern: Regex,
}

impl Default for LabelDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelDetector {
    pub fn new() -> Self {
        Self::from_config(&LabelConfig::default())
    }

    pub fn from_config(config: &LabelConfig) -> Self {
        Self {
            config: config.clone(),
            deadline_pattern: Regex::new(
                r"(?i)(?:\bby|deadline:|\bdue)\s+(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b",
            )
            .unwrap(),
        }
    }

    pub fn detect_labels(&self, email: &EmailData, now: DateTime<Utc>) -> Vec<String> {
        let text = email.searchable_text();
        let body = email.body.to_lowercase();
        let subject = email.subject.to_lowercase();
        let sender = email.from.to_lowercase();
        let mut labels = Vec::new();

        if Self::contains_any(&text, &self.config.urgent_keywords) {
            labels.push(URGENT_LABEL.to_string());
        } else if Self::contains_any(&text, &self.config.important_keywords) {
            labels.push(IMPORTANT_LABEL.to_string());
        }

        if Self::contains_any(&body, &self.config.action_phrases) {
            labels.push(ACTION_REQUIRED_LABEL.to_string());
        }

        if let Some(days) = self.days_until_deadline(&email.body, now) {
            if (0..=self.config.deadline_window_days).contains(&days) {
                labels.push(format!("⏰ Due in {} days", days));
            }
        }

        if email.has_attachments {
            labels.push(ATTACHMENT_LABEL.to_string());
        }

        if Self::contains_any(&sender, &self.config.vip_markers) {
            labels.push(VIP_LABEL.to_string());
        }

        if subject.contains("re:") || subject.contains("follow up") || body.contains("following up")
        {
            labels.push(FOLLOW_UP_LABEL.to_string());
        }

        labels
    }

    /// Whole days (rounded up) from `now` to the first valid deadline date in `text`
    pub fn days_until_deadline(&self, text: &str, now: DateTime<Utc>) -> Option<i64> {
        let deadline = self
            .deadline_pattern
            .captures_iter(text)
            .find_map(|captures| Self::deadline_date(&captures))?;

        let seconds = (deadline - now).num_seconds() as f64;
        Some((seconds / 86_400.0).ceil() as i64)
    }

    fn deadline_date(captures: &Captures) -> Option<DateTime<Utc>> {
        let month: u32 = captures.get(1)?.as_str().parse().ok()?;
        let day: u32 = captures.get(2)?.as_str().parse().ok()?;
        let year_text = captures.get(3)?.as_str();
        let mut year: i32 = year_text.parse().ok()?;
        if year_text.len() == 2 {
            year += 2000;
        }

        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc()),
            None => {
                log::debug!("Ignoring invalid deadline date {}/{}/{}", month, day, year);
                None
            }
        }
    }

    fn contains_any(haystack: &str, needles: &[String]) -> bool {
        needles
            .iter()
            .any(|n| !n.is_empty() && haystack.contains(&n.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn labels(email: &EmailData) -> Vec<String> {
        LabelDetector::new().detect_labels(email, now())
    }

    #[test]
    fn test_urgent_takes_precedence_over_important() {
        let email = EmailData::new("1", "a@b.com", "URGENT and important", "");
        let result = labels(&email);
        assert!(result.contains(&URGENT_LABEL.to_string()));
        assert!(!result.contains(&IMPORTANT_LABEL.to_string()));

        let email = EmailData::new("1", "a@b.com", "Report", "needed by EOD");
        assert_eq!(labels(&email), vec![IMPORTANT_LABEL.to_string()]);
    }

    #[test]
    fn test_action_required_reads_body_only() {
        let email = EmailData::new("1", "a@b.com", "Could you check?", "thanks");
        assert!(!labels(&email).contains(&ACTION_REQUIRED_LABEL.to_string()));

        let email = EmailData::new("1", "a@b.com", "Doc", "Please approve the draft");
        assert!(labels(&email).contains(&ACTION_REQUIRED_LABEL.to_string()));
    }

    #[test]
    fn test_deadline_window() {
        let detector = LabelDetector::new();
        assert_eq!(detector.days_until_deadline("send it by 06/12/2024", now()), Some(2));
        assert_eq!(detector.days_until_deadline("Deadline: 6/11/24", now()), Some(1));
        assert_eq!(detector.days_until_deadline("due 06/20/2024", now()), Some(10));
        assert_eq!(detector.days_until_deadline("no dates here", now()), None);
        assert_eq!(detector.days_until_deadline("by 13/45/2024", now()), None);
        assert_eq!(
            detector.days_until_deadline("ref by 13/45/2024, real due 06/11/2024", now()),
            Some(1)
        );

        let soon = EmailData::new("1", "a@b.com", "Report", "please send by 06/12/2024");
        assert!(labels(&soon).contains(&"⏰ Due in 2 days".to_string()));

        let later = EmailData::new("1", "a@b.com", "Report", "please send by 06/20/2024");
        assert!(!labels(&later).iter().any(|l| l.starts_with('⏰')));

        let past = EmailData::new("1", "a@b.com", "Report", "was due 01/01/2020");
        assert!(!labels(&past).iter().any(|l| l.starts_with('⏰')));
    }

    #[test]
    fn test_attachment_vip_and_follow_up() {
        let email = EmailData::new("1", "CEO@corp.com", "Re: plan", "")
            .with_attachments(true);
        let result = labels(&email);
        assert!(result.contains(&ATTACHMENT_LABEL.to_string()));
        assert!(result.contains(&VIP_LABEL.to_string()));
        assert!(result.contains(&FOLLOW_UP_LABEL.to_string()));

        let email = EmailData::new("1", "a@b.com", "Status", "Just following up on this");
        assert_eq!(labels(&email), vec![FOLLOW_UP_LABEL.to_string()]);
    }

    #[test]
    fn test_plain_email_has_no_labels() {
        let email = EmailData::new("1", "a@b.com", "Hello", "Nice to meet you");
        assert!(labels(&email).is_empty());
        assert!(labels(&EmailData::default()).is_empty());
    }

    #[test]
    fn test_custom_vip_markers() {
        let config = LabelConfig {
            vip_markers: vec!["founder@".to_string()],
            ..LabelConfig::default()
        };
        let detector = LabelDetector::from_config(&config);
        let email = EmailData::new("1", "founder@startup.io", "Hi", "");
        assert_eq!(detector.detect_labels(&email, now()), vec![VIP_LABEL.to_string()]);
    }
}
