use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A raw email record handed to the classifier by its caller.
///
/// Every field defaults when missing or `null` in JSON input, so partial
/// records classify as weak matches instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub from: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_attachments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 / RFC 2822 strings or epoch milliseconds; anything else is dropped
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_timestamp(&v)))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    let parsed = match value {
        Value::Null => return None,
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .or_else(|_| DateTime::parse_from_rfc2822(text))
            .ok(),
        Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|ts| ts.fixed_offset()),
        _ => None,
    };
    if parsed.is_none() {
        log::warn!("Ignoring unparseable email timestamp: {}", value);
    }
    parsed
}

impl EmailData {
    pub fn new(id: &str, from: &str, subject: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_attachments(mut self, has_attachments: bool) -> Self {
        self.has_attachments = has_attachments;
        self
    }

    /// Parse one record, degrading to an empty email (keeping its id when
    /// readable) if the record does not have the expected shape
    pub fn from_value_lenient(value: Value) -> Self {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match serde_json::from_value(value) {
            Ok(email) => email,
            Err(e) => {
                log::warn!("Malformed email record '{}': {}", id, e);
                Self {
                    id,
                    ..Default::default()
                }
            }
        }
    }

    /// Subject and body joined, lowercased for substring matching
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.subject, self.body).to_lowercase()
    }

    /// Hour of day in the timestamp's own offset
    pub fn local_hour(&self) -> Option<u32> {
        self.timestamp.map(|ts| ts.hour())
    }
}
