use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::SUCCESS_STATUS;

/// Identifier as GitLab sends it: commit shas are strings, pipeline ids numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    /// Empty strings and zero are treated as absent.
    fn into_present(self) -> Option<String> {
        match self {
            Self::Number(0) => None,
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(s),
        }
    }
}

// Informational fields never fail an element: an unreadable value is `None`
// so the id still decodes.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_str().map(str::to_owned)))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_string(deserializer)?;
    Ok(raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()))
}

fn lenient_utc_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_timestamp(deserializer)?.map(|t| t.with_timezone(&Utc)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub committed_date: Option<DateTime<FixedOffset>>,
}

impl Commit {
    pub fn sha(&self) -> Option<String> {
        self.id.clone().and_then(RawId::into_present)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_utc_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn pipeline_id(&self) -> Option<String> {
        self.id.clone().and_then(RawId::into_present)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Job {
    /// Both conditions are required; a matching name alone does not qualify.
    pub fn is_baseline_match(&self, prefix: &str) -> bool {
        self.name.as_deref().unwrap_or("").starts_with(prefix)
            && self.status.as_deref() == Some(SUCCESS_STATUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(name: &str, status: &str) -> Job {
        Job {
            name: Some(name.to_string()),
            status: Some(status.to_string()),
        }
    }

    #[test]
    fn test_prefix_match() {
        assert!(job("a750-vk", "success").is_baseline_match("a750-vk"));
        assert!(job("a750-vk-extra", "success").is_baseline_match("a750-vk"));
        assert!(!job("a750", "success").is_baseline_match("a750-vk"));
    }

    #[test]
    fn test_prefix_match_requires_success() {
        assert!(!job("a750-vk", "failed").is_baseline_match("a750-vk"));
        assert!(!Job::default().is_baseline_match("a750-vk"));
    }

    #[test]
    fn test_pipeline_numeric_id() {
        let pipeline: Pipeline = serde_json::from_value(json!({
            "id": 1234,
            "status": "success",
            "updated_at": "2024-05-01T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(pipeline.pipeline_id(), Some("1234".to_string()));
        assert!(pipeline.updated_at.is_some());
    }

    #[test]
    fn test_missing_or_empty_ids_are_absent() {
        let commit: Commit = serde_json::from_value(json!({ "id": "" })).unwrap();
        assert_eq!(commit.sha(), None);

        let commit: Commit = serde_json::from_value(json!({ "title": "no id" })).unwrap();
        assert_eq!(commit.sha(), None);

        let pipeline: Pipeline = serde_json::from_value(json!({ "id": 0 })).unwrap();
        assert_eq!(pipeline.pipeline_id(), None);
    }

    #[test]
    fn test_unreadable_timestamps_keep_the_id() {
        let commit: Commit = serde_json::from_value(json!({
            "id": "abc",
            "committed_date": "2024-05-01"
        }))
        .unwrap();
        assert_eq!(commit.sha(), Some("abc".to_string()));
        assert!(commit.committed_date.is_none());

        let pipeline: Pipeline = serde_json::from_value(json!({
            "id": 10,
            "status": 7,
            "updated_at": "2024-05-01 10:00:00 UTC"
        }))
        .unwrap();
        assert_eq!(pipeline.pipeline_id(), Some("10".to_string()));
        assert!(pipeline.status.is_none());
        assert!(pipeline.updated_at.is_none());
    }

    #[test]
    fn test_commit_date_keeps_offset() {
        let commit: Commit = serde_json::from_value(json!({
            "id": "abc123",
            "committed_date": "2024-05-01T12:00:00.000+02:00"
        }))
        .unwrap();
        assert_eq!(commit.sha(), Some("abc123".to_string()));
        assert_eq!(
            commit.committed_date.unwrap().with_timezone(&Utc).to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
    }
}
