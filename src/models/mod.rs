pub mod modifiers;

use serde::{Deserialize, Serialize};

pub const MIN_PARAGRAPHS: u32 = 1;
pub const MAX_PARAGRAPHS: u32 = 5;

/// Options chosen by the reader before the first segment is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryParams {
    pub genre: String,
    pub parental_rating: String,
    pub reading_level: String,
    #[serde(deserialize_with = "deserialize_paragraphs")]
    pub paragraphs: u32,
}

impl StoryParams {
    pub fn new(
        genre: impl Into<String>,
        parental_rating: impl Into<String>,
        reading_level: impl Into<String>,
        paragraphs: i64,
    ) -> Self {
        StoryParams {
            genre: genre.into(),
            parental_rating: parental_rating.into(),
            reading_level: reading_level.into(),
            paragraphs: clamp_paragraphs(paragraphs),
        }
    }
}

pub fn clamp_paragraphs(value: i64) -> u32 {
    value.clamp(MIN_PARAGRAPHS as i64, MAX_PARAGRAPHS as i64) as u32
}

// Out-of-range and fractional counts are clamped rather than rejected.
fn deserialize_paragraphs<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    let rounded = if value.is_finite() { value.round() as i64 } else { 0 };
    Ok(clamp_paragraphs(rounded))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: u32,
    pub text: String,
}

/// One parsed LLM completion. Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySegment {
    pub text: String,
    pub goal: String,
    pub summary: String,
    pub choices: Vec<Choice>,
    pub is_ending: bool,
}

/// Persisted long-term average of LLM call durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeRecord {
    pub average_time: f64,
    pub samples: u64,
    #[serde(default = "now_rfc3339")]
    pub last_updated: String,
}

impl Default for ResponseTimeRecord {
    fn default() -> Self {
        ResponseTimeRecord {
            average_time: crate::services::response_time::DEFAULT_ESTIMATE_MS as f64,
            samples: 0,
            last_updated: now_rfc3339(),
        }
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub result: String,
    pub part_of_speech: Option<String>,
    pub definitions: Vec<String>,
    pub examples: Vec<String>,
    pub synonyms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_are_clamped() {
        assert_eq!(StoryParams::new("Adventure", "G", "Age 3-7", 0).paragraphs, 1);
        assert_eq!(StoryParams::new("Adventure", "G", "Age 3-7", 3).paragraphs, 3);
        assert_eq!(StoryParams::new("Adventure", "G", "Age 3-7", 42).paragraphs, 5);
    }

    #[test]
    fn paragraphs_are_clamped_when_deserialized() {
        let params: StoryParams = serde_json::from_str(
            r#"{"genre":"Horror","parentalRating":"PG","readingLevel":"Age 9-10","paragraphs":-3}"#,
        )
        .unwrap();
        assert_eq!(params.paragraphs, 1);

        let params: StoryParams = serde_json::from_str(
            r#"{"genre":"Horror","parentalRating":"PG","readingLevel":"Age 9-10","paragraphs":9.4}"#,
        )
        .unwrap();
        assert_eq!(params.paragraphs, 5);
    }

    #[test]
    fn story_segment_uses_camel_case_on_the_wire() {
        let segment = StorySegment {
            is_ending: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&segment).unwrap();
        assert_eq!(value["isEnding"], serde_json::json!(true));
    }
}
