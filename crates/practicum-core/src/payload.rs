//! Defensive parsing of completion payloads.
//!
//! Models return loosely shaped JSON. These intermediate structures accept
//! the common spellings and wrappers; anything else is a
//! `CompletionError::Validation`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::CompletionError;
use crate::traits::extract_json_payload;

/// A question record as the model wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuestion {
    #[serde(alias = "question", alias = "prompt")]
    pub text: String,
    #[serde(rename = "type", alias = "questionType", alias = "question_type")]
    pub question_type: Option<String>,
    #[serde(alias = "topic", alias = "skill")]
    pub category: Option<String>,
    pub difficulty: Option<String>,
    #[serde(alias = "sampleAnswer", alias = "answer", alias = "expectedAnswer")]
    pub sample_answer: Option<String>,
    pub explanation: Option<String>,
    #[serde(alias = "resources")]
    pub links: Vec<Value>,
}

impl RawQuestion {
    /// Link entries may be plain URLs or `{ "url": ... }` objects.
    pub fn link_urls(&self) -> Vec<String> {
        self.links
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(map) => map
                    .get("url")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// An evaluation object as the model wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEvaluation {
    #[serde(alias = "overallScore", alias = "overall_score")]
    pub score: Option<f64>,
    #[serde(alias = "assessed_proficiency", alias = "proficiency")]
    pub assessed_proficiency: Option<String>,
    #[serde(alias = "category_scores")]
    pub category_scores: BTreeMap<String, f64>,
    #[serde(alias = "type_scores")]
    pub type_scores: BTreeMap<String, f64>,
    pub feedback: Option<String>,
    pub recommendations: Vec<String>,
}

/// Parse a generation response into question records.
///
/// Accepts a bare array, or an object carrying the array under `questions`
/// or `data`. An empty array is a failure.
pub fn parse_questions(response: &str) -> Result<Vec<RawQuestion>, CompletionError> {
    let value = parse_value(response)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match ["questions", "data"]
            .iter()
            .find_map(|key| map.remove(*key))
        {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CompletionError::Validation(
                    "object has no `questions` or `data` array".into(),
                ))
            }
        },
        _ => {
            return Err(CompletionError::Validation(
                "expected a JSON array of questions".into(),
            ))
        }
    };

    if items.is_empty() {
        return Err(CompletionError::Validation("question array is empty".into()));
    }

    // Malformed entries are skipped; the generator tops up from the fallback.
    let questions: Vec<RawQuestion> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(RawQuestion {
                text,
                ..Default::default()
            }),
            other => serde_json::from_value(other).ok(),
        })
        .collect();

    if questions.is_empty() {
        return Err(CompletionError::Validation(
            "no question record could be decoded".into(),
        ));
    }
    Ok(questions)
}

/// Parse an evaluation response into a score object.
///
/// Accepts a bare object, an object nested under `evaluation`, `data` or
/// `result`, or a single-element array holding the object.
pub fn parse_evaluation(response: &str) -> Result<RawEvaluation, CompletionError> {
    let value = parse_value(response)?;

    let object = match value {
        Value::Object(mut map) => {
            let wrapper = ["evaluation", "data", "result"]
                .into_iter()
                .find(|key| matches!(map.get(*key), Some(Value::Object(_))));
            match wrapper.and_then(|key| map.remove(key)) {
                Some(nested) => nested,
                None => Value::Object(map),
            }
        }
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        _ => {
            return Err(CompletionError::Validation(
                "expected a JSON object with a score".into(),
            ))
        }
    };

    let raw: RawEvaluation = serde_json::from_value(object)
        .map_err(|e| CompletionError::Validation(format!("malformed evaluation: {e}")))?;

    match raw.score {
        None => Err(CompletionError::Validation("evaluation has no score".into())),
        Some(score) if !score.is_finite() => Err(CompletionError::Validation(format!(
            "evaluation score is not finite: {score}"
        ))),
        Some(_) => Ok(raw),
    }
}

fn parse_value(response: &str) -> Result<Value, CompletionError> {
    let payload = extract_json_payload(response);
    if payload.is_empty() {
        return Err(CompletionError::Validation("empty response".into()));
    }
    serde_json::from_str(payload)
        .map_err(|e| CompletionError::Validation(format!("response is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_of_questions() {
        let input = r#"[
            {"text": "What is a trait?", "type": "concepts", "category": "Rust"},
            {"question": "Reverse a list", "questionType": "coding", "sampleAnswer": "Use iter().rev()"}
        ]"#;
        let qs = parse_questions(input).unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].question_type.as_deref(), Some("concepts"));
        assert_eq!(qs[1].text, "Reverse a list");
        assert_eq!(qs[1].sample_answer.as_deref(), Some("Use iter().rev()"));
    }

    #[test]
    fn wrapped_under_questions_or_data() {
        let wrapped = r#"{"questions": [{"text": "A"}]}"#;
        assert_eq!(parse_questions(wrapped).unwrap().len(), 1);

        let data = "```json\n{\"data\": [{\"text\": \"B\"}, \"C as plain string\"]}\n```";
        let qs = parse_questions(data).unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[1].text, "C as plain string");
    }

    #[test]
    fn other_shapes_are_failures() {
        assert!(parse_questions(r#"{"items": [{"text": "A"}]}"#).is_err());
        assert!(parse_questions("[]").is_err());
        assert!(parse_questions("\"just a string\"").is_err());
        assert!(parse_questions("not json at all").is_err());
        assert!(parse_questions("").is_err());
        assert!(parse_questions("[1, 2, 3]").is_err());
    }

    #[test]
    fn link_objects_and_strings() {
        let input = r#"[{"text": "Q", "links": ["https://a.dev", {"url": "https://b.dev", "title": "B"}, 7]}]"#;
        let qs = parse_questions(input).unwrap();
        assert_eq!(
            qs[0].link_urls(),
            vec!["https://a.dev".to_string(), "https://b.dev".to_string()]
        );
    }

    #[test]
    fn evaluation_object_variants() {
        let bare = r#"{"score": 72.4, "feedback": "Solid", "categoryScores": {"Rust": 80}}"#;
        let raw = parse_evaluation(bare).unwrap();
        assert_eq!(raw.score, Some(72.4));
        assert_eq!(raw.category_scores.get("Rust"), Some(&80.0));

        let nested = r#"{"evaluation": {"overallScore": 60, "type_scores": {"coding": 50}}}"#;
        let raw = parse_evaluation(nested).unwrap();
        assert_eq!(raw.score, Some(60.0));
        assert_eq!(raw.type_scores.get("coding"), Some(&50.0));

        let array = r#"[{"score": 10}]"#;
        assert_eq!(parse_evaluation(array).unwrap().score, Some(10.0));
    }

    #[test]
    fn evaluation_without_score_fails() {
        assert!(parse_evaluation(r#"{"feedback": "nice"}"#).is_err());
        assert!(parse_evaluation(r#"[{"score": 1}, {"score": 2}]"#).is_err());
        assert!(parse_evaluation(r#"{"score": "high"}"#).is_err());
    }
}
