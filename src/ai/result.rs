use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::error::QueryError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub matches: Vec<Match>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: f32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub aspect: String,
}

impl MatchResult {
    pub fn ids(&self) -> BTreeSet<String> {
        self.matches.iter().map(|entry| entry.id.clone()).collect()
    }
}

/// Scores arrive as numbers or numeric strings depending on the model.
fn lenient_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let score = match &value {
        serde_json::Value::Number(number) => number.as_f64().unwrap_or(0.0),
        serde_json::Value::String(text) => text.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok((score as f32).clamp(0.0, 100.0))
}

#[derive(Clone, Debug)]
pub struct MatchEntry {
    pub score: f32,
    pub reason: String,
    pub aspect: String,
}

/// id -> score/reason lookup for restyling the working view.
#[derive(Clone, Debug, Default)]
pub struct MatchMap {
    entries: HashMap<String, MatchEntry>,
}

impl MatchMap {
    pub fn from_result(result: &MatchResult) -> Self {
        let mut entries = HashMap::with_capacity(result.matches.len());
        for entry in &result.matches {
            let candidate = MatchEntry {
                score: entry.score,
                reason: entry.reason.clone(),
                aspect: entry.aspect.clone(),
            };
            // Duplicate ids keep the best score.
            entries
                .entry(entry.id.clone())
                .and_modify(|existing: &mut MatchEntry| {
                    if candidate.score > existing.score {
                        *existing = candidate.clone();
                    }
                })
                .or_insert_with(|| candidate.clone());
        }
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&MatchEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((language, body)) if !language.contains('{') => body,
        _ => rest.trim_start_matches("json"),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parses a model reply into a match result, tolerating Markdown fences and
/// chatter around the JSON object.
pub fn parse_match_response(text: &str) -> Result<MatchResult, QueryError> {
    let stripped = strip_code_fences(text);
    if stripped.is_empty() {
        return Err(QueryError::Parse("response was empty".to_owned()));
    }

    let direct = serde_json::from_str::<MatchResult>(stripped);
    let first_error = match direct {
        Ok(result) => return Ok(result),
        Err(error) => error,
    };

    let Some(object) = outer_object(stripped) else {
        return Err(QueryError::Parse(format!("no JSON object found ({first_error})")));
    };

    serde_json::from_str::<MatchResult>(object)
        .map_err(|error| QueryError::Parse(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_json() {
        let result = parse_match_response(
            r#"{"explanation":"ok","matches":[{"id":"p_0","name":"Ada","score":80,"reason":"math","aspect":"skills"}]}"#,
        )
        .unwrap();
        assert_eq!(result.explanation, "ok");
        assert_eq!(result.matches[0].id, "p_0");
        assert_eq!(result.matches[0].score, 80.0);
    }

    #[test]
    fn test_strips_code_fences() {
        let text = "```json\n{\"explanation\":\"fenced\",\"matches\":[]}\n```";
        let result = parse_match_response(text).unwrap();
        assert_eq!(result.explanation, "fenced");
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_recovers_object_from_chatter() {
        let text = "Sure! Here are the matches:\n{\"matches\":[{\"id\":\"p_3\",\"score\":\"75\"}]}\nHope that helps.";
        let result = parse_match_response(text).unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].score, 75.0);
    }

    #[test]
    fn test_scores_are_clamped() {
        let text = r#"{"matches":[{"id":"a","score":250},{"id":"b","score":-4}]}"#;
        let result = parse_match_response(text).unwrap();
        assert_eq!(result.matches[0].score, 100.0);
        assert_eq!(result.matches[1].score, 0.0);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            parse_match_response("I could not find anyone."),
            Err(QueryError::Parse(_))
        ));
        assert!(matches!(parse_match_response("  "), Err(QueryError::Parse(_))));
        assert!(matches!(
            parse_match_response("{ not json }"),
            Err(QueryError::Parse(_))
        ));
    }

    #[test]
    fn test_match_map_keeps_best_duplicate() {
        let result = MatchResult {
            explanation: String::new(),
            matches: vec![
                Match {
                    id: "p_1".to_owned(),
                    name: String::new(),
                    score: 40.0,
                    reason: "first".to_owned(),
                    aspect: String::new(),
                },
                Match {
                    id: "p_1".to_owned(),
                    name: String::new(),
                    score: 90.0,
                    reason: "second".to_owned(),
                    aspect: String::new(),
                },
            ],
        };
        let map = MatchMap::from_result(&result);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("p_1").map(|entry| entry.reason.as_str()), Some("second"));
    }
}
