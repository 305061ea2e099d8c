use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Analysis document returned by the ATS service.
///
/// The service is loosely typed and differs between deployments, so the body
/// is kept as a JSON object and read through defensive accessors. Missing or
/// mistyped fields read as `None`/empty rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    /// Fails when the body is not a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn success(&self) -> Option<bool> {
        self.0.get("success").and_then(Value::as_bool)
    }

    /// `message` is only read as an error when the body says `success: false`;
    /// otherwise it is informational.
    pub fn error_message(&self) -> Option<String> {
        match self.success() {
            Some(false) => text_field(&self.0, &["error", "message"]),
            _ => text_field(&self.0, &["error"]),
        }
    }

    /// Body reports failure either explicitly or by carrying only an error.
    pub fn is_failure(&self) -> bool {
        match self.success() {
            Some(success) => !success,
            None => self.error_message().is_some() && self.raw_score().is_none(),
        }
    }

    /// ATS score as sent. The optimizer deployment reports `after_score` and
    /// `before_score` instead of `ats_score`.
    pub fn raw_score(&self) -> Option<f64> {
        number_field(&self.0, &["ats_score", "after_score", "before_score", "score"])
    }

    pub fn score_before(&self) -> Option<f64> {
        number_field(&self.0, &["before_score"])
    }

    pub fn score_improvement(&self) -> Option<f64> {
        number_field(&self.0, &["score_improvement"])
    }

    pub fn report_url(&self) -> Option<String> {
        text_field(&self.0, &["analysis_report_url", "enhanced_resume_url", "report_url"])
    }

    pub fn resume_analysis(&self) -> Option<&Map<String, Value>> {
        self.0.get("resume_analysis").and_then(Value::as_object)
    }

    pub fn breakdown(&self) -> Option<&Map<String, Value>> {
        self.0.get("ats_breakdown").and_then(Value::as_object)
    }

    pub fn breakdown_section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.breakdown()
            .and_then(|breakdown| breakdown.get(name))
            .and_then(Value::as_object)
    }

    /// Recommendations may be plain strings or objects carrying a title and
    /// a description; both are flattened to display lines.
    pub fn recommendations(&self) -> Vec<String> {
        let Some(items) = ["recommendations", "ai_recommendations"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_array))
        else {
            return Vec::new();
        };

        items.iter().filter_map(recommendation_line).collect()
    }
}

fn recommendation_line(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => non_blank(text),
        Value::Object(map) => {
            let title = text_field(map, &["title", "category"]);
            let body = text_field(map, &["description", "recommendation", "text", "suggestion"]);
            match (title, body) {
                (Some(title), Some(body)) => Some(format!("{title}: {body}")),
                (title, body) => title.or(body),
            }
        }
        _ => None,
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First key holding a number or a numeric string.
pub fn number_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    })
}

/// First key holding a non-blank string or a number.
pub fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(text) => non_blank(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// First key holding an array; non-string entries are skipped, a single
/// comma separated string is split.
pub fn string_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| match map.get(*key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(non_blank)
                    .collect(),
            ),
            Value::String(text) => Some(text.split(',').filter_map(non_blank).collect()),
            _ => None,
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}
