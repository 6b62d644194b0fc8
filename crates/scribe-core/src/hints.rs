use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseHint {
    pub phrase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
}

/// Build phrase hints from the hints argument.
///
/// Accepts a JSON array whose items are strings or `{"phrase", "boost"}`
/// objects, or falls back to a comma-separated list. `default_boost` applies to
/// every phrase that does not carry its own boost.
pub fn parse_phrase_hints(hints: &str, default_boost: Option<f32>) -> Vec<PhraseHint> {
    let trimmed = hints.trim();
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            Ok(items) => {
                return items
                    .iter()
                    .filter_map(|item| json_hint(item, default_boost))
                    .collect();
            }
            Err(e) => {
                tracing::warn!("phrase hints look like JSON but failed to parse: {e}");
            }
        }
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|phrase| PhraseHint {
            phrase: phrase.to_string(),
            boost: default_boost,
        })
        .collect()
}

fn json_hint(item: &serde_json::Value, default_boost: Option<f32>) -> Option<PhraseHint> {
    if let Some(phrase) = item.as_str() {
        return Some(PhraseHint {
            phrase: phrase.to_string(),
            boost: default_boost,
        });
    }

    let Some(phrase) = item.get("phrase").and_then(|v| v.as_str()) else {
        tracing::warn!("skipping phrase hint without a phrase: {item}");
        return None;
    };
    let boost = item
        .get("boost")
        .and_then(|v| v.as_f64())
        .map(|b| b as f32)
        .or(default_boost);
    Some(PhraseHint {
        phrase: phrase.to_string(),
        boost,
    })
}
