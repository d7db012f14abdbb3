//! Stage agents — the six pipeline capabilities plus the candidate advisor.
//!
//! Every agent follows the same shape: build a prompt from its projection,
//! call the backend through `TextGenerator`, run the reply through the
//! three-tier parser, then conform it to the stage default. Backend and parse
//! failures never leave the agent; they become a fallback `StageResult`.

use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::llm_client::parse::parse_structured;
use crate::llm_client::TextGenerator;
use crate::pipeline::{Stage, StageAgents, StageResult};
use crate::store::CandidateStore;

pub mod advisor;
pub mod analyzer;
pub mod document;
pub mod enhancer;
pub mod extractor;
pub mod matcher;
pub mod prompts;
pub mod recommender;
pub mod screener;

pub use advisor::CandidateAdvisor;
pub use document::{DocumentExtractor, FileTextExtractor};

/// Wires one agent per stage against a single backend.
pub fn build_stage_agents(
    llm: Arc<dyn TextGenerator>,
    store: Arc<dyn CandidateStore>,
    documents: Arc<dyn DocumentExtractor>,
) -> StageAgents {
    StageAgents {
        extractor: Arc::new(extractor::ExtractorAgent::new(llm.clone(), documents)),
        enhancer: Arc::new(enhancer::EnhancerAgent::new(llm.clone())),
        analyzer: Arc::new(analyzer::AnalyzerAgent::new(llm.clone())),
        matcher: Arc::new(matcher::MatcherAgent::new(llm.clone(), store)),
        screener: Arc::new(screener::ScreenerAgent::new(llm.clone())),
        recommender: Arc::new(recommender::RecommenderAgent::new(llm)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared call + shaping helpers
// ────────────────────────────────────────────────────────────────────────────

/// Calls the backend and parses the reply. `Err` carries the fallback reason.
pub(crate) async fn structured_call(
    llm: &dyn TextGenerator,
    label: &str,
    system: &str,
    prompt: &str,
) -> Result<Value, String> {
    let text = llm.generate(system, prompt).await.map_err(|e| {
        warn!("{label}: backend call failed: {e}");
        format!("backend error: {e}")
    })?;

    let (value, tier) = parse_structured(&text).map_err(|e| {
        warn!("{label}: {e}");
        format!("unparseable reply: {e}")
    })?;
    debug!("{label}: reply parsed ({tier:?})");
    Ok(value)
}

/// Full call for a stage whose result is its default shape filled from the
/// reply. Never fails: every problem turns into the tagged default.
pub(crate) async fn conformed_stage_call(
    llm: &dyn TextGenerator,
    stage: Stage,
    system: &str,
    prompt: &str,
) -> StageResult {
    let default = stage.default_section();
    match structured_call(llm, stage.name(), system, prompt).await {
        Ok(Value::Object(parsed)) if carries_fields(&default, &parsed) => {
            StageResult::new(conform_map(&default, &parsed))
        }
        Ok(Value::Object(_)) => {
            warn!("{stage}: reply carried no stage fields");
            StageResult::fallback(stage, "reply carried no stage fields")
        }
        Ok(_) => StageResult::fallback(stage, "reply was not a JSON object"),
        Err(reason) => StageResult::fallback(stage, reason),
    }
}

/// A parsed reply counts as a result only when it names at least one of the
/// expected keys and is not an `{"error": ...}` envelope.
pub(crate) fn carries_fields(expected: &Map<String, Value>, parsed: &Map<String, Value>) -> bool {
    !parsed.contains_key("error") && expected.keys().any(|key| parsed.contains_key(key))
}

/// Shapes `parsed` against `default`:
/// - every default key is present in the output;
/// - a parsed value wins only when its JSON type matches the default's
///   (numeric strings such as `"85"` or `"85%"` count as numbers);
/// - nested objects conform recursively, except that an empty default
///   object accepts any object;
/// - keys the default does not name are dropped.
///
/// `None` when `parsed` is not an object at all.
pub(crate) fn conform(default: &Map<String, Value>, parsed: &Value) -> Option<Map<String, Value>> {
    parsed.as_object().map(|parsed| conform_map(default, parsed))
}

pub(crate) fn conform_map(default: &Map<String, Value>, parsed: &Map<String, Value>) -> Map<String, Value> {
    default
        .iter()
        .map(|(key, fallback)| {
            let value = parsed
                .get(key)
                .and_then(|candidate| conform_value(fallback, candidate))
                .unwrap_or_else(|| fallback.clone());
            (key.clone(), value)
        })
        .collect()
}

fn conform_value(default: &Value, candidate: &Value) -> Option<Value> {
    match (default, candidate) {
        (Value::String(_), Value::String(_))
        | (Value::Bool(_), Value::Bool(_))
        | (Value::Array(_), Value::Array(_))
        | (Value::Number(_), Value::Number(_)) => Some(candidate.clone()),
        (Value::Number(_), Value::String(s)) => numeric_string(s).map(Value::Number),
        (Value::Object(d), Value::Object(_)) if d.is_empty() => Some(candidate.clone()),
        (Value::Object(d), Value::Object(_)) => conform(d, candidate).map(Value::Object),
        _ => None,
    }
}

fn numeric_string(s: &str) -> Option<Number> {
    let s = s.trim().trim_end_matches('%').trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n.into());
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Clamps a numeric field into `[0, 100]`.
pub(crate) fn clamp_score(data: &mut Map<String, Value>, key: &str) {
    let clamped = match data.get(key) {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Value::from(i.clamp(0, 100)),
            None => n
                .as_f64()
                .and_then(|f| Number::from_f64(f.clamp(0.0, 100.0)))
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0)),
        },
        _ => return,
    };
    data.insert(key.to_string(), clamped);
}
