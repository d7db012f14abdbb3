// Shared prompt fragments.
// Each stage agent keeps its own prompts in agents/prompts.rs; this file only
// holds the cross-cutting pieces appended to every structured request.

/// Appended to every stage's system prompt.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Builds a system prompt from a stage's role description.
pub fn with_json_only(role: &str) -> String {
    format!("{role}\n\n{JSON_ONLY_INSTRUCTION}")
}
