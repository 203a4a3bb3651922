//! Best-effort JSON extraction from free-form model output.
//!
//! Completion models wrap their JSON in prose, markdown fences, chat-template
//! control tokens, or emit several candidate objects (e.g. an example followed
//! by the real answer). Everything here is pure string processing so it can be
//! shared by the resolver (live replies) and the replay scanner (log text).

/// Control tokens some chat templates leak into the completion text.
const CONTROL_TOKENS: &[&str] = &[
    "<|start_header_id|>assistant<|end_header_id|>",
    "<|python_tag|>",
    "<|eot_id|>",
    "<|end_of_text|>",
    "<|begin_of_text|>",
];

/// Remove known non-JSON artifacts and surrounding whitespace.
pub fn strip_artifacts(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    for token in CONTROL_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.trim().to_string()
}

/// Drop a leading markdown code fence line (```` ``` ```` or ```` ```json ````)
/// and a trailing closing fence.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = match body.find('\n') {
            Some(newline) => &body[newline + 1..],
            None => body.trim_start_matches('`'),
        };
        if let Some(stripped) = body.trim_end().strip_suffix("```") {
            body = stripped;
        }
    }
    body.trim()
}

/// Every balanced `{...}` substring, scanning left to right.
///
/// After a balanced object the scan resumes just past its closing brace, so
/// nested objects are only reported as part of their outermost parent. An
/// opening brace that is never closed is skipped and the scan continues at
/// the next byte, so a stray `{` in leading prose cannot hide a later object.
pub fn balanced_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut cursor = 0usize;

    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        let mut depth = 0usize;
        let mut end = None;

        for (pos, byte) in bytes.iter().enumerate().skip(start) {
            match byte {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(pos + 1);
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                found.push(&text[start..end]);
                cursor = end;
            }
            None => cursor = start + 1,
        }
    }

    found
}

/// Balanced objects that are valid JSON, in textual order.
pub fn json_objects(text: &str) -> Vec<&str> {
    balanced_objects(text)
        .into_iter()
        .filter(|candidate| serde_json::from_str::<serde_json::Value>(candidate).is_ok())
        .collect()
}

/// The longest valid JSON object in `text`; the earliest wins a length tie.
pub fn longest_json_object(text: &str) -> Option<&str> {
    json_objects(text)
        .into_iter()
        .fold(None, |best: Option<&str>, candidate| match best {
            Some(current) if current.len() >= candidate.len() => Some(current),
            _ => Some(candidate),
        })
}

/// Clean a raw completion into the string most likely to be the intended JSON.
///
/// Falls back to the fence-stripped text when no valid object is present, so
/// the caller still has something to log and the parse failure surfaces there.
pub fn extract_json(raw: &str) -> String {
    let cleaned = strip_artifacts(raw);
    match longest_json_object(&cleaned) {
        Some(object) => object.to_string(),
        None => strip_code_fence(&cleaned).to_string(),
    }
}

/// Valid JSON objects that carry a top-level `placements` key, in textual order.
pub fn placement_blobs(text: &str) -> Vec<&str> {
    json_objects(text)
        .into_iter()
        .filter(|candidate| {
            serde_json::from_str::<serde_json::Value>(candidate)
                .map(|value| value.get("placements").is_some())
                .unwrap_or(false)
        })
        .collect()
}
