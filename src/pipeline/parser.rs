use serde::de::DeserializeOwned;

/// Result of trying to parse one stage's model response. The fallback path
/// carries the reason so tests can force either branch deterministically.
#[derive(Debug)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Fallback(String),
}

impl<T> ParseOutcome<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Locate the JSON object embedded in a model response: from the first `{`
/// to its balanced closing `}`. Anything outside the braces (explanatory
/// prose the model may prepend or append) is ignored. If the braces never
/// balance, falls back to the span up to the last `}` in the response.
pub fn locate_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let tail = &response[start..];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in tail.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    // Unbalanced braces — try the widest span ending at the last `}`.
    response
        .rfind('}')
        .filter(|end| *end > start)
        .map(|end| &response[start..=end])
}

/// Locate and decode the JSON object in a stage response. Any failure (no
/// braces, malformed JSON, schema mismatch) yields the fallback outcome.
pub fn parse_stage_json<T: DeserializeOwned>(response: &str) -> ParseOutcome<T> {
    let Some(json) = locate_json_object(response) else {
        return ParseOutcome::Fallback("no JSON object in response".into());
    };

    match serde_json::from_str(json) {
        Ok(value) => ParseOutcome::Parsed(value),
        Err(e) => ParseOutcome::Fallback(format!("JSON decoding failed: {e}")),
    }
}
