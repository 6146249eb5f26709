// Sanitize free-text task input before sending it to the LLM.
// Removes invisible Unicode, drops prompt-injection lines, bounds length.

/// Maximum input length to embed in a prompt (characters).
const MAX_INPUT_CHARS: usize = 2_000;

/// Sanitize task input for LLM consumption: strip invisible characters,
/// remove injection-style lines, normalize whitespace, and truncate.
pub fn sanitize_input(raw: &str) -> String {
    let cleaned = remove_invisible_chars(raw);
    let (no_injection, removed) = remove_injection_lines(&cleaned);

    if removed > 0 {
        tracing::warn!(
            removed_lines = removed,
            "injection patterns removed from task input"
        );
    }

    let normalized = normalize_whitespace(&no_injection);
    truncate_chars(&normalized, MAX_INPUT_CHARS)
}

/// Remove zero-width and directional formatting characters that could
/// manipulate LLM behavior. Preserves standard whitespace.
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t' | '\r') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' // zero-width chars, directional marks
                | '\u{202A}'..='\u{202E}' // directional embedding/override
                | '\u{2060}'..='\u{2064}' // word joiner, invisible operators
                | '\u{FEFF}' // BOM
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

/// Check if a lowercased line looks like a role marker or override attempt.
fn is_injection_line(trimmed: &str) -> bool {
    trimmed.starts_with("system:")
        || trimmed.starts_with("assistant:")
        || trimmed.starts_with("user:")
        || trimmed.starts_with("[system]")
        || trimmed.starts_with("[inst]")
        || trimmed.starts_with("new instructions:")
        || trimmed.contains("ignore previous instructions")
        || trimmed.contains("ignore all instructions")
        || trimmed.contains("disregard your instructions")
        || trimmed.starts_with("</input")
        || trimmed.starts_with("<system")
}

/// Drop lines matching injection patterns. Returns (cleaned, removed_count).
fn remove_injection_lines(text: &str) -> (String, usize) {
    let mut result = String::with_capacity(text.len());
    let mut removed = 0usize;

    for line in text.lines() {
        if is_injection_line(&line.trim().to_lowercase()) {
            removed += 1;
            continue;
        }
        result.push_str(line);
        result.push('\n');
    }

    (result, removed)
}

/// Collapse runs of blank lines and trim trailing whitespace per line.
fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let trimmed_end = line.trim_end();
        if trimmed_end.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        result.push_str(trimmed_end);
        result.push('\n');
    }

    result.trim().to_string()
}

/// Truncate to a maximum number of characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
