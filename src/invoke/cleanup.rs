//! Salvage a JSON value out of chatty model output.

use regex::Regex;
use serde_json::Value;

/// Strip markdown fences and parse the outermost JSON object or array
pub fn extract_json(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("response is empty".to_string());
    }

    // Fenced blocks first; a model often explains itself around the payload
    for block in fenced_blocks(trimmed) {
        if let Some(value) = parse_outermost(&block) {
            return Ok(value);
        }
    }

    parse_outermost(trimmed).ok_or_else(|| "no parseable JSON object or array found".to_string())
}

fn fenced_blocks(s: &str) -> Vec<String> {
    let re = match Regex::new(r"```(?:[A-Za-z0-9_-]+)?[ \t]*\n?([\s\S]*?)\n?```") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    re.captures_iter(s)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

fn parse_outermost(s: &str) -> Option<Value> {
    let span = outermost_span(s)?;
    serde_json::from_str::<Value>(span).ok()
}

/// Locate the first `{` or `[` and its matching closer, skipping string contents
pub fn outermost_span(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&s[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_passes_through() {
        let value = extract_json(r#"{"cases": []}"#).unwrap();
        assert!(value["cases"].is_array());
    }

    #[test]
    fn test_markdown_fence_stripped() {
        let raw = "Here you go:\n\n```json\n{\"items\": [{\"title\": \"Login\"}]}\n```\nLet me know!";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["items"][0]["title"], "Login");
    }

    #[test]
    fn test_bare_array_with_prose() {
        let raw = "Sure. [{\"title\": \"a\"}, {\"title\": \"b\"}] Hope that helps.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let raw = r#"prefix {"summary": "use {curly} and ] brackets", "feedback": []} trailing }"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["summary"], "use {curly} and ] brackets");
    }

    #[test]
    fn test_unbalanced_fails() {
        assert!(extract_json("{\"cases\": [").is_err());
        assert!(extract_json("no json at all").is_err());
        assert!(extract_json("   ").is_err());
    }
}
