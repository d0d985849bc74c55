//! Project spec model and the tolerant payload parser.
//!
//! The generator's reply is an untrusted text blob. Locating the spec inside
//! it is a three-step pipeline: strip surrounding code fences, find the first
//! top-level brace-delimited object with a string-aware balanced scan, then
//! normalize lenient JSON (single quotes, unquoted keys, trailing commas)
//! into strict JSON before handing it to serde.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT MODEL
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable user input for one run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub description: String,
    pub style_hints: Vec<String>,
}

/// One generated source artifact. `name` is the component identifier
/// without extension; repairs replace `raw_content`, never the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSpec {
    pub name: String,
    pub raw_content: String,
}

/// The generator's unit of output. `components` preserves generation order;
/// duplicate names are possible and resolve last-write-wins when persisted.
/// `root` is absent in narrowed second-pass replies.
#[derive(Debug, Clone)]
pub struct ProjectSpec {
    pub components: Vec<ArtifactSpec>,
    pub root: Option<ArtifactSpec>,
}

// Wire format, matching the shape the system prompt requests.
#[derive(Debug, Deserialize)]
struct RawArtifact {
    filename: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawProjectPayload {
    #[serde(default)]
    components: Vec<RawArtifact>,
    app: Option<RawArtifact>,
}

impl From<RawArtifact> for ArtifactSpec {
    fn from(raw: RawArtifact) -> Self {
        ArtifactSpec {
            name: component_name(&raw.filename),
            raw_content: raw.content,
        }
    }
}

/// Normalize a filename to the extensionless component identifier.
pub fn component_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    base.trim_end_matches(".vue").to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYLOAD EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref FENCE_OPEN_RE: Regex = Regex::new(r"^```[A-Za-z0-9]*[ \t]*\r?\n?").unwrap();
    static ref FENCE_CLOSE_RE: Regex = Regex::new(r"\r?\n?```\s*$").unwrap();
}

/// Strip a surrounding Markdown code fence, if present.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let opened = FENCE_OPEN_RE.replace(trimmed, "");
    FENCE_CLOSE_RE.replace(&opened, "").to_string()
}

/// Find the end (exclusive byte offset) of the balanced object starting at
/// the `{` at `start`. String-aware: braces inside quoted strings are
/// ignored, as are escaped quotes.
fn find_balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(quote) = in_string {
            if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the first top-level brace-delimited object from raw generator
/// output, tolerating fences and commentary on either side. Returns `None`
/// when no complete object exists anywhere in the text.
pub fn extract_payload(raw: &str) -> Option<String> {
    let text = strip_code_fences(raw);
    for (idx, c) in text.char_indices() {
        if c == '{' {
            if let Some(end) = find_balanced_object_end(&text, idx) {
                return Some(text[idx..end].to_string());
            }
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// LENIENT PARSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrite lenient JSON into strict JSON: single-quoted strings become
/// double-quoted, bare object keys are quoted, and trailing commas are
/// dropped. Content inside strings is preserved.
fn normalize_lenient_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                let quote = c;
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    if d == '\\' && i + 1 < chars.len() {
                        let next = chars[i + 1];
                        if quote == '\'' && next == '\'' {
                            // \' has no meaning in strict JSON
                            out.push('\'');
                        } else {
                            out.push('\\');
                            out.push(next);
                        }
                        i += 2;
                        continue;
                    }
                    if d == quote {
                        i += 1;
                        break;
                    }
                    if quote == '\'' && d == '"' {
                        out.push('\\');
                        out.push('"');
                    } else {
                        out.push(d);
                    }
                    i += 1;
                }
                out.push('"');
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let trailing = j < chars.len() && (chars[j] == '}' || chars[j] == ']');
                if !trailing {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ':' {
                    // Unquoted object key
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Parse an extracted payload into a [`ProjectSpec`].
pub fn parse_spec(payload: &str) -> Result<ProjectSpec, AgentError> {
    let strict = normalize_lenient_json(payload);
    let raw: RawProjectPayload = serde_json::from_str(&strict)
        .map_err(|e| AgentError::SpecFormat(format!("payload is not a project spec: {}", e)))?;

    Ok(ProjectSpec {
        components: raw.components.into_iter().map(ArtifactSpec::from).collect(),
        root: raw.app.map(ArtifactSpec::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_surrounding_commentary() {
        let raw = "Sure! Here is the spec:\n```json\n{\"components\": [], \"app\": {\"filename\": \"App.vue\", \"content\": \"x\"}}\n```\nLet me know if you need anything else.";
        let payload = extract_payload(raw).expect("payload");
        assert!(payload.starts_with('{'));
        assert!(payload.ends_with('}'));
        let spec = parse_spec(&payload).unwrap();
        assert_eq!(spec.root.unwrap().name, "App");
    }

    #[test]
    fn balanced_scan_ignores_braces_in_strings() {
        let raw = r#"{"app": {"filename": "App.vue", "content": "<script>if (x) { y(); }</script>"}} trailing"#;
        let payload = extract_payload(raw).expect("payload");
        assert!(payload.ends_with("}}"));
        assert!(!payload.contains("trailing"));
    }

    #[test]
    fn tolerates_single_quotes_unquoted_keys_and_trailing_commas() {
        let payload = r#"{
            components: [
                { filename: 'Header.vue', content: '<template><div>It\'s here</div></template>', },
            ],
            app: { filename: 'App.vue', content: "ok", },
        }"#;
        let spec = parse_spec(payload).unwrap();
        assert_eq!(spec.components.len(), 1);
        assert_eq!(spec.components[0].name, "Header");
        assert!(spec.components[0].raw_content.contains("It's here"));
    }

    #[test]
    fn no_object_anywhere_yields_none() {
        assert!(extract_payload("I could not generate the dashboard, sorry.").is_none());
        assert!(extract_payload("```\nplain text fence\n```").is_none());
    }

    #[test]
    fn unbalanced_object_is_not_extracted() {
        assert!(extract_payload("{\"components\": [").is_none());
    }

    #[test]
    fn missing_app_is_allowed_for_narrowed_replies() {
        let spec = parse_spec(r#"{"components": [{"filename": "Sidebar.vue", "content": "c"}]}"#)
            .unwrap();
        assert!(spec.root.is_none());
        assert_eq!(spec.components[0].name, "Sidebar");
    }

    #[test]
    fn non_spec_object_is_a_format_error() {
        let err = parse_spec(r#"{"components": "not a list"}"#).unwrap_err();
        assert!(matches!(err, AgentError::SpecFormat(_)));
    }

    #[test]
    fn component_name_strips_path_and_extension() {
        assert_eq!(component_name("Header.vue"), "Header");
        assert_eq!(component_name("src/components/Footer.vue"), "Footer");
        assert_eq!(component_name("Chart"), "Chart");
    }
}
