//! Stack-based tag-nesting repair for template fragments.
//!
//! Generators frequently emit mismatched or truncated markup. `balance` is a
//! best-effort syntactic closer, not a semantic fixer: it guarantees a
//! well-nested result without guessing author intent.
//!
//! Invariants:
//! 1. Open tags are reproduced verbatim, attributes and casing included.
//! 2. A close tag pops to its nearest matching open; tags opened in between
//!    are closed implicitly before it.
//! 3. A close tag with no matching open ancestor is dropped.
//! 4. Anything still open at end of input is closed in LIFO order.
//! 5. Idempotent: `balance(balance(f).repaired).was_modified == false`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// One markup token: optional `/` marker, tag name, raw attribute text.
    /// Quoted attribute values may contain `>`.
    static ref TAG_RE: Regex =
        Regex::new(r#"(?s)<(/?)([A-Za-z][A-Za-z0-9.-]*)((?:"[^"]*"|'[^']*'|[^>"'])*)>"#).unwrap();
}

/// HTML void elements: never pushed on the open stack.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| name.eq_ignore_ascii_case(v))
}

/// Result of one balancing pass.
#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub repaired: String,
    pub was_modified: bool,
}

/// Repair tag nesting in a template fragment.
pub fn balance(fragment: &str) -> BalanceOutcome {
    let mut out = String::with_capacity(fragment.len() + 16);
    let mut stack: Vec<String> = Vec::new();
    let mut modified = false;
    let mut cursor = 0;

    for caps in TAG_RE.captures_iter(fragment) {
        let token = caps.get(0).unwrap();
        // Text between tokens is emitted verbatim.
        out.push_str(&fragment[cursor..token.start()]);
        cursor = token.end();

        let closing = !caps[1].is_empty();
        let name = &caps[2];
        let attrs = &caps[3];

        if !closing {
            out.push_str(token.as_str());
            let self_closing = attrs.trim_end().ends_with('/');
            if !self_closing && !is_void_element(name) {
                stack.push(name.to_string());
            }
            continue;
        }

        match stack.iter().rposition(|open| open.eq_ignore_ascii_case(name)) {
            Some(pos) => {
                // Implicitly close anything opened after the match.
                while stack.len() > pos + 1 {
                    let inner = stack.pop().unwrap();
                    out.push_str(&format!("</{}>", inner));
                    modified = true;
                }
                stack.pop();
                out.push_str(&format!("</{}>", name));
            }
            None => {
                // Stray close tag with no open ancestor: drop it.
                modified = true;
            }
        }
    }

    out.push_str(&fragment[cursor..]);

    // Close whatever survived to end of input, innermost first.
    while let Some(name) = stack.pop() {
        out.push_str(&format!("</{}>", name));
        modified = true;
    }

    BalanceOutcome {
        repaired: out,
        was_modified: modified,
    }
}

/// True when a fragment is already well-nested, i.e. balancing would be a
/// no-op.
pub fn is_well_nested(fragment: &str) -> bool {
    !balance(fragment).was_modified
}
