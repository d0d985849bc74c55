//! Root artifact assembly.
//!
//! The root is the only artifact rewritten against the final set of
//! persisted names: imports of known components are normalized to the
//! canonical relative path, imports of unknown ones are dropped line by
//! line, and usage tags of unknown components are excised outright. The
//! persisted root therefore never references a name absent from the final
//! artifact set.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

lazy_static! {
    static ref VUE_IMPORT_RE: Regex = Regex::new(
        r#"import\s+([A-Za-z_][A-Za-z0-9_]*)\s+from\s+['"][^'"]*?([A-Za-z_][A-Za-z0-9_]*)\.vue['"]"#
    )
    .unwrap();
    static ref IMPORT_LINE_RE: Regex =
        Regex::new(r#"^\s*import\s+([A-Za-z_][A-Za-z0-9_]*)\s+from\s+['"].*\.vue['"]"#).unwrap();
    static ref USAGE_TAG_RE: Regex = Regex::new(r"<([A-Z][A-Za-z0-9]*)\b").unwrap();
}

/// Rewrite the root artifact content against the final `generated` set.
pub fn assemble(content: &str, generated: &HashSet<String>) -> String {
    let normalized = normalize_known_imports(content, generated);
    let kept = drop_unknown_imports(&normalized, generated);
    excise_unknown_tags(&kept, generated)
}

/// Canonicalize every import of a known component to
/// `./components/<Name>.vue`, whatever path the generator wrote.
fn normalize_known_imports(content: &str, generated: &HashSet<String>) -> String {
    VUE_IMPORT_RE
        .replace_all(content, |caps: &regex::Captures| {
            let binding = &caps[1];
            let target = &caps[2];
            if generated.contains(target) {
                format!("import {} from './components/{}.vue'", binding, target)
            } else {
                caps[0].to_string()
            }
        })
        .to_string()
}

/// Drop any import line whose target component does not exist.
fn drop_unknown_imports(content: &str, generated: &HashSet<String>) -> String {
    content
        .lines()
        .filter(|line| {
            if let Some(caps) = IMPORT_LINE_RE.captures(line) {
                let keep = generated.contains(&caps[1]);
                if !keep {
                    warn!(component = &caps[1], "dropping import of missing component");
                }
                keep
            } else {
                true
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove usage tags of unknown components: paired open/close tags together
/// with everything between them, then self-closing forms, then any leftover
/// unpaired tags. A blunt textual excision, not a reflow.
fn excise_unknown_tags(content: &str, generated: &HashSet<String>) -> String {
    let mut used: Vec<String> = USAGE_TAG_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect();
    used.sort();
    used.dedup();

    let mut result = content.to_string();
    for tag in used.into_iter().filter(|t| !generated.contains(t)) {
        warn!(component = %tag, "removing usage of missing component from root");
        let escaped = regex::escape(&tag);
        let paired = Regex::new(&format!(r"(?s)<{}\b[^>]*>.*?</{}>", escaped, escaped)).unwrap();
        let self_closing = Regex::new(&format!(r"<{}\b[^>]*/>", escaped)).unwrap();
        let open = Regex::new(&format!(r"<{}\b[^>]*>", escaped)).unwrap();
        let close = Regex::new(&format!(r"</{}>", escaped)).unwrap();
        result = paired.replace_all(&result, "").to_string();
        result = self_closing.replace_all(&result, "").to_string();
        result = open.replace_all(&result, "").to_string();
        result = close.replace_all(&result, "").to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const ROOT: &str = "<template>\n  <div>\n    <Header title=\"Sales\" />\n    <Sidebar width=\"200\">\n      <p>nav</p>\n    </Sidebar>\n    <Footer></Footer>\n  </div>\n</template>\n<script setup>\nimport Header from './Header.vue';\nimport Sidebar from './Sidebar.vue';\nimport Footer from 'src/components/Footer.vue';\n</script>\n";

    #[test]
    fn known_imports_are_canonicalized() {
        let out = assemble(ROOT, &names(&["Header", "Sidebar", "Footer"]));
        assert!(out.contains("import Header from './components/Header.vue'"));
        assert!(out.contains("import Footer from './components/Footer.vue'"));
    }

    #[test]
    fn unknown_imports_and_tags_are_removed() {
        let out = assemble(ROOT, &names(&["Header", "Footer"]));
        assert!(!out.contains("Sidebar"));
        // the excision is blunt: the inner nav paragraph goes with it
        assert!(!out.contains("<p>nav</p>"));
        assert!(out.contains("<Header title=\"Sales\" />"));
        assert!(out.contains("<Footer></Footer>"));
    }

    #[test]
    fn leftover_unpaired_tags_are_still_excised() {
        let root = "<template><Chart data=\"d\"></template>\n";
        let out = assemble(root, &names(&[]));
        assert!(!out.contains("Chart"));
    }

    #[test]
    fn content_without_references_is_untouched_apart_from_line_endings() {
        let root = "<template><div>static</div></template>";
        assert_eq!(assemble(root, &names(&[])), root);
    }
}
