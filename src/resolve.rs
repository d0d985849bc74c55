//! Cross-component reference extraction.
//!
//! Purely textual: a reference is an import-like statement naming another
//! component file, or a capitalized usage tag in the template section. This
//! must keep working on content that failed structural validation, so it
//! never parses — it scans.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `import Name from './components/Name.vue'` and close variants.
    static ref IMPORT_RE: Regex = Regex::new(
        r#"import\s+[A-Za-z_][A-Za-z0-9_]*\s+from\s+['"](?:\./components/|src/components/|\./)([A-Za-z_][A-Za-z0-9_]*)\.vue['"]"#
    )
    .unwrap();
    /// Capitalized tag-like token, the inline usage form of a reference.
    static ref USAGE_TAG_RE: Regex = Regex::new(r"<([A-Z][A-Za-z0-9]*)\b").unwrap();
}

/// Names referenced by one artifact's content.
pub fn referenced_names(content: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for caps in IMPORT_RE.captures_iter(content) {
        names.insert(caps[1].to_string());
    }

    // Usage tags are scoped to the template section when one is extractable;
    // unvalidated content falls back to a whole-text scan.
    let markup = crate::parse::extract_template(content).unwrap_or_else(|| content.to_string());
    for caps in USAGE_TAG_RE.captures_iter(&markup) {
        names.insert(caps[1].to_string());
    }

    names
}

/// Union of all references across the artifact set, minus self-references
/// and `known` names. Recomputed from scratch on every call; never patched
/// incrementally.
pub fn compute_missing(
    contents: &BTreeMap<String, String>,
    known: &HashSet<String>,
) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    for (name, content) in contents {
        for referenced in referenced_names(content) {
            if referenced != *name && !known.contains(&referenced) {
                missing.insert(referenced);
            }
        }
    }
    missing
}
