//! Single-file-component section handling.
//!
//! A generated artifact is one text blob with a `<template>` section, a
//! `<script>` section, and optional `<style>` sections. This module extracts
//! and splices sections and runs the grammar check that drives the
//! validate-repair loop. Section work is regex-based on purpose: it must
//! operate on content that a structural parser would reject.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TEMPLATE_FULL_RE: Regex =
        Regex::new(r"(?is)(<template[^>]*>)([\s\S]*?)(</template>)").unwrap();
    static ref TEMPLATE_OPEN_RE: Regex = Regex::new(r"(?i)<template[^>]*>").unwrap();
    static ref SCRIPT_FULL_RE: Regex =
        Regex::new(r"(?is)<script\b[^>]*>([\s\S]*?)</script>").unwrap();
    static ref SCRIPT_OPEN_RE: Regex = Regex::new(r"(?i)<script\b[^>]*>").unwrap();
    static ref STYLE_FULL_RE: Regex =
        Regex::new(r"(?is)<style[^>]*>([\s\S]*?)</style>").unwrap();
    static ref STYLE_OPEN_RE: Regex = Regex::new(r"(?i)<style[^>]*>").unwrap();
    /// Imports written against the generator's habit of absolute-ish paths.
    static ref SRC_IMPORT_RE: Regex =
        Regex::new(r#"from\s+['"]src/components/([^'"]+)['"]"#).unwrap();
}

// Grammar error codes.
pub const ERR_NO_TEMPLATE: &str = "SFC001";
pub const ERR_UNTERMINATED_SECTION: &str = "SFC002";
pub const ERR_ILL_NESTED_TEMPLATE: &str = "SFC003";

/// A failed grammar check.
#[derive(Debug, Clone)]
pub struct GrammarError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Extract the inner fragment of the first `<template>` section, if the
/// section is complete.
pub fn extract_template(content: &str) -> Option<String> {
    TEMPLATE_FULL_RE
        .captures(content)
        .map(|caps| caps[2].to_string())
}

/// Replace the inner fragment of the first `<template>` section, keeping the
/// section tags (and any attributes on the opener) as they were.
pub fn splice_template(content: &str, repaired: &str) -> String {
    TEMPLATE_FULL_RE
        .replace(content, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], repaired, &caps[3])
        })
        .to_string()
}

/// Extract the first `<script>` section body, if complete.
pub fn extract_script(content: &str) -> Option<String> {
    SCRIPT_FULL_RE.captures(content).map(|caps| caps[1].to_string())
}

/// Extract all complete `<style>` section bodies.
pub fn extract_styles(content: &str) -> Vec<String> {
    STYLE_FULL_RE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// Rewrite `src/components/...` import paths to the relative form the
/// persisted project layout expects.
pub fn normalize_import_paths(content: &str) -> String {
    SRC_IMPORT_RE
        .replace_all(content, "from './components/$1'")
        .to_string()
}

/// The single-file-component grammar check.
///
/// Fails on: no template section at all, a section opener without its
/// closer, or ill-nested markup inside the template fragment.
pub fn check_grammar(content: &str) -> Result<(), GrammarError> {
    if !TEMPLATE_OPEN_RE.is_match(content) {
        return Err(GrammarError {
            code: ERR_NO_TEMPLATE,
            message: "component has no <template> section".to_string(),
        });
    }

    for (section, open_re, full_re) in [
        ("template", &*TEMPLATE_OPEN_RE, &*TEMPLATE_FULL_RE),
        ("script", &*SCRIPT_OPEN_RE, &*SCRIPT_FULL_RE),
        ("style", &*STYLE_OPEN_RE, &*STYLE_FULL_RE),
    ] {
        let opened = open_re.find_iter(content).count();
        let complete = full_re.captures_iter(content).count();
        if opened > complete {
            return Err(GrammarError {
                code: ERR_UNTERMINATED_SECTION,
                message: format!("unterminated <{}> section", section),
            });
        }
    }

    // Openers and closers pair up, so this always succeeds here.
    if let Some(fragment) = extract_template(content) {
        if !crate::balance::is_well_nested(&fragment) {
            return Err(GrammarError {
                code: ERR_ILL_NESTED_TEMPLATE,
                message: "template markup is not well-nested".to_string(),
            });
        }
    }

    Ok(())
}
