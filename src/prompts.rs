//! Prompt construction for the generator.

use std::collections::BTreeSet;

/// System prompt: instructs the model to design the component set and reply
/// with the JSON project structure, parameterised by the style libraries.
pub fn system_prompt(style_hints: &[String]) -> String {
    let styles = style_hints
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a Vue 3 (Vite) dashboard generator using the Composition API and these style libraries: [{styles}].
When the user describes a dashboard or component set, you decide which *.vue files are needed and return valid JSON with this structure:
{{
  "components": [
    {{
      "filename": "ComponentName.vue",
      "content": "<template>...</template><script setup>...</script><style>...</style>"
    }}
  ],
  "app": {{
    "filename": "App.vue",
    "content": "<template>...</template><script setup>...</script><style>...</style>"
  }}
}}
- Each "content" must be the complete, ready-to-use file, with no Markdown fences.
- Use relative import paths (for example './components/ComponentName.vue')."#
    )
}

/// First-pass user prompt.
pub fn user_prompt(description: &str) -> String {
    format!("Dashboard description: \"{}\"", description)
}

/// Second-pass user prompt, narrowed to the missing component names.
pub fn missing_components_prompt(description: &str, names: &BTreeSet<String>) -> String {
    let listing = names
        .iter()
        .map(|n| format!("- {}.vue", n))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nGenerate ONLY the following Vue components, as valid JSON in the same structure (no Markdown fences):\n{}",
        user_prompt(description),
        listing
    )
}

/// Appended to the user prompt for the single payload-extraction retry.
pub const DIRECT_PAYLOAD_INSTRUCTION: &str =
    "IMPORTANT: Return ONLY the JSON object, with no explanation, introduction, or extra text.";
