//! Placeholder synthesis for unresolved references.

use crate::spec::ArtifactSpec;

/// Produce a minimal, always-valid component that visibly renders as a
/// placeholder. The terminal fallback that keeps the final artifact set
/// referentially closed.
pub fn stub(name: &str) -> ArtifactSpec {
    let raw_content = format!(
        "<template>\n  <div style=\"color: red;\">Stub: {}</div>\n</template>\n<script setup>\n</script>\n",
        name
    );
    ArtifactSpec {
        name: name.to_string(),
        raw_content,
    }
}
