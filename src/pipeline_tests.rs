//! End-to-end pipeline scenarios against a scripted generator.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use crate::client::{GenerationClient, LlmClient};
use crate::error::AgentError;
use crate::pipeline::Orchestrator;
use crate::resolve;
use crate::spec::GenerationRequest;
use crate::store::Workspace;

/// Replays canned replies in order; replies beyond the script are garbage.
struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(replies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "I'm sorry, I can't help with that.".to_string()))
    }
}

fn request() -> GenerationRequest {
    GenerationRequest {
        description: "sales dashboard with a header and footer".to_string(),
        style_hints: vec!["tailwind".to_string(), "element-plus".to_string()],
    }
}

fn workspace() -> (TempDir, Workspace) {
    let dir = TempDir::new().unwrap();
    let ws = Workspace::at(dir.path().join("project-test")).unwrap();
    (dir, ws)
}

fn component(name: &str, template: &str) -> serde_json::Value {
    serde_json::json!({
        "filename": format!("{}.vue", name),
        "content": format!(
            "<template>\n{}\n</template>\n<script setup>\n</script>\n",
            template
        )
    })
}

/// First pass: Header and Footer generated, root additionally references a
/// Sidebar that was never produced.
fn first_pass_reply() -> String {
    let payload = serde_json::json!({
        "components": [
            component("Header", "  <header class=\"p-4\">Sales</header>"),
            component("Footer", "  <footer>2026</footer>"),
        ],
        "app": {
            "filename": "App.vue",
            "content": "<template>\n  <div>\n    <Header />\n    <main><p>content</p></main>\n    <Sidebar title=\"nav\"><p>links</p></Sidebar>\n    <Footer />\n  </div>\n</template>\n<script setup>\nimport Header from './components/Header.vue';\nimport Footer from './components/Footer.vue';\nimport Sidebar from './components/Sidebar.vue';\n</script>\n"
        }
    });
    format!("Here is your dashboard spec:\n```json\n{}\n```\nEnjoy!", payload)
}

fn empty_components_reply() -> String {
    serde_json::json!({ "components": [] }).to_string()
}

#[tokio::test]
async fn missing_component_is_stubbed_and_stripped_from_root() {
    let client = ScriptedClient::new(vec![first_pass_reply(), empty_components_reply()]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let summary = orchestrator.run(&store, &request()).await.unwrap();

    assert_eq!(summary.generated, vec!["Header", "Footer"]);
    assert_eq!(summary.stubbed, vec!["Sidebar"]);

    let stub = store.read_component("Sidebar").unwrap();
    assert!(stub.contains("Stub: Sidebar"));

    let root = std::fs::read_to_string(store.project_dir().join("src/App.vue")).unwrap();
    assert!(!root.contains("Sidebar"), "root still references Sidebar:\n{}", root);
    assert!(root.contains("<Header />"));
    assert!(root.contains("import Header from './components/Header.vue'"));
}

#[tokio::test]
async fn second_pass_recovers_missing_components() {
    let second = serde_json::json!({
        "components": [component("Sidebar", "  <nav>links</nav>")]
    })
    .to_string();
    let client = ScriptedClient::new(vec![first_pass_reply(), second]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let summary = orchestrator.run(&store, &request()).await.unwrap();

    assert_eq!(client.calls(), 2);
    assert!(summary.stubbed.is_empty());
    assert!(summary.generated.contains(&"Sidebar".to_string()));

    let root = std::fs::read_to_string(store.project_dir().join("src/App.vue")).unwrap();
    assert!(root.contains("<Sidebar title=\"nav\">"));
}

#[tokio::test]
async fn references_introduced_by_the_second_pass_are_stubbed() {
    // The recovered Sidebar itself references a Widget nobody generated.
    let second = serde_json::json!({
        "components": [component("Sidebar", "  <nav><Widget /></nav>")]
    })
    .to_string();
    let client = ScriptedClient::new(vec![first_pass_reply(), second]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let summary = orchestrator.run(&store, &request()).await.unwrap();

    assert_eq!(client.calls(), 2, "second pass must not trigger a third call");
    assert_eq!(summary.stubbed, vec!["Widget"]);
    assert!(store.component_exists("Widget"));
}

#[tokio::test]
async fn final_artifact_set_is_referentially_closed() {
    let client = ScriptedClient::new(vec![first_pass_reply(), empty_components_reply()]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    orchestrator.run(&store, &request()).await.unwrap();

    let mut names: std::collections::HashSet<String> =
        store.list_component_names().into_iter().collect();
    names.insert("App".to_string());

    let mut contents = store.read_all_components().unwrap();
    contents.insert(
        "App".to_string(),
        std::fs::read_to_string(store.project_dir().join("src/App.vue")).unwrap(),
    );

    for (name, content) in &contents {
        for referenced in resolve::referenced_names(content) {
            assert!(
                referenced == *name || names.contains(&referenced),
                "{} dangles from {}",
                referenced,
                name
            );
        }
    }
}

#[tokio::test]
async fn ill_nested_component_is_repaired_before_persisting() {
    let payload = serde_json::json!({
        "components": [{
            "filename": "Card.vue",
            "content": "<template><div class=\"card\"><p>body</template>\n<script setup>\n</script>\n"
        }],
        "app": {
            "filename": "App.vue",
            "content": "<template><Card /></template>\n<script setup>\nimport Card from './components/Card.vue';\n</script>\n"
        }
    });
    let client = ScriptedClient::new(vec![payload.to_string()]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let summary = orchestrator.run(&store, &request()).await.unwrap();

    assert!(summary.warnings.is_empty(), "repair should not degrade: {:?}", summary.warnings);
    let card = store.read_component("Card").unwrap();
    assert!(card.contains("<p>body</p></div>"));
    assert_eq!(client.calls(), 1, "a closed set needs no second pass");
}

#[tokio::test]
async fn duplicate_names_in_one_pass_are_last_write_wins() {
    let payload = serde_json::json!({
        "components": [
            component("Header", "  <header>first</header>"),
            component("Header", "  <header>second</header>"),
        ],
        "app": {
            "filename": "App.vue",
            "content": "<template><Header /></template>\n<script setup>\nimport Header from './components/Header.vue';\n</script>\n"
        }
    });
    let client = ScriptedClient::new(vec![payload.to_string()]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let summary = orchestrator.run(&store, &request()).await.unwrap();

    assert_eq!(summary.generated, vec!["Header"]);
    assert!(store.read_component("Header").unwrap().contains("second"));
}

#[tokio::test]
async fn no_payload_anywhere_is_fatal_after_exactly_one_retry() {
    let client = ScriptedClient::new(vec![
        "Sorry, I can only describe the dashboard in prose.".to_string(),
        "Still prose. No JSON today.".to_string(),
    ]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let err = orchestrator.run(&store, &request()).await.unwrap_err();

    assert!(matches!(err, AgentError::Generation(_)));
    assert_eq!(client.calls(), 2, "one call plus exactly one retry");
    assert!(store.list_component_names().is_empty());
    assert!(!store.project_dir().join("src/App.vue").exists());
    // The raw replies were still recorded before parsing was attempted.
    let recorded = std::fs::read_dir(store.project_dir().join("raw-responses"))
        .unwrap()
        .count();
    assert_eq!(recorded, 2);
}

#[tokio::test]
async fn payload_without_root_artifact_is_a_spec_format_error() {
    let client = ScriptedClient::new(vec![empty_components_reply()]);
    let (_guard, store) = workspace();
    let orchestrator = Orchestrator::new(GenerationClient::new(client.clone()));

    let err = orchestrator.run(&store, &request()).await.unwrap_err();
    assert!(matches!(err, AgentError::SpecFormat(_)));
}
