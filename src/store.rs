//! Project workspace persistence.
//!
//! One run owns one timestamped project directory. Components live under
//! `src/components/`, the root artifact at `src/App.vue`. Every raw
//! generator response is recorded to a write-once sidecar before parsing is
//! attempted; the sidecar is never read back by the pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;
use walkdir::WalkDir;

const COMPONENT_EXT: &str = "vue";

pub struct Workspace {
    project_dir: PathBuf,
    components_dir: PathBuf,
    raw_dir: PathBuf,
}

impl Workspace {
    /// Create a fresh `project-<timestamp>` directory under `root`.
    pub fn create(root: &Path) -> io::Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        Self::at(root.join(format!("project-{}", stamp)))
    }

    /// Open (creating directories as needed) a specific project directory.
    pub fn at(project_dir: PathBuf) -> io::Result<Self> {
        let components_dir = project_dir.join("src").join("components");
        let raw_dir = project_dir.join("raw-responses");
        fs::create_dir_all(&components_dir)?;
        fs::create_dir_all(&raw_dir)?;
        Ok(Self {
            project_dir,
            components_dir,
            raw_dir,
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn component_path(&self, name: &str) -> PathBuf {
        self.components_dir.join(format!("{}.{}", name, COMPONENT_EXT))
    }

    pub fn component_exists(&self, name: &str) -> bool {
        self.component_path(name).exists()
    }

    pub fn write_component(&self, name: &str, content: &str) -> io::Result<()> {
        fs::write(self.component_path(name), content)?;
        info!(name, "component written");
        Ok(())
    }

    pub fn read_component(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.component_path(name))
    }

    /// Enumerate persisted component names.
    pub fn list_component_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.components_dir).into_iter().flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().map(|e| e == COMPONENT_EXT).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        names
    }

    /// Re-read every persisted component. The dependency resolver works on
    /// these, not on in-memory specs, so that references introduced by
    /// repair are also seen.
    pub fn read_all_components(&self) -> io::Result<BTreeMap<String, String>> {
        let mut contents = BTreeMap::new();
        for name in self.list_component_names() {
            let content = self.read_component(&name)?;
            contents.insert(name, content);
        }
        Ok(contents)
    }

    /// The root artifact is written exactly once, after resolution completes.
    pub fn write_root(&self, content: &str) -> io::Result<()> {
        fs::write(self.project_dir.join("src").join("App.vue"), content)?;
        info!("root artifact written");
        Ok(())
    }

    /// Record a raw generator response, keyed by a hash of the request.
    /// Write-once: recorded before parsing, never read back.
    pub fn record_raw_response(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        raw: &str,
    ) -> io::Result<()> {
        let mut hasher = Sha256::new();
        hasher.update(system_prompt.as_bytes());
        hasher.update(user_prompt.as_bytes());
        let key = format!("{:x}", hasher.finalize());
        fs::write(self.raw_dir.join(format!("{}.json", &key[..16])), raw)?;
        // Convenience copy of the most recent response.
        fs::write(self.project_dir.join("last-response.json"), raw)?;
        Ok(())
    }

    /// Write the static Vite project shell around the generated sources.
    pub fn scaffold(&self) -> io::Result<()> {
        fs::write(
            self.project_dir.join("package.json"),
            r#"{
  "name": "generated-dashboard",
  "private": true,
  "version": "0.0.0",
  "type": "module",
  "scripts": {
    "dev": "vite",
    "build": "vite build",
    "preview": "vite preview"
  },
  "dependencies": {
    "vue": "^3.4.0",
    "element-plus": "^2.7.0"
  },
  "devDependencies": {
    "@vitejs/plugin-vue": "^5.0.0",
    "tailwindcss": "^3.4.0",
    "vite": "^5.2.0"
  }
}
"#,
        )?;
        fs::write(
            self.project_dir.join("index.html"),
            "<!doctype html>\n<html>\n  <head>\n    <meta charset=\"UTF-8\" />\n    <title>Generated Dashboard</title>\n  </head>\n  <body>\n    <div id=\"app\"></div>\n    <script type=\"module\" src=\"/src/main.js\"></script>\n  </body>\n</html>\n",
        )?;
        fs::write(
            self.project_dir.join("vite.config.js"),
            "import { defineConfig } from 'vite';\nimport vue from '@vitejs/plugin-vue';\n\nexport default defineConfig({\n  plugins: [vue()],\n});\n",
        )?;
        fs::write(
            self.project_dir.join("src").join("main.js"),
            "import { createApp } from 'vue';\nimport App from './App.vue';\n\ncreateApp(App).mount('#app');\n",
        )?;
        Ok(())
    }
}
