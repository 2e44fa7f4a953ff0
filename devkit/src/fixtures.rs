/*!
Filesystem fixtures

One temp directory per test holding the full host layout the agent
expects: a discovery root with category subdirectories, a declared
inventory directory and an ignore file.
*/

use anyhow::{Context, Result};
use inventa_agent::config::AgentConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

pub struct HostFixture {
    dir: TempDir,
}

impl HostFixture {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("failed to create fixture directory")?;
        std::fs::create_dir(dir.path().join("apps"))?;
        std::fs::create_dir(dir.path().join("declared"))?;
        Ok(Self { dir })
    }

    pub fn discovery_root(&self) -> PathBuf {
        self.dir.path().join("apps")
    }

    pub fn declared_dir(&self) -> PathBuf {
        self.dir.path().join("declared")
    }

    pub fn ignore_file(&self) -> PathBuf {
        self.dir.path().join("ignore.list")
    }

    /// Agent configuration pointing at this fixture. The publish section
    /// keeps its defaults; tests normally pair this with
    /// `Agent::with_publisher` and a `RecordingPublisher`.
    pub fn config(&self) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.discovery.root = self.discovery_root();
        config.declared.dir = self.declared_dir();
        config.ignore.file = self.ignore_file();
        config
    }

    /// Create one instance directory under a category (`webapps`,
    /// `services`, `batch`) and return its absolute path.
    pub async fn add_instance(&self, category: &str, name: &str) -> Result<PathBuf> {
        let path = self.discovery_root().join(category).join(name);
        fs::create_dir_all(&path)
            .await
            .with_context(|| format!("failed to create instance {}", path.display()))?;
        Ok(path)
    }

    /// Write a file inside an instance directory, creating intermediate
    /// directories as needed. `rel` uses forward slashes.
    pub async fn write_instance_file(
        &self,
        instance: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()> {
        let path = instance.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Write one declared record as a TOML file. Dotted record keys are
    /// quoted by the TOML serializer.
    pub async fn declare(&self, file_name: &str, pairs: &[(&str, &str)]) -> Result<()> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let text = toml::to_string(&map).context("failed to serialize declared record")?;
        fs::write(self.declared_dir().join(file_name), text).await?;
        Ok(())
    }

    /// Write the ignore file, one uri per line.
    pub async fn ignore(&self, uris: &[&str]) -> Result<()> {
        let mut text = uris.join("\n");
        text.push('\n');
        fs::write(self.ignore_file(), text).await?;
        Ok(())
    }
}
