//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::project::DEFAULT_FORMS_CONTAINER;
use crate::core::workflow::WorkflowDefinitionConfig;
use crate::core::Project;

/// TFM configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Author recorded when nodes are created
    pub author: Option<String>,

    /// Folder (relative to the project root) that forms are created under
    pub forms_container: Option<String>,

    /// Workflow definitions offered as a form's default workflow
    pub workflows: Vec<WorkflowDefinitionConfig>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/tfm/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.tfm/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.tfm_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("TFM_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(container) = std::env::var("TFM_FORMS_CONTAINER") {
            config.forms_container = Some(container);
        }

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        // The generated project config is all comments
        let blank = contents
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'));
        if blank {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring unreadable config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tfm")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.forms_container.is_some() {
            self.forms_container = other.forms_container;
        }
        if !other.workflows.is_empty() {
            self.workflows = other.workflows;
        }
    }

    /// Get the author name, falling back to the login name
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Get the forms container folder name
    pub fn forms_container(&self) -> &str {
        self.forms_container
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_FORMS_CONTAINER)
    }
}
