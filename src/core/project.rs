//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project marker directory
pub const PROJECT_DIR: &str = ".tfm";

/// Container folder that holds every registered form
pub const DEFAULT_FORMS_CONTAINER: &str = "forms";

/// Represents a TFM project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .tfm/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::create_structure(root)
    }

    /// Force initialization even if .tfm/ exists
    ///
    /// The repository index is left untouched so registered forms survive.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        Self::create_structure(root)
    }

    fn create_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let tfm_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&tfm_dir)
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(tfm_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::create_dir_all(root.join(DEFAULT_FORMS_CONTAINER))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# TFM Project Configuration

# Default author recorded on created nodes (can be overridden by global config)
# author: ""

# Folder that registered forms are created under
# forms_container: forms

# Workflow definitions offered as a form's default workflow.
# The built-in catalogue is used when this list is empty.
# workflows:
#   - name: "wcmwf:submit"
#     title: "Submit Web Content"
#     description: "Submit changes for approval"
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .tfm configuration directory
    pub fn tfm_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Path of the repository node index
    pub fn repository_index_path(&self) -> PathBuf {
        self.tfm_dir().join("repository.yaml")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a TFM project (searched from {searched_from:?}). Run 'tfm init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("TFM project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.tfm_dir().exists());
        assert!(project.tfm_dir().join("config.yaml").exists());
        assert!(project.root().join("forms").is_dir());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_init_force_keeps_index() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(project.repository_index_path(), "nodes: {}\n").unwrap();

        let project = Project::init_force(tmp.path()).unwrap();
        assert!(project.repository_index_path().exists());
    }

    #[test]
    fn test_project_discover_finds_tfm_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_tfm_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }
}
