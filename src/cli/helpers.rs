//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::{Config, FsRepository, Project};

/// Locate the project from `--project` or the current directory
pub fn discover_project(global: &GlobalOpts) -> Result<Project> {
    let project = match global.project {
        Some(ref path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Open the project's content repository with its layered configuration
pub fn open_repository(global: &GlobalOpts) -> Result<(Project, Config, FsRepository)> {
    let project = discover_project(global)?;
    let config = Config::load_for(Some(&project));
    let repo = FsRepository::open(&project, &config).map_err(|e| miette::miette!("{}", e))?;
    Ok((project, config, repo))
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
