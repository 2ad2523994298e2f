use std::fmt;
use std::path::Path;

use indexmap::IndexSet;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{PipewatchError, Result};

/// A GitLab project path such as `group/subgroup/project`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryRef(String);

impl RepositoryRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, the project's own name.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes one line of a repository list into a project path.
///
/// Accepts either a bare project path or a clone URL under `base_url`. Returns
/// `None` for blank lines.
pub fn normalize(line: &str, base_url: &str) -> Option<RepositoryRef> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let prefix = format!("{}/", base_url.trim_end_matches('/'));
    let path = line.strip_prefix(&prefix).unwrap_or(line);
    let path = path.strip_suffix(".git").unwrap_or(path);

    Some(RepositoryRef::new(path.trim_matches('/')))
}

/// Parses a whole repository list, one entry per line.
///
/// Entries that normalize to an already listed project are dropped, keeping
/// the first occurrence's position.
pub fn parse_repositories(contents: &str, base_url: &str) -> Vec<RepositoryRef> {
    let mut repositories = IndexSet::new();
    for repository in contents.lines().filter_map(|line| normalize(line, base_url)) {
        if !repositories.insert(repository.clone()) {
            warn!("Repository {repository} is listed more than once, ignoring duplicate.");
        }
    }
    repositories.into_iter().collect()
}

/// Loads the repository list from `path`.
///
/// # Errors
///
/// Returns a configuration error if the file does not exist or cannot be read.
pub fn load_repositories(path: &Path, base_url: &str) -> Result<Vec<RepositoryRef>> {
    if !path.is_file() {
        return Err(PipewatchError::Config(format!(
            "{} not found",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        PipewatchError::Config(format!("Failed to read {}: {e}", path.display()))
    })?;

    let repositories = parse_repositories(&contents, base_url);
    info!(
        "Loaded {} repositories from {}.",
        repositories.len(),
        path.display()
    );

    Ok(repositories)
}
