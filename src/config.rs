use crate::error::{CiError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the repository root and in
/// the user configuration directory.
pub const CONFIG_FILE_NAME: &str = "gha-ci.toml";

/// Represents the complete configuration for gha-ci.
///
/// Contains the monorepo layout, change-detection rules, release settings,
/// the git backend selection and GitHub API settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub changes: ChangesConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub github: GitHubConfig,
}

fn default_actions_dir() -> String {
    "actions".to_string()
}

fn default_workflows_dir() -> String {
    ".github/workflows".to_string()
}

fn default_workflows_config_dir() -> String {
    ".github/workflows-config".to_string()
}

fn default_action_config_file() -> String {
    "action-config.yml".to_string()
}

/// Where build units live inside the repository. All paths are relative to
/// the repository root and use `/` separators.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_actions_dir")]
    pub actions_dir: String,

    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,

    #[serde(default = "default_workflows_config_dir")]
    pub workflows_config_dir: String,

    /// File name of the per-action configuration, inside the action directory.
    #[serde(default = "default_action_config_file")]
    pub action_config_file: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            actions_dir: default_actions_dir(),
            workflows_dir: default_workflows_dir(),
            workflows_config_dir: default_workflows_config_dir(),
            action_config_file: default_action_config_file(),
        }
    }
}

/// Returns the default shared-dependency globs that affect every action.
fn default_global_triggers() -> Vec<String> {
    vec![
        "package.json".to_string(),
        "package-lock.json".to_string(),
        "lib/**".to_string(),
        "jest.config.mjs".to_string(),
        "tsconfig.json".to_string(),
    ]
}

/// Returns the default source file extensions of a buildable action.
fn default_source_extensions() -> Vec<String> {
    vec![
        "js".to_string(),
        "mjs".to_string(),
        "ts".to_string(),
        "mts".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

/// Configuration for change detection.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangesConfig {
    /// Globs of shared files; a change to any of them affects every action
    /// containing source files.
    #[serde(default = "default_global_triggers")]
    pub global_triggers: Vec<String>,

    /// Globs whose change affects every workflow unit.
    #[serde(default)]
    pub workflow_global_triggers: Vec<String>,

    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Paths excluded from the directory tier (e.g. `**/*.md`).
    #[serde(default)]
    pub ignore_paths: Vec<String>,

    #[serde(default = "default_true")]
    pub ignore_if_all_deletions: bool,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        ChangesConfig {
            global_triggers: default_global_triggers(),
            workflow_global_triggers: Vec::new(),
            source_extensions: default_source_extensions(),
            ignore_paths: Vec::new(),
            ignore_if_all_deletions: true,
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_marker_file() -> String {
    ".timestamp".to_string()
}

/// Configuration for the publish flow.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    /// File rewritten before every commit so that no publish commit is empty.
    #[serde(default = "default_marker_file")]
    pub marker_file: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            remote: default_remote(),
            marker_file: default_marker_file(),
        }
    }
}

/// Which implementation answers diff/tag/branch queries.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GitBackend {
    #[default]
    Cli,
    Libgit2,
}

fn default_git_executable() -> String {
    "git".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default)]
    pub backend: GitBackend,

    #[serde(default = "default_git_executable")]
    pub executable: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            backend: GitBackend::default(),
            executable: default_git_executable(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_comment_namespace() -> String {
    "gha-ci".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Namespace embedded in the hidden marker of bot comments.
    #[serde(default = "default_comment_namespace")]
    pub comment_namespace: String,

    /// Ref test workflows are dispatched on for releases.
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: default_api_url(),
            comment_namespace: default_comment_namespace(),
            default_branch: default_branch(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gha-ci.toml` in the repository root
/// 3. `gha-ci.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>, root: &Path) -> Result<Config> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(root),
    };

    let Some(path) = path else {
        return Ok(Config::default());
    };

    tracing::debug!(path = %path.display(), "loading configuration");
    let config_str = fs::read_to_string(&path).map_err(|e| {
        CiError::config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}

fn find_config_file(root: &Path) -> Option<PathBuf> {
    let local = root.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
[changes]
ignore_paths = ["**/*.md"]
"#,
        )
        .unwrap();

        assert_eq!(config.changes.ignore_paths, vec!["**/*.md".to_string()]);
        assert!(config.changes.ignore_if_all_deletions);
        assert_eq!(config.changes.global_triggers, default_global_triggers());
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.release.remote, "origin");
    }

    #[test]
    fn test_git_backend_is_lowercase() {
        let config: Config = toml::from_str("[git]\nbackend = \"libgit2\"\n").unwrap();
        assert_eq!(config.git.backend, GitBackend::Libgit2);
        assert_eq!(config.git.executable, "git");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[git]\nbackend = \"svn\"\n");
        assert!(result.is_err());
    }
}
