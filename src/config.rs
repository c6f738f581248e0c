use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Token;
use crate::error::GuardError;

/// Job name prefix a pipeline must contain a passing job for.
pub const JOB_NAME_PREFIX: &str = "a750-vk";
pub const SUCCESS_STATUS: &str = "success";

pub const DEFAULT_BASE_URL: &str = "https://gitlab.freedesktop.org";
pub const DEFAULT_PROJECT: &str = "mesa/mesa";
pub const DEFAULT_REF: &str = "main";
pub const DEFAULT_MAX_COMMITS: i64 = 60;

pub const PIPELINES_PER_COMMIT: usize = 20;
pub const JOBS_PER_PIPELINE: usize = 200;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CLIENT_NAME: &str = "baseline-guard";

/// Optional on-disk defaults.
///
/// Every field may be overridden by the matching CLI flag or environment
/// variable. Files are looked up in the current directory unless a path is
/// given explicitly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub project_path: Option<String>,
    pub target_ref: Option<String>,
    pub max_commits: Option<i64>,
}

impl FileConfig {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./baseline-guard.toml
    /// 3. ./baseline-guard.json
    /// 4. ./baseline-guard.yaml
    /// 5. ./baseline-guard.yml
    ///
    /// Returns an empty configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "baseline-guard.toml",
            "baseline-guard.json",
            "baseline-guard.yaml",
            "baseline-guard.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub project_path: Option<String>,
    pub target_ref: Option<String>,
    pub max_commits: Option<i64>,
    pub github_output: Option<PathBuf>,
}

/// Resolved, validated run configuration. Built once and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub token: Token,
    pub base_url: String,
    /// Project identifier exactly as it appears in API paths.
    pub project: String,
    pub target_ref: String,
    pub max_commits: usize,
    pub github_output: Option<PathBuf>,
}

impl Settings {
    /// Merge overrides over file values over built-in defaults, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::MissingToken`] when no non-empty token is
    /// available and [`GuardError::InvalidMaxCommits`] for a bound below 1.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self, GuardError> {
        let token = overrides
            .token
            .or(file.token)
            .map(Token::from)
            .filter(|t| !t.is_empty())
            .ok_or(GuardError::MissingToken)?;

        let max_commits = overrides
            .max_commits
            .or(file.max_commits)
            .unwrap_or(DEFAULT_MAX_COMMITS);
        let max_commits = usize::try_from(max_commits)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(GuardError::InvalidMaxCommits(max_commits))?;

        // An explicit project is trusted to be path-ready (encoded path or numeric id).
        let project = overrides
            .project_path
            .or(file.project_path)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| urlencoding::encode(DEFAULT_PROJECT).into_owned());

        Ok(Self {
            token,
            base_url: overrides
                .base_url
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            project,
            target_ref: overrides
                .target_ref
                .or(file.target_ref)
                .unwrap_or_else(|| DEFAULT_REF.to_string()),
            max_commits,
            github_output: overrides.github_output.filter(|p| !p.as_os_str().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn with_token() -> Overrides {
        Overrides {
            token: Some("glpat-test".to_string()),
            ..Overrides::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(with_token(), FileConfig::default()).unwrap();
        assert_eq!(settings.base_url, "https://gitlab.freedesktop.org");
        assert_eq!(settings.project, "mesa%2Fmesa");
        assert_eq!(settings.target_ref, "main");
        assert_eq!(settings.max_commits, 60);
        assert!(settings.github_output.is_none());
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = Settings::resolve(Overrides::default(), FileConfig::default()).unwrap_err();
        assert!(matches!(err, GuardError::MissingToken));

        let blank = Overrides {
            token: Some(String::new()),
            ..Overrides::default()
        };
        let err = Settings::resolve(blank, FileConfig::default()).unwrap_err();
        assert!(matches!(err, GuardError::MissingToken));
    }

    #[test]
    fn test_non_positive_max_commits_is_rejected() {
        for bad in [0, -5] {
            let overrides = Overrides {
                max_commits: Some(bad),
                ..with_token()
            };
            let err = Settings::resolve(overrides, FileConfig::default()).unwrap_err();
            assert!(matches!(err, GuardError::InvalidMaxCommits(n) if n == bad));
        }
    }

    #[test]
    fn test_project_override_is_used_verbatim() {
        let overrides = Overrides {
            project_path: Some("176".to_string()),
            ..with_token()
        };
        let settings = Settings::resolve(overrides, FileConfig::default()).unwrap();
        assert_eq!(settings.project, "176");
    }

    #[test]
    fn test_overrides_beat_file_values() {
        let file = FileConfig {
            token: Some("file-token".to_string()),
            target_ref: Some("staging".to_string()),
            max_commits: Some(10),
            ..FileConfig::default()
        };
        let overrides = Overrides {
            max_commits: Some(5),
            ..Overrides::default()
        };

        let settings = Settings::resolve(overrides, file).unwrap();
        assert_eq!(settings.token.as_str(), "file-token");
        assert_eq!(settings.target_ref, "staging");
        assert_eq!(settings.max_commits, 5);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
token = "glpat-test-token"
base-url = "https://gitlab.example.com"
target-ref = "release"
max-commits = 15
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = FileConfig::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.token, Some("glpat-test-token".to_string()));
        assert_eq!(config.base_url, Some("https://gitlab.example.com".to_string()));
        assert_eq!(config.target_ref, Some("release".to_string()));
        assert_eq!(config.max_commits, Some(15));
        assert!(config.project_path.is_none());
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "project-path: \"42\"\nmax-commits: 3\n").unwrap();

        let config = FileConfig::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.project_path, Some("42".to_string()));
        assert_eq!(config.max_commits, Some(3));
    }

    #[test]
    fn test_load_unknown_extension_falls_back_to_json() {
        let mut temp_file = NamedTempFile::with_suffix(".conf").unwrap();
        write!(temp_file, r#"{{"target-ref": "next"}}"#).unwrap();

        let config = FileConfig::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.target_ref, Some("next".to_string()));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let err = FileConfig::load(Some(Path::new("does-not-exist.toml"))).unwrap_err();
        assert!(err.to_string().contains("does-not-exist.toml"));
    }
}
