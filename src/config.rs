use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::favorites::OpenPostingSource;

const API_URL_VAR: &str = "JOBBOARD_API_URL";
const TOKEN_VAR: &str = "JOBBOARD_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Size hint sent with listing requests.
    pub page_size: usize,
    pub favorites_page_size: usize,
    /// Lookup order for a company's open postings.
    pub open_posting_sources: Vec<OpenPostingSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            token: None,
            timeout_secs: 30,
            page_size: 100,
            favorites_page_size: 50,
            open_posting_sources: OpenPostingSource::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "jobboard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` if given (must exist), otherwise from the platform config
    /// dir if a file is there, otherwise defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(env::var(API_URL_VAR).ok(), env::var(TOKEN_VAR).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn apply_overrides(&mut self, api_url: Option<String>, token: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(
            config.open_posting_sources,
            vec![
                OpenPostingSource::CompanyFilter,
                OpenPostingSource::CompanyPosts,
                OpenPostingSource::FullScan
            ]
        );
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_url = "https://jobs.example.com/api"
timeout_secs = 5
open_posting_sources = ["full-scan", "company-posts"]
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api_url, "https://jobs.example.com/api");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.page_size, 100);
        assert_eq!(
            config.open_posting_sources,
            vec![OpenPostingSource::FullScan, OpenPostingSource::CompanyPosts]
        );
    }

    #[test]
    fn test_from_file_rejects_unknown_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"open_posting_sources = ["carrier-pigeon"]"#).unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("http://other/api".to_string()), Some("tok".to_string()));
        assert_eq!(config.api_url, "http://other/api");
        assert_eq!(config.token.as_deref(), Some("tok"));

        // blank values do not clobber
        config.apply_overrides(Some("  ".to_string()), Some(String::new()));
        assert_eq!(config.api_url, "http://other/api");
        assert_eq!(config.token.as_deref(), Some("tok"));
    }
}
