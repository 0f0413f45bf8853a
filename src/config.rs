//! Client configuration from `AMPLIA_*` environment variables.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;

pub const ENV_API_URL: &str = "AMPLIA_API_URL";
pub const ENV_STATE_DIR: &str = "AMPLIA_STATE_DIR";
pub const ENV_PAGE_SIZE: &str = "AMPLIA_PAGE_SIZE";

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_STATE_DIR: &str = ".amplia";
pub const DEFAULT_DIRECTORY_PAGE_SIZE: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL without a trailing `/`.
    pub api_url: String,
    /// Directory holding `session.json`.
    pub state_dir: PathBuf,
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            page_size: DEFAULT_DIRECTORY_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from any key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = match get(ENV_API_URL) {
            Some(raw) => parse_api_url(&raw).with_context(|| format!("invalid {}", ENV_API_URL))?,
            None => DEFAULT_API_URL.to_string(),
        };
        let state_dir = get(ENV_STATE_DIR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
        let page_size = match get(ENV_PAGE_SIZE) {
            Some(raw) => parse_page_size(&raw).with_context(|| format!("invalid {}", ENV_PAGE_SIZE))?,
            None => DEFAULT_DIRECTORY_PAGE_SIZE,
        };
        Ok(Self { api_url, state_dir, page_size })
    }

    pub fn session_file(&self) -> PathBuf { self.state_dir.join(crate::identity::SESSION_FILE) }
}

fn parse_api_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| anyhow!("'{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("'{}': scheme must be http or https, got '{}'", raw, other),
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_page_size(raw: &str) -> Result<u32> {
    let n: u32 = raw.parse().map_err(|e| anyhow!("'{}': {}", raw, e))?;
    if n == 0 {
        bail!("page size must be greater than zero");
    }
    Ok(n)
}
