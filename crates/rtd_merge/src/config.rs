use crate::app::App;
use crate::error::ConfigError;
use crate::merge::JsonTemplateMerger;
use crate::source::HttpPostSource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWrite;

pub const DEFAULT_URL: &str = "https://seg.halo.ad.gt/api/v1/rtd";
pub const DEFAULT_REQUEST_BODY: &str =
    r#"{"userIds":{"haloId": "TEST"},"config":{"publisherId": 999999000001}}"#;
pub const DEFAULT_TEMPLATE: &str = "{\n    \"returned_http_payload\": %s\n}";
/// Flat deadline for the whole exchange, body included.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Everything a run needs. Missing fields in a config file fall back to the
/// compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// POST target
    pub url: String,
    /// Request body, sent verbatim as `application/json`
    pub request_body: String,
    /// Wrapper document with a single `%s` placeholder
    pub template: String,
    pub timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            request_body: DEFAULT_REQUEST_BODY.into(),
            template: DEFAULT_TEMPLATE.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid("url must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be > 0".into()));
        }
        JsonTemplateMerger::new(&self.template)?;
        Ok(())
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ConfigError::Client)
}

/// Wire the HTTP source, template merger and `output` into an [`App`].
pub fn build_app<W>(
    cfg: &PipelineConfig,
    output: W,
) -> Result<App<HttpPostSource, JsonTemplateMerger, W>, ConfigError>
where
    W: AsyncWrite + Unpin + Send,
{
    cfg.validate()?;
    let client = build_client(cfg.timeout())?;
    let source = HttpPostSource::new(cfg.url.clone(), cfg.request_body.clone().into_bytes(), client);
    let merger = JsonTemplateMerger::new(&cfg.template)?;
    Ok(App::new(source, merger, output))
}
