//! Script download.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::redirect::Policy;

use devsetup_config::ResolvedConfig;
use devsetup_types::ScriptUrl;

use crate::error::FetchError;

pub type FetchFut<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + 'a>>;

const MAX_REDIRECTS: usize = 10;

/// Where the script bytes come from.
pub trait ScriptSource: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a ScriptUrl) -> FetchFut<'a>;
}

/// Settings for [`HttpScriptSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_download_bytes: u64,
    /// Refuse plain-http requests, including redirect targets.
    pub https_only: bool,
}

impl From<&ResolvedConfig> for HttpSourceConfig {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
            max_download_bytes: config.max_download_bytes,
            https_only: !config.allow_insecure_http,
        }
    }
}

/// Plain GET over reqwest. One attempt, no retry.
#[derive(Debug, Clone)]
pub struct HttpScriptSource {
    client: reqwest::Client,
    max_download_bytes: u64,
}

impl HttpScriptSource {
    pub fn new(config: &HttpSourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .https_only(config.https_only)
            .build()
            .map_err(FetchError::Request)?;
        Ok(Self {
            client,
            max_download_bytes: config.max_download_bytes,
        })
    }

    async fn fetch_inner(&self, url: &ScriptUrl) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.as_url().clone())
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %url, "Script download rejected");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let max_bytes = self.max_download_bytes;
        if let Some(len) = response.content_length()
            && len > max_bytes
        {
            return Err(FetchError::TooLarge { max_bytes });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::Request)?;
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(FetchError::TooLarge { max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::info!(url = %url, bytes = body.len(), "Script downloaded");
        Ok(body)
    }
}

impl ScriptSource for HttpScriptSource {
    fn fetch<'a>(&'a self, url: &'a ScriptUrl) -> FetchFut<'a> {
        Box::pin(self.fetch_inner(url))
    }
}
