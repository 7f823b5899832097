use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

const USER_AGENT: &str = concat!("embedded_solc/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("HTTP {0}")]
  Status(u16),
  #[error("{0}")]
  Transport(String),
}

/// Blocking GET used for the catalog and artifact downloads. Swappable so callers can route
/// through a mirror or count requests.
pub trait Fetch: Send + Sync {
  fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`Fetch`] backed by a blocking `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
  client: Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self, FetchError> {
    let client = Client::builder()
      .user_agent(USER_AGENT)
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|err| FetchError::Transport(format!("failed to create HTTP client: {err}")))?;
    Ok(Self { client })
  }
}

impl Fetch for HttpFetcher {
  fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = self
      .client
      .get(url)
      .send()
      .map_err(|err| FetchError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    let body = response
      .bytes()
      .map_err(|err| FetchError::Transport(format!("failed to read response body: {err}")))?;
    Ok(body.to_vec())
  }
}
