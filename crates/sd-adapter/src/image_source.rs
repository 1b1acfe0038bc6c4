use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use dyn_clone::DynClone;
use tracing::debug;

use crate::{GenerationError, Result};

/// Prefix of an inline image reference.
const DATA_URI_PREFIX: &str = "data:image";

dyn_clone::clone_trait_object!(ImageFetcher);

/// Retrieves source images referenced by URL.
#[async_trait]
pub trait ImageFetcher: std::fmt::Debug + DynClone + Send + Sync {
    /// Fetches the raw bytes at `url`. Failures are [`GenerationError::Fetch`].
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Fetches images over HTTP with `reqwest`.
#[derive(Clone, Debug, Default)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let fetch_error = |reason: String| GenerationError::Fetch {
            url: url.to_owned(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(status.to_string()));
        }
        response.bytes().await.map_err(|e| fetch_error(e.to_string()))
    }
}

/// Returns the base64 payload the WebUI expects in `init_images`.
///
/// A `data:image/...;base64,` reference has its prefix stripped without touching the network.
/// Anything else is fetched once as a URL and its bytes are base64-encoded.
pub async fn resolve_init_image(fetcher: &dyn ImageFetcher, reference: &str) -> Result<String> {
    if reference.starts_with(DATA_URI_PREFIX) {
        return reference
            .split_once(',')
            .map(|(_, payload)| payload.to_owned())
            .ok_or_else(|| GenerationError::validation("Malformed data URI for init image"));
    }

    debug!(url = reference, "fetching init image");
    let bytes = fetcher.fetch(reference).await?;
    Ok(general_purpose::STANDARD.encode(bytes))
}
