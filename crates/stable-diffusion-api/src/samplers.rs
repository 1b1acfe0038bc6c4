use std::collections::HashMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{read_json, ApiError, Result};

/// A sampler the WebUI has loaded.
#[derive(Default, PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct Sampler {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// Struct representing a connection to the WebUI `samplers` endpoint.
#[derive(Clone, Debug)]
pub struct SamplersApi {
    client: reqwest::Client,
    endpoint: Url,
}

impl SamplersApi {
    /// Constructs a new `SamplersApi` client with a given `reqwest::Client` and endpoint `Url`.
    pub fn new_with_url(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches the samplers the WebUI currently offers.
    pub async fn list(&self) -> Result<Vec<Sampler>> {
        debug!(endpoint = %self.endpoint, "fetching samplers");
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|source| ApiError::Request {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        read_json(response).await
    }
}
