use std::collections::HashMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::debug;

use super::{read_json, ApiError, ImgResponse, Result};

/// Key in `override_settings` that selects the checkpoint for a single request.
pub const MODEL_CHECKPOINT_SETTING: &str = "sd_model_checkpoint";

/// Struct representing a text to image request.
#[skip_serializing_none]
#[derive(Default, PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct Txt2ImgRequest {
    /// Text prompt for generating the image.
    pub prompt: Option<String>,
    /// Negative text prompt.
    pub negative_prompt: Option<String>,
    /// Width of the generated image.
    pub width: Option<u32>,
    /// Height of the generated image.
    pub height: Option<u32>,
    /// Number of steps.
    pub steps: Option<u32>,
    /// CFG scale factor.
    pub cfg_scale: Option<f64>,
    /// Name of the sampler.
    pub sampler_name: Option<String>,
    /// Batch size used in generating images.
    pub batch_size: Option<u32>,
    /// Number of batches to generate.
    pub n_iter: Option<u32>,
    /// Seed for generating the image. `-1` picks a random seed.
    pub seed: Option<i64>,
    /// Settings to override when generating the image.
    pub override_settings: Option<HashMap<String, serde_json::Value>>,
}

impl Txt2ImgRequest {
    /// Adds a prompt to the request.
    ///
    /// # Example
    ///
    /// ```
    /// # use stable_diffusion_api::Txt2ImgRequest;
    /// let mut req = Txt2ImgRequest::default();
    /// req.with_prompt("A blue sky with green grass".to_string());
    /// assert_eq!(req.prompt.as_deref(), Some("A blue sky with green grass"));
    /// ```
    pub fn with_prompt(&mut self, prompt: String) -> &mut Self {
        self.prompt = Some(prompt);
        self
    }

    /// Adds a negative prompt to the request.
    pub fn with_negative_prompt(&mut self, negative_prompt: String) -> &mut Self {
        self.negative_prompt = Some(negative_prompt);
        self
    }

    /// Sets the output size.
    pub fn with_size(&mut self, width: u32, height: u32) -> &mut Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the number of steps for image generation.
    pub fn with_steps(&mut self, steps: u32) -> &mut Self {
        self.steps = Some(steps);
        self
    }

    /// Sets the cfg scale for image generation.
    pub fn with_cfg_scale(&mut self, cfg_scale: f64) -> &mut Self {
        self.cfg_scale = Some(cfg_scale);
        self
    }

    /// Sampler by display name, as listed by `/sdapi/v1/samplers`.
    pub fn with_sampler_name(&mut self, sampler_name: String) -> &mut Self {
        self.sampler_name = Some(sampler_name);
        self
    }

    pub fn with_batch_size(&mut self, batch_size: u32) -> &mut Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_n_iter(&mut self, n_iter: u32) -> &mut Self {
        self.n_iter = Some(n_iter);
        self
    }

    /// `-1` lets the WebUI pick a random seed.
    pub fn with_seed(&mut self, seed: i64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Asks the WebUI to load `checkpoint` for this request only.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stable_diffusion_api::Txt2ImgRequest;
    /// let mut req = Txt2ImgRequest::default();
    /// req.with_model_checkpoint("dreamshaper_8.safetensors".to_string());
    /// assert_eq!(req.model_checkpoint(), Some("dreamshaper_8.safetensors"));
    /// ```
    pub fn with_model_checkpoint(&mut self, checkpoint: String) -> &mut Self {
        self.override_settings
            .get_or_insert_with(HashMap::new)
            .insert(MODEL_CHECKPOINT_SETTING.to_owned(), checkpoint.into());
        self
    }

    /// The checkpoint override, if one is set.
    pub fn model_checkpoint(&self) -> Option<&str> {
        self.override_settings
            .as_ref()
            .and_then(|s| s.get(MODEL_CHECKPOINT_SETTING))
            .and_then(|v| v.as_str())
    }
}

/// A client for sending text to image requests to a specified endpoint.
#[derive(Clone, Debug)]
pub struct Txt2Img {
    client: reqwest::Client,
    endpoint: Url,
}

impl Txt2Img {
    /// Constructs a new Txt2Img client with a given `reqwest::Client` and Stable Diffusion API
    /// endpoint `String`.
    ///
    /// # Returns
    ///
    /// A `Result` containing a new Txt2Img instance on success, or an error if url parsing failed.
    pub fn new(client: reqwest::Client, endpoint: String) -> Result<Self> {
        Ok(Self::new_with_url(client, Url::parse(&endpoint)?))
    }

    /// Constructs a new Txt2Img client with a given `reqwest::Client` and endpoint `Url`.
    pub fn new_with_url(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends an image request using the Txt2Img client.
    ///
    /// # Returns
    ///
    /// A `Result` containing an `ImgResponse<Txt2ImgRequest>` on success. A non-success status
    /// is returned as `ApiError::Status` carrying the response body.
    pub async fn send(&self, request: &Txt2ImgRequest) -> Result<ImgResponse<Txt2ImgRequest>> {
        debug!(endpoint = %self.endpoint, "sending txt2img request");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        read_json(response).await
    }
}
