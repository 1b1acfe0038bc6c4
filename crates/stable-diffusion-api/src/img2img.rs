use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::debug;

use super::{read_json, ApiError, ImgResponse, Result, Txt2ImgRequest};

/// Struct representing an image to image request.
///
/// Everything a text to image request carries is flattened into the same JSON object, with the
/// source images and denoising strength added on top.
#[skip_serializing_none]
#[derive(Default, PartialEq, Serialize, Deserialize, Debug, Clone)]
pub struct Img2ImgRequest {
    /// Base64-encoded source images.
    pub init_images: Option<Vec<String>>,
    /// How far the result may drift from the source image, between 0 and 1.
    pub denoising_strength: Option<f64>,
    #[serde(flatten)]
    pub params: Txt2ImgRequest,
}

impl Img2ImgRequest {
    /// Builds an image to image request from text to image parameters.
    pub fn from_params(params: Txt2ImgRequest) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Adds an image that is already base64-encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stable_diffusion_api::Img2ImgRequest;
    /// let mut req = Img2ImgRequest::default();
    /// req.with_encoded_image("aGVsbG8=".to_string());
    /// assert_eq!(req.init_images, Some(vec!["aGVsbG8=".to_string()]));
    /// ```
    pub fn with_encoded_image(&mut self, image: String) -> &mut Self {
        self.init_images.get_or_insert_with(Vec::new).push(image);
        self
    }

    /// Sets the denoising strength for image generation.
    pub fn with_denoising_strength(&mut self, denoising_strength: f64) -> &mut Self {
        self.denoising_strength = Some(denoising_strength);
        self
    }
}

/// A client for sending image to image requests to a specified endpoint.
#[derive(Clone, Debug)]
pub struct Img2Img {
    client: reqwest::Client,
    endpoint: Url,
}

impl Img2Img {
    /// Constructs a new Img2Img client with a given `reqwest::Client` and Stable Diffusion API
    /// endpoint `String`.
    pub fn new(client: reqwest::Client, endpoint: String) -> Result<Self> {
        Ok(Self::new_with_url(client, Url::parse(&endpoint)?))
    }

    /// Constructs a new Img2Img client with a given `reqwest::Client` and endpoint `Url`.
    pub fn new_with_url(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends an image request using the Img2Img client.
    ///
    /// # Returns
    ///
    /// A `Result` containing an `ImgResponse<Img2ImgRequest>` on success. A non-success status
    /// is returned as `ApiError::Status` carrying the response body.
    pub async fn send(&self, request: &Img2ImgRequest) -> Result<ImgResponse<Img2ImgRequest>> {
        debug!(endpoint = %self.endpoint, "sending img2img request");
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
