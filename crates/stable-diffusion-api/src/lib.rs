use std::time::Duration;

use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::skip_serializing_none;

mod txt2img;
pub use txt2img::*;

mod img2img;
pub use img2img::*;

mod samplers;
pub use samplers::*;

#[cfg(test)]
mod test_server;

/// Default location of a locally running Stable Diffusion WebUI.
pub const DEFAULT_URL: &str = "http://127.0.0.1:7860";

/// Errors returned by the Stable Diffusion WebUI API client.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// Error parsing the base or endpoint URL.
    #[error("Failed to parse endpoint URL")]
    Url(#[from] url::ParseError),
    /// The request could not be sent or timed out.
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: Url,
        #[source]
        source: reqwest::Error,
    },
    /// The API answered with a non-success status code.
    #[error("got error code: {status}, message text: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The response body could not be parsed.
    #[error("Parsing response failed")]
    InvalidResponse(#[source] reqwest::Error),
}

impl ApiError {
    /// Returns true when the error was caused by the request timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { source, .. } if source.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Struct representing a connection to a Stable Diffusion WebUI API.
#[derive(Clone, Debug)]
pub struct Api {
    client: reqwest::Client,
    url: Url,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: Url::parse(DEFAULT_URL).expect("Failed to parse default URL"),
        }
    }
}

impl Api {
    /// Returns a new `Api` instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new `Api` instance with the given URL as a string value.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse, an error will be returned.
    pub fn new_with_url<S>(url: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        Ok(Self {
            url: Url::parse(url.as_ref())?,
            ..Default::default()
        })
    }

    /// Returns a new `Api` instance with the given `reqwest::Client` and URL as a string value.
    ///
    /// # Arguments
    ///
    /// * `client` - An instance of `reqwest::Client`.
    /// * `url` - A string that specifies the Stable Diffusion WebUI API URL endpoint.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse, an error will be returned.
    pub fn new_with_client_and_url<S>(client: reqwest::Client, url: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        Ok(Self {
            client,
            url: Url::parse(url.as_ref())?,
        })
    }

    /// Returns a new `Api` whose client gives up on any request after `timeout`.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse or the client cannot be built, an error will be returned.
    pub fn new_with_timeout<S>(url: S, timeout: Duration) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let url = Url::parse(url.as_ref())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Request {
                endpoint: url.clone(),
                source,
            })?;
        Ok(Self { client, url })
    }

    /// The base URL of the WebUI.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns a new instance of `SamplersApi` for the `samplers` endpoint.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse, an error will be returned.
    pub fn samplers(&self) -> Result<SamplersApi> {
        Ok(SamplersApi::new_with_url(
            self.client.clone(),
            self.url.join("sdapi/v1/samplers")?,
        ))
    }

    /// Returns a new instance of `Txt2Img` for the `txt2img` endpoint.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse, an error will be returned.
    pub fn txt2img(&self) -> Result<Txt2Img> {
        Ok(Txt2Img::new_with_url(
            self.client.clone(),
            self.url.join("sdapi/v1/txt2img")?,
        ))
    }

    /// Returns a new instance of `Img2Img` for the `img2img` endpoint.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse, an error will be returned.
    pub fn img2img(&self) -> Result<Img2Img> {
        Ok(Img2Img::new_with_url(
            self.client.clone(),
            self.url.join("sdapi/v1/img2img")?,
        ))
    }
}

/// Checks the status of `response` and parses its JSON body.
pub(crate) async fn read_json<T>(response: reqwest::Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(ApiError::InvalidResponse);
    }
    let body = response.text().await.map_err(ApiError::InvalidResponse)?;
    Err(ApiError::Status { status, body })
}

/// A struct that represents the response from the Stable Diffusion WebUI API endpoint.
#[skip_serializing_none]
#[derive(Default, Serialize, Deserialize, Debug)]
pub struct ImgResponse<T> {
    /// A vector of strings containing base64-encoded images.
    #[serde(default)]
    pub images: Vec<String>,
    /// The parameters that were provided for the generation request.
    pub parameters: Option<T>,
    /// A string containing JSON representing information about the request.
    pub info: Option<String>,
}

impl<T> ImgResponse<T> {
    /// Parses the `info` field, if the WebUI sent one.
    pub fn info(&self) -> Option<ImgInfo> {
        self.info
            .as_deref()
            .and_then(|info| serde_json::from_str(info).ok())
    }
}

/// Information about the generated images.
#[skip_serializing_none]
#[derive(Default, Serialize, Deserialize, Debug, PartialEq)]
pub struct ImgInfo {
    /// The random seed the WebUI picked for the first image.
    pub seed: Option<i64>,
    /// The name of the sampler used for image generation.
    pub sampler_name: Option<String>,
    /// The number of steps taken when generating the image.
    pub steps: Option<u32>,
    /// The cfg scale factor used when generating the image.
    pub cfg_scale: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// The name of the checkpoint that produced the image.
    pub sd_model_name: Option<String>,
    pub denoising_strength: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{client, response, serve, silent};

    #[test]
    fn test_endpoints_join_base_url() {
        let api = Api::new_with_url("http://sd.local:7861/").unwrap();

        assert_eq!(
            api.txt2img().unwrap().endpoint().as_str(),
            "http://sd.local:7861/sdapi/v1/txt2img"
        );
        assert_eq!(
            api.img2img().unwrap().endpoint().as_str(),
            "http://sd.local:7861/sdapi/v1/img2img"
        );
        assert_eq!(
            api.samplers().unwrap().endpoint().as_str(),
            "http://sd.local:7861/sdapi/v1/samplers"
        );
    }

    #[test]
    fn test_bad_url() {
        assert!(matches!(
            Api::new_with_url("not a url"),
            Err(ApiError::Url(_))
        ));
    }

    #[test]
    fn test_response_without_images() {
        let resp: ImgResponse<Txt2ImgRequest> =
            serde_json::from_str(r#"{"images": [], "info": "{}"}"#).unwrap();

        assert!(resp.images.is_empty());
        assert!(resp.parameters.is_none());
        assert_eq!(resp.info(), Some(ImgInfo::default()));
    }

    #[test]
    fn test_response_info() {
        let resp: ImgResponse<Txt2ImgRequest> = serde_json::from_str(
            r#"{
                "images": ["aGVsbG8="],
                "parameters": {"prompt": "a cat"},
                "info": "{\"seed\": 1234, \"sampler_name\": \"Euler a\", \"sd_model_name\": \"dreamshaper_8\"}"
            }"#,
        )
        .unwrap();

        let info = resp.info().unwrap();
        assert_eq!(info.seed, Some(1234));
        assert_eq!(info.sampler_name.as_deref(), Some("Euler a"));
        assert_eq!(info.sd_model_name.as_deref(), Some("dreamshaper_8"));
        assert_eq!(
            resp.parameters.and_then(|p| p.prompt).as_deref(),
            Some("a cat")
        );
    }

    #[test]
    fn test_unparseable_info_is_ignored() {
        let resp: ImgResponse<Txt2ImgRequest> =
            serde_json::from_str(r#"{"images": ["x"], "info": "not json"}"#).unwrap();
        assert!(resp.info().is_none());
    }

    #[tokio::test]
    async fn test_txt2img_over_http() {
        let (url, server) = serve(response(
            "200 OK",
            "application/json",
            r#"{"images": ["aW1hZ2U="], "parameters": {"prompt": "a cat"}, "info": "{\"seed\": 7}"}"#,
        ))
        .await;
        let api = Api::new_with_client_and_url(client(), url).unwrap();
        let mut req = Txt2ImgRequest::default();
        req.with_prompt("a cat".to_string());

        let resp = api.txt2img().unwrap().send(&req).await.unwrap();

        assert_eq!(resp.images, ["aW1hZ2U="]);
        assert_eq!(resp.info().and_then(|info| info.seed), Some(7));
        assert_eq!(server.await.unwrap(), "POST /sdapi/v1/txt2img HTTP/1.1");
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let (url, server) = serve(response(
            "500 Internal Server Error",
            "application/json",
            r#"{"error": "OutOfMemoryError"}"#,
        ))
        .await;
        let api = Api::new_with_client_and_url(client(), url).unwrap();

        let err = api
            .img2img()
            .unwrap()
            .send(&Img2ImgRequest::default())
            .await
            .unwrap_err();

        assert!(
            matches!(&err, ApiError::Status { status, body }
                if status.as_u16() == 500 && body.contains("OutOfMemoryError")),
            "{err:?}"
        );
        assert!(!err.is_timeout());
        assert_eq!(server.await.unwrap(), "POST /sdapi/v1/img2img HTTP/1.1");
    }

    #[tokio::test]
    async fn test_unparseable_body() {
        let (url, _server) = serve(response("200 OK", "text/html", "<html>loading</html>")).await;
        let api = Api::new_with_client_and_url(client(), url).unwrap();

        let err = api.samplers().unwrap().list().await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_timeout() {
        let (url, _server) = silent().await;
        let api = Api::new_with_timeout(url, Duration::from_millis(100)).unwrap();

        let err = api.samplers().unwrap().list().await.unwrap_err();

        assert!(err.is_timeout(), "{err:?}");
    }
}
