//! Thin relay to an OpenAI-compatible API for prompt writing and speech.

use std::time::Duration;

use reqwest::Url;

mod chat;
pub use chat::*;

mod debounce;
pub use debounce::*;

mod speech;
pub use speech::*;

mod sse;
pub use sse::*;

#[cfg(test)]
mod test_server;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_VOICE: &str = "alloy";

/// Errors returned by the relay.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Failed to parse endpoint URL")]
    Url(#[from] url::ParseError),
    /// The request could not be sent, timed out, or the body could not be read.
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// The provider answered with a non-success status.
    #[error("got error code: {status}, message text: {message}")]
    Upstream { status: u16, message: String },
    /// A streamed event was not valid JSON.
    #[error("Invalid event in response stream")]
    InvalidEvent(#[from] serde_json::Error),
    #[error("Nothing to send")]
    EmptyInput,
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Connection to an OpenAI-compatible API.
#[derive(Clone, Debug)]
pub struct Relay {
    client: reqwest::Client,
    url: Url,
    api_key: String,
    chat_model: String,
    tts_model: String,
    voice: String,
}

impl Relay {
    /// Returns a new `Relay` for the API at `url`.
    ///
    /// # Errors
    ///
    /// If the URL fails to parse, an error will be returned.
    pub fn new_with_client_and_url<S>(client: reqwest::Client, url: S, api_key: String) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let mut url = Url::parse(url.as_ref())?;
        // Endpoints are joined onto the base, which drops the last segment unless it ends in '/'.
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        Ok(Self {
            client,
            url,
            api_key,
            chat_model: DEFAULT_CHAT_MODEL.to_owned(),
            tts_model: DEFAULT_TTS_MODEL.to_owned(),
            voice: DEFAULT_VOICE.to_owned(),
        })
    }

    /// Returns a new `Relay` whose requests give up after `timeout`.
    pub fn new_with_timeout<S>(url: S, api_key: String, timeout: Duration) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RelayError::Request)?;
        Self::new_with_client_and_url(client, url, api_key)
    }

    /// Sets the model used for chat completions.
    pub fn chat_model(mut self, model: String) -> Self {
        self.chat_model = model;
        self
    }

    /// Sets the model used for speech synthesis.
    pub fn tts_model(mut self, model: String) -> Self {
        self.tts_model = model;
        self
    }

    /// Sets the voice used when a speech request doesn't pick one.
    pub fn voice(mut self, voice: String) -> Self {
        self.voice = voice;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.url.join(path)?)
    }
}

/// Turns a non-success response into [`RelayError::Upstream`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.map_err(RelayError::Request)?;
    Err(RelayError::Upstream {
        status: status.as_u16(),
        message,
    })
}
