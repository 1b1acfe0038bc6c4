use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::{check_status, Relay, RelayError, Result};

#[derive(Serialize, Debug, PartialEq)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

impl Relay {
    fn speech_request<'a>(&'a self, text: &'a str, voice: Option<&'a str>) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.tts_model,
            voice: voice.unwrap_or(&self.voice),
            input: text,
        }
    }

    /// Synthesizes `text` and returns the complete `audio/mpeg` payload.
    pub async fn speech(&self, text: &str, voice: Option<&str>) -> Result<Bytes> {
        if text.trim().is_empty() {
            return Err(RelayError::EmptyInput);
        }

        let endpoint = self.endpoint("audio/speech")?;
        let request = self.speech_request(text, voice);
        info!(voice = request.voice, chars = text.len(), "synthesizing speech");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(RelayError::Request)?;
        check_status(response)
            .await?
            .bytes()
            .await
            .map_err(RelayError::Request)
    }
}
