use std::pin::Pin;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{check_status, Relay, RelayError, Result, SseDecoder};

const DONE: &str = "[DONE]";

const BASE_SYSTEM_MESSAGE: &str =
    "You are an AI assistant specialized in creating prompts for text-to-image generators. ";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Text tokens of a streamed completion.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Instruction that steers the language model towards prompts suited to `model`.
pub fn system_message(model: Option<&str>, category: Option<&str>) -> String {
    let category = category.unwrap_or_default();
    match model {
        Some("sdxl") => format!(
            "{BASE_SYSTEM_MESSAGE}Focus on creating detailed, realistic prompts for the SDXL model, \
             emphasizing {category}. Include specific details about lighting, composition, and \
             style that SDXL excels at rendering."
        ),
        Some("dreamshaper") => format!(
            "{BASE_SYSTEM_MESSAGE}Create imaginative and fantastical prompts for the Dreamshaper \
             model, focusing on {category}. Emphasize unique and creative elements that showcase \
             Dreamshaper's ability to generate surreal and stylized images."
        ),
        _ => format!(
            "{BASE_SYSTEM_MESSAGE}Provide detailed descriptions of images based on the given theme \
             and user prompts, including elements, style, details, and colors."
        ),
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize, Debug, Default)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug, Default)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Debug, Default)]
struct Delta {
    content: Option<String>,
}

impl ChatChunk {
    fn content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Content of one streamed event, or `None` for events without text.
fn parse_event(event: &str) -> Result<Option<String>> {
    Ok(serde_json::from_str::<ChatChunk>(event)?.content())
}

fn with_system_message(
    messages: Vec<ChatMessage>,
    model: Option<&str>,
    category: Option<&str>,
) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage::new(
        Role::System,
        system_message(model, category),
    ))
    .chain(messages)
    .collect()
}

impl Relay {
    /// Streams a completion for `messages`.
    ///
    /// A system message chosen by `model` and `category` is put in front of the history. The
    /// request is sent before this returns, so an upstream error is reported here rather than
    /// inside the stream. Dropping the stream stops reading from the provider.
    pub async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<&str>,
        category: Option<&str>,
    ) -> Result<ChatStream> {
        if messages.is_empty() {
            return Err(RelayError::EmptyInput);
        }

        let endpoint = self.endpoint("chat/completions")?;
        info!(model = ?model, category = ?category, messages = messages.len(), "requesting prompt");
        let request = ChatRequest {
            model: &self.chat_model,
            stream: true,
            messages: with_system_message(messages, model, category),
        };

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(RelayError::Request)?;
        let mut body = check_status(response).await?.bytes_stream();

        Ok(Box::pin(try_stream! {
            let mut decoder = SseDecoder::new();
            let mut done = false;
            'read: while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(RelayError::Request)?;
                for event in decoder.push(&chunk) {
                    if event == DONE {
                        debug!("completion finished");
                        done = true;
                        break 'read;
                    }
                    if let Some(content) = parse_event(&event)? {
                        yield content;
                    }
                }
            }
            if !done {
                // The body may end without a blank line after the last event.
                if let Some(event) = decoder.finish().filter(|event| event != DONE) {
                    if let Some(content) = parse_event(&event)? {
                        yield content;
                    }
                }
            }
        }))
    }
}
