//! Turns the loose parameters a prompt UI collects into Stable Diffusion WebUI requests.
//!
//! A generation resolves the sampler against what the WebUI has loaded, resolves an optional
//! source image, maps quality/style tiers and the model key onto the WebUI's numeric fields and
//! checkpoint override, and returns the first image as a data URI.

mod backend;
mod builder;
mod generator;
mod image_source;
mod model;
mod sampler;
#[cfg(test)]
mod test_server;

pub use backend::*;
pub use builder::*;
pub use generator::*;
pub use image_source::*;
pub use model::*;
pub use sampler::*;

/// Errors produced while generating an image.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum GenerationError {
    /// The request itself is malformed.
    #[error("{0}")]
    Validation(String),
    /// The source image for an image to image request could not be retrieved.
    #[error("Failed to fetch image from URL {url}: {reason}")]
    Fetch { url: String, reason: String },
    /// The WebUI could not be reached, timed out, or refused to list its samplers.
    #[error("Stable Diffusion backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The WebUI answered the generation request with an error status.
    #[error("HTTP error! status: {status}, message: {message}")]
    Backend { status: u16, message: String },
    /// The WebUI reported success but returned no images.
    #[error("No image generated")]
    EmptyResult,
}

impl GenerationError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
