use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use prompt_relay::Relay;
use sd_adapter::Generator;
use stable_diffusion_api::Api;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{config::Config, controller};

#[derive(Clone, Debug)]
pub struct AppState {
    pub generator: Generator,
    /// Absent when no language model API key is configured.
    pub relay: Option<Relay>,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.sd_timeout_secs);
        let api = Api::new_with_timeout(&config.sd_api_url, timeout)
            .context("Failed to initialize sd api")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build image fetch client")?;

        let relay = match &config.openai_api_key {
            Some(key) => Some(
                Relay::new_with_timeout(
                    &config.openai_api_url,
                    key.clone(),
                    Duration::from_secs(config.llm_timeout_secs),
                )
                .context("Failed to initialize language model relay")?
                .chat_model(config.chat_model.clone())
                .tts_model(config.tts_model.clone())
                .voice(config.tts_voice.clone()),
            ),
            None => {
                warn!("No openai_api_key configured, prompt and speech endpoints are disabled");
                None
            }
        };

        Ok(Self {
            generator: Generator::with_api(api, client),
            relay,
        })
    }
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET]);

    Router::new()
        .route("/health", get(controller::get_health))
        .route("/api/generate-image", post(controller::generate_image))
        .route("/api/compare-images", post(controller::compare_images))
        .route("/api/samplers", get(controller::get_samplers))
        .route("/api/chat", post(controller::chat))
        .route("/api/tts", post(controller::tts))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
