use std::{net::SocketAddr, path::Path};

use anyhow::Context;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Base URL of the Stable Diffusion WebUI.
    pub sd_api_url: String,
    /// Upper bound on any single WebUI request, in seconds.
    pub sd_timeout_secs: u64,
    /// Largest accepted request body; init images arrive inline.
    pub body_limit_bytes: usize,
    /// Key for the language model provider. Prompt and speech endpoints are disabled without it.
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub llm_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            sd_api_url: stable_diffusion_api::DEFAULT_URL.to_owned(),
            sd_timeout_secs: 300,
            body_limit_bytes: 32 * 1024 * 1024,
            openai_api_key: None,
            openai_api_url: prompt_relay::DEFAULT_API_URL.to_owned(),
            chat_model: prompt_relay::DEFAULT_CHAT_MODEL.to_owned(),
            tts_model: prompt_relay::DEFAULT_TTS_MODEL.to_owned(),
            tts_voice: prompt_relay::DEFAULT_VOICE.to_owned(),
            llm_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Defaults, then the system config, the local config, `extra`, and `SD_SHOWCASE_*`
    /// environment variables, later sources winning.
    pub fn figment(extra: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("/etc/sd-showcase/config.toml"))
            .merge(Toml::file("config.toml"));
        if let Some(path) = extra {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("SD_SHOWCASE_"))
    }

    pub fn load(extra: Option<&Path>) -> anyhow::Result<Self> {
        Self::figment(extra)
            .extract()
            .context("Invalid configuration")
    }
}
