use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::GenerationError;

/// Models the UI can pick from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Sdxl,
    Dreamshaper,
}

impl Model {
    const ALL: [Model; 2] = [Model::Sdxl, Model::Dreamshaper];

    /// Every model, in the order the UI lists them.
    pub fn all() -> impl Iterator<Item = Model> {
        Self::ALL.into_iter()
    }

    pub fn key(self) -> &'static str {
        self.entry().0
    }

    /// Checkpoint filename passed as `sd_model_checkpoint`.
    pub fn checkpoint(self) -> &'static str {
        self.entry().1
    }

    /// Model key and the checkpoint the WebUI loads for it.
    fn entry(self) -> (&'static str, &'static str) {
        match self {
            Model::Sdxl => ("sdxl", "sd_xl_base_1.0.safetensors"),
            Model::Dreamshaper => ("dreamshaper", "dreamshaper_8.safetensors"),
        }
    }
}

impl FromStr for Model {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::all()
            .find(|model| model.key() == s)
            .ok_or_else(|| GenerationError::validation(format!("Unsupported model: {s}")))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Coarse quality setting. Maps to a step count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum QualityTier {
    #[default]
    Standard,
    Hd,
}

impl QualityTier {
    pub fn steps(self) -> u32 {
        match self {
            Self::Standard => 30,
            Self::Hd => 50,
        }
    }
}

// Anything other than "hd" is standard quality.
impl From<String> for QualityTier {
    fn from(value: String) -> Self {
        if value == "hd" {
            Self::Hd
        } else {
            Self::Standard
        }
    }
}

/// Coarse style setting. Maps to a guidance (cfg) scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum StyleTier {
    Vivid,
    #[default]
    Natural,
}

impl StyleTier {
    pub fn cfg_scale(self) -> f64 {
        match self {
            Self::Vivid => 7.5,
            Self::Natural => 7.0,
        }
    }
}

// Anything other than "vivid" is natural.
impl From<String> for StyleTier {
    fn from(value: String) -> Self {
        if value == "vivid" {
            Self::Vivid
        } else {
            Self::Natural
        }
    }
}

/// Everything needed to generate one image.
///
/// `resolution` and `model` are kept as the caller sent them and validated when the request is
/// built, so bad input surfaces as [`GenerationError::Validation`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// `"<width>x<height>"`, e.g. `"1024x1024"`.
    pub resolution: String,
    pub quality: QualityTier,
    pub style: StyleTier,
    /// Model key, e.g. `"sdxl"`.
    pub model: String,
    /// Overrides the default sampler.
    pub sampler: Option<String>,
    /// Overrides the step count derived from `quality`.
    pub steps: Option<u32>,
    /// Overrides the cfg scale derived from `style`.
    pub guidance_scale: Option<f64>,
    /// Overrides the default image to image denoising strength.
    pub denoising_strength: Option<f64>,
    /// A URL or `data:image/...` URI of a source image.
    pub init_image: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, resolution: impl Into<String>, model: Model) -> Self {
        Self {
            prompt: prompt.into(),
            resolution: resolution.into(),
            model: model.key().to_owned(),
            ..Default::default()
        }
    }

    /// Parses the model key.
    pub fn model(&self) -> crate::Result<Model> {
        self.model.parse()
    }

    /// A copy of this request targeting another model.
    pub fn for_model(&self, model: Model) -> Self {
        Self {
            model: model.key().to_owned(),
            ..self.clone()
        }
    }
}

/// One side of a model comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    /// Model key, checked when the comparison runs.
    pub model: String,
    /// Sampler for this model only; falls back to the request's sampler.
    #[serde(default)]
    pub sampler: Option<String>,
}

impl From<Model> for ModelSelection {
    fn from(model: Model) -> Self {
        Self {
            model: model.key().to_owned(),
            sampler: None,
        }
    }
}

/// A generated image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub model: Model,
    /// `data:image/png;base64,...`
    pub image_data: String,
    /// Sampler the image was generated with.
    pub sampler: String,
    /// True when the requested sampler was unavailable and the fallback was used.
    pub sampler_substituted: bool,
}
