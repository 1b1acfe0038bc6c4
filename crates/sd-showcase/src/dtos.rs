use prompt_relay::ChatMessage;
use sd_adapter::{GenerationOutput, GenerationRequest, Model, ModelSelection, QualityTier, StyleTier};
use serde::{Deserialize, Serialize};

/// Image parameters shared by single generations and comparisons.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImageParamsDto {
    pub prompt: String,
    pub size: String,
    #[serde(default)]
    pub quality: QualityTier,
    #[serde(default)]
    pub style: StyleTier,
    pub init_image: Option<String>,
    pub steps: Option<u32>,
    #[serde(alias = "cfg_scale")]
    pub cfg_scale: Option<f64>,
    pub sampler: Option<String>,
    #[serde(alias = "denoising_strength")]
    pub denoising_strength: Option<f64>,
}

impl ImageParamsDto {
    pub fn into_request(self, model: String) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt,
            resolution: self.size,
            quality: self.quality,
            style: self.style,
            model,
            sampler: self.sampler.filter(|s| !s.is_empty()),
            steps: self.steps,
            guidance_scale: self.cfg_scale,
            denoising_strength: self.denoising_strength,
            init_image: self.init_image.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct GenerateImageDto {
    pub model: String,
    #[serde(flatten)]
    pub params: ImageParamsDto,
}

impl From<GenerateImageDto> for GenerationRequest {
    fn from(dto: GenerateImageDto) -> Self {
        dto.params.into_request(dto.model)
    }
}

fn default_selections() -> Vec<ModelSelection> {
    Model::all().map(ModelSelection::from).collect()
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompareImagesDto {
    #[serde(default = "default_selections")]
    pub models: Vec<ModelSelection>,
    #[serde(flatten)]
    pub params: ImageParamsDto,
}

#[derive(Serialize, Debug)]
pub struct CompareImagesResponse {
    pub results: Vec<GenerationOutput>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatDto {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TtsDto {
    pub text: String,
    pub voice: Option<String>,
}
