use axum::{
    body::StreamBody,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use prompt_relay::Relay;
use sd_adapter::{GenerationOutput, GenerationRequest};
use tracing::{error, info};

use crate::{
    api_error::ApiError,
    dtos::{ChatDto, CompareImagesDto, CompareImagesResponse, GenerateImageDto, TtsDto},
    json_from_request::JsonFromRequest,
    AppState,
};

pub async fn get_health() -> &'static str {
    "ok"
}

pub async fn generate_image(
    State(state): State<AppState>,
    JsonFromRequest(dto): JsonFromRequest<GenerateImageDto>,
) -> Result<Json<GenerationOutput>, ApiError> {
    info!(
        model = %dto.model,
        size = %dto.params.size,
        img2img = dto.params.init_image.is_some(),
        "received image generation request"
    );
    let request = GenerationRequest::from(dto);
    match state.generator.generate(&request).await {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            error!("Error in image generation: {}", e);
            Err(ApiError::internal(format!("Error generating image: {e}")))
        }
    }
}

pub async fn compare_images(
    State(state): State<AppState>,
    JsonFromRequest(dto): JsonFromRequest<CompareImagesDto>,
) -> Result<Json<CompareImagesResponse>, ApiError> {
    info!(
        models = ?dto.models.iter().map(|s| s.model.as_str()).collect::<Vec<_>>(),
        size = %dto.params.size,
        "received comparison request"
    );
    let request = dto.params.into_request(String::new());
    match state.generator.compare(&request, &dto.models).await {
        Ok(results) => Ok(Json(CompareImagesResponse { results })),
        Err(e) => {
            error!("Error in model comparison: {}", e);
            Err(ApiError::internal(format!("Error generating images: {e}")))
        }
    }
}

pub async fn get_samplers(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    match state.generator.backend().samplers().await {
        Ok(samplers) => Ok(Json(samplers.into_iter().map(|s| s.name).collect())),
        Err(e) => {
            error!("Error fetching samplers: {}", e);
            Err(ApiError::internal(format!("Failed to fetch samplers: {e}")))
        }
    }
}

fn relay(state: &AppState) -> Result<&Relay, ApiError> {
    state
        .relay
        .as_ref()
        .ok_or_else(|| ApiError::internal("Language model relay is not configured"))
}

pub async fn chat(
    State(state): State<AppState>,
    JsonFromRequest(dto): JsonFromRequest<ChatDto>,
) -> Result<Response, ApiError> {
    let relay = relay(&state)?;
    let stream = relay
        .chat_stream(dto.messages, dto.model.as_deref(), dto.category.as_deref())
        .await
        .map_err(|e| {
            error!("Error requesting prompt: {}", e);
            ApiError::internal(format!("Error generating prompt: {e}"))
        })?;

    let stream = stream.inspect(|item| {
        if let Err(e) = item {
            error!("Prompt stream failed: {}", e);
        }
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        StreamBody::new(stream),
    )
        .into_response())
}

pub async fn tts(
    State(state): State<AppState>,
    JsonFromRequest(dto): JsonFromRequest<TtsDto>,
) -> Result<Response, ApiError> {
    let relay = relay(&state)?;
    match relay.speech(&dto.text, dto.voice.as_deref()).await {
        Ok(audio) => Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()),
        Err(e) => {
            error!("Error generating TTS: {}", e);
            Err(ApiError::internal("Error generating TTS"))
        }
    }
}
