use futures::future::try_join_all;
use stable_diffusion_api::{Api, ApiError, ImgResponse};
use tracing::{debug, info, info_span, Instrument};

use crate::{
    build_request, parse_resolution, resolve_init_image, resolve_sampler, BackendRequest,
    DiffusionBackend, GenerationError, GenerationOutput, GenerationRequest, HttpImageFetcher,
    ImageFetcher, ModelSelection, Result,
};

/// Generates images against a Stable Diffusion WebUI.
#[derive(Clone, Debug)]
pub struct Generator {
    backend: Box<dyn DiffusionBackend>,
    fetcher: Box<dyn ImageFetcher>,
}

impl Generator {
    pub fn new(backend: Box<dyn DiffusionBackend>, fetcher: Box<dyn ImageFetcher>) -> Self {
        Self { backend, fetcher }
    }

    /// A generator talking to `api`, fetching source images with `client`.
    pub fn with_api(api: Api, client: reqwest::Client) -> Self {
        Self::new(Box::new(api), Box::new(HttpImageFetcher::new(client)))
    }

    /// The WebUI this generator talks to.
    pub fn backend(&self) -> &dyn DiffusionBackend {
        self.backend.as_ref()
    }

    /// Generates one image.
    ///
    /// The model and resolution are checked before anything is sent. Then the sampler and the
    /// optional source image are resolved, the request is built and sent, and the first image
    /// of the response is returned as a PNG data URI.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput> {
        let model = request.model()?;
        parse_resolution(&request.resolution)?;

        async move {
            let sampler = resolve_sampler(self.backend.as_ref(), request.sampler.as_deref()).await?;

            let init_image = match &request.init_image {
                Some(reference) => Some(resolve_init_image(self.fetcher.as_ref(), reference).await?),
                None => None,
            };

            let backend_request = build_request(request, &sampler.name, init_image)?;
            debug!(
                endpoint = backend_request.endpoint_name(),
                steps = ?backend_request.params().steps,
                cfg_scale = ?backend_request.params().cfg_scale,
                sampler = %sampler.name,
                "built backend request"
            );

            let images = self.send(&backend_request).await?;
            let image = images
                .into_iter()
                .next()
                .ok_or(GenerationError::EmptyResult)?;

            info!("generated image");
            Ok(GenerationOutput {
                model,
                image_data: format!("data:image/png;base64,{image}"),
                sampler: sampler.name,
                sampler_substituted: sampler.substituted,
            })
        }
        .instrument(info_span!("generate", %model))
        .await
    }

    /// Generates the same prompt with each selected model concurrently.
    ///
    /// Either every generation succeeds and the outputs are returned in selection order, or the
    /// first failure is returned and the remaining generations are dropped.
    pub async fn compare(
        &self,
        request: &GenerationRequest,
        selections: &[ModelSelection],
    ) -> Result<Vec<GenerationOutput>> {
        if selections.is_empty() {
            return Err(GenerationError::validation("No models selected"));
        }

        // Every key is checked before any generation starts.
        let requests = selections
            .iter()
            .map(|selection| -> Result<GenerationRequest> {
                let mut request = request.for_model(selection.model.parse()?);
                if let Some(sampler) = &selection.sampler {
                    request.sampler = Some(sampler.clone());
                }
                Ok(request)
            })
            .collect::<Result<Vec<_>>>()?;

        try_join_all(requests.iter().map(|request| self.generate(request))).await
    }

    async fn send(&self, request: &BackendRequest) -> Result<Vec<String>> {
        let images = match request {
            BackendRequest::Txt2Img(req) => self.backend.txt2img(req).await.map(log_info)?,
            BackendRequest::Img2Img(req) => self.backend.img2img(req).await.map(log_info)?,
        };
        Ok(images)
    }
}

fn log_info<T>(response: ImgResponse<T>) -> Vec<String> {
    if let Some(info) = response.info() {
        debug!(seed = ?info.seed, model = ?info.sd_model_name, "backend image info");
    }
    response.images
}

impl From<ApiError> for GenerationError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => Self::Backend {
                status: status.as_u16(),
                message: body,
            },
            err if err.is_timeout() => {
                Self::BackendUnavailable(format!("Stable Diffusion request timed out: {err}"))
            }
            err => Self::BackendUnavailable(err.to_string()),
        }
    }
}
