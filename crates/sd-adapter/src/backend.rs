use async_trait::async_trait;
use dyn_clone::DynClone;
use stable_diffusion_api::{Api, Img2ImgRequest, ImgResponse, Sampler, Txt2ImgRequest};

dyn_clone::clone_trait_object!(DiffusionBackend);

/// The parts of the Stable Diffusion WebUI API a generation needs.
#[async_trait]
pub trait DiffusionBackend: std::fmt::Debug + DynClone + Send + Sync {
    /// Lists the samplers the WebUI has loaded.
    async fn samplers(&self) -> stable_diffusion_api::Result<Vec<Sampler>>;

    async fn txt2img(
        &self,
        request: &Txt2ImgRequest,
    ) -> stable_diffusion_api::Result<ImgResponse<Txt2ImgRequest>>;

    async fn img2img(
        &self,
        request: &Img2ImgRequest,
    ) -> stable_diffusion_api::Result<ImgResponse<Img2ImgRequest>>;
}

#[async_trait]
impl DiffusionBackend for Api {
    async fn samplers(&self) -> stable_diffusion_api::Result<Vec<Sampler>> {
        Api::samplers(self)?.list().await
    }

    async fn txt2img(
        &self,
        request: &Txt2ImgRequest,
    ) -> stable_diffusion_api::Result<ImgResponse<Txt2ImgRequest>> {
        Api::txt2img(self)?.send(request).await
    }

    async fn img2img(
        &self,
        request: &Img2ImgRequest,
    ) -> stable_diffusion_api::Result<ImgResponse<Img2ImgRequest>> {
        Api::img2img(self)?.send(request).await
    }
}
