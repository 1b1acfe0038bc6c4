use stable_diffusion_api::{Img2ImgRequest, Txt2ImgRequest};

use crate::{GenerationError, GenerationRequest, Result};

/// Denoising strength for image to image requests that don't set one.
pub const DEFAULT_DENOISING_STRENGTH: f64 = 0.75;

/// A request ready to send, tagged with the endpoint it goes to.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendRequest {
    Txt2Img(Txt2ImgRequest),
    Img2Img(Img2ImgRequest),
}

impl BackendRequest {
    /// The parameters shared by both endpoints.
    pub fn params(&self) -> &Txt2ImgRequest {
        match self {
            Self::Txt2Img(request) => request,
            Self::Img2Img(request) => &request.params,
        }
    }

    pub fn endpoint_name(&self) -> &'static str {
        match self {
            Self::Txt2Img(_) => "txt2img",
            Self::Img2Img(_) => "img2img",
        }
    }
}

/// Parses a `"<width>x<height>"` string into two positive integers.
pub fn parse_resolution(resolution: &str) -> Result<(u32, u32)> {
    let invalid = || GenerationError::validation(format!("Invalid resolution: {resolution:?}"));

    let (width, height) = resolution.split_once('x').ok_or_else(invalid)?;
    // `u32::from_str` alone would accept a leading '+'.
    let parse = |dim: &str| match dim.parse::<u32>() {
        Ok(n) if n > 0 && dim.bytes().all(|b| b.is_ascii_digit()) => Ok(n),
        _ => Err(invalid()),
    };
    Ok((parse(width)?, parse(height)?))
}

/// Maps a generation request onto the WebUI's request schema.
///
/// Explicit `steps`/`guidance_scale` take precedence over the quality and style tiers. An
/// `init_image` payload selects the image to image endpoint.
pub fn build_request(
    request: &GenerationRequest,
    sampler: &str,
    init_image: Option<String>,
) -> Result<BackendRequest> {
    let model = request.model()?;
    let (width, height) = parse_resolution(&request.resolution)?;

    let steps = match request.steps {
        Some(0) => return Err(GenerationError::validation("Steps must be at least 1")),
        Some(steps) => steps,
        None => request.quality.steps(),
    };
    let cfg_scale = match request.guidance_scale {
        Some(cfg) if !cfg.is_finite() || cfg <= 0.0 => {
            return Err(GenerationError::validation(
                "CFG scale must be a positive number",
            ))
        }
        Some(cfg) => cfg,
        None => request.style.cfg_scale(),
    };

    let mut params = Txt2ImgRequest::default();
    params
        .with_prompt(request.prompt.clone())
        .with_negative_prompt(String::new())
        .with_size(width, height)
        .with_steps(steps)
        .with_cfg_scale(cfg_scale)
        .with_sampler_name(sampler.to_owned())
        .with_batch_size(1)
        .with_n_iter(1)
        .with_seed(-1)
        .with_model_checkpoint(model.checkpoint().to_owned());

    let Some(image) = init_image else {
        return Ok(BackendRequest::Txt2Img(params));
    };

    let denoising_strength = match request.denoising_strength {
        Some(d) if !(0.0..=1.0).contains(&d) => {
            return Err(GenerationError::validation(
                "Denoising strength must be between 0 and 1",
            ))
        }
        Some(d) => d,
        None => DEFAULT_DENOISING_STRENGTH,
    };

    let mut img2img = Img2ImgRequest::from_params(params);
    img2img
        .with_encoded_image(image)
        .with_denoising_strength(denoising_strength);
    Ok(BackendRequest::Img2Img(img2img))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Model, QualityTier, StyleTier};

    fn request(model: Model, quality: QualityTier, style: StyleTier) -> GenerationRequest {
        GenerationRequest {
            quality,
            style,
            ..GenerationRequest::new("a cat", "1024x1024", model)
        }
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1024x1024").unwrap(), (1024, 1024));
        assert_eq!(parse_resolution("512x768").unwrap(), (512, 768));
        assert_eq!(parse_resolution("1x4096").unwrap(), (1, 4096));
    }

    #[test]
    fn test_parse_malformed_resolution() {
        for bad in [
            "", "1024", "1024X1024", "1024*1024", "axb", "1024x", "x1024", "0x512", "512x0",
            "-512x512", "512x512x512", "512 x 512", "1.5x2", "+512x512", "512x+512",
        ] {
            assert!(
                matches!(parse_resolution(bad), Err(GenerationError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_txt2img_fields() {
        let built = build_request(
            &request(Model::Sdxl, QualityTier::Standard, StyleTier::Vivid),
            "Euler a",
            None,
        )
        .unwrap();

        let BackendRequest::Txt2Img(req) = &built else {
            panic!("expected txt2img, got {built:?}");
        };
        assert_eq!(built.endpoint_name(), "txt2img");
        assert_eq!(
            serde_json::to_value(req).unwrap(),
            json!({
                "prompt": "a cat",
                "negative_prompt": "",
                "width": 1024,
                "height": 1024,
                "steps": 30,
                "cfg_scale": 7.5,
                "sampler_name": "Euler a",
                "batch_size": 1,
                "n_iter": 1,
                "seed": -1,
                "override_settings": {"sd_model_checkpoint": "sd_xl_base_1.0.safetensors"}
            })
        );
    }

    #[test]
    fn test_tier_defaults() {
        let cases = [
            (QualityTier::Standard, StyleTier::Vivid, 30, 7.5),
            (QualityTier::Standard, StyleTier::Natural, 30, 7.0),
            (QualityTier::Hd, StyleTier::Vivid, 50, 7.5),
            (QualityTier::Hd, StyleTier::Natural, 50, 7.0),
        ];
        for (quality, style, steps, cfg) in cases {
            for model in Model::all() {
                let built = build_request(&request(model, quality, style), "Euler a", None).unwrap();
                assert_eq!(built.params().steps, Some(steps));
                assert_eq!(built.params().cfg_scale, Some(cfg));
                assert_eq!(built.params().model_checkpoint(), Some(model.checkpoint()));
            }
        }
    }

    #[test]
    fn test_explicit_overrides_win() {
        for (quality, style) in [
            (QualityTier::Standard, StyleTier::Vivid),
            (QualityTier::Hd, StyleTier::Natural),
        ] {
            let req = GenerationRequest {
                steps: Some(12),
                guidance_scale: Some(3.5),
                ..request(Model::Dreamshaper, quality, style)
            };

            let built = build_request(&req, "DDIM", None).unwrap();

            assert_eq!(built.params().steps, Some(12));
            assert_eq!(built.params().cfg_scale, Some(3.5));
            assert_eq!(built.params().sampler_name.as_deref(), Some("DDIM"));
        }
    }

    #[test]
    fn test_img2img_with_default_denoising() {
        let built = build_request(
            &request(Model::Dreamshaper, QualityTier::Hd, StyleTier::Natural),
            "Euler a",
            Some("aGVsbG8=".to_string()),
        )
        .unwrap();

        let BackendRequest::Img2Img(req) = &built else {
            panic!("expected img2img, got {built:?}");
        };
        assert_eq!(built.endpoint_name(), "img2img");
        assert_eq!(req.init_images, Some(vec!["aGVsbG8=".to_string()]));
        assert_eq!(req.denoising_strength, Some(DEFAULT_DENOISING_STRENGTH));
        assert_eq!(req.params.steps, Some(50));
        assert_eq!(
            req.params.model_checkpoint(),
            Some("dreamshaper_8.safetensors")
        );
    }

    #[test]
    fn test_img2img_explicit_denoising() {
        let req = GenerationRequest {
            denoising_strength: Some(0.4),
            ..request(Model::Sdxl, QualityTier::Standard, StyleTier::Vivid)
        };

        let BackendRequest::Img2Img(built) =
            build_request(&req, "Euler a", Some("abc".to_string())).unwrap()
        else {
            panic!("expected img2img");
        };
        assert_eq!(built.denoising_strength, Some(0.4));
    }

    #[test]
    fn test_txt2img_ignores_denoising() {
        let req = GenerationRequest {
            denoising_strength: Some(0.4),
            ..request(Model::Sdxl, QualityTier::Standard, StyleTier::Vivid)
        };

        let built = build_request(&req, "Euler a", None).unwrap();

        assert!(matches!(built, BackendRequest::Txt2Img(_)));
        assert!(serde_json::to_value(built.params())
            .unwrap()
            .get("denoising_strength")
            .is_none());
    }

    #[test]
    fn test_validation_errors() {
        let base = request(Model::Sdxl, QualityTier::Standard, StyleTier::Vivid);
        let bad = [
            GenerationRequest {
                model: "midjourney".to_string(),
                ..base.clone()
            },
            GenerationRequest {
                resolution: "big".to_string(),
                ..base.clone()
            },
            GenerationRequest {
                steps: Some(0),
                ..base.clone()
            },
            GenerationRequest {
                guidance_scale: Some(f64::NAN),
                ..base.clone()
            },
            GenerationRequest {
                guidance_scale: Some(-1.0),
                ..base.clone()
            },
        ];
        for req in bad {
            assert!(
                matches!(
                    build_request(&req, "Euler a", None),
                    Err(GenerationError::Validation(_))
                ),
                "{req:?} should be rejected"
            );
        }

        let req = GenerationRequest {
            denoising_strength: Some(1.5),
            ..base
        };
        assert!(matches!(
            build_request(&req, "Euler a", Some("abc".to_string())),
            Err(GenerationError::Validation(_))
        ));
    }
}
