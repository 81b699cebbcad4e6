use crate::{
    config::{GenerationConfig, GenerationParams},
    device::select_device,
    encode::encode_png_base64,
    error::GenerateError,
    pipelines::{Pipeline, TextToImagePipeline},
    tokens::TokenSource,
};

/// Guidance scale handed to the model call.
///
/// Turbo-distilled checkpoints are trained for the zero-guidance regime;
/// whatever a caller puts into [`GenerationParams`] is pinned to this value
/// at call time.
pub const TURBO_GUIDANCE_SCALE: f64 = 0.0;

/// Run one inference pass on an already loaded pipeline and return the image
/// as a base64-encoded PNG.
pub fn generate_with(
    pipeline: &mut dyn TextToImagePipeline,
    prompt: &str,
    params: GenerationParams,
) -> Result<String, GenerateError> {
    let params = GenerationParams {
        guidance_scale: TURBO_GUIDANCE_SCALE,
        ..params
    };

    let images = pipeline
        .generate(prompt, &params)
        .map_err(GenerateError::Inference)?;
    let image = images
        .first()
        .ok_or_else(|| GenerateError::Inference(anyhow::anyhow!("pipeline produced no images")))?;

    encode_png_base64(image).map_err(GenerateError::Encoding)
}

/// Load the configured model and generate one image for `prompt`.
///
/// The pipeline, and any accelerator memory it holds, is released before
/// this returns, on success and on error alike.
pub fn generate(
    config: &GenerationConfig,
    token: TokenSource,
    silent: bool,
    prompt: &str,
    params: GenerationParams,
) -> Result<String, GenerateError> {
    let device = select_device().map_err(GenerateError::Device)?;
    let mut pipeline =
        Pipeline::load(config, silent, token, &device).map_err(GenerateError::ModelResolution)?;
    generate_with(&mut pipeline, prompt, params)
}
