mod sdxl;

use anyhow::Result;
use candle_core::Device;
use image::DynamicImage;
use tracing::info;

use crate::{
    config::{GenerationConfig, GenerationParams},
    source::ModelSource,
    tokens::TokenSource,
};
use sdxl::SdxlPipeline;

/// One loaded text-to-image model exposing a single inference entry point.
///
/// This is the seam between the one-shot invoker and the pretrained model
/// backend; tests substitute a recording double for the real thing.
pub trait TextToImagePipeline {
    /// Run one inference pass, returning the generated images.
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> Result<Vec<DynamicImage>>;
}

/// Represents the model and provides methods to load and interact with it.
pub struct Pipeline {
    model: Box<dyn TextToImagePipeline>,
}

impl Pipeline {
    /// Load the model named by `config` onto `device`.
    ///
    /// The pipeline class is read from the repo's `model_index.json` before
    /// any weights are downloaded.
    pub fn load(
        config: &GenerationConfig,
        silent: bool,
        token: TokenSource,
        device: &Device,
    ) -> Result<Self> {
        info!("loading model id: {}", config.model_id);

        let source = ModelSource::new(&config.model_id, config.revision.clone(), silent, token)?;
        let class = source.pipeline_class()?;
        info!("model architecture is: {class}");

        let dtype = config.dtype.resolve(device);
        let model: Box<dyn TextToImagePipeline> = match class.as_str() {
            "StableDiffusionXLPipeline" => Box::new(SdxlPipeline::load(&source, device, dtype)?),
            other => anyhow::bail!("unexpected pipeline class `{other:?}`"),
        };

        Ok(Self { model })
    }
}

impl TextToImagePipeline for Pipeline {
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> Result<Vec<DynamicImage>> {
        self.model.generate(prompt, params)
    }
}
