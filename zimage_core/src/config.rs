use crate::device::ModelDType;

/// Model ID used when deployment supplies nothing else.
///
/// This is the standard distilled turbo checkpoint. Deployments that ship a
/// different turbo model point at it through configuration (see the
/// `zimage_cli` environment handling) instead of editing this constant.
pub const DEFAULT_MODEL_ID: &str = "stabilityai/sdxl-turbo";

/// Which model to load, and at what precision.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Hugging Face model ID of the pipeline to load.
    pub model_id: String,
    /// Repo revision. Defaults to `main`.
    pub revision: Option<String>,
    /// Numeric precision for the loaded weights.
    pub dtype: ModelDType,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: None,
            dtype: ModelDType::Auto,
        }
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// The number of denoising steps. Turbo models are distilled for very few
    /// steps, usually between 1 and 4.
    pub num_steps: usize,
    /// Requested guidance scale. The one-shot call path pins this to 0.0
    /// before the model sees it; see [`crate::TURBO_GUIDANCE_SCALE`].
    pub guidance_scale: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            num_steps: 4,
            guidance_scale: 7.5,
        }
    }
}
