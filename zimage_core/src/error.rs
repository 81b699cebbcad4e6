use thiserror::Error;

/// Failure of one one-shot generation, by origin.
///
/// The display form is the underlying message unchanged; the variant records
/// which stage failed. Callers that only report the message can format the
/// error directly.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The configured model ID could not be resolved, downloaded or loaded.
    #[error("{0}")]
    ModelResolution(anyhow::Error),

    /// The selected device could not be constructed.
    #[error("{0}")]
    Device(anyhow::Error),

    /// The forward pass failed, or produced no image.
    #[error("{0}")]
    Inference(anyhow::Error),

    /// The generated image could not be serialized.
    #[error("{0}")]
    Encoding(anyhow::Error),
}
