//! Core crate of zimage: one-shot text-to-image generation with
//! turbo-class diffusion models.
//!
//! The API is intentionally small: pick a device, load the configured
//! pipeline, run one inference pass, and hand back the image as a
//! base64-encoded PNG.
//!
//! ```rust,no_run
//! use zimage_core::{generate, GenerationConfig, GenerationParams, TokenSource};
//!
//! let encoded = generate(
//!     &GenerationConfig::default(),
//!     TokenSource::CacheToken,
//!     false,
//!     "a red circle",
//!     GenerationParams::default(),
//! )?;
//! println!("{encoded}");
//!
//! # Ok::<(), zimage_core::GenerateError>(())
//! ```

mod config;
mod device;
mod encode;
mod error;
mod generate;
mod pipelines;
mod source;
mod tokens;

pub use config::{GenerationConfig, GenerationParams, DEFAULT_MODEL_ID};
pub use device::{select_device, ModelDType};
pub use encode::{encode_png_base64, png_bytes};
pub use error::GenerateError;
pub use generate::{generate, generate_with, TURBO_GUIDANCE_SCALE};
pub use pipelines::{Pipeline, TextToImagePipeline};
pub use tokens::TokenSource;
