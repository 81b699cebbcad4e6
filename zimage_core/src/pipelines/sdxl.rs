use std::time::Instant;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_transformers::models::stable_diffusion::{
    self, clip, schedulers::Scheduler, unet_2d::UNet2DConditionModel, vae::AutoEncoderKL,
    StableDiffusionConfig,
};
use image::{DynamicImage, RgbImage};
use tokenizers::Tokenizer;
use tracing::info;

use crate::{config::GenerationParams, pipelines::TextToImagePipeline, source::ModelSource};

// The SDXL repos ship their tokenizers in the original vocab/merges layout;
// the `tokenizers`-compatible files live in the upstream CLIP repos.
const TOKENIZER_REPO: &str = "openai/clip-vit-large-patch14";
const TOKENIZER_2_REPO: &str = "laion/CLIP-ViT-bigG-14-laion2B-39B-b160k";
// The stock SDXL VAE overflows in f16; this repo carries an f16-safe refit.
const VAE_F16_FIX_REPO: &str = "madebyollin/sdxl-vae-fp16-fix";

const VAE_SCALE: f64 = 0.13025;
const LATENT_CHANNELS: usize = 4;

/// SDXL-class turbo pipeline: two CLIP text encoders, a UNet and a VAE,
/// denoised with the scheduler the model config prescribes.
pub(crate) struct SdxlPipeline {
    config: StableDiffusionConfig,
    tokenizer: Tokenizer,
    tokenizer_2: Tokenizer,
    text_encoder: clip::ClipTextTransformer,
    text_encoder_2: clip::ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
    device: Device,
    dtype: DType,
}

impl SdxlPipeline {
    pub(crate) fn load(source: &ModelSource, device: &Device, dtype: DType) -> Result<Self> {
        let use_f16 = dtype == DType::F16;
        let config = StableDiffusionConfig::sdxl_turbo(None, None, None);

        let tokenizer = Tokenizer::from_file(source.get_from(TOKENIZER_REPO, "tokenizer.json")?)
            .map_err(anyhow::Error::msg)?;
        let tokenizer_2 =
            Tokenizer::from_file(source.get_from(TOKENIZER_2_REPO, "tokenizer.json")?)
                .map_err(anyhow::Error::msg)?;

        // The text encoders run in f32 regardless of the model dtype; their
        // embeddings are cast afterwards.
        let text_encoder = stable_diffusion::build_clip_transformer(
            &config.clip,
            source.get("text_encoder/model.safetensors")?,
            device,
            DType::F32,
        )?;
        let clip2_config = config
            .clip2
            .as_ref()
            .context("expected a second text encoder for an SDXL class model")?;
        let text_encoder_2 = stable_diffusion::build_clip_transformer(
            clip2_config,
            source.get("text_encoder_2/model.safetensors")?,
            device,
            DType::F32,
        )?;

        let vae_weights = if use_f16 {
            source.get_from(VAE_F16_FIX_REPO, "diffusion_pytorch_model.safetensors")?
        } else {
            source.get("vae/diffusion_pytorch_model.safetensors")?
        };
        let vae = config.build_vae(vae_weights, device, dtype)?;

        let unet_weights = if use_f16 {
            source.get("unet/diffusion_pytorch_model.fp16.safetensors")?
        } else {
            source.get("unet/diffusion_pytorch_model.safetensors")?
        };
        let unet = config.build_unet(unet_weights, device, LATENT_CHANNELS, false, dtype)?;

        Ok(Self {
            config,
            tokenizer,
            tokenizer_2,
            text_encoder,
            text_encoder_2,
            unet,
            vae,
            device: device.clone(),
            dtype,
        })
    }

    /// Embed `prompt` with one CLIP encoder, padded to the encoder's context
    /// length.
    fn text_embedding(
        &self,
        prompt: &str,
        tokenizer: &Tokenizer,
        encoder: &clip::ClipTextTransformer,
        config: &clip::Config,
    ) -> Result<Tensor> {
        let vocab = tokenizer.get_vocab(true);
        let pad_id = match &config.pad_with {
            Some(padding) => *vocab
                .get(padding.as_str())
                .context("tokenizer is missing its pad token")?,
            None => *vocab
                .get("<|endoftext|>")
                .context("tokenizer is missing `<|endoftext|>`")?,
        };
        let mut tokens = tokenizer
            .encode(prompt, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .to_vec();
        if tokens.len() > config.max_position_embeddings {
            anyhow::bail!(
                "the prompt is too long, {} > max tokens ({})",
                tokens.len(),
                config.max_position_embeddings
            );
        }
        while tokens.len() < config.max_position_embeddings {
            tokens.push(pad_id)
        }
        let tokens = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        Ok(encoder.forward(&tokens)?)
    }

    /// Embed the prompt with both encoders, concatenated along the hidden
    /// dimension. With guidance enabled, unconditional embeddings are stacked
    /// in front along the batch dimension.
    fn encode_prompt(&self, prompt: &str, use_guidance: bool) -> Result<Tensor> {
        let clip2_config = self
            .config
            .clip2
            .as_ref()
            .context("expected a second text encoder for an SDXL class model")?;
        let encoders = [
            (&self.tokenizer, &self.text_encoder, &self.config.clip),
            (&self.tokenizer_2, &self.text_encoder_2, clip2_config),
        ];

        let mut embeddings = Vec::new();
        for (tokenizer, encoder, config) in encoders {
            let cond = self.text_embedding(prompt, tokenizer, encoder, config)?;
            let embedding = if use_guidance {
                let uncond = self.text_embedding("", tokenizer, encoder, config)?;
                Tensor::cat(&[uncond, cond], 0)?
            } else {
                cond
            };
            embeddings.push(embedding);
        }

        Ok(Tensor::cat(&embeddings, D::Minus1)?.to_dtype(self.dtype)?)
    }

    /// Convert the decoded `(batch, channel, height, width)` tensor into RGB
    /// images.
    fn to_images(&self, decoded: &Tensor) -> Result<Vec<DynamicImage>> {
        let images = ((decoded.to_dtype(DType::F32)? / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
        let images = (images.clamp(0f32, 1f32)? * 255.)?.to_dtype(DType::U8)?;

        let (_b, c, h, w) = images.dims4()?;
        if c != 3 {
            anyhow::bail!("expected 3 channels in image output");
        }
        let mut out = Vec::new();
        for image in images.chunk(images.dim(0)?, 0)? {
            let flattened = image.squeeze(0)?.permute((1, 2, 0))?.flatten_all()?;
            #[allow(clippy::cast_possible_truncation)]
            out.push(DynamicImage::ImageRgb8(
                RgbImage::from_raw(w as u32, h as u32, flattened.to_vec1::<u8>()?)
                    .context("rgb image has invalid capacity")?,
            ));
        }
        Ok(out)
    }
}

impl TextToImagePipeline for SdxlPipeline {
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> Result<Vec<DynamicImage>> {
        let mut scheduler = self.config.build_scheduler(params.num_steps)?;
        // Guidance at or below 1.0 means no classifier-free guidance pass.
        let use_guidance = params.guidance_scale > 1.0;

        let text_embeddings = self.encode_prompt(prompt, use_guidance)?;

        let latents = Tensor::randn(
            0f32,
            1f32,
            (
                1,
                LATENT_CHANNELS,
                self.config.height / 8,
                self.config.width / 8,
            ),
            &self.device,
        )?;
        // Scale the initial noise by the standard deviation required by the
        // scheduler.
        let latents = (latents * scheduler.init_noise_sigma())?;
        let mut latents = latents.to_dtype(self.dtype)?;

        let timesteps = scheduler.timesteps().to_vec();
        for (step, &timestep) in timesteps.iter().enumerate() {
            let start = Instant::now();
            let latent_input = if use_guidance {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let latent_input = scheduler.scale_model_input(latent_input, timestep)?;
            let noise_pred = self
                .unet
                .forward(&latent_input, timestep as f64, &text_embeddings)?;
            let noise_pred = if use_guidance {
                let chunks = noise_pred.chunk(2, 0)?;
                let (uncond, text) = (&chunks[0], &chunks[1]);
                (uncond + ((text - uncond)? * params.guidance_scale)?)?
            } else {
                noise_pred
            };
            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            info!(
                "step {}/{} done, {:.2}s",
                step + 1,
                params.num_steps,
                start.elapsed().as_secs_f32()
            );
        }

        let decoded = self.vae.decode(&(&latents / VAE_SCALE)?)?;
        self.to_images(&decoded)
    }
}
