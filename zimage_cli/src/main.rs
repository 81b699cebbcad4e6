use std::{process, time::Instant};

use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use zimage_core::{generate, GenerationConfig, GenerationParams, TokenSource};

/// Environment variable deployments use to point at the intended turbo
/// checkpoint. The built-in default is a documented fallback.
const MODEL_ID_ENV: &str = "ZIMAGE_MODEL_ID";

#[derive(Parser)]
struct Args {
    /// Text prompt to generate an image for.
    #[arg(long)]
    prompt: String,

    /// Hugging Face token. Useful for accessing gated repositories.
    /// By default, the Hugging Face token at ~/.cache/huggingface/token is used.
    #[arg(long)]
    token: Option<String>,

    /// Suppress download progress output.
    #[arg(long)]
    silent: bool,
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    // stdout carries only the encoded image; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = GenerationConfig::default();
    if let Ok(model_id) = std::env::var(MODEL_ID_ENV) {
        config.model_id = model_id;
    }
    let token = args
        .token
        .map(TokenSource::Literal)
        .unwrap_or(TokenSource::CacheToken);

    let start = Instant::now();
    match generate(
        &config,
        token,
        args.silent,
        &args.prompt,
        GenerationParams::default(),
    ) {
        Ok(encoded) => {
            info!(
                "image generation took: {:.2}s",
                start.elapsed().as_secs_f32()
            );
            println!("{encoded}");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_required() {
        assert!(Args::try_parse_from(["zimage_cli"]).is_err());
    }

    #[test]
    fn prompt_is_parsed() {
        let args = Args::try_parse_from(["zimage_cli", "--prompt", "a red circle"]).unwrap();
        assert_eq!(args.prompt, "a red circle");
        assert!(args.token.is_none());
        assert!(!args.silent);
    }
}
