use anyhow::anyhow;
use base64::prelude::*;
use image::DynamicImage;
use std::io::Cursor;
use zimage_core::{
    generate_with, GenerateError, GenerationParams, TextToImagePipeline, TURBO_GUIDANCE_SCALE,
};

/// Records every call it receives and replays a canned response.
#[derive(Default)]
struct StubPipeline {
    image: Option<DynamicImage>,
    fail_with: Option<String>,
    received: Vec<GenerationParams>,
}

impl TextToImagePipeline for StubPipeline {
    fn generate(
        &mut self,
        _prompt: &str,
        params: &GenerationParams,
    ) -> anyhow::Result<Vec<DynamicImage>> {
        self.received.push(params.clone());
        if let Some(message) = &self.fail_with {
            return Err(anyhow!("{message}"));
        }
        Ok(self.image.iter().cloned().collect())
    }
}

#[test]
fn guidance_is_pinned_to_zero_and_steps_default_to_four() {
    let mut stub = StubPipeline {
        image: Some(DynamicImage::new_rgb8(8, 8)),
        ..Default::default()
    };

    generate_with(&mut stub, "a red circle", GenerationParams::default()).unwrap();

    assert_eq!(stub.received.len(), 1);
    assert_eq!(stub.received[0].guidance_scale, TURBO_GUIDANCE_SCALE);
    assert_eq!(stub.received[0].num_steps, 4);
}

#[test]
fn caller_supplied_guidance_is_ignored() {
    let mut stub = StubPipeline {
        image: Some(DynamicImage::new_rgb8(8, 8)),
        ..Default::default()
    };
    let params = GenerationParams {
        num_steps: 2,
        guidance_scale: 7.5,
    };

    generate_with(&mut stub, "a red circle", params).unwrap();

    assert_eq!(stub.received[0].guidance_scale, 0.0);
    assert_eq!(stub.received[0].num_steps, 2);
}

#[test]
fn black_square_encodes_to_its_png_base64() {
    let image = DynamicImage::new_rgb8(8, 8);
    let mut stub = StubPipeline {
        image: Some(image.clone()),
        ..Default::default()
    };

    let encoded = generate_with(&mut stub, "a red circle", GenerationParams::default()).unwrap();

    let mut expected_png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut expected_png), image::ImageFormat::Png)
        .unwrap();
    assert_eq!(encoded, BASE64_STANDARD.encode(&expected_png));

    let decoded = image::load_from_memory(&BASE64_STANDARD.decode(&encoded).unwrap()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 8));
    assert!(decoded.to_rgb8().as_raw().iter().all(|&px| px == 0));
}

#[test]
fn pipeline_failure_is_reported_verbatim() {
    let mut stub = StubPipeline {
        fail_with: Some("out of memory".to_string()),
        ..Default::default()
    };

    let err = generate_with(&mut stub, "a red circle", GenerationParams::default()).unwrap_err();

    assert!(matches!(err, GenerateError::Inference(_)));
    assert_eq!(format!("Error: {err}"), "Error: out of memory");
}

#[test]
fn empty_pipeline_output_is_an_inference_error() {
    let mut stub = StubPipeline::default();

    let err = generate_with(&mut stub, "a red circle", GenerationParams::default()).unwrap_err();

    assert!(matches!(err, GenerateError::Inference(_)));
    assert_eq!(err.to_string(), "pipeline produced no images");
}
