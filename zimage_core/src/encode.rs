use std::io::Cursor;

use anyhow::Result;
use base64::prelude::*;
use image::DynamicImage;

/// Serialize an image to PNG bytes in memory.
pub fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Serialize an image to PNG and base64-encode the bytes.
pub fn encode_png_base64(image: &DynamicImage) -> Result<String> {
    Ok(BASE64_STANDARD.encode(png_bytes(image)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_bytes_carry_the_png_magic() {
        let image = DynamicImage::new_rgb8(8, 8);
        let bytes = png_bytes(&image).unwrap();
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn encoded_output_decodes_back_to_the_image() {
        let image = DynamicImage::new_rgb8(8, 8);
        let encoded = encode_png_base64(&image).unwrap();

        let bytes = BASE64_STANDARD.decode(&encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
        assert_eq!(decoded.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }
}
