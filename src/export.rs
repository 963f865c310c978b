//! Thin encoding utilities for handing scene images to the caller:
//! PNG bytes, and base64 data URIs for collaborator-built download links.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .context("encode png")?;
    Ok(buf.into_inner())
}

pub fn png_data_uri(image: &RgbImage) -> Result<String> {
    let bytes = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", B64.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn png_bytes_carry_the_magic_header() {
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn data_uri_is_prefixed_and_decodable() {
        let img = RgbImage::from_pixel(2, 2, Rgb([0, 255, 0]));
        let uri = png_data_uri(&img).unwrap();
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = B64.decode(b64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, img);
    }
}
