//! Recovery of the AES passphrase hidden in the host's key image.
//!
//! Layout of the RGBA8 pixel buffer:
//!
//! - the alpha byte of pixel 3 holds the number of key characters `n`;
//! - the low alpha bit of each of the next `8 * n` pixels is one key bit,
//!   most significant bit first;
//! - every 8 bits form one ASCII hex digit of the key.
//!
//! The hex digits decode to the raw key, whose base64 form is the passphrase.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use image::ImageFormat;

use crate::error::ExtractorError;

const BYTES_PER_PIXEL: usize = 4;
const COUNT_PIXEL: usize = 3;
const FIRST_KEY_PIXEL: usize = COUNT_PIXEL + 1;

pub fn extract_key(png: &[u8]) -> Result<String, ExtractorError> {
    let image = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
    key_from_rgba(image.as_raw())
}

pub(crate) fn key_from_rgba(rgba: &[u8]) -> Result<String, ExtractorError> {
    let count_offset = COUNT_PIXEL * BYTES_PER_PIXEL + 3;
    let count = *rgba
        .get(count_offset)
        .ok_or_else(|| ExtractorError::KeyDecoding("image too small to hold a key".to_string()))?
        as usize;
    if count == 0 {
        return Err(ExtractorError::KeyDecoding(
            "key length is zero".to_string(),
        ));
    }
    if count % 2 != 0 {
        return Err(ExtractorError::KeyDecoding(format!(
            "key has an odd number of hex digits ({count})"
        )));
    }

    let start = FIRST_KEY_PIXEL * BYTES_PER_PIXEL;
    let end = start + count * 8 * BYTES_PER_PIXEL;
    let key_pixels = rgba.get(start..end).ok_or_else(|| {
        ExtractorError::KeyDecoding(format!(
            "image has {} pixels, {count} key digits need {}",
            rgba.len() / BYTES_PER_PIXEL,
            FIRST_KEY_PIXEL + count * 8
        ))
    })?;

    let digits: Vec<u8> = key_pixels
        .chunks_exact(BYTES_PER_PIXEL * 8)
        .map(|pixels| {
            pixels
                .chunks_exact(BYTES_PER_PIXEL)
                .fold(0u8, |acc, pixel| (acc << 1) | (pixel[3] & 1))
        })
        .collect();

    let key = hex::decode(&digits)
        .map_err(|e| ExtractorError::KeyDecoding(format!("key is not hex: {e}")))?;
    Ok(BASE64_STANDARD.encode(key))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{Rgba, RgbaImage};

    use super::*;

    /// Encodes `hex_key` into a PNG following the layout above.
    pub(crate) fn key_image(hex_key: &str, width: u32, height: u32) -> Vec<u8> {
        let mut image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8, 0xFE])
        });

        let mut set_alpha = |index: usize, alpha: u8| {
            let x = (index % width as usize) as u32;
            let y = (index / width as usize) as u32;
            image.get_pixel_mut(x, y).0[3] = alpha;
        };
        set_alpha(COUNT_PIXEL, hex_key.len() as u8);
        for (i, byte) in hex_key.bytes().enumerate() {
            for bit in 0..8 {
                let value = (byte >> (7 - bit)) & 1;
                set_alpha(FIRST_KEY_PIXEL + i * 8 + bit, 0xFE | value);
            }
        }

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        png
    }

    #[test]
    fn key_is_recovered_from_alpha_bits() {
        let raw_key = [0x5a_u8, 0x01, 0xff, 0x10, 0x42, 0x99, 0x00, 0x7e];
        let png = key_image(&hex::encode(raw_key), 16, 16);

        let key = extract_key(&png).unwrap();
        assert_eq!(key, BASE64_STANDARD.encode(raw_key));
    }

    #[test]
    fn image_too_small_for_declared_key() {
        // 16 digits need 132 pixels.
        let png = key_image("00112233445566ff", 8, 8);
        assert!(matches!(
            extract_key(&png),
            Err(ExtractorError::KeyDecoding(_))
        ));
    }

    #[test]
    fn tiny_or_empty_key_images_fail() {
        assert!(matches!(
            key_from_rgba(&[0u8; 8]),
            Err(ExtractorError::KeyDecoding(_))
        ));
        assert!(matches!(
            key_from_rgba(&[0u8; 64]),
            Err(ExtractorError::KeyDecoding(_))
        ));
    }

    #[test]
    fn non_hex_digits_fail() {
        let png = key_image("zz", 8, 8);
        assert!(matches!(
            extract_key(&png),
            Err(ExtractorError::KeyDecoding(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        assert!(matches!(
            extract_key(b"not a png"),
            Err(ExtractorError::ImageError(_))
        ));
    }
}
