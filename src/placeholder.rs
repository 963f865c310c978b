//! Synthesized stand-in image for scenes whose rendering failed
//! irrecoverably. Must never fail: if no TrueType font can be loaded
//! from the host, text falls back to a built-in bitmap glyph set.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

pub const PLACEHOLDER_WIDTH: u32 = 1024;
pub const PLACEHOLDER_HEIGHT: u32 = 576;

const BACKGROUND: Rgb<u8> = Rgb([0xFF, 0x6B, 0x6B]);
const TEXT_COLOR: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);
const HEADLINE: &str = "Image Generation Failed";
const SUBLINE: &str = "Could not connect to the model.";

/// Renders the fixed 1024x576 failure card. The prompt text is accepted
/// for symmetry with the image renderer's signature and is not drawn.
pub fn render_placeholder(_prompt_text: &str) -> RgbImage {
    let mut img = RgbImage::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, BACKGROUND);
    match load_system_font() {
        Some(font) => {
            let scale = PxScale::from(40.0);
            draw_text_mut(&mut img, TEXT_COLOR, 50, 50, scale, &font, HEADLINE);
            draw_text_mut(&mut img, TEXT_COLOR, 50, 120, scale, &font, SUBLINE);
        }
        None => {
            debug!("no system font found, using built-in glyphs");
            draw_bitmap_text(&mut img, 50, 50, 5, HEADLINE);
            draw_bitmap_text(&mut img, 50, 120, 5, SUBLINE);
        }
    }
    img
}

fn load_system_font() -> Option<FontVec> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    for path in CANDIDATES {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }
    None
}

fn draw_bitmap_text(img: &mut RgbImage, origin_x: i32, origin_y: i32, scale: u32, text: &str) {
    let mut pen_x = origin_x;
    let step = scale as i32;
    for ch in text.chars() {
        if let Some(rows) = glyph_rows(ch) {
            for (ry, row) in rows.iter().enumerate() {
                for cx in 0..5u8 {
                    if row & (0x10 >> cx) == 0 {
                        continue;
                    }
                    for dy in 0..step {
                        for dx in 0..step {
                            let px = pen_x + cx as i32 * step + dx;
                            let py = origin_y + ry as i32 * step + dy;
                            if px >= 0
                                && py >= 0
                                && (px as u32) < img.width()
                                && (py as u32) < img.height()
                            {
                                img.put_pixel(px as u32, py as u32, TEXT_COLOR);
                            }
                        }
                    }
                }
            }
        }
        pen_x += 6 * step;
    }
}

/// 5x7 glyphs (one byte per row, low 5 bits used) covering the two fixed
/// failure lines. Unknown characters render as blank advances.
fn glyph_rows(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0E],
        'I' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x1F],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'c' => [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x13, 0x0D],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'h' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'l' => [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x15, 0x15],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        't' => [0x04, 0x04, 0x1F, 0x04, 0x04, 0x05, 0x02],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_fixed_dimensions() {
        let img = render_placeholder("any prompt");
        assert_eq!(img.width(), PLACEHOLDER_WIDTH);
        assert_eq!(img.height(), PLACEHOLDER_HEIGHT);
    }

    #[test]
    fn placeholder_background_is_warm_accent() {
        let img = render_placeholder("any prompt");
        // Corners are well away from the text block.
        assert_eq!(*img.get_pixel(0, 0), BACKGROUND);
        assert_eq!(
            *img.get_pixel(PLACEHOLDER_WIDTH - 1, PLACEHOLDER_HEIGHT - 1),
            BACKGROUND
        );
    }

    #[test]
    fn placeholder_is_deterministic_per_environment() {
        assert_eq!(render_placeholder("one"), render_placeholder("two"));
    }

    #[test]
    fn placeholder_contains_overlaid_text() {
        let img = render_placeholder("any prompt");
        let white = img.pixels().filter(|p| **p == TEXT_COLOR).count();
        assert!(white > 0, "expected text pixels over the background");
    }

    #[test]
    fn bitmap_glyphs_cover_both_fixed_lines() {
        for ch in HEADLINE.chars().chain(SUBLINE.chars()) {
            if ch != ' ' {
                assert!(glyph_rows(ch).is_some(), "missing glyph for {ch:?}");
            }
        }
    }
}
