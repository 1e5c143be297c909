//! Pixel-font text for the HUD and session banners. Drawn straight into the
//! logical framebuffer after the world, so it is unaffected by the camera.

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;
pub(crate) const LINE_ADVANCE: i32 = GLYPH_HEIGHT + 2;

pub(crate) const HUD_TEXT_COLOR: [u8; 4] = [244, 248, 252, 255];
pub(crate) const HUD_SHADOW_COLOR: [u8; 4] = [10, 12, 16, 255];
pub(crate) const BANNER_BG_COLOR: [u8; 4] = [10, 12, 16, 255];

/// Pixel width of a rendered string, for centering.
pub(crate) fn text_width_px(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

/// Draws `text` with a one-pixel drop shadow. Lowercase input renders with
/// the uppercase glyphs; characters outside the font render as space.
pub(crate) fn draw_text(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, text: &str) {
    draw_text_colored(frame, width, height, x + 1, y + 1, text, HUD_SHADOW_COLOR);
    draw_text_colored(frame, width, height, x, y, text, HUD_TEXT_COLOR);
}

pub(crate) fn draw_text_colored(
    frame: &mut [u8],
    width: u32,
    height: u32,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    for ch in text.chars() {
        draw_glyph(frame, width, height, x, y, glyph_rows(ch), color);
        x += GLYPH_ADVANCE;
    }
}

pub(crate) fn draw_filled_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = (x + rect_width).min(width as i32);
    let end_y = (y + rect_height).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    let width_usize = width as usize;
    for py in start_y..end_y {
        for px in start_x..end_x {
            write_pixel_rgba(frame, width_usize, px as usize, py as usize, color);
        }
    }
}

fn draw_glyph(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rows: [u8; GLYPH_HEIGHT as usize],
    color: [u8; 4],
) {
    if width == 0 || height == 0 {
        return;
    }
    let width_i32 = width as i32;
    let height_i32 = height as i32;

    for (row_index, row_bits) in rows.iter().enumerate() {
        let pixel_y = y + row_index as i32;
        if pixel_y < 0 || pixel_y >= height_i32 {
            continue;
        }
        for col in 0..GLYPH_WIDTH {
            if (row_bits & (1 << (GLYPH_WIDTH - 1 - col))) == 0 {
                continue;
            }
            let pixel_x = x + col;
            if pixel_x < 0 || pixel_x >= width_i32 {
                continue;
            }
            write_pixel_rgba(frame, width as usize, pixel_x as usize, pixel_y as usize, color);
        }
    }
}

fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

const BLANK: [u8; 5] = [0, 0, 0, 0, 0];

fn glyph_rows(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b111, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b011, 0b000, 0b010],
        _ => BLANK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_width_counts_advance_per_char() {
        assert_eq!(text_width_px(""), 0);
        assert_eq!(text_width_px("PAUSED"), 24);
    }

    #[test]
    fn lowercase_renders_same_as_uppercase() {
        assert_eq!(glyph_rows('a'), glyph_rows('A'));
        assert_eq!(glyph_rows('z'), glyph_rows('Z'));
    }

    #[test]
    fn unknown_characters_render_blank() {
        assert_eq!(glyph_rows('\u{1f642}'), BLANK);
        assert_eq!(glyph_rows(' '), BLANK);
    }

    #[test]
    fn drawing_off_screen_never_writes() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        draw_text(&mut frame, 8, 8, 100, 100, "SCORE: 10");
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn negative_origins_clip_instead_of_panicking() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        draw_text(&mut frame, 8, 8, -3, -3, "GAME OVER");
        assert_eq!(frame.len(), 8 * 8 * 4);
    }

    #[test]
    fn filled_rect_clips_to_frame() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        draw_filled_rect(&mut frame, 4, 4, -2, -2, 100, 100, [9, 9, 9, 255]);
        assert!(frame.chunks_exact(4).all(|px| px == [9, 9, 9, 255]));

        let mut empty = vec![0u8; 4 * 4 * 4];
        draw_filled_rect(&mut empty, 4, 4, 10, 10, 2, 2, [9, 9, 9, 255]);
        assert!(empty.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn zero_size_frame_is_safe() {
        let mut frame: Vec<u8> = Vec::new();
        draw_text(&mut frame, 0, 0, 0, 0, "COINS: 3");
    }
}
