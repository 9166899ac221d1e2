use crate::app::TextBubble;

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const TEXT_SCALE: i32 = 3;
const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
const LINE_ADVANCE: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;
const BUBBLE_PADDING_FACTOR: i32 = 2;
const FALLBACK_CHAR: char = '?';

// Printable ASCII ' '..='~', one u16 per glyph: five 3-bit rows, top row in the high bits.
const GLYPHS: [u16; 95] = [
    0x0000, 0x2482, 0x5A00, 0x5F7D, 0x7DDF, 0x52A5, 0x2AAB, 0x2400,
    0x1491, 0x4494, 0x0AA8, 0x05D0, 0x0014, 0x01C0, 0x0002, 0x12A4,
    0x7B6F, 0x2C97, 0x73E7, 0x73CF, 0x5BC9, 0x79CF, 0x79EF, 0x7292,
    0x7BEF, 0x7BCF, 0x0410, 0x0414, 0x1511, 0x0E38, 0x4454, 0x72C2,
    0x7BE7, 0x2BED, 0x6BAE, 0x7927, 0x6B6E, 0x79A7, 0x79A4, 0x796F,
    0x5BED, 0x7497, 0x726F, 0x5BAD, 0x4927, 0x5FED, 0x5FFD, 0x7B6F,
    0x6BA4, 0x7B79, 0x6BAD, 0x79CF, 0x7492, 0x5B6F, 0x5B6A, 0x5BFD,
    0x5AAD, 0x5A92, 0x72A7, 0x6926, 0x4889, 0x324B, 0x2A00, 0x0007,
    0x4400, 0x0E7F, 0x49AE, 0x0F27, 0x13EF, 0x0FA7, 0x39A4, 0x0F79,
    0x49AD, 0x2092, 0x106A, 0x4BAD, 0x4927, 0x0DED, 0x0D6D, 0x0F6F,
    0x0D74, 0x0F79, 0x0D64, 0x0F8F, 0x2E93, 0x0B6F, 0x0B6A, 0x0B7A,
    0x0A95, 0x0B79, 0x0E57, 0x3593, 0x2492, 0x64D6, 0x0780,
];

fn glyph_bits(ch: char) -> u16 {
    let ch = if (' '..='~').contains(&ch) {
        ch
    } else {
        FALLBACK_CHAR
    };
    GLYPHS[(ch as u32 - ' ' as u32) as usize]
}

fn glyph_pixel_set(bits: u16, row: i32, column: i32) -> bool {
    let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - column);
    bits & (1 << shift) != 0
}

pub(super) fn text_width_px(text: &str) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        0
    } else {
        count * GLYPH_ADVANCE - TEXT_SCALE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BubbleLayout {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// Top-left of each line, in screen pixels.
    pub line_origins: Vec<(i32, i32)>,
}

/// Box is twice the text block in each axis, centred on the anchor; lines are centred inside it.
pub(super) fn layout_bubble(lines: &[String], anchor_px: (i32, i32)) -> Option<BubbleLayout> {
    let text_width = lines.iter().map(|line| text_width_px(line)).max()?;
    if text_width == 0 {
        return None;
    }
    let text_height = lines.len() as i32 * LINE_ADVANCE;
    let width = text_width * BUBBLE_PADDING_FACTOR;
    let height = text_height * BUBBLE_PADDING_FACTOR;
    let left = anchor_px.0 - width / 2;
    let top = anchor_px.1 - height / 2;
    let first_line_top = top + text_height / BUBBLE_PADDING_FACTOR;

    let line_origins = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let x = left + (width - text_width_px(line)) / 2;
            let y = first_line_top + index as i32 * LINE_ADVANCE;
            (x, y)
        })
        .collect();

    Some(BubbleLayout {
        left,
        top,
        width,
        height,
        line_origins,
    })
}

pub(super) fn draw_bubble(frame: &mut [u8], width: u32, height: u32, bubble: &TextBubble) {
    let Some(layout) = layout_bubble(&bubble.lines, bubble.anchor_px) else {
        return;
    };
    fill_rect_clipped(
        frame,
        width,
        height,
        (layout.left, layout.top, layout.width, layout.height),
        bubble.background,
    );
    for (line, (x, y)) in bubble.lines.iter().zip(layout.line_origins) {
        draw_text_clipped(frame, width, height, x, y, line, bubble.text_color);
    }
}

fn draw_text_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    for ch in text.chars() {
        let bits = glyph_bits(ch);
        for row in 0..GLYPH_HEIGHT {
            for column in 0..GLYPH_WIDTH {
                if glyph_pixel_set(bits, row, column) {
                    fill_rect_clipped(
                        frame,
                        width,
                        height,
                        (
                            x + column * TEXT_SCALE,
                            y + row * TEXT_SCALE,
                            TEXT_SCALE,
                            TEXT_SCALE,
                        ),
                        color,
                    );
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

/// `rect` is (left, top, width, height) in screen pixels.
pub(super) fn fill_rect_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: (i32, i32, i32, i32),
    color: [u8; 4],
) {
    let (left, top, rect_width, rect_height) = rect;
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = left.saturating_add(rect_width).min(width as i32);
    let y1 = top.saturating_add(rect_height).min(height as i32);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    for y in y0..y1 {
        for x in x0..x1 {
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

pub(super) fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: usize,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    if let Some(pixel) = frame.get_mut(byte_offset..byte_offset + 4) {
        pixel.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered_rows(ch: char) -> [u8; 5] {
        let bits = glyph_bits(ch);
        let mut rows = [0u8; 5];
        for (row, out) in rows.iter_mut().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if glyph_pixel_set(bits, row as i32, column) {
                    *out |= 1 << (GLYPH_WIDTH - 1 - column);
                }
            }
        }
        rows
    }

    #[test]
    fn glyph_rows_decode_top_to_bottom() {
        assert_eq!(rendered_rows('!'), [0b010, 0b010, 0b010, 0b000, 0b010]);
        assert_eq!(rendered_rows('_'), [0b000, 0b000, 0b000, 0b000, 0b111]);
        assert_eq!(rendered_rows(' '), [0; 5]);
    }

    #[test]
    fn non_ascii_falls_back_to_question_mark() {
        assert_eq!(glyph_bits('é'), glyph_bits('?'));
        assert_eq!(glyph_bits('\u{7f}'), glyph_bits('?'));
    }

    #[test]
    fn bubble_is_twice_the_text_block_and_centred_on_anchor() {
        let lines = vec!["abcd".to_string(), "ab".to_string()];
        let layout = layout_bubble(&lines, (400, 200)).expect("layout");

        let text_width = text_width_px("abcd");
        assert_eq!(layout.width, text_width * 2);
        assert_eq!(layout.height, 2 * LINE_ADVANCE * 2);
        assert_eq!(layout.left + layout.width / 2, 400);
        assert_eq!(layout.top + layout.height / 2, 200);

        let (first_x, first_y) = layout.line_origins[0];
        let (second_x, second_y) = layout.line_origins[1];
        assert_eq!(second_y - first_y, LINE_ADVANCE);
        assert!(second_x > first_x);
        assert_eq!(first_y, layout.top + LINE_ADVANCE);
    }

    #[test]
    fn empty_text_has_no_bubble() {
        assert!(layout_bubble(&[], (0, 0)).is_none());
        assert!(layout_bubble(&[String::new()], (0, 0)).is_none());
    }

    #[test]
    fn drawing_clips_to_frame() {
        let (width, height) = (8u32, 8u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        fill_rect_clipped(&mut frame, width, height, (-4, 6, 20, 20), [9, 9, 9, 255]);

        let painted = frame.chunks_exact(4).filter(|px| px[0] == 9).count();
        assert_eq!(painted, 8 * 2);
    }
}
