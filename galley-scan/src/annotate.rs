//! Draws detections onto a copy of the frame for display.

use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use galley_core::{resolve, Catalog};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::warn;

use crate::decoder::{DetectedCode, Point};
use crate::frame::Frame;

pub const LABEL_MAX_CHARS: usize = 30;

const MATCHED: Rgb<u8> = Rgb([0, 200, 0]);
const UNMATCHED: Rgb<u8> = Rgb([220, 0, 0]);
const LINE_WIDTH: i32 = 2;
const LABEL_TEXT: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_HEIGHT: u32 = 14;
const LABEL_PADDING: u32 = 2;
const LABEL_SCALE: f32 = 12.0;
const LABEL_CHAR_WIDTH: u32 = 7;

static LABEL_FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

fn label_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(LABEL_FONT_DATA) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(error = %e, "label font unusable, drawing plates without text");
            None
        }
    })
    .as_ref()
}

/// Label drawn above a detection: a colored plate with the text in white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub anchor: Point,
    pub matched: bool,
}

#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub image: RgbImage,
    pub labels: Vec<Label>,
}

/// Shortens `text` to at most [`LABEL_MAX_CHARS`] characters.
pub fn truncate_label(text: &str) -> String {
    if text.chars().count() <= LABEL_MAX_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(LABEL_MAX_CHARS - 3).collect();
    short.push_str("...");
    short
}

pub fn annotate(frame: &Frame, detections: &[DetectedCode], catalog: &Catalog) -> AnnotatedFrame {
    let mut image = frame.image().clone();
    let mut labels = Vec::with_capacity(detections.len());

    for detection in detections {
        let resolution = resolve(catalog, &detection.payload);
        let matched = resolution.is_found();
        let color = if matched { MATCHED } else { UNMATCHED };

        draw_polygon(&mut image, &detection.polygon, color);

        let text = truncate_label(resolution.display_name());
        let corner = detection.anchor();
        let anchor = Point {
            x: corner.x,
            y: (corner.y - LABEL_HEIGHT as i32).max(0),
        };
        draw_label(&mut image, &text, anchor, color);

        labels.push(Label {
            text,
            anchor,
            matched,
        });
    }

    AnnotatedFrame { image, labels }
}

fn draw_label(image: &mut RgbImage, text: &str, anchor: Point, color: Rgb<u8>) {
    let scale = PxScale::from(LABEL_SCALE);
    let font = label_font();
    let text_width = match font {
        Some(font) => text_size(scale, font, text).0,
        None => text.chars().count() as u32 * LABEL_CHAR_WIDTH,
    };
    let width = (text_width + 2 * LABEL_PADDING).max(1);
    draw_filled_rect_mut(
        image,
        Rect::at(anchor.x, anchor.y).of_size(width, LABEL_HEIGHT),
        color,
    );
    if let Some(font) = font {
        let x = anchor.x + LABEL_PADDING as i32;
        draw_text_mut(image, LABEL_TEXT, x, anchor.y + 1, scale, font, text);
    }
}

fn draw_polygon(image: &mut RgbImage, polygon: &[Point], color: Rgb<u8>) {
    if polygon.len() < 2 {
        return;
    }
    for (i, start) in polygon.iter().enumerate() {
        let end = polygon[(i + 1) % polygon.len()];
        for offset in 0..LINE_WIDTH {
            let d = offset as f32;
            draw_line_segment_mut(
                image,
                (start.x as f32 + d, start.y as f32),
                (end.x as f32 + d, end.y as f32),
                color,
            );
            draw_line_segment_mut(
                image,
                (start.x as f32, start.y as f32 + d),
                (end.x as f32, end.y as f32 + d),
                color,
            );
        }
    }
}
