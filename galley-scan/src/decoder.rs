use tracing::debug;

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A code found in a frame: its decoded text and bounding polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub payload: String,
    pub polygon: Vec<Point>,
}

impl DetectedCode {
    pub fn new(payload: impl Into<String>, polygon: Vec<Point>) -> Self {
        Self {
            payload: payload.into(),
            polygon,
        }
    }

    /// Top-left corner of the polygon's bounding box.
    pub fn anchor(&self) -> Point {
        Point {
            x: self.polygon.iter().map(|p| p.x).min().unwrap_or(0),
            y: self.polygon.iter().map(|p| p.y).min().unwrap_or(0),
        }
    }
}

/// Extracts codes from a single frame. Stateless: the same frame always
/// yields the same detections, in a stable order.
pub trait Decoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Vec<DetectedCode>;
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl Decoder for QrDecoder {
    fn decode(&self, frame: &Frame) -> Vec<DetectedCode> {
        let luma = frame.to_luma();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width() as usize,
            luma.height() as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );

        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| {
                let polygon = grid.bounds.iter().map(|p| Point { x: p.x, y: p.y }).collect();
                match grid.decode() {
                    Ok((_, payload)) => Some(DetectedCode { payload, polygon }),
                    Err(e) => {
                        debug!(error = ?e, "found a grid that did not decode");
                        None
                    }
                }
            })
            .collect()
    }
}
