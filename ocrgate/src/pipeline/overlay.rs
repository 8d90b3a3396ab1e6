//! Bounding-box overlay drawing.

use imageproc::drawing::draw_line_segment_mut;

use super::codec::Raster;
use crate::models::{FilteredDetection, Point};

pub const STROKE_WIDTH: u32 = 2;

/// Returns a copy of `raster` with each detection's quad drawn as a closed polygon.
pub fn draw_overlay(raster: &Raster, detections: &[FilteredDetection]) -> Raster {
    let mut canvas = raster.clone();
    for item in detections {
        draw_quad(&mut canvas, &item.detection.bbox, item.color.to_rgb());
    }
    canvas
}

fn draw_quad(canvas: &mut Raster, quad: &[Point; 4], color: image::Rgb<u8>) {
    if quad.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        tracing::debug!("Skipping box with non-finite coordinates");
        return;
    }

    let (width, height) = canvas.dimensions();
    let corners = quad.map(|p| clamp_to_canvas(p, width, height));

    for i in 0..corners.len() {
        let start = corners[i];
        let end = corners[(i + 1) % corners.len()];
        for dx in 0..STROKE_WIDTH {
            for dy in 0..STROKE_WIDTH {
                let (ox, oy) = (dx as f32, dy as f32);
                draw_line_segment_mut(
                    canvas,
                    (start.0 + ox, start.1 + oy),
                    (end.0 + ox, end.1 + oy),
                    color,
                );
            }
        }
    }
}

/// Truncates to whole pixels and pulls far-away points to just outside the canvas.
/// Pixels that still fall outside are clipped by the line rasterizer.
fn clamp_to_canvas(point: Point, width: u32, height: u32) -> (f32, f32) {
    let margin = f64::from(STROKE_WIDTH) + 1.0;
    let x = point.x.trunc().clamp(-margin, f64::from(width) + margin);
    let y = point.y.trunc().clamp(-margin, f64::from(height) + margin);
    (x as f32, y as f32)
}
