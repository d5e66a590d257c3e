use image::{Rgb, RgbImage};

use super::RawDetection;

const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Line width scaled to the image, never below 2px.
pub fn line_width(image: &RgbImage) -> u32 {
    let scaled = ((image.width() + image.height()) as f32 / 2.0 * 0.003).round() as u32;
    scaled.max(2)
}

/// Returns a copy of `image` with one outlined box per detection.
pub fn draw_detections(image: &RgbImage, detections: &[RawDetection]) -> RgbImage {
    let mut canvas = image.clone();
    let thickness = line_width(image);
    for detection in detections {
        draw_box(
            &mut canvas,
            detection.bbox,
            thickness,
            class_color(detection.class_id),
        );
    }
    canvas
}

fn draw_box(canvas: &mut RgbImage, bbox: [f32; 4], thickness: u32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let clip_x = |v: f32| (v.max(0.0) as u32).min(width - 1);
    let clip_y = |v: f32| (v.max(0.0) as u32).min(height - 1);
    let (x1, y1, x2, y2) = (clip_x(bbox[0]), clip_y(bbox[1]), clip_x(bbox[2]), clip_y(bbox[3]));
    if x1 >= x2 || y1 >= y2 {
        return;
    }

    for t in 0..thickness {
        let top = (y1 + t).min(y2);
        let bottom = y2.saturating_sub(t).max(y1);
        for x in x1..=x2 {
            canvas.put_pixel(x, top, color);
            canvas.put_pixel(x, bottom, color);
        }
        let left = (x1 + t).min(x2);
        let right = x2.saturating_sub(t).max(x1);
        for y in y1..=y2 {
            canvas.put_pixel(left, y, color);
            canvas.put_pixel(right, y, color);
        }
    }
}
