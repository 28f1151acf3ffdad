#![allow(dead_code)]

use ic_smartcrop::core::OutputFormat;
use ic_smartcrop::processors::{MinAreaRect, Point};
use ic_smartcrop::utils::encode_image;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point as DrawPoint;
use imageproc::rect::Rect;

pub const FRAME_WIDTH: u32 = 480;
pub const FRAME_HEIGHT: u32 = 360;
pub const BACKGROUND: Rgb<u8> = Rgb([220, 220, 220]);
pub const CHIP: Rgb<u8> = Rgb([30, 30, 30]);

/// A light frame with one dark rotated rectangle.
pub fn chip_frame(center: (f32, f32), width: f32, height: f32, angle: f32) -> RgbImage {
    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND);
    draw_box(&mut img, center, width, height, angle, CHIP);
    img
}

/// A chip of 200x100 px centred in the frame at `angle` degrees.
pub fn centered_chip(angle: f32) -> RgbImage {
    chip_frame(
        (FRAME_WIDTH as f32 / 2.0, FRAME_HEIGHT as f32 / 2.0),
        200.0,
        100.0,
        angle,
    )
}

/// An axis-aligned 160x80 body with four 12x20 leads above and four below.
pub fn chip_with_leads() -> RgbImage {
    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND);
    draw_filled_rect_mut(&mut img, Rect::at(160, 140).of_size(160, 80), CHIP);
    for i in 0..4 {
        let x = 180 + i * 40;
        draw_filled_rect_mut(&mut img, Rect::at(x, 120).of_size(12, 20), CHIP);
        draw_filled_rect_mut(&mut img, Rect::at(x, 220).of_size(12, 20), CHIP);
    }
    img
}

/// A featureless frame.
pub fn uniform_frame(value: u8) -> RgbImage {
    RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([value, value, value]))
}

/// A light frame sprinkled with 2x2 dark specks on a coarse grid.
pub fn speckle_frame() -> RgbImage {
    let mut img = uniform_frame(BACKGROUND.0[0]);
    for y in (17..FRAME_HEIGHT - 2).step_by(37) {
        for x in (11..FRAME_WIDTH - 2).step_by(29) {
            draw_filled_rect_mut(&mut img, Rect::at(x as i32, y as i32).of_size(2, 2), CHIP);
        }
    }
    img
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    encode_image(img, OutputFormat::Png).expect("PNG encoding of a synthetic frame")
}

fn draw_box(
    img: &mut RgbImage,
    center: (f32, f32),
    width: f32,
    height: f32,
    angle: f32,
    color: Rgb<u8>,
) {
    let rect = MinAreaRect {
        center: Point::new(center.0, center.1),
        width,
        height,
        angle,
    };
    let corners: Vec<DrawPoint<i32>> = rect
        .box_points()
        .iter()
        .map(|p| DrawPoint::new(p.x.round() as i32, p.y.round() as i32))
        .collect();
    draw_polygon_mut(img, &corners, color);
}
