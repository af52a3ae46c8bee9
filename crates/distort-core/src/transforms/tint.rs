//! Оттенок: ось зелёный-пурпурный (каналы R/G или канал a в LAB)

use image::RgbImage;

use super::color::{map_lab, map_unit_rgb};
use crate::severity::Severity;

const GAIN: [f32; 5] = [1.08, 1.15, 1.23, 1.32, 1.42];
const ATTENUATION: [f32; 5] = [0.92, 0.85, 0.77, 0.68, 0.58];
const A_SHIFT: [f32; 5] = [5.0, 10.0, 15.0, 20.0, 25.0];

pub fn green_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let (green, red) = (severity.pick(&GAIN), severity.pick(&ATTENUATION));
    map_unit_rgb(img, |[r, g, b]| [r * red, g * green, b])
}

pub fn magenta_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let (red, green) = (severity.pick(&GAIN), severity.pick(&ATTENUATION));
    map_unit_rgb(img, |[r, g, b]| [r * red, g * green, b])
}

/// Negative a is green
pub fn green_lab(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&A_SHIFT);
    map_lab(img, |[l, a, b]| [l, a - shift, b])
}

pub fn magenta_lab(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&A_SHIFT);
    map_lab(img, |[l, a, b]| [l, a + shift, b])
}
