//! Цветовая температура: масштабирование R/B или сдвиг канала b в LAB

use image::RgbImage;

use super::color::{map_lab, map_unit_rgb};
use crate::severity::Severity;

const GAIN: [f32; 5] = [1.08, 1.15, 1.23, 1.32, 1.42];
const ATTENUATION: [f32; 5] = [0.92, 0.85, 0.77, 0.68, 0.58];
const B_SHIFT: [f32; 5] = [5.0, 10.0, 15.0, 20.0, 25.0];

pub fn warm_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let (red, blue) = (severity.pick(&GAIN), severity.pick(&ATTENUATION));
    map_unit_rgb(img, |[r, g, b]| [r * red, g, b * blue])
}

pub fn cool_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let (red, blue) = (severity.pick(&ATTENUATION), severity.pick(&GAIN));
    map_unit_rgb(img, |[r, g, b]| [r * red, g, b * blue])
}

/// Positive b is yellow
pub fn warm_lab(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&B_SHIFT);
    map_lab(img, |[l, a, b]| [l, a, b + shift])
}

pub fn cool_lab(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&B_SHIFT);
    map_lab(img, |[l, a, b]| [l, a, b - shift])
}
