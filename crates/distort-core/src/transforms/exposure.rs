//! Экспозиция: умножение L в LAB на 2^EV.
//! EV +1 удваивает количество света, EV -1 уменьшает вдвое.

use image::RgbImage;

use super::color::map_lab;
use crate::severity::Severity;

const EV: [f32; 5] = [0.5, 1.0, 1.5, 2.0, 2.5];

fn scale_lightness(img: &RgbImage, ev: f32) -> RgbImage {
    let gain = 2f32.powf(ev);
    map_lab(img, |[l, a, b]| [l * gain, a, b])
}

pub fn increase_lab(img: &RgbImage, severity: Severity) -> RgbImage {
    scale_lightness(img, severity.pick(&EV))
}

pub fn decrease_lab(img: &RgbImage, severity: Severity) -> RgbImage {
    scale_lightness(img, -severity.pick(&EV))
}
