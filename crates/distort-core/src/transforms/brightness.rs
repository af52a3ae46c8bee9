//! Яркость: сдвиг и гамма-коррекция в HSV (канал V) и RGB (все каналы)

use image::RgbImage;

use super::color::{map_hsv, map_unit_rgb};
use crate::severity::Severity;

const SHIFT: [f32; 5] = [0.1, 0.2, 0.3, 0.4, 0.5];
const BRIGHTEN_GAMMA: [f32; 5] = [0.7, 0.58, 0.47, 0.36, 0.25];
const DARKEN_GAMMA: [f32; 5] = [1.5, 1.8, 2.2, 2.7, 3.5];

pub fn brighten_shift_hsv(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&SHIFT);
    map_hsv(img, |[h, s, v]| [h, s, v + shift])
}

pub fn brighten_shift_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&SHIFT);
    map_unit_rgb(img, |rgb| rgb.map(|c| c + shift))
}

pub fn brighten_gamma_hsv(img: &RgbImage, severity: Severity) -> RgbImage {
    let gamma = severity.pick(&BRIGHTEN_GAMMA);
    map_hsv(img, |[h, s, v]| [h, s, v.powf(gamma)])
}

pub fn brighten_gamma_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let gamma = severity.pick(&BRIGHTEN_GAMMA);
    map_unit_rgb(img, |rgb| rgb.map(|c| c.powf(gamma)))
}

pub fn darken_shift_hsv(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&SHIFT);
    map_hsv(img, |[h, s, v]| [h, s, v - shift])
}

pub fn darken_shift_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let shift = severity.pick(&SHIFT);
    map_unit_rgb(img, |rgb| rgb.map(|c| c - shift))
}

pub fn darken_gamma_hsv(img: &RgbImage, severity: Severity) -> RgbImage {
    let gamma = severity.pick(&DARKEN_GAMMA);
    map_hsv(img, |[h, s, v]| [h, s, v.powf(gamma)])
}

pub fn darken_gamma_rgb(img: &RgbImage, severity: Severity) -> RgbImage {
    let gamma = severity.pick(&DARKEN_GAMMA);
    map_unit_rgb(img, |rgb| rgb.map(|c| c.powf(gamma)))
}
