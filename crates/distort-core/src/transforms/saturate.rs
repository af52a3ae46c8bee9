//! Насыщенность: масштабирование S в HSV или хроматических каналов в YCrCb

use image::RgbImage;

use super::color::{map_hsv, map_ycrcb};
use crate::severity::Severity;

const STRENGTHEN_FACTOR: [f32; 5] = [1.3, 1.6, 1.9, 2.2, 2.5];
const WEAKEN_FACTOR: [f32; 5] = [0.75, 0.55, 0.4, 0.25, 0.1];

fn scale_chroma(img: &RgbImage, factor: f32) -> RgbImage {
    map_ycrcb(img, |[y, cr, cb]| {
        [y, 128.0 + (cr - 128.0) * factor, 128.0 + (cb - 128.0) * factor]
    })
}

pub fn strengthen_hsv(img: &RgbImage, severity: Severity) -> RgbImage {
    let factor = severity.pick(&STRENGTHEN_FACTOR);
    map_hsv(img, |[h, s, v]| [h, s * factor, v])
}

pub fn weaken_hsv(img: &RgbImage, severity: Severity) -> RgbImage {
    let factor = severity.pick(&WEAKEN_FACTOR);
    map_hsv(img, |[h, s, v]| [h, s * factor, v])
}

pub fn strengthen_ycrcb(img: &RgbImage, severity: Severity) -> RgbImage {
    scale_chroma(img, severity.pick(&STRENGTHEN_FACTOR))
}

pub fn weaken_ycrcb(img: &RgbImage, severity: Severity) -> RgbImage {
    scale_chroma(img, severity.pick(&WEAKEN_FACTOR))
}
