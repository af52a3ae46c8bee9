//! Контраст: масштабирование относительно средней яркости и линейное растяжение/сжатие

use image::{Rgb, RgbImage};
use imageproc::map::map_colors;

use super::color::{map_unit_rgb, mean_luma, saturate_u8};
use crate::severity::Severity;

const STRENGTHEN_FACTOR: [f32; 5] = [1.2, 1.4, 1.6, 1.8, 2.0];
const WEAKEN_FACTOR: [f32; 5] = [0.75, 0.6, 0.45, 0.3, 0.2];
/// Доля отсекаемых хвостов с каждой стороны
const STRETCH_CLIP: [f32; 5] = [0.05, 0.1, 0.15, 0.2, 0.25];
/// Полуширина итогового диапазона вокруг 0.5
const COMPRESS_RADIUS: [f32; 5] = [0.4, 0.33, 0.26, 0.19, 0.12];

/// Смешивание с серым цветом средней яркости
fn scale_about_mean(img: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(img).round();
    map_colors(img, |p: Rgb<u8>| {
        Rgb(p.0.map(|c| saturate_u8(mean + factor * (c as f32 - mean))))
    })
}

pub fn strengthen_scale(img: &RgbImage, severity: Severity) -> RgbImage {
    scale_about_mean(img, severity.pick(&STRENGTHEN_FACTOR))
}

pub fn weaken_scale(img: &RgbImage, severity: Severity) -> RgbImage {
    scale_about_mean(img, severity.pick(&WEAKEN_FACTOR))
}

/// [p, 1 - p] -> [0, 1] с отсечением
pub fn strengthen_stretch(img: &RgbImage, severity: Severity) -> RgbImage {
    let clip = severity.pick(&STRETCH_CLIP);
    let span = 1.0 - 2.0 * clip;
    map_unit_rgb(img, |rgb| rgb.map(|c| (c - clip) / span))
}

/// [0, 1] -> [0.5 - r, 0.5 + r]
pub fn weaken_stretch(img: &RgbImage, severity: Severity) -> RgbImage {
    let radius = severity.pick(&COMPRESS_RADIUS);
    map_unit_rgb(img, |rgb| rgb.map(|c| 0.5 + (c - 0.5) * 2.0 * radius))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone() -> RgbImage {
        RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([60, 60, 60])
            } else {
                Rgb([180, 180, 180])
            }
        })
    }

    fn spread(img: &RgbImage) -> i32 {
        img.get_pixel(31, 0).0[0] as i32 - img.get_pixel(0, 0).0[0] as i32
    }

    #[test]
    fn test_strengthen_widens_and_weaken_narrows() {
        let img = two_tone();
        let base = spread(&img);
        for s in Severity::ALL {
            assert!(spread(&strengthen_scale(&img, s)) > base);
            assert!(spread(&strengthen_stretch(&img, s)) > base);
            assert!(spread(&weaken_scale(&img, s)) < base);
            assert!(spread(&weaken_stretch(&img, s)) < base);
        }
    }

    #[test]
    fn test_weaken_scale_keeps_mean_gray() {
        let img = RgbImage::from_pixel(32, 32, Rgb([77, 77, 77]));
        let out = weaken_scale(&img, Severity::new(5).unwrap());
        assert_eq!(out.get_pixel(3, 3).0, [77, 77, 77]);
    }
}
