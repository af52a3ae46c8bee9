//! Резкость
//!
//! В отличие от канальных операций, работает с пространственными частотами:
//! - `oversharpen`: нерезкое маскирование (усиление высоких частот)
//! - `sharpening_decrease`: ослабление детального слоя над краесохраняющей
//!   (билатеральной) основой

use image::{Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;

use super::color::saturate_u8;
use crate::severity::Severity;

const AMOUNT: [f32; 5] = [2.0, 2.8, 4.0, 6.0, 8.0];
/// Sigma гауссова ядра 5x5 (формула OpenCV для sigma = 0)
const UNSHARP_SIGMA: f32 = 1.1;

/// Доля сохраняемых деталей
const DETAIL_KEEP: [f32; 5] = [0.8, 0.65, 0.5, 0.35, 0.2];
const SIGMA_COLOR: [f32; 5] = [20.0, 35.0, 50.0, 65.0, 80.0];
const SIGMA_SPACE: [f32; 5] = [9.0, 12.0, 16.0, 20.0, 24.0];
/// Диаметр окна 9
const BILATERAL_RADIUS: i64 = 4;

/// (1 + a) * img - a * blurred
pub fn oversharpen(img: &RgbImage, severity: Severity) -> RgbImage {
    let amount = severity.pick(&AMOUNT);
    let blurred = gaussian_blur_f32(img, UNSHARP_SIGMA);

    let mut result = RgbImage::new(img.width(), img.height());
    for ((out, src), low) in result.pixels_mut().zip(img.pixels()).zip(blurred.pixels()) {
        for c in 0..3 {
            let value = (1.0 + amount) * src.0[c] as f32 - amount * low.0[c] as f32;
            out.0[c] = saturate_u8(value);
        }
    }
    result
}

/// base + alpha * (img - base), base = bilateral(img)
pub fn sharpening_decrease(img: &RgbImage, severity: Severity) -> RgbImage {
    let alpha = severity.pick(&DETAIL_KEEP);
    let base = bilateral(img, severity.pick(&SIGMA_COLOR), severity.pick(&SIGMA_SPACE));

    let mut result = RgbImage::new(img.width(), img.height());
    for (x, y, out) in result.enumerate_pixels_mut() {
        let src = img.get_pixel(x, y).0;
        let smooth = base[(y * img.width() + x) as usize];
        for c in 0..3 {
            let detail = src[c] as f32 - smooth[c];
            out.0[c] = saturate_u8(smooth[c] + alpha * detail);
        }
    }
    result
}

/// Билатеральный фильтр с круглым окном; цветовое расстояние - сумма
/// модулей разностей по каналам. Соседи за границей не учитываются.
fn bilateral(img: &RgbImage, sigma_color: f32, sigma_space: f32) -> Vec<[f32; 3]> {
    let (width, height) = (img.width() as i64, img.height() as i64);
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let mut window = Vec::new();
    for dy in -BILATERAL_RADIUS..=BILATERAL_RADIUS {
        for dx in -BILATERAL_RADIUS..=BILATERAL_RADIUS {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2 <= (BILATERAL_RADIUS * BILATERAL_RADIUS) as f32 {
                window.push((dx, dy, (r2 * space_coeff).exp()));
            }
        }
    }

    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let Rgb(center) = *img.get_pixel(x as u32, y as u32);
            let mut sum = [0.0f32; 3];
            let mut weight_sum = 0.0f32;

            for &(dx, dy, space_weight) in &window {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let Rgb(neighbor) = *img.get_pixel(nx as u32, ny as u32);
                let dist: f32 = (0..3)
                    .map(|c| (neighbor[c] as f32 - center[c] as f32).abs())
                    .sum();
                let weight = space_weight * (dist * dist * color_coeff).exp();
                for c in 0..3 {
                    sum[c] += neighbor[c] as f32 * weight;
                }
                weight_sum += weight;
            }

            // центр всегда в окне, weight_sum > 0
            out.push(sum.map(|s| s / weight_sum));
        }
    }
    out
}
