//! Преобразования цветовых пространств
//!
//! Все функции работают попиксельно. HSV и LAB считаются через `palette`,
//! поверх него только 8-битное масштабирование в стиле OpenCV:
//! - HSV: компоненты в [0, 1]
//! - LAB: L * 255 / 100, a + 128, b + 128 (sRGB, белая точка D65)
//! - YCrCb: BT.601, смещение хроматических каналов 128

use image::{Rgb, RgbImage};
use imageproc::map::map_colors;
use palette::{FromColor, Hsv, IntoColor, Lab, LinSrgb, Srgb};

/// Запас на погрешность f32 при усечении: x / 255 * 255 не должно дать x - 1
const TRUNC_EPSILON: f32 = 1e-3;

/// Округление и насыщение в диапазон u8
#[inline]
pub fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// [0, 1] -> u8 с усечением
#[inline]
pub fn truncate_unit(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + TRUNC_EPSILON).min(255.0) as u8
}

/// Попиксельное отображение в нормализованном RGB ([0, 1]).
///
/// Результат `f` обрезается до [0, 1] и масштабируется обратно в u8
/// с усечением дробной части.
pub fn map_unit_rgb<F>(img: &RgbImage, f: F) -> RgbImage
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    map_colors(img, |p: Rgb<u8>| {
        let unit = [
            p.0[0] as f32 / 255.0,
            p.0[1] as f32 / 255.0,
            p.0[2] as f32 / 255.0,
        ];
        let out = f(unit);
        Rgb(out.map(truncate_unit))
    })
}

/// Попиксельное отображение в пространстве HSV
pub fn map_hsv<F>(img: &RgbImage, f: F) -> RgbImage
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    map_unit_rgb(img, |rgb| {
        let [h, s, v] = f(rgb_to_hsv(rgb));
        hsv_to_rgb([h, s.clamp(0.0, 1.0), v.clamp(0.0, 1.0)])
    })
}

/// Попиксельное отображение в 8-битном LAB.
///
/// `f` получает каналы как f32 в шкале 0..255; результат обрезается и
/// усекается до u8 перед обратной конвертацией.
pub fn map_lab<F>(img: &RgbImage, f: F) -> RgbImage
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    map_colors(img, |p: Rgb<u8>| {
        let lab = rgb_to_lab8(p.0);
        let out = f([lab[0] as f32, lab[1] as f32, lab[2] as f32]);
        let lab = [
            out[0].clamp(0.0, 255.0) as u8,
            out[1].clamp(0.0, 255.0) as u8,
            out[2].clamp(0.0, 255.0) as u8,
        ];
        Rgb(lab8_to_rgb(lab))
    })
}

/// Попиксельное отображение в YCrCb (каналы в шкале 0..255)
pub fn map_ycrcb<F>(img: &RgbImage, f: F) -> RgbImage
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    map_colors(img, |p: Rgb<u8>| {
        let out = f(rgb_to_ycrcb(p.0));
        Rgb(ycrcb_to_rgb(out))
    })
}

/// RGB [0, 1] -> HSV [0, 1]
pub fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let hsv: Hsv = Hsv::from_color(Srgb::new(rgb[0], rgb[1], rgb[2]));
    [hsv.hue.into_positive_degrees() / 360.0, hsv.saturation, hsv.value]
}

/// HSV [0, 1] -> RGB [0, 1]
pub fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    let hsv: Hsv = Hsv::new(hsv[0].rem_euclid(1.0) * 360.0, hsv[1], hsv[2]);
    let rgb: Srgb = Srgb::from_color(hsv);
    [rgb.red, rgb.green, rgb.blue]
}

/// RGB u8 -> 8-битный LAB
pub fn rgb_to_lab8(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    let lin: LinSrgb = Srgb::new(r, g, b).into_linear();
    let lab: Lab = Lab::from_color(lin);

    [
        saturate_u8(lab.l * 255.0 / 100.0),
        saturate_u8(lab.a + 128.0),
        saturate_u8(lab.b + 128.0),
    ]
}

/// 8-битный LAB -> RGB u8
pub fn lab8_to_rgb(lab: [u8; 3]) -> [u8; 3] {
    let lab: Lab = Lab::new(
        lab[0] as f32 * 100.0 / 255.0,
        lab[1] as f32 - 128.0,
        lab[2] as f32 - 128.0,
    );
    let lin: LinSrgb = lab.into_color();
    // вне гаммы sRGB: обрезка до перехода в нелинейную шкалу
    let lin = LinSrgb::new(
        lin.red.clamp(0.0, 1.0),
        lin.green.clamp(0.0, 1.0),
        lin.blue.clamp(0.0, 1.0),
    );
    let srgb: Srgb = Srgb::from_linear(lin);

    [srgb.red, srgb.green, srgb.blue].map(|c| saturate_u8(c.clamp(0.0, 1.0) * 255.0))
}

/// RGB u8 -> YCrCb (f32, шкала 0..255)
pub fn rgb_to_ycrcb(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    [y, cr, cb]
}

/// YCrCb (f32, шкала 0..255) -> RGB u8
pub fn ycrcb_to_rgb(ycrcb: [f32; 3]) -> [u8; 3] {
    let [y, cr, cb] = ycrcb;
    let r = y + 1.403 * (cr - 128.0);
    let g = y - 0.714 * (cr - 128.0) - 0.344 * (cb - 128.0);
    let b = y + 1.773 * (cb - 128.0);
    [saturate_u8(r), saturate_u8(g), saturate_u8(b)]
}

/// Средняя яркость изображения (BT.601), шкала 0..255
pub fn mean_luma(img: &RgbImage) -> f32 {
    let count = (img.width() as u64 * img.height() as u64).max(1);
    let sum: f64 = img
        .pixels()
        .map(|p| 0.299 * p.0[0] as f64 + 0.587 * p.0[1] as f64 + 0.114 * p.0[2] as f64)
        .sum();
    (sum / count as f64) as f32
}
