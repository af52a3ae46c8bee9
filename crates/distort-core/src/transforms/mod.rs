//! Библиотека преобразований
//!
//! Реестр именованных операций искажения. Каждая операция:
//! - работает в объявленном цветовом пространстве
//! - параметризуется уровнем силы 1-5 через фиксированную таблицу
//! - детерминирована и не имеет побочных эффектов

pub mod brightness;
pub mod color;
pub mod contrast;
pub mod exposure;
pub mod saturate;
pub mod sharpness;
pub mod temperature;
pub mod tint;

use std::collections::BTreeMap;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::severity::Severity;
use crate::SynthError;

/// Минимальная сторона входного изображения в пикселях
pub const MIN_SIDE: u32 = 32;

/// Сигнатура операции искажения
pub type TransformFn = fn(&RgbImage, Severity) -> RgbImage;

/// Цветовое пространство, в котором работает операция
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Rgb,
    Hsv,
    Lab,
    YCrCb,
}

/// Зарегистрированная операция
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub color_space: ColorSpace,
    transform: TransformFn,
}

impl Operation {
    pub const fn new(name: &'static str, color_space: ColorSpace, transform: TransformFn) -> Self {
        Self {
            name,
            color_space,
            transform,
        }
    }

    /// Применение без проверок входа (см. [`TransformRegistry::apply`])
    pub fn run(&self, img: &RgbImage, severity: Severity) -> RgbImage {
        (self.transform)(img, severity)
    }
}

/// Все встроенные операции
const STANDARD_OPERATIONS: &[Operation] = &[
    Operation::new("brightness_brighten_shift_HSV", ColorSpace::Hsv, brightness::brighten_shift_hsv),
    Operation::new("brightness_brighten_shift_RGB", ColorSpace::Rgb, brightness::brighten_shift_rgb),
    Operation::new("brightness_brighten_gamma_HSV", ColorSpace::Hsv, brightness::brighten_gamma_hsv),
    Operation::new("brightness_brighten_gamma_RGB", ColorSpace::Rgb, brightness::brighten_gamma_rgb),
    Operation::new("brightness_darken_shift_HSV", ColorSpace::Hsv, brightness::darken_shift_hsv),
    Operation::new("brightness_darken_shift_RGB", ColorSpace::Rgb, brightness::darken_shift_rgb),
    Operation::new("brightness_darken_gamma_HSV", ColorSpace::Hsv, brightness::darken_gamma_hsv),
    Operation::new("brightness_darken_gamma_RGB", ColorSpace::Rgb, brightness::darken_gamma_rgb),
    Operation::new("contrast_strengthen_scale", ColorSpace::Rgb, contrast::strengthen_scale),
    Operation::new("contrast_strengthen_stretch", ColorSpace::Rgb, contrast::strengthen_stretch),
    Operation::new("contrast_weaken_scale", ColorSpace::Rgb, contrast::weaken_scale),
    Operation::new("contrast_weaken_stretch", ColorSpace::Rgb, contrast::weaken_stretch),
    Operation::new("saturate_strengthen_HSV", ColorSpace::Hsv, saturate::strengthen_hsv),
    Operation::new("saturate_strengthen_YCrCb", ColorSpace::YCrCb, saturate::strengthen_ycrcb),
    Operation::new("saturate_weaken_HSV", ColorSpace::Hsv, saturate::weaken_hsv),
    Operation::new("saturate_weaken_YCrCb", ColorSpace::YCrCb, saturate::weaken_ycrcb),
    Operation::new("oversharpen", ColorSpace::Rgb, sharpness::oversharpen),
    Operation::new("sharpening_decrease", ColorSpace::Rgb, sharpness::sharpening_decrease),
    Operation::new("temperature_warm_RGB", ColorSpace::Rgb, temperature::warm_rgb),
    Operation::new("temperature_warm_LAB", ColorSpace::Lab, temperature::warm_lab),
    Operation::new("temperature_cool_RGB", ColorSpace::Rgb, temperature::cool_rgb),
    Operation::new("temperature_cool_LAB", ColorSpace::Lab, temperature::cool_lab),
    Operation::new("tint_green_RGB", ColorSpace::Rgb, tint::green_rgb),
    Operation::new("tint_green_LAB", ColorSpace::Lab, tint::green_lab),
    Operation::new("tint_magenta_RGB", ColorSpace::Rgb, tint::magenta_rgb),
    Operation::new("tint_magenta_LAB", ColorSpace::Lab, tint::magenta_lab),
    Operation::new("exposure_increase_LAB", ColorSpace::Lab, exposure::increase_lab),
    Operation::new("exposure_decrease_LAB", ColorSpace::Lab, exposure::decrease_lab),
];

/// Реестр операций: имя -> функция
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    operations: BTreeMap<&'static str, Operation>,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransformRegistry {
    /// Пустой реестр
    pub fn empty() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    /// Реестр со всеми встроенными операциями
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for op in STANDARD_OPERATIONS {
            registry.register(*op);
        }
        registry
    }

    /// Регистрация операции (замещает одноимённую)
    pub fn register(&mut self, op: Operation) {
        self.operations.insert(op.name, op);
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Имена всех операций в лексикографическом порядке
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Применение операции к изображению.
    ///
    /// Ошибки (неизвестное имя, слишком маленькое изображение) являются
    /// ошибками вызывающей стороны и не повторяются.
    pub fn apply(&self, img: &RgbImage, name: &str, severity: Severity) -> Result<RgbImage, SynthError> {
        validate_image(img)?;
        let op = self
            .get(name)
            .ok_or_else(|| SynthError::UnknownOperation(name.to_string()))?;
        log::debug!("Applying {} (severity {}, {:?})", op.name, severity, op.color_space);
        Ok(op.run(img, severity))
    }
}

/// Проверка предусловий для входного изображения
pub fn validate_image(img: &RgbImage) -> Result<(), SynthError> {
    let (width, height) = img.dimensions();
    if width < MIN_SIDE || height < MIN_SIDE {
        return Err(SynthError::InvalidImage(format!(
            "{}x{} is smaller than the {}x{} minimum",
            width, height, MIN_SIDE, MIN_SIDE
        )));
    }
    Ok(())
}
