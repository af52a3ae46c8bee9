//! Эталонные изображения
//!
//! Нормализация декодированного изображения к 3-канальному 8-битному RGB.
//! Чтение файлов и масштабирование выполняет вызывающая сторона.

use image::{DynamicImage, RgbImage};

use crate::transforms::validate_image;
use crate::SynthError;

/// Эталонное изображение с идентификатором
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub id: String,
    pub image: RgbImage,
}

impl ReferenceImage {
    /// Создание с проверкой размера (не меньше 32x32)
    pub fn new(id: impl Into<String>, image: RgbImage) -> Result<Self, SynthError> {
        validate_image(&image)?;
        Ok(Self { id: id.into(), image })
    }

    /// Создание из декодированного изображения: 1 или 3 канала по 8 бит
    pub fn from_dynamic(id: impl Into<String>, image: DynamicImage) -> Result<Self, SynthError> {
        Self::new(id, normalize_channels(image)?)
    }
}

/// Приведение 1- или 3-канального 8-битного изображения к RGB
pub fn normalize_channels(image: DynamicImage) -> Result<RgbImage, SynthError> {
    match image {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb),
        gray @ DynamicImage::ImageLuma8(_) => Ok(gray.to_rgb8()),
        other => Err(SynthError::InvalidImage(format!(
            "expected 1 or 3 channels of 8-bit data, got {:?}",
            other.color()
        ))),
    }
}
