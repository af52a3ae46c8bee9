//! Пакетная обработка эталонных изображений
//!
//! Каждое изображение получает собственный генератор, засеянный из
//! глобального seed и индекса изображения. Поэтому результат не зависит
//! от числа потоков и порядка их выполнения.

use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::controller::ImageOutcome;
use crate::reference::ReferenceImage;
use crate::{DistortionSynth, SynthError};

/// Seed генератора для изображения с индексом `index`
pub fn image_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Итог пакета: по одному элементу на эталонное изображение, в порядке входа
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub images: Vec<ImageOutcome>,
}

/// Краткая сводка по изображению
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReport {
    pub reference: String,
    pub accepted: usize,
    pub skipped: usize,
}

/// Сводка по пакету
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub images: Vec<ImageReport>,
    pub accepted: usize,
    pub skipped: usize,
}

impl ImageOutcome {
    pub fn report(&self) -> ImageReport {
        ImageReport {
            reference: self.reference.clone(),
            accepted: self.samples.len(),
            skipped: self.skipped,
        }
    }
}

impl BatchOutcome {
    pub fn report(&self) -> BatchReport {
        let images: Vec<ImageReport> = self.images.iter().map(ImageOutcome::report).collect();
        BatchReport {
            accepted: images.iter().map(|r| r.accepted).sum(),
            skipped: images.iter().map(|r| r.skipped).sum(),
            images,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.images.iter().map(|outcome| outcome.samples.len()).sum()
    }
}

impl DistortionSynth {
    /// Обработка пакета эталонных изображений.
    ///
    /// Первая ошибка конфигурации или входа прерывает весь пакет.
    pub fn run_batch(&self, references: &[ReferenceImage]) -> Result<BatchOutcome, SynthError> {
        log::info!(
            "Synthesizing {} reference images (seed {}, {} samples each)",
            references.len(),
            self.config.seed,
            self.config.samples_per_image
        );

        let seed = self.config.seed;
        let run = |(index, reference): (usize, &ReferenceImage)| {
            let mut rng = StdRng::seed_from_u64(image_seed(seed, index));
            self.synthesize_image(reference, &mut rng)
        };

        #[cfg(feature = "parallel")]
        let images = references
            .par_iter()
            .enumerate()
            .map(run)
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(not(feature = "parallel"))]
        let images = references
            .iter()
            .enumerate()
            .map(run)
            .collect::<Result<Vec<_>, _>>()?;

        let outcome = BatchOutcome { images };
        let report = outcome.report();
        log::info!(
            "Batch done: {} samples accepted, {} slots skipped",
            report.accepted,
            report.skipped
        );
        Ok(outcome)
    }
}
