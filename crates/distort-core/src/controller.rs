//! Контроллер дедупликации и повторных попыток
//!
//! Для одного эталонного изображения генерирует до `samples_per_image`
//! образцов так, чтобы:
//! - никакие два принятых рецепта не совпадали по набору классов
//! - первый шаг каждого рецепта избегал категорий, уже занятых первыми
//!   шагами предыдущих образцов этого изображения
//!
//! Неудачная выборка повторяется не более `max_retries` раз; после этого
//! слот пропускается, а не превращается в ошибку.

use std::collections::{BTreeMap, BTreeSet};

use image::RgbImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::recipe::{is_duplicate, Recipe};
use crate::reference::ReferenceImage;
use crate::taxonomy::{Category, DistortionClass, Taxonomy};
use crate::transforms::validate_image;
use crate::{DistortionSynth, SynthError};

/// Режим выбора рецепта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeMode {
    /// Одно искажение, взвешенный выбор категории
    Single,
    /// Несколько искажений, обход графа совместимости
    Multi,
}

/// Конфигурация синтеза
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Режим выбора рецепта
    pub mode: RecipeMode,
    /// Число шагов в многошаговом рецепте
    pub steps: usize,
    /// Число образцов на одно эталонное изображение
    pub samples_per_image: usize,
    /// Максимум попыток на один слот
    pub max_retries: u32,
    /// Глобальный seed
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            mode: RecipeMode::Multi,
            steps: 2,
            samples_per_image: 5,
            max_retries: 50,
            seed: 131,
        }
    }
}

impl SynthConfig {
    /// Загрузка из JSON; отсутствующие поля берутся по умолчанию
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.mode == RecipeMode::Multi && self.steps < 2 {
            return Err(SynthError::InvalidRequest(format!(
                "multi mode needs at least 2 steps, got {}",
                self.steps
            )));
        }
        if self.max_retries == 0 {
            return Err(SynthError::InvalidRequest("max_retries must be positive".to_string()));
        }
        Ok(())
    }

    /// Число шагов в одном рецепте для текущего режима
    pub fn steps_per_recipe(&self) -> usize {
        match self.mode {
            RecipeMode::Single => 1,
            RecipeMode::Multi => self.steps,
        }
    }
}

/// Состояние генерации для одного эталонного изображения
#[derive(Debug, Clone, Default)]
pub struct ImageContext {
    used_categories: BTreeSet<Category>,
    accepted: Vec<Recipe>,
}

impl ImageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Категории первых шагов уже принятых рецептов
    pub fn used_categories(&self) -> &BTreeSet<Category> {
        &self.used_categories
    }

    pub fn accepted(&self) -> &[Recipe] {
        &self.accepted
    }

    pub fn is_duplicate(&self, recipe: &Recipe) -> bool {
        is_duplicate(recipe, &self.accepted)
    }

    /// Принятие рецепта: категория первого шага помечается как занятая
    pub fn accept(&mut self, recipe: Recipe, taxonomy: &Taxonomy) {
        if let Some(category) = recipe.first_class().and_then(|class| taxonomy.category_of(class)) {
            self.used_categories.insert(category);
        }
        self.accepted.push(recipe);
    }

    /// Сброс перед следующим изображением
    pub fn reset(&mut self) {
        self.used_categories.clear();
        self.accepted.clear();
    }
}

/// Искажённый образец
#[derive(Debug, Clone)]
pub struct Sample {
    /// Идентификатор эталонного изображения
    pub reference: String,
    /// Порядковый номер среди принятых образцов изображения
    pub slot: usize,
    pub recipe: Recipe,
    pub image: RgbImage,
}

impl Sample {
    pub fn record(&self) -> SampleRecord {
        SampleRecord {
            distortion_classes: self.recipe.classes(),
            distortion_order_name: self.recipe.order_by_name(),
            severities: self.recipe.severities(),
        }
    }
}

/// Метаданные образца для сохранения
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub distortion_classes: Vec<DistortionClass>,
    /// Имя операции -> позиция в рецепте
    pub distortion_order_name: BTreeMap<String, usize>,
    pub severities: Vec<u8>,
}

/// Итог обработки одного изображения
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub reference: String,
    pub samples: Vec<Sample>,
    /// Слоты, пропущенные после исчерпания попыток
    pub skipped: usize,
}

impl DistortionSynth {
    /// Генерация образцов для одного эталонного изображения.
    ///
    /// Ошибки конфигурации и неподходящее изображение прерывают вызов;
    /// неудачная выборка только пропускает слот.
    pub fn synthesize_image<R: Rng + ?Sized>(
        &self,
        reference: &ReferenceImage,
        rng: &mut R,
    ) -> Result<ImageOutcome, SynthError> {
        validate_image(&reference.image)?;

        let mut context = ImageContext::new();
        let mut samples = Vec::new();
        let mut skipped = 0;

        for slot in 0..self.config.samples_per_image {
            match self.draw_unique(&context, rng)? {
                Some(recipe) => {
                    let image = self.apply_recipe(&reference.image, &recipe)?;
                    log::debug!(
                        "{} #{}: accepted {:?} (severities {:?})",
                        reference.id,
                        samples.len(),
                        recipe.classes(),
                        recipe.severities()
                    );
                    context.accept(recipe.clone(), &self.taxonomy);
                    samples.push(Sample {
                        reference: reference.id.clone(),
                        slot: samples.len(),
                        recipe,
                        image,
                    });
                }
                None => {
                    log::warn!(
                        "After {} retries, failed to generate a unique recipe for {} (slot {})",
                        self.config.max_retries,
                        reference.id,
                        slot
                    );
                    skipped += 1;
                }
            }
        }

        log::info!(
            "{}: {} samples accepted, {} skipped",
            reference.id,
            samples.len(),
            skipped
        );

        Ok(ImageOutcome {
            reference: reference.id.clone(),
            samples,
            skipped,
        })
    }

    /// Выбор рецепта, не совпадающего с уже принятыми.
    /// `None` - попытки исчерпаны.
    pub fn draw_unique<R: Rng + ?Sized>(
        &self,
        context: &ImageContext,
        rng: &mut R,
    ) -> Result<Option<Recipe>, SynthError> {
        let count = self.config.steps_per_recipe();

        for attempt in 0..self.config.max_retries {
            let Some(recipe) = self.synthesize_recipe(self.config.mode, count, context.used_categories(), rng)?
            else {
                log::debug!("Attempt {}: no valid recipe could be sampled", attempt);
                continue;
            };
            if context.is_duplicate(&recipe) {
                log::debug!("Attempt {}: duplicate recipe {:?}", attempt, recipe.classes());
                continue;
            }
            return Ok(Some(recipe));
        }

        Ok(None)
    }
}
