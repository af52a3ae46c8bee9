//! Distort Core - синтез рецептов искажений
//!
//! Библиотека для генерации размеченных искажённых изображений из эталонных:
//! - Реестр операций искажения, параметризованных уровнем силы 1-5
//! - Таксономия категория -> класс -> операция и граф совместимости классов
//! - Взвешенный выбор одношаговых рецептов
//! - Многошаговые рецепты обходом графа совместимости
//! - Дедупликация рецептов с ограниченным числом повторных попыток
//! - Параллельная обработка пакета изображений

pub mod batch;
pub mod controller;
pub mod graph_walk;
pub mod recipe;
pub mod reference;
pub mod severity;
pub mod taxonomy;
pub mod transforms;
pub mod weighted;

pub use batch::{image_seed, BatchOutcome, BatchReport, ImageReport};
pub use controller::{ImageContext, ImageOutcome, RecipeMode, Sample, SampleRecord, SynthConfig};
pub use graph_walk::{GraphWalk, RecipeSampler};
pub use recipe::{is_duplicate, Recipe, RecipeStep};
pub use reference::ReferenceImage;
pub use severity::Severity;
pub use taxonomy::{Category, CompatibilityGraph, DistortionClass, Taxonomy, TaxonomyConfig};
pub use transforms::{ColorSpace, Operation, TransformRegistry};
pub use weighted::{weighted_sample_without_replacement, Pick, WeightedCategorySampler};

use std::collections::BTreeSet;

use image::RgbImage;
use rand::Rng;
use thiserror::Error;

/// Основные ошибки модуля.
///
/// Все варианты - ошибки конфигурации или входных данных: они не
/// повторяются и прерывают вызов.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid severity {0}: expected an integer in [1, 5]")]
    InvalidSeverity(u8),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Главный синтезатор искажений
pub struct DistortionSynth {
    registry: TransformRegistry,
    taxonomy: Taxonomy,
    config: SynthConfig,
}

impl DistortionSynth {
    /// Синтезатор со встроенной таксономией и настройками по умолчанию
    pub fn new() -> Result<Self, SynthError> {
        Self::with_config(SynthConfig::default())
    }

    /// Синтезатор со встроенной таксономией
    pub fn with_config(config: SynthConfig) -> Result<Self, SynthError> {
        Self::with_taxonomy(TaxonomyConfig::standard(), config)
    }

    /// Синтезатор с пользовательской таксономией
    pub fn with_taxonomy(taxonomy: TaxonomyConfig, config: SynthConfig) -> Result<Self, SynthError> {
        config.validate()?;
        let registry = TransformRegistry::standard();
        let taxonomy = Taxonomy::load(taxonomy, &registry)?;
        Ok(Self {
            registry,
            taxonomy,
            config,
        })
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Выбор рецепта.
    ///
    /// - `Single`: `count` категорий взвешенной выборкой, по одному шагу на категорию
    /// - `Multi`: обход графа совместимости длиной `count` (не меньше 2)
    ///
    /// `Ok(None)` - выборка не удалась (повторяемо), `Err` - ошибка запроса.
    pub fn synthesize_recipe<R: Rng + ?Sized>(
        &self,
        mode: RecipeMode,
        count: usize,
        excluded: &BTreeSet<Category>,
        rng: &mut R,
    ) -> Result<Option<Recipe>, SynthError> {
        match mode {
            RecipeMode::Single => {
                if count == 0 {
                    return Err(SynthError::InvalidRequest(
                        "single-distortion sampling needs at least 1 pick".to_string(),
                    ));
                }
                let picks = WeightedCategorySampler::new(&self.taxonomy).sample(count, excluded, rng);
                if picks.is_empty() {
                    return Ok(None);
                }
                let steps = picks
                    .into_iter()
                    .map(|pick| RecipeStep {
                        class: pick.class,
                        operation: pick.operation,
                        severity: Severity::sample(rng),
                    })
                    .collect();
                Ok(Some(Recipe::new(steps)))
            }
            RecipeMode::Multi => {
                let Some(walk) = RecipeSampler::new(&self.taxonomy).sample(count, excluded, rng)? else {
                    return Ok(None);
                };

                let mut steps = Vec::with_capacity(walk.classes.len());
                for class in walk.classes {
                    let operation = self
                        .taxonomy
                        .choose_operation(class, rng)
                        .ok_or_else(|| SynthError::Taxonomy(format!("class '{}' has no operations", class)))?
                        .to_string();
                    steps.push(RecipeStep {
                        class,
                        operation,
                        severity: Severity::sample(rng),
                    });
                }

                Ok(Some(Recipe {
                    steps,
                    fallback_positions: walk.fallback_positions,
                }))
            }
        }
    }

    /// Применение рецепта: операции строго в порядке шагов,
    /// каждая видит результат предыдущей.
    pub fn apply_recipe(&self, img: &RgbImage, recipe: &Recipe) -> Result<RgbImage, SynthError> {
        transforms::validate_image(img)?;
        let mut current = img.clone();
        for step in &recipe.steps {
            current = self.registry.apply(&current, &step.operation, step.severity)?;
        }
        Ok(current)
    }

    /// Совпадает ли рецепт по набору классов с одним из `history`
    pub fn is_duplicate(&self, recipe: &Recipe, history: &[Recipe]) -> bool {
        is_duplicate(recipe, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_image() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]))
    }

    #[test]
    fn test_synth_creation() {
        let synth = DistortionSynth::new().unwrap();
        assert_eq!(synth.config().max_retries, 50);
        assert_eq!(synth.taxonomy().classes().len(), 13);
    }

    #[test]
    fn test_single_recipe_has_one_step_per_pick() {
        let synth = DistortionSynth::new().unwrap();
        let mut rng = StdRng::seed_from_u64(131);
        let recipe = synth
            .synthesize_recipe(RecipeMode::Single, 1, &BTreeSet::new(), &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(recipe.len(), 1);
        assert!(synth
            .taxonomy()
            .operations_of(recipe.steps[0].class)
            .contains(&recipe.steps[0].operation));
        assert!(synth
            .synthesize_recipe(RecipeMode::Single, 0, &BTreeSet::new(), &mut rng)
            .is_err());
    }

    #[test]
    fn test_multi_recipe_rejects_single_step() {
        let synth = DistortionSynth::new().unwrap();
        let mut rng = StdRng::seed_from_u64(131);
        let err = synth
            .synthesize_recipe(RecipeMode::Multi, 1, &BTreeSet::new(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, SynthError::InvalidRequest(_)));
    }

    #[test]
    fn test_apply_recipe_runs_steps_in_order() {
        let synth = DistortionSynth::new().unwrap();
        let img = test_image();
        let step = |class, op: &str, s| RecipeStep {
            class,
            operation: op.to_string(),
            severity: Severity::new(s).unwrap(),
        };
        let recipe = Recipe::new(vec![
            step(DistortionClass::Brighten, "brightness_brighten_shift_RGB", 3),
            step(DistortionClass::ContrastStrengthen, "contrast_strengthen_scale", 4),
        ]);

        let out = synth.apply_recipe(&img, &recipe).unwrap();
        let registry = synth.registry();
        let first = registry
            .apply(&img, "brightness_brighten_shift_RGB", Severity::new(3).unwrap())
            .unwrap();
        let expected = registry
            .apply(&first, "contrast_strengthen_scale", Severity::new(4).unwrap())
            .unwrap();
        assert_eq!(out.as_raw(), expected.as_raw());
    }

    #[test]
    fn test_apply_recipe_rejects_unknown_operation() {
        let synth = DistortionSynth::new().unwrap();
        let recipe = Recipe::new(vec![RecipeStep {
            class: DistortionClass::Darken,
            operation: "darken_everything".to_string(),
            severity: Severity::new(1).unwrap(),
        }]);
        assert!(synth.apply_recipe(&test_image(), &recipe).is_err());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SynthConfig {
            steps: 1,
            ..SynthConfig::default()
        };
        assert!(DistortionSynth::with_config(config).is_err());
    }
}
