//! WASM bindings для синтеза искажений
//!
//! Предоставляет JavaScript API: выбор рецептов, применение к RGBA-буферам
//! и ImageData из Canvas, дедупликация в рамках одного изображения.

use distort_core::{DistortionSynth, ImageContext, Recipe, RecipeMode, SynthConfig, TaxonomyConfig};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use web_sys::ImageData;

/// Инициализация panic hook и логирования в консоль браузера
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("Distortion synth WASM module initialized");
}

fn to_js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// JavaScript-доступный синтезатор искажений.
///
/// Хранит собственный генератор и контекст текущего изображения:
/// `acceptRecipe` помечает рецепт как принятый, `resetImage` начинает
/// следующее изображение.
#[wasm_bindgen]
pub struct WasmDistortionSynth {
    synth: DistortionSynth,
    context: ImageContext,
    rng: StdRng,
}

impl WasmDistortionSynth {
    fn build(synth: DistortionSynth) -> Result<WasmDistortionSynth, JsError> {
        let rng = StdRng::seed_from_u64(synth.config().seed);
        Ok(Self {
            synth,
            context: ImageContext::new(),
            rng,
        })
    }
}

#[wasm_bindgen]
impl WasmDistortionSynth {
    /// Синтезатор со встроенной таксономией и настройками по умолчанию
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmDistortionSynth, JsError> {
        Self::build(DistortionSynth::new().map_err(to_js_error)?)
    }

    /// Синтезатор с настройками из JSON (`SynthConfig`)
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<WasmDistortionSynth, JsError> {
        let config = SynthConfig::from_json(config_json).map_err(to_js_error)?;
        Self::build(DistortionSynth::with_config(config).map_err(to_js_error)?)
    }

    /// Синтезатор с пользовательской таксономией
    ///
    /// @param taxonomy_json - JSON `TaxonomyConfig`
    /// @param config_json - JSON `SynthConfig` (может быть пустым объектом)
    #[wasm_bindgen(js_name = withTaxonomy)]
    pub fn with_taxonomy(taxonomy_json: &str, config_json: &str) -> Result<WasmDistortionSynth, JsError> {
        let taxonomy = TaxonomyConfig::from_json(taxonomy_json).map_err(to_js_error)?;
        let config = SynthConfig::from_json(config_json).map_err(to_js_error)?;
        Self::build(DistortionSynth::with_taxonomy(taxonomy, config).map_err(to_js_error)?)
    }

    /// Выбор рецепта с учётом категорий, уже занятых в текущем изображении
    ///
    /// @param mode - "single" или "multi"
    /// @param count - число шагов
    /// @returns Recipe или null, если выборка не удалась
    #[wasm_bindgen(js_name = synthesizeRecipe)]
    pub fn synthesize_recipe(&mut self, mode: &str, count: usize) -> Result<JsValue, JsError> {
        let mode = match mode {
            "single" => RecipeMode::Single,
            "multi" => RecipeMode::Multi,
            other => return Err(JsError::new(&format!("Unknown mode '{}'", other))),
        };
        let recipe = self
            .synth
            .synthesize_recipe(mode, count, self.context.used_categories(), &mut self.rng)
            .map_err(to_js_error)?;
        match recipe {
            Some(recipe) => serde_wasm_bindgen::to_value(&recipe).map_err(to_js_error),
            None => Ok(JsValue::NULL),
        }
    }

    /// Применение рецепта к RGBA-буферу
    ///
    /// @param recipe - объект Recipe
    /// @param data - RGBA байты (например, из canvas.getImageData())
    /// @returns RGBA байты того же размера; альфа-канал сохраняется
    #[wasm_bindgen(js_name = applyRecipe)]
    pub fn apply_recipe(&self, recipe: JsValue, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, JsError> {
        let recipe: Recipe = serde_wasm_bindgen::from_value(recipe).map_err(to_js_error)?;
        let rgb = rgba_to_rgb(data, width, height)?;

        let start = js_sys::Date::now();
        let out = self.synth.apply_recipe(&rgb, &recipe).map_err(to_js_error)?;
        log::debug!(
            "Applied {} steps to {}x{} in {:.1} ms",
            recipe.len(),
            width,
            height,
            js_sys::Date::now() - start
        );

        Ok(rgb_to_rgba(&out, data))
    }

    /// Применение рецепта к ImageData из Canvas
    #[wasm_bindgen(js_name = applyRecipeToImageData)]
    pub fn apply_recipe_to_image_data(&self, recipe: JsValue, image_data: &ImageData) -> Result<ImageData, JsError> {
        let (width, height) = (image_data.width(), image_data.height());
        let data = image_data.data();
        let out = self.apply_recipe(recipe, &data, width, height)?;
        ImageData::new_with_u8_clamped_array_and_sh(Clamped(&out[..]), width, height)
            .map_err(|e| JsError::new(&format!("Failed to create ImageData: {:?}", e)))
    }

    /// Совпадает ли рецепт по набору классов с уже принятым
    #[wasm_bindgen(js_name = isDuplicate)]
    pub fn is_duplicate(&self, recipe: JsValue) -> Result<bool, JsError> {
        let recipe: Recipe = serde_wasm_bindgen::from_value(recipe).map_err(to_js_error)?;
        Ok(self.context.is_duplicate(&recipe))
    }

    /// Пометка рецепта как принятого для текущего изображения
    #[wasm_bindgen(js_name = acceptRecipe)]
    pub fn accept_recipe(&mut self, recipe: JsValue) -> Result<(), JsError> {
        let recipe: Recipe = serde_wasm_bindgen::from_value(recipe).map_err(to_js_error)?;
        self.context.accept(recipe, self.synth.taxonomy());
        Ok(())
    }

    /// Начало нового изображения: занятые категории и история сбрасываются
    #[wasm_bindgen(js_name = resetImage)]
    pub fn reset_image(&mut self) {
        self.context.reset();
    }

    /// Перезапуск генератора
    #[wasm_bindgen(js_name = setSeed)]
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Текущая таксономия (категории, операции, граф совместимости)
    #[wasm_bindgen(js_name = taxonomy)]
    pub fn taxonomy(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.synth.taxonomy().to_config()).map_err(to_js_error)
    }
}

/// RGBA -> RGB, альфа отбрасывается
fn rgba_to_rgb(rgba: &[u8], width: u32, height: u32) -> Result<RgbImage, JsError> {
    let pixel_count = (width as usize) * (height as usize);
    if rgba.len() != pixel_count * 4 {
        return Err(JsError::new(&format!(
            "Expected {} RGBA bytes for {}x{}, got {}",
            pixel_count * 4,
            width,
            height,
            rgba.len()
        )));
    }

    let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();
    RgbImage::from_raw(width, height, rgb).ok_or_else(|| JsError::new("Failed to create image from data"))
}

/// RGB -> RGBA с альфой из исходного буфера
fn rgb_to_rgba(rgb: &RgbImage, original: &[u8]) -> Vec<u8> {
    rgb.pixels()
        .zip(original.chunks_exact(4))
        .flat_map(|(px, src)| [px[0], px[1], px[2], src[3]])
        .collect()
}

/// Информация о версии
#[wasm_bindgen(js_name = version)]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn ok<T>(result: Result<T, JsError>) -> T {
        result.unwrap_or_else(|_| panic!("unexpected JsError"))
    }

    fn rgba(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| [(i % 251) as u8, (i % 127) as u8, 90, 200])
            .collect()
    }

    #[wasm_bindgen_test]
    fn test_synth_creation() {
        let _synth = ok(WasmDistortionSynth::new());
    }

    #[wasm_bindgen_test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
    }

    #[wasm_bindgen_test]
    fn test_apply_keeps_size_and_alpha() {
        let mut synth = ok(WasmDistortionSynth::new());
        let recipe = ok(synth.synthesize_recipe("multi", 2));
        let data = rgba(48, 40);
        let out = ok(synth.apply_recipe(recipe, &data, 48, 40));
        assert_eq!(out.len(), data.len());
        assert!(out.chunks_exact(4).all(|px| px[3] == 200));
    }

    #[wasm_bindgen_test]
    fn test_accepted_recipe_is_duplicate_until_reset() {
        let mut synth = ok(WasmDistortionSynth::new());
        let recipe = ok(synth.synthesize_recipe("single", 1));
        ok(synth.accept_recipe(recipe.clone()));
        assert!(ok(synth.is_duplicate(recipe.clone())));
        synth.reset_image();
        assert!(!ok(synth.is_duplicate(recipe)));
    }

    #[wasm_bindgen_test]
    fn test_unknown_mode_is_rejected() {
        let mut synth = ok(WasmDistortionSynth::new());
        assert!(synth.synthesize_recipe("triple", 2).is_err());
    }

    #[wasm_bindgen_test]
    fn test_rgba_size_mismatch() {
        assert!(rgba_to_rgb(&[0; 10], 32, 32).is_err());
    }
}
