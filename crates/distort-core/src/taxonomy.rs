//! Таксономия искажений
//!
//! Статический реестр: категория -> классы -> операции, плюс граф
//! совместимости классов для многошаговых рецептов. Загружается один раз и
//! далее только читается.
//!
//! Все отображения упорядочены (`BTreeMap`), поэтому выборка с
//! фиксированным seed воспроизводима.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::transforms::TransformRegistry;
use crate::SynthError;

/// Семантическая группа классов искажений
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Brightness,
    Contrast,
    Exposure,
    Oversharpen,
    Saturate,
    Temperature,
    Tint,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Brightness,
        Category::Contrast,
        Category::Exposure,
        Category::Oversharpen,
        Category::Saturate,
        Category::Temperature,
        Category::Tint,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Brightness => "brightness",
            Category::Contrast => "contrast",
            Category::Exposure => "exposure",
            Category::Oversharpen => "oversharpen",
            Category::Saturate => "saturate",
            Category::Temperature => "temperature",
            Category::Tint => "tint",
        }
    }
}

/// Направленный эффект внутри категории
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionClass {
    Brighten,
    Darken,
    ContrastStrengthen,
    ContrastWeaken,
    SaturateStrengthen,
    SaturateWeaken,
    Oversharpen,
    TemperatureWarm,
    TemperatureCool,
    TintGreen,
    TintMagenta,
    ExposureIncrease,
    ExposureDecrease,
}

impl DistortionClass {
    pub const ALL: [DistortionClass; 13] = [
        DistortionClass::Brighten,
        DistortionClass::Darken,
        DistortionClass::ContrastStrengthen,
        DistortionClass::ContrastWeaken,
        DistortionClass::SaturateStrengthen,
        DistortionClass::SaturateWeaken,
        DistortionClass::Oversharpen,
        DistortionClass::TemperatureWarm,
        DistortionClass::TemperatureCool,
        DistortionClass::TintGreen,
        DistortionClass::TintMagenta,
        DistortionClass::ExposureIncrease,
        DistortionClass::ExposureDecrease,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DistortionClass::Brighten => "brighten",
            DistortionClass::Darken => "darken",
            DistortionClass::ContrastStrengthen => "contrast_strengthen",
            DistortionClass::ContrastWeaken => "contrast_weaken",
            DistortionClass::SaturateStrengthen => "saturate_strengthen",
            DistortionClass::SaturateWeaken => "saturate_weaken",
            DistortionClass::Oversharpen => "oversharpen",
            DistortionClass::TemperatureWarm => "temperature_warm",
            DistortionClass::TemperatureCool => "temperature_cool",
            DistortionClass::TintGreen => "tint_green",
            DistortionClass::TintMagenta => "tint_magenta",
            DistortionClass::ExposureIncrease => "exposure_increase",
            DistortionClass::ExposureDecrease => "exposure_decrease",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DistortionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SynthError::Taxonomy(format!("unknown category '{}'", s)))
    }
}

impl FromStr for DistortionClass {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistortionClass::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SynthError::Taxonomy(format!("unknown distortion class '{}'", s)))
    }
}

/// Описание таксономии (сериализуемое)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Категория -> классы
    pub categories: BTreeMap<Category, Vec<DistortionClass>>,
    /// Класс -> имена операций
    pub operations: BTreeMap<DistortionClass, Vec<String>>,
    /// Класс -> классы, которые могут за ним следовать
    #[serde(default)]
    pub compatibility: BTreeMap<DistortionClass, Vec<DistortionClass>>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl TaxonomyConfig {
    /// Встроенная таксономия
    pub fn standard() -> Self {
        use DistortionClass::*;

        let categories = BTreeMap::from([
            (Category::Brightness, vec![Brighten, Darken]),
            (Category::Contrast, vec![ContrastStrengthen, ContrastWeaken]),
            (Category::Exposure, vec![ExposureIncrease, ExposureDecrease]),
            (Category::Oversharpen, vec![Oversharpen]),
            (Category::Saturate, vec![SaturateStrengthen, SaturateWeaken]),
            (Category::Temperature, vec![TemperatureWarm, TemperatureCool]),
            (Category::Tint, vec![TintGreen, TintMagenta]),
        ]);

        let ops = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let operations = BTreeMap::from([
            (
                Brighten,
                ops(&[
                    "brightness_brighten_shift_HSV",
                    "brightness_brighten_shift_RGB",
                    "brightness_brighten_gamma_HSV",
                    "brightness_brighten_gamma_RGB",
                ]),
            ),
            (
                Darken,
                ops(&[
                    "brightness_darken_shift_HSV",
                    "brightness_darken_shift_RGB",
                    "brightness_darken_gamma_HSV",
                    "brightness_darken_gamma_RGB",
                ]),
            ),
            (ContrastStrengthen, ops(&["contrast_strengthen_scale", "contrast_strengthen_stretch"])),
            (ContrastWeaken, ops(&["contrast_weaken_scale", "contrast_weaken_stretch"])),
            (SaturateStrengthen, ops(&["saturate_strengthen_HSV", "saturate_strengthen_YCrCb"])),
            (SaturateWeaken, ops(&["saturate_weaken_HSV", "saturate_weaken_YCrCb"])),
            (Oversharpen, ops(&["oversharpen"])),
            (TemperatureWarm, ops(&["temperature_warm_RGB", "temperature_warm_LAB"])),
            (TemperatureCool, ops(&["temperature_cool_RGB", "temperature_cool_LAB"])),
            (TintGreen, ops(&["tint_green_RGB", "tint_green_LAB"])),
            (TintMagenta, ops(&["tint_magenta_RGB", "tint_magenta_LAB"])),
            (ExposureIncrease, ops(&["exposure_increase_LAB"])),
            (ExposureDecrease, ops(&["exposure_decrease_LAB"])),
        ]);

        // Brightness и exposure не следуют друг за другом;
        // temperature и tint тоже.
        let after_brightness = vec![
            ContrastStrengthen, ContrastWeaken,
            SaturateStrengthen, SaturateWeaken,
            TemperatureWarm, TemperatureCool,
            TintGreen, TintMagenta,
            Oversharpen,
        ];
        let after_contrast = vec![
            Brighten, Darken,
            SaturateStrengthen, SaturateWeaken,
            ExposureIncrease, ExposureDecrease,
            TemperatureWarm, TemperatureCool,
            TintGreen, TintMagenta,
            Oversharpen,
        ];
        let after_saturate = vec![
            Brighten, Darken,
            ContrastStrengthen, ContrastWeaken,
            ExposureIncrease, ExposureDecrease,
            TemperatureWarm, TemperatureCool,
            TintGreen, TintMagenta,
            Oversharpen,
        ];
        let after_color_cast = vec![
            Brighten, Darken,
            ContrastStrengthen, ContrastWeaken,
            SaturateStrengthen, SaturateWeaken,
            ExposureIncrease, ExposureDecrease,
            Oversharpen,
        ];
        let after_oversharpen = vec![
            Brighten, Darken,
            ContrastStrengthen, ContrastWeaken,
            SaturateStrengthen, SaturateWeaken,
            ExposureIncrease, ExposureDecrease,
            TemperatureWarm, TemperatureCool,
            TintGreen, TintMagenta,
        ];

        let compatibility = BTreeMap::from([
            (Brighten, after_brightness.clone()),
            (Darken, after_brightness.clone()),
            (ContrastStrengthen, after_contrast.clone()),
            (ContrastWeaken, after_contrast),
            (SaturateStrengthen, after_saturate.clone()),
            (SaturateWeaken, after_saturate),
            (ExposureIncrease, after_brightness.clone()),
            (ExposureDecrease, after_brightness),
            (TemperatureWarm, after_color_cast.clone()),
            (TemperatureCool, after_color_cast.clone()),
            (TintGreen, after_color_cast.clone()),
            (TintMagenta, after_color_cast),
            (Oversharpen, after_oversharpen),
        ]);

        Self {
            categories,
            operations,
            compatibility,
        }
    }

    /// Загрузка из JSON
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Подмножество таксономии: только указанные классы.
    ///
    /// Опустевшие категории удаляются, рёбра графа к отброшенным классам тоже.
    pub fn retain_classes(&self, keep: &[DistortionClass]) -> Self {
        let kept = |class: &DistortionClass| keep.contains(class);

        let categories = self
            .categories
            .iter()
            .map(|(&category, classes)| (category, classes.iter().copied().filter(kept).collect::<Vec<_>>()))
            .filter(|(_, classes)| !classes.is_empty())
            .collect();
        let operations = self
            .operations
            .iter()
            .filter(|(class, _)| kept(*class))
            .map(|(&class, names)| (class, names.clone()))
            .collect();
        let compatibility = self
            .compatibility
            .iter()
            .filter(|(class, _)| kept(*class))
            .map(|(&class, next)| (class, next.iter().copied().filter(kept).collect()))
            .collect();

        Self {
            categories,
            operations,
            compatibility,
        }
    }
}

/// Граф совместимости: класс -> допустимые последователи.
///
/// Направленный; симметрия не предполагается.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityGraph {
    edges: BTreeMap<DistortionClass, Vec<DistortionClass>>,
}

impl CompatibilityGraph {
    pub fn successors(&self, class: DistortionClass) -> &[DistortionClass] {
        self.edges.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn allows(&self, from: DistortionClass, to: DistortionClass) -> bool {
        self.successors(from).contains(&to)
    }
}

/// Проверенная таксономия
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: BTreeMap<Category, Vec<DistortionClass>>,
    class_category: BTreeMap<DistortionClass, Category>,
    operations: BTreeMap<DistortionClass, Vec<String>>,
    /// Порядок объявления: по категориям, затем по классам
    classes: Vec<DistortionClass>,
    graph: CompatibilityGraph,
}

impl Taxonomy {
    /// Встроенная таксономия поверх стандартного реестра
    pub fn standard(registry: &TransformRegistry) -> Result<Self, SynthError> {
        Self::load(TaxonomyConfig::standard(), registry)
    }

    /// Загрузка с проверкой. Любое нарушение - фатальная ошибка конфигурации.
    pub fn load(config: TaxonomyConfig, registry: &TransformRegistry) -> Result<Self, SynthError> {
        let mut class_category = BTreeMap::new();
        let mut classes = Vec::new();

        // 1. Категории: каждый класс ровно в одной категории
        for (&category, members) in &config.categories {
            if members.is_empty() {
                return Err(SynthError::Taxonomy(format!("category '{}' has no classes", category)));
            }
            for &class in members {
                if let Some(previous) = class_category.insert(class, category) {
                    return Err(SynthError::Taxonomy(format!(
                        "class '{}' listed in both '{}' and '{}'",
                        class, previous, category
                    )));
                }
                classes.push(class);
            }
        }

        // 2. Операции: каждый класс разрешается хотя бы в одну
        //    зарегистрированную операцию
        for class in config.operations.keys() {
            if !class_category.contains_key(class) {
                return Err(SynthError::Taxonomy(format!(
                    "operations given for class '{}' which belongs to no category",
                    class
                )));
            }
        }
        for class in &classes {
            let names = config.operations.get(class).map(Vec::as_slice).unwrap_or(&[]);
            if names.is_empty() {
                return Err(SynthError::Taxonomy(format!("class '{}' has no operations", class)));
            }
            if let Some(missing) = names.iter().find(|n| !registry.contains(n)) {
                return Err(SynthError::UnknownOperation(missing.clone()));
            }
        }

        // 3. Граф: только известные классы, без петель
        for (&from, successors) in &config.compatibility {
            if !class_category.contains_key(&from) {
                return Err(SynthError::Taxonomy(format!(
                    "compatibility graph references unknown class '{}'",
                    from
                )));
            }
            for &to in successors {
                if to == from {
                    return Err(SynthError::Taxonomy(format!("class '{}' is compatible with itself", from)));
                }
                if !class_category.contains_key(&to) {
                    return Err(SynthError::Taxonomy(format!(
                        "compatibility graph references unknown class '{}'",
                        to
                    )));
                }
            }
        }

        log::debug!(
            "Taxonomy loaded: {} categories, {} classes",
            config.categories.len(),
            classes.len()
        );

        Ok(Self {
            categories: config.categories,
            class_category,
            operations: config.operations,
            classes,
            graph: CompatibilityGraph {
                edges: config.compatibility,
            },
        })
    }

    /// Категории в порядке объявления
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    /// Все классы в порядке объявления
    pub fn classes(&self) -> &[DistortionClass] {
        &self.classes
    }

    pub fn classes_of(&self, category: Category) -> &[DistortionClass] {
        self.categories.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn operations_of(&self, class: DistortionClass) -> &[String] {
        self.operations.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn category_of(&self, class: DistortionClass) -> Option<Category> {
        self.class_category.get(&class).copied()
    }

    pub fn contains(&self, class: DistortionClass) -> bool {
        self.class_category.contains_key(&class)
    }

    pub fn graph(&self) -> &CompatibilityGraph {
        &self.graph
    }

    /// "Богатство" категории: суммарное число операций её классов.
    /// Категория без операций весит 1.
    pub fn category_weight(&self, category: Category) -> usize {
        let weight: usize = self
            .classes_of(category)
            .iter()
            .map(|&class| self.operations_of(class).len())
            .sum();
        weight.max(1)
    }

    /// Равномерный выбор одной операции класса
    pub fn choose_operation<R: Rng + ?Sized>(&self, class: DistortionClass, rng: &mut R) -> Option<&str> {
        self.operations_of(class).choose(rng).map(String::as_str)
    }

    /// Класс, к которому принадлежит операция
    pub fn class_of_operation(&self, name: &str) -> Option<DistortionClass> {
        self.operations
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(&class, _)| class)
    }

    /// Разрешение имени в операцию: имя операции возвращается как есть,
    /// имя класса - случайной операцией этого класса.
    pub fn resolve_operation<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Result<String, SynthError> {
        if self.class_of_operation(name).is_some() {
            return Ok(name.to_string());
        }
        let class = DistortionClass::from_str(name)
            .map_err(|_| SynthError::UnknownOperation(name.to_string()))?;
        self.choose_operation(class, rng)
            .map(str::to_string)
            .ok_or_else(|| SynthError::UnknownOperation(name.to_string()))
    }

    /// Снимок в виде конфигурации
    pub fn to_config(&self) -> TaxonomyConfig {
        TaxonomyConfig {
            categories: self.categories.clone(),
            operations: self.operations.clone(),
            compatibility: self.graph.edges.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn standard() -> Taxonomy {
        Taxonomy::standard(&TransformRegistry::standard()).unwrap()
    }

    #[test]
    fn test_standard_taxonomy_loads() {
        let taxonomy = standard();
        assert_eq!(taxonomy.categories().count(), 7);
        assert_eq!(taxonomy.classes().len(), 13);
        assert_eq!(taxonomy.category_of(DistortionClass::TintGreen), Some(Category::Tint));
        assert_eq!(taxonomy.category_weight(Category::Brightness), 8);
        assert_eq!(taxonomy.category_weight(Category::Oversharpen), 1);
    }

    #[test]
    fn test_graph_never_pairs_a_category_with_itself() {
        let taxonomy = standard();
        for &class in taxonomy.classes() {
            for &next in taxonomy.graph().successors(class) {
                assert_ne!(taxonomy.category_of(class), taxonomy.category_of(next));
            }
        }
    }

    #[test]
    fn test_graph_is_not_assumed_symmetric() {
        let graph = standard().graph().clone();
        assert!(graph.allows(DistortionClass::ExposureIncrease, DistortionClass::Oversharpen));
        assert!(!graph.allows(DistortionClass::Brighten, DistortionClass::ExposureIncrease));
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let mut config = TaxonomyConfig::standard();
        config
            .compatibility
            .get_mut(&DistortionClass::Oversharpen)
            .unwrap()
            .push(DistortionClass::Oversharpen);
        let err = Taxonomy::load(config, &TransformRegistry::standard()).unwrap_err();
        assert!(matches!(err, SynthError::Taxonomy(_)));
    }

    #[test]
    fn test_class_without_operations_is_rejected() {
        let mut config = TaxonomyConfig::standard();
        config.operations.remove(&DistortionClass::TintMagenta);
        assert!(Taxonomy::load(config, &TransformRegistry::standard()).is_err());
    }

    #[test]
    fn test_unregistered_operation_is_rejected() {
        let mut config = TaxonomyConfig::standard();
        config
            .operations
            .insert(DistortionClass::Oversharpen, vec!["jpeg_compression".to_string()]);
        let err = Taxonomy::load(config, &TransformRegistry::standard()).unwrap_err();
        assert!(matches!(err, SynthError::UnknownOperation(_)));
    }

    #[test]
    fn test_graph_with_unknown_class_is_rejected() {
        let mut config = TaxonomyConfig::standard();
        config.categories.remove(&Category::Tint);
        config.operations.remove(&DistortionClass::TintGreen);
        config.operations.remove(&DistortionClass::TintMagenta);
        // граф всё ещё ссылается на tint_*
        assert!(Taxonomy::load(config, &TransformRegistry::standard()).is_err());
    }

    #[test]
    fn test_class_in_two_categories_is_rejected() {
        let mut config = TaxonomyConfig::standard();
        config
            .categories
            .get_mut(&Category::Exposure)
            .unwrap()
            .push(DistortionClass::Brighten);
        assert!(Taxonomy::load(config, &TransformRegistry::standard()).is_err());
    }

    #[test]
    fn test_resolve_operation() {
        let taxonomy = standard();
        let mut rng = StdRng::seed_from_u64(131);
        assert_eq!(taxonomy.resolve_operation("oversharpen", &mut rng).unwrap(), "oversharpen");
        let op = taxonomy.resolve_operation("tint_green", &mut rng).unwrap();
        assert!(op.starts_with("tint_green_"));
        assert!(taxonomy.resolve_operation("motion_blur", &mut rng).is_err());
        assert_eq!(
            taxonomy.class_of_operation("contrast_weaken_stretch"),
            Some(DistortionClass::ContrastWeaken)
        );
    }

    #[test]
    fn test_retain_classes() {
        let config = TaxonomyConfig::standard().retain_classes(&[
            DistortionClass::Brighten,
            DistortionClass::Oversharpen,
        ]);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[&Category::Brightness], vec![DistortionClass::Brighten]);
        assert_eq!(
            config.compatibility[&DistortionClass::Brighten],
            vec![DistortionClass::Oversharpen]
        );
        assert!(Taxonomy::load(config, &TransformRegistry::standard()).is_ok());
    }

    #[test]
    fn test_config_json_roundtrip_loads() {
        let json = serde_json::to_string(&TaxonomyConfig::standard()).unwrap();
        assert!(json.contains("\"brightness\""));
        let config = TaxonomyConfig::from_json(&json).unwrap();
        assert!(Taxonomy::load(config, &TransformRegistry::standard()).is_ok());
    }
}
