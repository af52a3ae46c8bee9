//! Рецепт искажения
//!
//! Упорядоченная последовательность шагов (класс, операция, сила),
//! применяемая к одному эталонному изображению.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::severity::Severity;
use crate::taxonomy::DistortionClass;

/// Один шаг рецепта
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub class: DistortionClass,
    pub operation: String,
    pub severity: Severity,
}

/// Рецепт искажения
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub steps: Vec<RecipeStep>,
    /// Позиции, заполненные без учёта графа совместимости (тупик обхода)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_positions: Vec<usize>,
}

impl Recipe {
    pub fn new(steps: Vec<RecipeStep>) -> Self {
        Self {
            steps,
            fallback_positions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Классы в порядке применения
    pub fn classes(&self) -> Vec<DistortionClass> {
        self.steps.iter().map(|s| s.class).collect()
    }

    pub fn first_class(&self) -> Option<DistortionClass> {
        self.steps.first().map(|s| s.class)
    }

    /// Классы, отсортированные для сравнения без учёта порядка
    fn class_key(&self) -> Vec<DistortionClass> {
        let mut classes = self.classes();
        classes.sort_unstable();
        classes
    }

    /// Равенство для дедупликации: совпадают наборы классов (порядок,
    /// операции и сила не учитываются).
    pub fn same_classes(&self, other: &Recipe) -> bool {
        self.class_key() == other.class_key()
    }

    /// Имя операции -> позиция в рецепте
    pub fn order_by_name(&self) -> BTreeMap<String, usize> {
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, step)| (step.operation.clone(), idx))
            .collect()
    }

    pub fn severities(&self) -> Vec<u8> {
        self.steps.iter().map(|s| s.severity.get()).collect()
    }
}

/// Повторяет ли рецепт один из уже принятых
pub fn is_duplicate(recipe: &Recipe, history: &[Recipe]) -> bool {
    history.iter().any(|accepted| accepted.same_classes(recipe))
}
