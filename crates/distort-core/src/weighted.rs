//! Взвешенный выбор категорий для одношаговых рецептов
//!
//! Вес категории равен числу операций во всех её классах, поэтому
//! категории с большим разнообразием реализаций выбираются чаще.

use std::collections::BTreeSet;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::taxonomy::{Category, DistortionClass, Taxonomy};

/// Результат выбора: категория, класс и конкретная операция
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub category: Category,
    pub class: DistortionClass,
    pub operation: String,
}

/// Взвешенная выборка без возвращения.
///
/// На каждом шаге порог равномерно берётся из [0, сумма весов), кандидаты
/// обходятся с накоплением веса до превышения порога. При нулевой или
/// бесконечной сумме весов выбор равномерный. Возвращает не более `candidates.len()` элементов.
pub fn weighted_sample_without_replacement<T, R>(candidates: &[(T, f64)], k: usize, rng: &mut R) -> Vec<T>
where
    T: Copy,
    R: Rng + ?Sized,
{
    let mut available = candidates.to_vec();
    let mut selected = Vec::with_capacity(k.min(available.len()));

    while selected.len() < k && !available.is_empty() {
        let total: f64 = available.iter().map(|(_, w)| w.max(0.0)).sum();

        let idx = if !total.is_finite() || total <= 0.0 {
            rng.gen_range(0..available.len())
        } else {
            let threshold = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, (_, weight)) in available.iter().enumerate() {
                cumulative += weight.max(0.0);
                if threshold < cumulative {
                    chosen = Some(i);
                    break;
                }
            }
            // float rounding at the tail
            chosen
                .or_else(|| available.iter().rposition(|(_, w)| *w > 0.0))
                .unwrap_or(available.len() - 1)
        };

        selected.push(available.remove(idx).0);
    }

    selected
}

/// Взвешенный сэмплер категорий
pub struct WeightedCategorySampler<'a> {
    taxonomy: &'a Taxonomy,
}

impl<'a> WeightedCategorySampler<'a> {
    pub fn new(taxonomy: &'a Taxonomy) -> Self {
        Self { taxonomy }
    }

    /// Категории-кандидаты за вычетом исключённых.
    ///
    /// Если исключение опустошает пул, оно игнорируется для этого выбора.
    pub fn candidates(&self, excluded: &BTreeSet<Category>) -> Vec<Category> {
        let usable: Vec<Category> = self
            .taxonomy
            .categories()
            .filter(|&category| {
                self.taxonomy
                    .classes_of(category)
                    .iter()
                    .any(|&class| !self.taxonomy.operations_of(class).is_empty())
            })
            .collect();

        let pool: Vec<Category> = usable
            .iter()
            .copied()
            .filter(|category| !excluded.contains(category))
            .collect();

        if pool.is_empty() {
            log::debug!("All categories excluded, dropping the exclusion for this draw");
            usable
        } else {
            pool
        }
    }

    /// Выбор `k` категорий и для каждой - класса и операции.
    ///
    /// Сначала без возвращения; если `k` больше числа кандидатов, после
    /// полного перебора остаток добирается с возвращением с теми же весами.
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, excluded: &BTreeSet<Category>, rng: &mut R) -> Vec<Pick> {
        let categories = self.candidates(excluded);
        if categories.is_empty() || k == 0 {
            return Vec::new();
        }

        let weighted: Vec<(Category, f64)> = categories
            .iter()
            .map(|&category| (category, self.taxonomy.category_weight(category) as f64))
            .collect();

        let mut selected = weighted_sample_without_replacement(&weighted, k, rng);

        if selected.len() < k {
            let remaining = k - selected.len();
            match WeightedIndex::new(weighted.iter().map(|(_, w)| *w)) {
                Ok(dist) => {
                    for _ in 0..remaining {
                        selected.push(weighted[dist.sample(rng)].0);
                    }
                }
                Err(_) => {
                    for _ in 0..remaining {
                        selected.push(weighted[rng.gen_range(0..weighted.len())].0);
                    }
                }
            }
        }

        selected
            .into_iter()
            .filter_map(|category| self.pick_in(category, rng))
            .collect()
    }

    /// Равномерно класс внутри категории, затем равномерно операция
    fn pick_in<R: Rng + ?Sized>(&self, category: Category, rng: &mut R) -> Option<Pick> {
        let classes: Vec<DistortionClass> = self
            .taxonomy
            .classes_of(category)
            .iter()
            .copied()
            .filter(|&class| !self.taxonomy.operations_of(class).is_empty())
            .collect();
        let class = *classes.choose(rng)?;
        let operation = self.taxonomy.choose_operation(class, rng)?.to_string();
        Some(Pick {
            category,
            class,
            operation,
        })
    }
}
