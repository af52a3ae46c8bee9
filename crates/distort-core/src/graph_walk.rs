//! Выбор классов для многошаговых рецептов обходом графа совместимости
//!
//! Алгоритм:
//! 1. Первый класс: равномерно вне исключённых категорий (если это
//!    возможно, иначе из всех классов)
//! 2. Каждый следующий: равномерно среди последователей предыдущего в графе,
//!    ещё не использованных и из ещё не задействованных категорий
//! 3. В тупике графа: равномерно среди всех оставшихся классов свободных
//!    категорий; позиция запоминается как fallback

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::taxonomy::{Category, DistortionClass, Taxonomy};
use crate::SynthError;

/// Результат обхода графа
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphWalk {
    /// Классы в порядке применения
    pub classes: Vec<DistortionClass>,
    /// Позиции, выбранные без учёта графа
    pub fallback_positions: Vec<usize>,
}

/// Сэмплер многошаговых рецептов
pub struct RecipeSampler<'a> {
    taxonomy: &'a Taxonomy,
}

impl<'a> RecipeSampler<'a> {
    pub fn new(taxonomy: &'a Taxonomy) -> Self {
        Self { taxonomy }
    }

    /// Построение последовательности из `n` классов.
    ///
    /// `Ok(None)` означает, что подходящей последовательности нет вовсе
    /// (пул классов пуст или свободных категорий меньше `n`).
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        excluded: &BTreeSet<Category>,
        rng: &mut R,
    ) -> Result<Option<GraphWalk>, SynthError> {
        if n < 2 {
            return Err(SynthError::InvalidRequest(format!(
                "multi-distortion recipes need at least 2 steps, got {}",
                n
            )));
        }

        let pool: Vec<DistortionClass> = self
            .taxonomy
            .classes()
            .iter()
            .copied()
            .filter(|&class| !self.taxonomy.operations_of(class).is_empty())
            .collect();

        // 1. Первый класс
        let outside_excluded: Vec<DistortionClass> = pool
            .iter()
            .copied()
            .filter(|&class| {
                self.taxonomy
                    .category_of(class)
                    .map_or(true, |category| !excluded.contains(&category))
            })
            .collect();
        let first_pool = if outside_excluded.is_empty() {
            &pool
        } else {
            &outside_excluded
        };
        let Some(&first) = first_pool.choose(rng) else {
            return Ok(None);
        };

        let mut classes = vec![first];
        let mut used_categories: BTreeSet<Category> = self.taxonomy.category_of(first).into_iter().collect();
        let mut fallback_positions = Vec::new();

        // 2. Остальные позиции
        while classes.len() < n {
            let last = classes[classes.len() - 1];
            let compatible: Vec<DistortionClass> = self
                .taxonomy
                .graph()
                .successors(last)
                .iter()
                .copied()
                .filter(|&class| self.is_open(class, &classes, &used_categories))
                .collect();

            let next = match compatible.choose(rng) {
                Some(&next) => next,
                None => {
                    // 3. Тупик графа
                    let remaining: Vec<DistortionClass> = pool
                        .iter()
                        .copied()
                        .filter(|&class| self.is_open(class, &classes, &used_categories))
                        .collect();
                    let Some(&next) = remaining.choose(rng) else {
                        log::debug!(
                            "No class left for position {} after {:?}, giving up",
                            classes.len(),
                            classes
                        );
                        return Ok(None);
                    };
                    log::debug!(
                        "Compatibility dead end after '{}', falling back to '{}'",
                        last,
                        next
                    );
                    fallback_positions.push(classes.len());
                    next
                }
            };

            used_categories.extend(self.taxonomy.category_of(next));
            classes.push(next);
        }

        Ok(Some(GraphWalk {
            classes,
            fallback_positions,
        }))
    }

    /// Класс можно поставить следующим: есть операции, он ещё не выбран,
    /// его категория ещё не задействована.
    fn is_open(&self, class: DistortionClass, chosen: &[DistortionClass], used: &BTreeSet<Category>) -> bool {
        !self.taxonomy.operations_of(class).is_empty()
            && !chosen.contains(&class)
            && self
                .taxonomy
                .category_of(class)
                .map_or(false, |category| !used.contains(&category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TaxonomyConfig;
    use crate::transforms::TransformRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use DistortionClass::*;

    fn load(config: TaxonomyConfig) -> Taxonomy {
        Taxonomy::load(config, &TransformRegistry::standard()).unwrap()
    }

    #[test]
    fn test_single_step_is_rejected() {
        let taxonomy = load(TaxonomyConfig::standard());
        let sampler = RecipeSampler::new(&taxonomy);
        let mut rng = StdRng::seed_from_u64(131);
        assert!(sampler.sample(1, &BTreeSet::new(), &mut rng).is_err());
        assert!(sampler.sample(0, &BTreeSet::new(), &mut rng).is_err());
    }

    #[test]
    fn test_walk_follows_graph_and_keeps_categories_distinct() {
        let taxonomy = load(TaxonomyConfig::standard());
        let sampler = RecipeSampler::new(&taxonomy);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let n = 2 + (seed as usize % 4);
            let walk = sampler.sample(n, &BTreeSet::new(), &mut rng).unwrap().unwrap();
            assert_eq!(walk.classes.len(), n);

            let categories: BTreeSet<_> = walk.classes.iter().map(|&c| taxonomy.category_of(c)).collect();
            assert_eq!(categories.len(), n, "{:?}", walk.classes);

            for i in 1..n {
                if !walk.fallback_positions.contains(&i) {
                    assert!(taxonomy.graph().allows(walk.classes[i - 1], walk.classes[i]));
                }
            }
        }
    }

    #[test]
    fn test_first_class_avoids_excluded_categories() {
        let taxonomy = load(TaxonomyConfig::standard());
        let sampler = RecipeSampler::new(&taxonomy);
        let excluded: BTreeSet<_> = [Category::Brightness, Category::Saturate, Category::Tint].into();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let walk = sampler.sample(2, &excluded, &mut rng).unwrap().unwrap();
            let first = taxonomy.category_of(walk.classes[0]).unwrap();
            assert!(!excluded.contains(&first));
        }
    }

    #[test]
    fn test_full_exclusion_falls_back_to_all_classes() {
        let taxonomy = load(TaxonomyConfig::standard());
        let sampler = RecipeSampler::new(&taxonomy);
        let excluded: BTreeSet<_> = Category::ALL.into_iter().collect();
        let mut rng = StdRng::seed_from_u64(4);
        assert!(sampler.sample(2, &excluded, &mut rng).unwrap().is_some());
    }

    #[test]
    fn test_dead_end_uses_fallback() {
        let mut config = TaxonomyConfig::standard().retain_classes(&[Brighten, ContrastWeaken]);
        config.compatibility.clear();
        let taxonomy = load(config);
        let sampler = RecipeSampler::new(&taxonomy);
        let mut rng = StdRng::seed_from_u64(131);
        let walk = sampler.sample(2, &BTreeSet::new(), &mut rng).unwrap().unwrap();
        assert_eq!(walk.fallback_positions, vec![1]);
        let set: BTreeSet<_> = walk.classes.iter().copied().collect();
        assert_eq!(set, BTreeSet::from([Brighten, ContrastWeaken]));
    }

    #[test]
    fn test_single_category_cannot_produce_a_walk() {
        let taxonomy = load(TaxonomyConfig::standard().retain_classes(&[Brighten, Darken]));
        let sampler = RecipeSampler::new(&taxonomy);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(sampler.sample(2, &BTreeSet::new(), &mut rng).unwrap(), None);
    }

    #[test]
    fn test_same_seed_same_walk() {
        let taxonomy = load(TaxonomyConfig::standard());
        let sampler = RecipeSampler::new(&taxonomy);
        let a = sampler.sample(3, &BTreeSet::new(), &mut StdRng::seed_from_u64(131)).unwrap();
        let b = sampler.sample(3, &BTreeSet::new(), &mut StdRng::seed_from_u64(131)).unwrap();
        assert_eq!(a, b);
    }
}
