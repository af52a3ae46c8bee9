//! Integration tests for distortion recipe synthesis

use std::collections::BTreeSet;

use distort_core::{
    DistortionClass, DistortionSynth, RecipeMode, ReferenceImage, SynthConfig, TaxonomyConfig,
};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Текстурированное изображение: градиенты плюс шахматка
fn textured_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let checker = if ((x / 8) + (y / 8)) % 2 == 0 { 40 } else { 0 };
        Rgb([
            (x * 200 / width) as u8 + checker,
            (y * 200 / height) as u8 + checker,
            ((x + y) * 100 / (width + height)) as u8 + 60,
        ])
    })
}

fn multi_config(samples_per_image: usize) -> SynthConfig {
    SynthConfig {
        mode: RecipeMode::Multi,
        steps: 2,
        samples_per_image,
        max_retries: 50,
        seed: 131,
    }
}

#[test]
fn test_end_to_end_multi_recipe() {
    init_logger();
    let synth = DistortionSynth::with_config(multi_config(2)).unwrap();
    let reference = ReferenceImage::new("ref", textured_image(100, 100)).unwrap();

    let mut rng = StdRng::seed_from_u64(131);
    let outcome = synth.synthesize_image(&reference, &mut rng).unwrap();
    assert_eq!(outcome.samples.len(), 2);

    let taxonomy = synth.taxonomy();
    for sample in &outcome.samples {
        let recipe = &sample.recipe;
        assert_eq!(recipe.len(), 2);

        let [a, b] = [recipe.steps[0].class, recipe.steps[1].class];
        if recipe.fallback_positions.is_empty() {
            assert!(taxonomy.graph().allows(a, b), "{:?} -> {:?}", a, b);
        }
        assert_ne!(taxonomy.category_of(a), taxonomy.category_of(b));

        for step in &recipe.steps {
            assert!(taxonomy.operations_of(step.class).contains(&step.operation));
            assert!((1..=5).contains(&step.severity.get()));
        }

        assert_eq!(sample.image.dimensions(), (100, 100));
    }

    assert!(outcome
        .samples
        .iter()
        .any(|sample| sample.image.as_raw() != reference.image.as_raw()));
}

#[test]
fn test_same_seed_same_output() {
    let synth = DistortionSynth::with_config(multi_config(3)).unwrap();
    let reference = ReferenceImage::new("ref", textured_image(64, 48)).unwrap();

    let a = synth
        .synthesize_image(&reference, &mut StdRng::seed_from_u64(131))
        .unwrap();
    let b = synth
        .synthesize_image(&reference, &mut StdRng::seed_from_u64(131))
        .unwrap();

    assert_eq!(a.samples.len(), b.samples.len());
    for (x, y) in a.samples.iter().zip(&b.samples) {
        assert_eq!(x.recipe, y.recipe);
        assert_eq!(x.image.as_raw(), y.image.as_raw());
    }
}

#[test]
fn test_retry_exhaustion_skips_slots() {
    init_logger();
    let taxonomy = TaxonomyConfig::standard().retain_classes(&[DistortionClass::Brighten]);
    let synth = DistortionSynth::with_taxonomy(taxonomy, multi_config(3)).unwrap();
    let reference = ReferenceImage::new("ref", textured_image(48, 48)).unwrap();

    let mut rng = StdRng::seed_from_u64(131);
    let outcome = synth.synthesize_image(&reference, &mut rng).unwrap();

    assert!(outcome.skipped >= 1);
    assert_eq!(outcome.samples.len() + outcome.skipped, 3);
}

#[test]
fn test_single_mode_uses_every_category_once() {
    let config = SynthConfig {
        mode: RecipeMode::Single,
        samples_per_image: 7,
        ..SynthConfig::default()
    };
    let synth = DistortionSynth::with_config(config).unwrap();
    let reference = ReferenceImage::new("ref", textured_image(40, 40)).unwrap();

    let outcome = synth
        .synthesize_image(&reference, &mut StdRng::seed_from_u64(5))
        .unwrap();
    assert_eq!(outcome.samples.len(), 7);

    let categories: BTreeSet<_> = outcome
        .samples
        .iter()
        .map(|s| synth.taxonomy().category_of(s.recipe.steps[0].class))
        .collect();
    assert_eq!(categories.len(), 7);
}

#[test]
fn test_grayscale_reference_goes_through_pipeline() {
    let gray = GrayImage::from_fn(64, 64, |x, y| Luma([((x + y) * 2) as u8]));
    let reference = ReferenceImage::from_dynamic("gray", DynamicImage::ImageLuma8(gray)).unwrap();
    let synth = DistortionSynth::new().unwrap();

    let outcome = synth.run_batch(&[reference]).unwrap();
    for sample in &outcome.images[0].samples {
        assert_eq!(sample.image.dimensions(), (64, 64));
    }
}

#[test]
fn test_custom_taxonomy_from_json() {
    let json = r#"{
        "categories": {
            "brightness": ["brighten"],
            "contrast": ["contrast_weaken"]
        },
        "operations": {
            "brighten": ["brightness_brighten_gamma_RGB"],
            "contrast_weaken": ["contrast_weaken_scale"]
        },
        "compatibility": {
            "brighten": ["contrast_weaken"]
        }
    }"#;
    let taxonomy = TaxonomyConfig::from_json(json).unwrap();
    let synth = DistortionSynth::with_taxonomy(taxonomy, multi_config(1)).unwrap();

    let recipe = synth
        .synthesize_recipe(RecipeMode::Multi, 2, &BTreeSet::new(), &mut StdRng::seed_from_u64(1))
        .unwrap()
        .unwrap();
    let classes: BTreeSet<_> = recipe.classes().into_iter().collect();
    assert_eq!(
        classes,
        BTreeSet::from([DistortionClass::Brighten, DistortionClass::ContrastWeaken])
    );
}

#[test]
fn test_unregistered_operation_is_a_config_error() {
    let json = r#"{
        "categories": { "brightness": ["brighten"] },
        "operations": { "brighten": ["brightness_brighten_laser"] }
    }"#;
    let taxonomy = TaxonomyConfig::from_json(json).unwrap();
    assert!(DistortionSynth::with_taxonomy(taxonomy, SynthConfig::default()).is_err());
}

#[cfg(feature = "parallel")]
#[test]
fn test_batch_independent_of_thread_count() {
    let references: Vec<_> = (0..6)
        .map(|i| ReferenceImage::new(format!("img_{}", i), textured_image(40 + i * 4, 40)).unwrap())
        .collect();
    let synth = DistortionSynth::with_config(multi_config(3)).unwrap();

    let run_with = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        pool.install(|| synth.run_batch(&references).unwrap())
    };
    let one = run_with(1);
    let four = run_with(4);

    assert_eq!(one.report(), four.report());
    for (a, b) in one.images.iter().zip(&four.images) {
        for (x, y) in a.samples.iter().zip(&b.samples) {
            assert_eq!(x.recipe, y.recipe);
            assert_eq!(x.image.as_raw(), y.image.as_raw());
        }
    }
}
