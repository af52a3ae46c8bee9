//! Generator of a distorted image dataset from reference images
//!
//! Usage: cargo run -p distort-core --example gen_dataset -- <reference_dir> <output_dir> [config.json]
//!
//! Writes `<stem>_<slot>.<ext>` for every accepted sample and `meta.json`
//! in the output directory. `meta.json` is rewritten after every reference,
//! so an interrupted run resumes from the last finished image. References already present in `meta.json` with
//! all their outputs on disk are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use distort_core::{DistortionSynth, ReferenceImage, SampleRecord, SynthConfig};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Короткая сторона после масштабирования
const RESIZE: u32 = 768;
const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Serialize, Deserialize)]
struct MetaEntry {
    img_path: String,
    distortion_num: usize,
    distortions: Vec<DistortionEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DistortionEntry {
    #[serde(flatten)]
    record: SampleRecord,
    img_lq: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let reference_dir = PathBuf::from(args.first().map(String::as_str).unwrap_or("reference_images"));
    let output_dir = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("distorted_dataset"));
    let config = match args.get(2) {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
            SynthConfig::from_json(&json)?
        }
        None => SynthConfig::default(),
    };

    fs::create_dir_all(&output_dir).with_context(|| format!("creating {:?}", output_dir))?;
    let meta_path = output_dir.join("meta.json");
    let mut meta: BTreeMap<String, MetaEntry> = if meta_path.exists() {
        let json = fs::read_to_string(&meta_path)?;
        let meta: BTreeMap<String, MetaEntry> = serde_json::from_str(&json).context("parsing meta.json")?;
        println!("Loaded existing summary with {} entries", meta.len());
        meta
    } else {
        BTreeMap::new()
    };

    let paths = collect_images(&reference_dir)?;
    println!("Total images to process: {}", paths.len());

    let mut pending = Vec::new();
    for path in paths {
        let stem = file_stem(&path);
        if is_complete(&meta, &stem, &path, &output_dir) {
            println!("{:?} has been generated, skip.", path);
            continue;
        }
        let img = image::open(&path).with_context(|| format!("opening {:?}", path))?;
        let reference = ReferenceImage::from_dynamic(stem, resize_short_side(drop_alpha(img), RESIZE))
            .with_context(|| format!("loading {:?}", path))?;
        pending.push((path, reference));
    }

    let synth = DistortionSynth::with_config(config)?;
    let references: Vec<ReferenceImage> = pending.iter().map(|(_, r)| r.clone()).collect();
    let outcome = synth.run_batch(&references)?;

    for ((path, _), image_outcome) in pending.iter().zip(&outcome.images) {
        let ext = extension(path);
        let mut distortions = Vec::with_capacity(image_outcome.samples.len());
        for sample in &image_outcome.samples {
            let save_path = output_dir.join(format!("{}_{}.{}", sample.reference, sample.slot, ext));
            sample
                .image
                .save(&save_path)
                .with_context(|| format!("saving {:?}", save_path))?;
            distortions.push(DistortionEntry {
                record: sample.record(),
                img_lq: save_path.display().to_string(),
            });
        }

        if !distortions.is_empty() {
            meta.insert(
                image_outcome.reference.clone(),
                MetaEntry {
                    img_path: path.display().to_string(),
                    distortion_num: distortions.len(),
                    distortions,
                },
            );
            save_meta(&meta_path, &meta)?;
        }
    }

    let report = outcome.report();
    println!(
        "Generated {} images ({} slots skipped). Summary saved with {} entries",
        report.accepted,
        report.skipped,
        meta.len()
    );
    Ok(())
}

fn save_meta(path: &Path, meta: &BTreeMap<String, MetaEntry>) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(path, json).with_context(|| format!("writing {:?}", path))
}

fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {:?}", dir))? {
        let path = entry?.path();
        if EXTENSIONS.contains(&extension(&path).as_str()) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Все ли выходы изображения уже записаны
fn is_complete(meta: &BTreeMap<String, MetaEntry>, stem: &str, path: &Path, output_dir: &Path) -> bool {
    let Some(entry) = meta.get(stem) else {
        return false;
    };
    let ext = extension(path);
    (0..entry.distortion_num).all(|i| output_dir.join(format!("{}_{}.{}", stem, i, ext)).exists())
}

fn drop_alpha(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn resize_short_side(img: DynamicImage, target: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let short = w.min(h);
    if target >= short {
        return img;
    }
    let ratio = target as f64 / short as f64;
    let (w_new, h_new) = ((w as f64 * ratio).round() as u32, (h as f64 * ratio).round() as u32);
    img.resize_exact(w_new, h_new, FilterType::CatmullRom)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "png".to_string())
}
