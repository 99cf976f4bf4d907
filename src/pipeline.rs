//! Host-facing entry point.
//!
//! Chains pixelization with optional sprite extraction, sequencing and
//! assembly. The only I/O is the artifact sink supplied by the caller and,
//! for `process_file`, the input/output image paths.

use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use crate::assembler::{self, ArtifactSink, FrameInfo};
use crate::error::Result;
use crate::extractor;
use crate::pixelizer;
use crate::sequencer;
use crate::settings::PipelineSettings;

pub const META_PIXEL_SIZE: &str = "Pixelization pixel size";
pub const META_SEQUENCE_PATH: &str = "Sprite sequence";
pub const META_SPRITE_COUNT: &str = "Sprite count";

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub image: DynamicImage,
    pub artifact: Option<PathBuf>,
    pub frames: Vec<FrameInfo>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input: String,
    pub output: String,
    pub original_size: (u32, u32),
    pub final_size: (u32, u32),
    pub pixel_size: u32,
    pub sprite_count: usize,
    pub artifact: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Run the pipeline on an in-memory image
pub fn run(
    img: &DynamicImage,
    settings: &PipelineSettings,
    sink: &dyn ArtifactSink,
) -> Result<PipelineOutput> {
    if !settings.enabled {
        return Ok(PipelineOutput {
            image: img.clone(),
            artifact: None,
            frames: Vec::new(),
            metadata: BTreeMap::new(),
        });
    }

    // All parameters are checked before any pixel work
    settings.validate()?;

    let mut image = pixelizer::pixelize(img, &settings.pixelizer)?;
    let mut metadata = BTreeMap::new();
    metadata.insert(
        META_PIXEL_SIZE.to_string(),
        settings.pixelizer.pixel_size.to_string(),
    );

    if !settings.make_sequence {
        return Ok(PipelineOutput {
            image,
            artifact: None,
            frames: Vec::new(),
            metadata,
        });
    }

    let rgba = image.to_rgba8();
    let sprites = extractor::extract_or_fail(&rgba)?;
    let ordered = sequencer::sequence(sprites, settings.sequencer.row_threshold);
    let artifact = assembler::assemble(&ordered, settings.assembler.framerate)?;
    let path = sink.persist(&artifact)?;

    metadata.insert(META_SEQUENCE_PATH.to_string(), path.display().to_string());
    metadata.insert(META_SPRITE_COUNT.to_string(), artifact.frames.len().to_string());

    if settings.reload_artifact {
        debug!("Reloading {} as working image", path.display());
        image = assembler::load_first_frame(&path)?;
    }

    Ok(PipelineOutput {
        image,
        artifact: Some(path),
        frames: artifact.frame_info(),
        metadata,
    })
}

/// Save the working image, dropping alpha for formats that cannot store it
fn save_output(img: &DynamicImage, path: &Path) -> Result<()> {
    let needs_rgb = matches!(
        ImageFormat::from_path(path),
        Ok(ImageFormat::Jpeg)
    );
    if needs_rgb && img.color().has_alpha() {
        debug!("Dropping alpha to save {}", path.display());
        DynamicImage::ImageRgb8(img.to_rgb8()).save(path)?;
    } else {
        img.save(path)?;
    }
    Ok(())
}

/// Load an image from disk, run the pipeline and save the result
pub fn process_file(
    input_path: &Path,
    output_path: &Path,
    settings: &PipelineSettings,
    sink: &dyn ArtifactSink,
) -> Result<PipelineReport> {
    let img = image::open(input_path)?;
    let original_size = (img.width(), img.height());

    let output = run(&img, settings, sink)?;

    // Ensure output directory exists
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    save_output(&output.image, output_path)?;

    info!(
        "Processed {} -> {} ({}x{} -> {}x{})",
        input_path.display(),
        output_path.display(),
        original_size.0,
        original_size.1,
        output.image.width(),
        output.image.height()
    );

    Ok(PipelineReport {
        input: input_path.display().to_string(),
        output: output_path.display().to_string(),
        original_size,
        final_size: (output.image.width(), output.image.height()),
        pixel_size: settings.pixelizer.pixel_size,
        sprite_count: output.frames.len(),
        artifact: output.artifact.map(|p| p.display().to_string()),
        metadata: output.metadata,
    })
}
