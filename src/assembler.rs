//! Sequence assembly: pad sprites onto a shared canvas and write them out as
//! a looping animated GIF.
//!
//! Every frame is a full canvas rather than a delta, so frames are disposed
//! to background before the next one is drawn.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use crate::error::{Result, PixelsError};
use crate::extractor::{BoundingBox, Sprite};
use crate::naming::ArtifactNamer;

pub const MIN_FRAMERATE: u32 = 1;
pub const MAX_FRAMERATE: u32 = 300;

/// Quantizer speed passed to the GIF encoder (1 = best, 30 = fastest)
const GIF_QUANTIZE_SPEED: i32 = 10;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssemblerSettings {
    /// Frames per second of the output animation (default: 10)
    pub framerate: u32,
    /// Write a JSON sidecar describing each frame next to the artifact (default: false)
    pub export_metadata: bool,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            framerate: 10,
            export_metadata: false,
        }
    }
}

impl AssemblerSettings {
    pub fn validate(&self) -> Result<()> {
        frame_delay_ms(self.framerate).map(|_| ())
    }
}

/// Per-frame delay in whole milliseconds, truncated
pub fn frame_delay_ms(framerate: u32) -> Result<u32> {
    if framerate < MIN_FRAMERATE || framerate > MAX_FRAMERATE {
        return Err(PixelsError::InvalidConfiguration(format!(
            "framerate must be in {}..={}, got {}",
            MIN_FRAMERATE, MAX_FRAMERATE, framerate
        )));
    }
    Ok(1000 / framerate)
}

// ============================================================================
// TYPES
// ============================================================================

/// A sprite placed bottom-left on the run's shared canvas
#[derive(Debug, Clone)]
pub struct PaddedSprite {
    pub image: RgbaImage,
    /// Where the sprite sat in the source sheet
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct AnimatedArtifact {
    pub frames: Vec<PaddedSprite>,
    pub delay_ms: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameInfo {
    pub index: usize,
    pub source: BoundingBox,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub delay_ms: u32,
    pub frames: Vec<FrameInfo>,
}

impl AnimatedArtifact {
    pub fn frame_info(&self) -> Vec<FrameInfo> {
        self.frames
            .iter()
            .enumerate()
            .map(|(index, frame)| FrameInfo {
                index,
                source: frame.bounds,
                w: frame.image.width(),
                h: frame.image.height(),
            })
            .collect()
    }
}

// ============================================================================
// PADDING + ASSEMBLY
// ============================================================================

/// Place every sprite on a transparent canvas of the largest sprite dimensions
pub fn pad_sprites(sprites: &[Sprite]) -> Vec<PaddedSprite> {
    let max_width = sprites.iter().map(Sprite::width).max().unwrap_or(0);
    let max_height = sprites.iter().map(Sprite::height).max().unwrap_or(0);

    sprites
        .iter()
        .map(|sprite| {
            let mut canvas = RgbaImage::from_pixel(max_width, max_height, Rgba([0, 0, 0, 0]));
            let offset_y = max_height - sprite.height();
            imageops::replace(&mut canvas, &sprite.image, 0, offset_y as i64);
            PaddedSprite {
                image: canvas,
                bounds: sprite.bounds,
            }
        })
        .collect()
}

/// Build an animation from ordered sprites
pub fn assemble(sprites: &[Sprite], framerate: u32) -> Result<AnimatedArtifact> {
    let delay_ms = frame_delay_ms(framerate)?;

    if sprites.is_empty() {
        return Err(PixelsError::NoSpritesFound);
    }

    let frames = pad_sprites(sprites);
    let (width, height) = frames[0].image.dimensions();
    debug!("Assembled {} frames on a {}x{} canvas", frames.len(), width, height);

    Ok(AnimatedArtifact {
        frames,
        delay_ms,
        width,
        height,
    })
}

// ============================================================================
// GIF OUTPUT
// ============================================================================

/// Encode the artifact as an infinitely looping GIF
pub fn write_gif(artifact: &AnimatedArtifact, path: &Path) -> Result<()> {
    if artifact.width > u16::MAX as u32 || artifact.height > u16::MAX as u32 {
        return Err(PixelsError::Encoding(format!(
            "{}x{} exceeds the GIF maximum of 65535x65535",
            artifact.width, artifact.height
        )));
    }
    let (w, h) = (artifact.width as u16, artifact.height as u16);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut encoder = gif::Encoder::new(BufWriter::new(file), w, h, &[])?;
    encoder.set_repeat(gif::Repeat::Infinite)?;

    // GIF delays are in centiseconds
    let delay_cs = (artifact.delay_ms / 10).clamp(1, u16::MAX as u32) as u16;

    for padded in &artifact.frames {
        let mut pixels = padded.image.as_raw().clone();
        let mut frame = gif::Frame::from_rgba_speed(w, h, &mut pixels, GIF_QUANTIZE_SPEED);
        frame.delay = delay_cs;
        frame.dispose = gif::DisposalMethod::Background;
        encoder.write_frame(&frame)?;
    }

    Ok(())
}

/// Load the first frame of a persisted artifact as a working image
pub fn load_first_frame(path: &Path) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

// ============================================================================
// SINKS
// ============================================================================

/// Persists an artifact and reports where it went
pub trait ArtifactSink: Send + Sync {
    fn persist(&self, artifact: &AnimatedArtifact) -> Result<PathBuf>;
}

/// Writes GIFs into a directory using an injected namer
pub struct DirectorySink {
    dir: PathBuf,
    namer: Box<dyn ArtifactNamer>,
    export_metadata: bool,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, namer: Box<dyn ArtifactNamer>) -> Self {
        Self {
            dir: dir.into(),
            namer,
            export_metadata: false,
        }
    }

    pub fn with_metadata(mut self, export_metadata: bool) -> Self {
        self.export_metadata = export_metadata;
        self
    }
}

impl ArtifactSink for DirectorySink {
    fn persist(&self, artifact: &AnimatedArtifact) -> Result<PathBuf> {
        let name = self.namer.next_name(&artifact.frames);
        let path = self.dir.join(&name);

        write_gif(artifact, &path)?;

        if self.export_metadata {
            let metadata = ArtifactMetadata {
                file: name,
                width: artifact.width,
                height: artifact.height,
                delay_ms: artifact.delay_ms,
                frames: artifact.frame_info(),
            };
            let json = serde_json::to_string_pretty(&metadata)?;
            std::fs::write(path.with_extension("json"), json)?;
        }

        info!("Wrote {} frame sequence to {}", artifact.frames.len(), path.display());
        Ok(path)
    }
}
