//! Pixel art post-processing: pixelize an image, cut the resulting sprite
//! sheet into sprites and assemble them into a looping animation.

pub mod assembler;
pub mod error;
pub mod extractor;
pub mod naming;
pub mod pipeline;
pub mod pixelizer;
pub mod sequencer;
pub mod settings;

pub use assembler::{AnimatedArtifact, ArtifactSink, DirectorySink, PaddedSprite};
pub use error::{PixelsError, Result};
pub use extractor::{BoundingBox, Sprite};
pub use naming::{ArtifactNamer, ContentHashNamer, FixedNamer, TimestampNamer};
pub use pipeline::{process_file, run, PipelineOutput, PipelineReport};
pub use pixelizer::{pixelize, PixelizerSettings};
pub use settings::PipelineSettings;
