//! Artifact file naming.
//!
//! Names are produced by an injected namer rather than read from ambient
//! process state, so runs can be made deterministic.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use crate::assembler::PaddedSprite;

pub const ARTIFACT_PREFIX: &str = "sequence";
pub const ARTIFACT_EXTENSION: &str = "gif";

pub trait ArtifactNamer: Send + Sync {
    fn next_name(&self, frames: &[PaddedSprite]) -> String;
}

/// Names artifacts after the time they were written
pub struct TimestampNamer {
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl TimestampNamer {
    pub fn new<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self { clock: Box::new(clock) }
    }
}

impl Default for TimestampNamer {
    fn default() -> Self {
        Self::new(Utc::now)
    }
}

impl ArtifactNamer for TimestampNamer {
    fn next_name(&self, _frames: &[PaddedSprite]) -> String {
        let now = (self.clock)();
        format!(
            "{}-{}.{}",
            ARTIFACT_PREFIX,
            now.format("%Y%m%d-%H%M%S-%3f"),
            ARTIFACT_EXTENSION
        )
    }
}

/// Names artifacts after a SHA-256 of their frame content
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHashNamer;

impl ArtifactNamer for ContentHashNamer {
    fn next_name(&self, frames: &[PaddedSprite]) -> String {
        let mut hasher = Sha256::new();
        for frame in frames {
            let (w, h) = frame.image.dimensions();
            hasher.update(w.to_le_bytes());
            hasher.update(h.to_le_bytes());
            hasher.update(frame.image.as_raw());
        }
        let digest = format!("{:x}", hasher.finalize());
        format!("{}-{}.{}", ARTIFACT_PREFIX, &digest[..16], ARTIFACT_EXTENSION)
    }
}

/// Always returns the same name
#[derive(Debug, Clone)]
pub struct FixedNamer(String);

impl FixedNamer {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl ArtifactNamer for FixedNamer {
    fn next_name(&self, _frames: &[PaddedSprite]) -> String {
        self.0.clone()
    }
}

/// Prepends `<prefix>-` to another namer's output, keeping batch runs apart
pub struct PrefixedNamer {
    prefix: String,
    inner: Box<dyn ArtifactNamer>,
}

impl PrefixedNamer {
    pub fn new(prefix: impl Into<String>, inner: Box<dyn ArtifactNamer>) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }
}

impl ArtifactNamer for PrefixedNamer {
    fn next_name(&self, frames: &[PaddedSprite]) -> String {
        format!("{}-{}", self.prefix, self.inner.next_name(frames))
    }
}
